//! Session-anchored VWAP.
//!
//! VWAP[t] = Σ(typical * volume) / Σ volume over the bars of the current
//! session, where typical = (high + low + close) / 3. A session starts at the
//! first bar of each calendar date, so the running sums reset at every date
//! change. Sessions with zero cumulative volume so far yield NaN.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionVwap;

impl SessionVwap {
    pub fn typical_price(bar: &Bar) -> f64 {
        (bar.high + bar.low + bar.close) / 3.0
    }
}

impl Indicator for SessionVwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = Vec::with_capacity(bars.len());
        let mut session = None;
        let mut cum_pv = 0.0;
        let mut cum_vol = 0.0;

        for bar in bars {
            let date = bar.date();
            if session != Some(date) {
                session = Some(date);
                cum_pv = 0.0;
                cum_vol = 0.0;
            }
            if !bar.is_void() && bar.volume.is_finite() {
                cum_pv += Self::typical_price(bar) * bar.volume;
                cum_vol += bar.volume;
            }
            result.push(if cum_vol > 0.0 {
                cum_pv / cum_vol
            } else {
                f64::NAN
            });
        }

        result
    }
}
