//! Indicators — pure functions from a bar series to a numeric series.
//!
//! Indicators are computed once over the whole series and written onto the
//! bars with [`annotate`] before evaluation. The first `lookback()` values
//! of each series are `f64::NAN` (warmup).
//!
//! # Look-ahead contamination guard
//! No value at bar t may depend on data from bar t+1 or later.

pub mod ema;
pub mod vwap;

pub use ema::Ema;
pub use vwap::SessionVwap;

use crate::domain::Bar;

/// Trait for indicators.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_13", "vwap").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Fill `vwap`, `ema_fast` and (if `slow_period` is given) `ema_slow` on
/// every bar that does not already carry a value.
///
/// Values supplied by the data source win over computed ones, so feeds with
/// their own VWAP pass through unchanged. Warmup NaNs become `None`.
pub fn annotate(bars: &mut [Bar], fast_period: usize, slow_period: Option<usize>) {
    let vwap = SessionVwap.compute(bars);
    let fast = Ema::new(fast_period).compute(bars);
    let slow = slow_period.map(|p| Ema::new(p).compute(bars));

    for (i, bar) in bars.iter_mut().enumerate() {
        if bar.vwap_value().is_none() {
            bar.vwap = finite(vwap[i]);
        }
        if bar.ema_fast_value().is_none() {
            bar.ema_fast = finite(fast[i]);
        }
        if let Some(slow) = &slow {
            if bar.ema_slow_value().is_none() {
                bar.ema_slow = finite(slow[i]);
            }
        }
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Create synthetic intraday bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000,
/// one bar per minute from 09:30.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar::new(
                start + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
