//! Bar — the fundamental market data unit.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// OHLCV bar with the indicator values the decision rules read.
///
/// Indicator fields are optional: `None` (or a NaN value) means the
/// indicator has not been computed for this bar, typically during warmup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Session-anchored volume-weighted average price.
    #[serde(default)]
    pub vwap: Option<f64>,
    /// Fast EMA of closes (EMA-13 for the retest strategy).
    #[serde(default)]
    pub ema_fast: Option<f64>,
    /// Slow EMA of closes, read only by the crossover strategy.
    #[serde(default)]
    pub ema_slow: Option<f64>,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            vwap: None,
            ema_fast: None,
            ema_slow: None,
        }
    }

    pub fn with_vwap(mut self, vwap: f64) -> Self {
        self.vwap = Some(vwap);
        self
    }

    pub fn with_ema_fast(mut self, ema: f64) -> Self {
        self.ema_fast = Some(ema);
        self
    }

    pub fn with_ema_slow(mut self, ema: f64) -> Self {
        self.ema_slow = Some(ema);
        self
    }

    /// Calendar date of the bar, used for session boundaries.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Midpoint of the candle body: (open + close) / 2.
    pub fn midpoint(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    /// VWAP if present and not NaN.
    pub fn vwap_value(&self) -> Option<f64> {
        self.vwap.filter(|v| !v.is_nan())
    }

    /// Fast EMA if present and not NaN.
    pub fn ema_fast_value(&self) -> Option<f64> {
        self.ema_fast.filter(|v| !v.is_nan())
    }

    /// Slow EMA if present and not NaN.
    pub fn ema_slow_value(&self) -> Option<f64> {
        self.ema_slow.filter(|v| !v.is_nan())
    }

    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }
}
