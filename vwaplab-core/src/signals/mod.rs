//! Per-bar decision functions.
//!
//! Evaluators are pure: they receive a window of bars (most-recent-last),
//! the state carried from the previous bar, and the caller's position, and
//! return a [`Decision`](crate::domain::Decision). They never touch broker or
//! account state.
//!
//! - [`retest`] — VWAP retest with confirmation candle, soft stop and EMA exit
//! - [`crossover`] — fast/slow EMA crossover with a fixed holding period

pub mod crossover;
pub mod retest;

pub use crossover::{evaluate_crossover, CrossoverParams};
pub use retest::{evaluate, RetestParams};

use crate::domain::Bar;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed input handed to an evaluator. No partial result is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("window is empty")]
    EmptyWindow,

    #[error("bar at {timestamp} has invalid vwap {value}")]
    InvalidVwap {
        timestamp: NaiveDateTime,
        value: f64,
    },

    #[error("bar at {timestamp} is missing {field}")]
    MissingIndicator {
        timestamp: NaiveDateTime,
        field: &'static str,
    },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// Directional flag produced by the retest and confirmation rules.
///
/// Encodes the {-1, 0, +1} convention: `Long` = +1, `Neutral` = 0, `Short` = -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupFlag {
    Long,
    Short,
    #[default]
    Neutral,
}

impl SetupFlag {
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Neutral)
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
            Self::Neutral => 0,
        }
    }
}

/// State carried across bar evaluations for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalState {
    pub retest_flag: SetupFlag,
    pub confirmation_flag: SetupFlag,
    /// Consecutive bars the close has breached the stop-loss.
    pub soft_stop_count: u32,
}

/// Bounded view over the most recent bars, most-recent-last.
///
/// Replaces negative-offset lookback with named positional access.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    bars: &'a [Bar],
}

impl<'a> Window<'a> {
    pub fn new(bars: &'a [Bar]) -> Result<Self, InputError> {
        if bars.is_empty() {
            return Err(InputError::EmptyWindow);
        }
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false: construction rejects empty slices.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The bar being evaluated.
    pub fn current(&self) -> &'a Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// The bar before the current one, if the window holds one.
    pub fn previous(&self) -> Option<&'a Bar> {
        self.bars.len().checked_sub(2).map(|i| &self.bars[i])
    }

    /// The last `n` bars (or all of them if fewer).
    pub fn tail(&self, n: usize) -> &'a [Bar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}

/// Check that a bar carries a usable, strictly positive VWAP.
pub(crate) fn require_vwap(bar: &Bar) -> Result<f64, InputError> {
    let vwap = bar.vwap_value().ok_or(InputError::MissingIndicator {
        timestamp: bar.timestamp,
        field: "vwap",
    })?;
    if !vwap.is_finite() || vwap <= 0.0 {
        return Err(InputError::InvalidVwap {
            timestamp: bar.timestamp,
            value: vwap,
        });
    }
    Ok(vwap)
}

/// Fetch a finite indicator value or report it missing.
pub(crate) fn require_indicator(
    bar: &Bar,
    value: Option<f64>,
    field: &'static str,
) -> Result<f64, InputError> {
    value
        .filter(|v| v.is_finite())
        .ok_or(InputError::MissingIndicator {
            timestamp: bar.timestamp,
            field,
        })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::Bar;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    pub fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + Duration::minutes(5 * i as i64)
    }

    /// Bar with explicit open/close, high/low one tick outside the body.
    pub fn bar(i: usize, open: f64, close: f64, vwap: f64, ema: f64) -> Bar {
        Bar::new(
            ts(i),
            open,
            open.max(close) + 0.05,
            open.min(close) - 0.05,
            close,
            1_000.0,
        )
        .with_vwap(vwap)
        .with_ema_fast(ema)
    }
}
