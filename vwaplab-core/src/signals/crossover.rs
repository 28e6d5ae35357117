//! EMA crossover — golden cross opens long, death cross opens short, and any
//! open position is closed after a fixed number of bars.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, CloseReason, Decision, Position};
use crate::sizing::{FixedSizer, Sizer};

use super::{require_indicator, InputError, Window};

/// Parameters for the EMA crossover evaluator.
///
/// # Indicator dependencies
/// Reads `ema_fast` (EMA of `fast_period`) and `ema_slow` (EMA of
/// `slow_period`) from each bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    /// Bars after entry at which the position is closed.
    pub hold_bars: u32,
    /// Units per entry, clamped to available cash.
    pub order_size: u64,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        Self {
            fast_period: 9,
            slow_period: 13,
            hold_bars: 5,
            order_size: 1,
        }
    }
}

impl CrossoverParams {
    pub fn validate(&self) -> Result<(), InputError> {
        if self.fast_period == 0 {
            return Err(InputError::InvalidParams("fast_period must be >= 1".into()));
        }
        if self.slow_period <= self.fast_period {
            return Err(InputError::InvalidParams(
                "slow_period must be > fast_period".into(),
            ));
        }
        if self.order_size == 0 {
            return Err(InputError::InvalidParams("order_size must be >= 1".into()));
        }
        Ok(())
    }
}

/// Evaluate the crossover strategy for the newest bar in `window`.
///
/// Stateless: everything it needs is in the window and the position.
pub fn evaluate_crossover(
    window: &[Bar],
    position: &Position,
    params: &CrossoverParams,
    available_cash: f64,
) -> Result<Decision, InputError> {
    params.validate()?;
    let window = Window::new(window)?;
    let bar = window.current();

    if !position.is_flat() {
        if position.bars_held >= params.hold_bars {
            tracing::info!(
                timestamp = %bar.timestamp,
                price = bar.close,
                bars_held = position.bars_held,
                "holding period reached, close created"
            );
            return Ok(Decision::Close {
                reason: CloseReason::HoldingPeriod,
            });
        }
        return Ok(Decision::Hold);
    }

    // Guard: need a previous bar for crossover detection.
    let Some(prev) = window.previous() else {
        return Ok(Decision::Hold);
    };

    let fast_cur = require_indicator(bar, bar.ema_fast, "ema_fast")?;
    let slow_cur = require_indicator(bar, bar.ema_slow, "ema_slow")?;
    let fast_prev = require_indicator(prev, prev.ema_fast, "ema_fast")?;
    let slow_prev = require_indicator(prev, prev.ema_slow, "ema_slow")?;

    let golden = fast_cur > slow_cur && fast_prev < slow_prev;
    let death = fast_cur < slow_cur && fast_prev > slow_prev;
    if !golden && !death {
        return Ok(Decision::Hold);
    }

    let size = FixedSizer::new(params.order_size).size(bar.close, None, available_cash);
    if size == 0 {
        tracing::warn!(
            timestamp = %bar.timestamp,
            price = bar.close,
            cash = available_cash,
            "crossover skipped: position size is zero"
        );
        return Ok(Decision::Hold);
    }

    if golden {
        tracing::info!(timestamp = %bar.timestamp, price = bar.close, size, "buy created");
        Ok(Decision::OpenLong {
            size,
            stop_loss: None,
        })
    } else {
        tracing::info!(timestamp = %bar.timestamp, price = bar.close, size, "sell created");
        Ok(Decision::OpenShort {
            size,
            stop_loss: None,
        })
    }
}
