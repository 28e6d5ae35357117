//! Position sizers — translate a risk budget or fixed quantity into whole units.
//!
//! Sizers are account-aware (they see available cash) but signal-agnostic.
//! Every sizer clamps its result so that `size * entry_price` never exceeds
//! the available cash.

/// Position sizing logic.
pub trait Sizer: Send + Sync {
    /// Units to trade when entering at `entry_price` with a protective stop
    /// at `stop_price` (if any). Returns 0 when no valid size exists.
    fn size(&self, entry_price: f64, stop_price: Option<f64>, available_cash: f64) -> u64;

    /// Sizer name for logging.
    fn name(&self) -> &str;
}

/// Fixed-risk sizer.
///
/// # Formula
/// ```text
/// max_loseable = account_value * max_loss_fraction
/// quantity     = round(max_loseable / |entry - stop|)
/// ```
///
/// # Example
/// - Account: $10,000, max loss 0.5% ($50)
/// - Entry 100.0, stop 98.703 (distance 1.297)
/// - Quantity: round(50 / 1.297) = 39 units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSizer {
    pub account_value: f64,
    pub max_loss_fraction: f64,
}

impl RiskSizer {
    pub fn new(account_value: f64, max_loss_fraction: f64) -> Self {
        Self {
            account_value,
            max_loss_fraction,
        }
    }

    /// Largest loss a single trade may take if the stop is hit.
    pub fn max_loseable(&self) -> f64 {
        self.account_value * self.max_loss_fraction
    }
}

impl Sizer for RiskSizer {
    fn size(&self, entry_price: f64, stop_price: Option<f64>, available_cash: f64) -> u64 {
        let Some(stop) = stop_price else {
            return 0;
        };
        let distance = (entry_price - stop).abs();
        if !distance.is_finite() || distance <= 0.0 {
            return 0;
        }
        let raw = (self.max_loseable() / distance).round();
        clamp_to_cash(raw, entry_price, available_cash)
    }

    fn name(&self) -> &str {
        "risk"
    }
}

/// Always trade the same number of units, subject to the cash clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizer {
    pub quantity: u64,
}

impl FixedSizer {
    pub fn new(quantity: u64) -> Self {
        Self { quantity }
    }
}

impl Sizer for FixedSizer {
    fn size(&self, entry_price: f64, _stop_price: Option<f64>, available_cash: f64) -> u64 {
        clamp_to_cash(self.quantity as f64, entry_price, available_cash)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// If `raw * price` exceeds the cash, fall back to the most whole units the
/// cash can buy.
fn clamp_to_cash(raw: f64, price: f64, available_cash: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 || !price.is_finite() || price <= 0.0 {
        return 0;
    }
    let cash = available_cash.max(0.0);
    let qty = if raw * price > cash {
        (cash / price).floor()
    } else {
        raw
    };
    // `as` saturates for out-of-range floats.
    qty as u64
}
