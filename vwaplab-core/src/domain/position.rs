use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
    #[default]
    Flat,
}

/// Position as seen by the decision functions.
///
/// The caller owns and updates it; evaluators only read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    pub size: u64,
    pub stop_loss_price: Option<f64>,
    /// Bars elapsed since the entry bar (0 on the entry bar itself).
    pub bars_held: u32,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn new_long(entry_price: f64, size: u64, stop_loss_price: Option<f64>) -> Self {
        Self {
            side: PositionSide::Long,
            entry_price,
            size,
            stop_loss_price,
            bars_held: 0,
        }
    }

    pub fn new_short(entry_price: f64, size: u64, stop_loss_price: Option<f64>) -> Self {
        Self {
            side: PositionSide::Short,
            entry_price,
            size,
            stop_loss_price,
            bars_held: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }

    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }

    /// Signed PnL of closing the whole position at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        let qty = self.size as f64;
        match self.side {
            PositionSide::Long => qty * (price - self.entry_price),
            PositionSide::Short => qty * (self.entry_price - price),
            PositionSide::Flat => 0.0,
        }
    }
}
