//! Decision — the single per-bar output of a strategy evaluator.

use serde::{Deserialize, Serialize};

/// Why a position is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Close breached the stop-loss on two consecutive bars.
    SoftStop,
    /// Close crossed back through the fast EMA while in profit territory.
    EmaTakeProfit,
    /// Position reached its maximum holding period.
    HoldingPeriod,
}

/// What the caller should do on this bar.
///
/// Evaluators never execute orders; the caller maps a decision onto its
/// broker or order system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Hold,
    OpenLong { size: u64, stop_loss: Option<f64> },
    OpenShort { size: u64, stop_loss: Option<f64> },
    Close { reason: CloseReason },
}

impl Decision {
    pub fn is_hold(&self) -> bool {
        matches!(self, Self::Hold)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::OpenLong { .. } | Self::OpenShort { .. })
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close { .. })
    }
}
