//! Domain types shared by every evaluator.

pub mod bar;
pub mod decision;
pub mod position;

pub use bar::Bar;
pub use decision::{CloseReason, Decision};
pub use position::{Position, PositionSide};
