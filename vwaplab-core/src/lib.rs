//! VwapLab Core — per-bar trading decisions, decoupled from any backtest engine.
//!
//! This crate contains:
//! - Domain types (bars, positions, decisions)
//! - The VWAP retest evaluator and the EMA crossover evaluator
//! - Risk-based and fixed position sizing
//! - EMA and session VWAP indicators
//! - A per-symbol replay session that applies decisions at the bar close
//! - TOML strategy configuration, CSV bar loading and run fingerprints

pub mod config;
pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
pub mod session;
pub mod signals;
pub mod sizing;

pub use config::{ConfigError, StrategyConfig, StrategyKind};
pub use domain::{Bar, CloseReason, Decision, Position, PositionSide};
pub use session::{replay, replay_many, Session, SessionReport};
pub use signals::{
    evaluate, evaluate_crossover, CrossoverParams, InputError, RetestParams, SetupFlag,
    SignalState,
};
