//! Per-symbol replay driver.
//!
//! A [`Session`] is the trading loop around the pure evaluators: it owns the
//! bounded bar window, the carried [`SignalState`], the [`Position`] and the
//! cash balance, feeds bars one at a time, and applies each decision at the
//! bar's close. There is no broker model: fills happen at the close with no
//! commission or slippage.
//!
//! Sessions share nothing, so independent symbols can be replayed in
//! parallel with [`replay_many`].

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::{StrategyConfig, StrategyKind};
use crate::domain::{Bar, CloseReason, Decision, Position, PositionSide};
use crate::fingerprint::{DatasetHash, RunFingerprint};
use crate::indicators::annotate;
use crate::signals::{
    evaluate, evaluate_crossover, require_indicator, require_vwap, InputError, SignalState,
};

/// A non-hold decision and the bar it was made on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub decision: Decision,
}

/// A completed round trip: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: PositionSide,
    pub size: u64,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: CloseReason,
    pub bars_held: u32,
    pub pnl: f64,
}

/// Everything a replay produced for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub fingerprint: RunFingerprint,
    pub decisions: Vec<DecisionRecord>,
    pub trades: Vec<TradeRecord>,
    pub bars_evaluated: usize,
    /// Bars dropped because their indicators were still warming up.
    pub bars_skipped: usize,
    pub final_cash: f64,
    /// Cash plus the open position marked at the last close.
    pub final_equity: f64,
    pub final_position: Position,
}

/// Trading loop state for one symbol.
#[derive(Debug, Clone)]
pub struct Session {
    symbol: String,
    config: StrategyConfig,
    window: VecDeque<Bar>,
    capacity: usize,
    state: SignalState,
    position: Position,
    entry_time: Option<NaiveDateTime>,
    cash: f64,
    decisions: Vec<DecisionRecord>,
    trades: Vec<TradeRecord>,
    bars_evaluated: usize,
    bars_skipped: usize,
}

impl Session {
    pub fn new(symbol: impl Into<String>, config: StrategyConfig) -> Result<Self, InputError> {
        config.validate()?;
        let capacity = config.strategy.window_len();
        Ok(Self {
            symbol: symbol.into(),
            cash: config.initial_cash,
            config,
            window: VecDeque::with_capacity(capacity),
            capacity,
            state: SignalState::default(),
            position: Position::flat(),
            entry_time: None,
            decisions: Vec::new(),
            trades: Vec::new(),
            bars_evaluated: 0,
            bars_skipped: 0,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> &SignalState {
        &self.state
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn decisions(&self) -> &[DecisionRecord] {
        &self.decisions
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// True once the bar carries every indicator the strategy reads.
    fn has_indicators(&self, bar: &Bar) -> bool {
        match &self.config.strategy {
            StrategyKind::VwapRetest { .. } => {
                bar.vwap_value().is_some() && bar.ema_fast_value().is_some()
            }
            StrategyKind::EmaCrossover { .. } => {
                bar.ema_fast_value().is_some() && bar.ema_slow_value().is_some()
            }
        }
    }

    /// Reject a bar whose indicators are present but unusable.
    fn check_bar(&self, bar: &Bar) -> Result<(), InputError> {
        match &self.config.strategy {
            StrategyKind::VwapRetest { .. } => {
                require_vwap(bar)?;
                require_indicator(bar, bar.ema_fast, "ema_fast")?;
            }
            StrategyKind::EmaCrossover { .. } => {
                require_indicator(bar, bar.ema_fast, "ema_fast")?;
                require_indicator(bar, bar.ema_slow, "ema_slow")?;
            }
        }
        Ok(())
    }

    /// Feed the next bar, evaluate it, and apply the decision at its close.
    ///
    /// A bar that fails validation leaves the session untouched, so the
    /// caller may skip it and continue with the next one.
    pub fn on_bar(&mut self, bar: Bar) -> Result<Decision, InputError> {
        if !self.has_indicators(&bar) {
            tracing::trace!(symbol = %self.symbol, timestamp = %bar.timestamp, "warmup bar skipped");
            self.bars_skipped += 1;
            return Ok(Decision::Hold);
        }
        self.check_bar(&bar)?;

        if !self.position.is_flat() {
            self.position.bars_held += 1;
        }

        self.window.push_back(bar);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        let window = self.window.make_contiguous();

        let decision = match &self.config.strategy {
            StrategyKind::VwapRetest { params, .. } => {
                let params = params.with_available_cash(self.cash);
                let (decision, state) = evaluate(window, &self.state, &self.position, &params)?;
                self.state = state;
                decision
            }
            StrategyKind::EmaCrossover { params } => {
                evaluate_crossover(window, &self.position, params, self.cash)?
            }
        };
        self.bars_evaluated += 1;

        let (timestamp, close) = match self.window.back() {
            Some(bar) => (bar.timestamp, bar.close),
            None => return Ok(decision),
        };
        self.apply(decision, timestamp, close);
        Ok(decision)
    }

    fn apply(&mut self, decision: Decision, timestamp: NaiveDateTime, close: f64) {
        match decision {
            Decision::Hold => return,
            Decision::OpenLong { size, stop_loss } => {
                self.cash -= size as f64 * close;
                self.position = Position::new_long(close, size, stop_loss);
                self.entry_time = Some(timestamp);
            }
            Decision::OpenShort { size, stop_loss } => {
                self.cash += size as f64 * close;
                self.position = Position::new_short(close, size, stop_loss);
                self.entry_time = Some(timestamp);
            }
            Decision::Close { reason } => {
                let notional = self.position.size as f64 * close;
                match self.position.side {
                    PositionSide::Long => self.cash += notional,
                    PositionSide::Short => self.cash -= notional,
                    PositionSide::Flat => return,
                }
                let trade = TradeRecord {
                    side: self.position.side,
                    size: self.position.size,
                    entry_time: self.entry_time.unwrap_or(timestamp),
                    entry_price: self.position.entry_price,
                    exit_time: timestamp,
                    exit_price: close,
                    exit_reason: reason,
                    bars_held: self.position.bars_held,
                    pnl: self.position.unrealized_pnl(close),
                };
                tracing::info!(
                    symbol = %self.symbol,
                    pnl = trade.pnl,
                    bars_held = trade.bars_held,
                    reason = ?reason,
                    "trade closed"
                );
                self.trades.push(trade);
                self.position = Position::flat();
                self.entry_time = None;
            }
        }
        self.decisions.push(DecisionRecord {
            timestamp,
            close,
            decision,
        });
    }

    /// Cash plus the open position marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        let notional = self.position.size as f64 * price;
        match self.position.side {
            PositionSide::Long => self.cash + notional,
            PositionSide::Short => self.cash - notional,
            PositionSide::Flat => self.cash,
        }
    }

    fn into_report(self, fingerprint: RunFingerprint, last_close: f64) -> SessionReport {
        let final_equity = self.equity(last_close);
        SessionReport {
            fingerprint,
            decisions: self.decisions,
            trades: self.trades,
            bars_evaluated: self.bars_evaluated,
            bars_skipped: self.bars_skipped,
            final_cash: self.cash,
            final_equity,
            final_position: self.position,
        }
    }
}

/// Annotate `bars` with the strategy's indicators and replay them through a
/// fresh session.
pub fn replay(
    symbol: &str,
    mut bars: Vec<Bar>,
    config: &StrategyConfig,
) -> Result<SessionReport, InputError> {
    let mut session = Session::new(symbol, config.clone())?;
    let fingerprint = RunFingerprint {
        symbol: symbol.to_string(),
        strategy: config.strategy.name().to_string(),
        config_hash: config.full_hash(),
        dataset_hash: DatasetHash::of_bars(&bars),
        bar_count: bars.len(),
    };

    let (fast, slow) = config.strategy.ema_periods();
    annotate(&mut bars, fast, slow);

    let last_close = bars.last().map(|b| b.close).unwrap_or(0.0);
    for bar in bars {
        session.on_bar(bar)?;
    }

    let report = session.into_report(fingerprint, last_close);
    tracing::info!(
        symbol,
        trades = report.trades.len(),
        final_equity = report.final_equity,
        "replay finished"
    );
    Ok(report)
}

/// Replay independent symbols in parallel. Results keep the input order.
pub fn replay_many(
    inputs: Vec<(String, Vec<Bar>)>,
    config: &StrategyConfig,
) -> Vec<(String, Result<SessionReport, InputError>)> {
    inputs
        .into_par_iter()
        .map(|(symbol, bars)| {
            let result = replay(&symbol, bars, config);
            (symbol, result)
        })
        .collect()
}
