//! VWAP retest signal — pullback to VWAP after a sustained move, confirmed by
//! the next candle.
//!
//! Rule 1 (retest setup): most of the recent candle bodies sit on one side of
//! VWAP, price is moving back toward it, and the close (or the wick on the
//! VWAP side) touches VWAP within `tolerance`.
//!
//! Rule 2 (confirmation): on the bar right after a setup, the close moves away
//! from VWAP in the setup direction and finishes on the correct side of it.
//!
//! Exits: a soft stop that needs two consecutive closes through the stop, and
//! an EMA take-profit when the close crosses back through the fast EMA.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, CloseReason, Decision, Position, PositionSide};
use crate::sizing::{RiskSizer, Sizer};

use super::{require_indicator, require_vwap, InputError, SetupFlag, SignalState, Window};

/// Consecutive stop breaches required before the soft stop closes a position.
pub const SOFT_STOP_BARS: u32 = 2;

/// Largest accepted `vwap_candle_threshold`; sessions allocate a window this big.
pub const MAX_VWAP_CANDLE_THRESHOLD: usize = 10_000;

/// Parameters for the VWAP retest evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetestParams {
    /// Relative distance to VWAP that counts as a touch (0.001 = 0.1%).
    pub tolerance: f64,
    /// Number of recent bars inspected for the above/below VWAP majority.
    pub vwap_candle_threshold: usize,
    /// Fraction of `vwap_candle_threshold` bars that must agree.
    pub majority_fraction: f64,
    /// Stop distance beyond VWAP as a fraction (0.003 = 0.3%).
    pub stoploss_fraction: f64,
    pub account_value: f64,
    /// Fraction of `account_value` a single trade may lose at its stop.
    pub max_loss_fraction: f64,
    /// Cash available for a new position; `None` means `account_value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_cash: Option<f64>,
}

impl Default for RetestParams {
    fn default() -> Self {
        Self {
            tolerance: 0.001,
            vwap_candle_threshold: 8,
            majority_fraction: 0.6,
            stoploss_fraction: 0.003,
            account_value: 10_000.0,
            max_loss_fraction: 0.005,
            available_cash: None,
        }
    }
}

impl RetestParams {
    pub fn with_available_cash(mut self, cash: f64) -> Self {
        self.available_cash = Some(cash);
        self
    }

    /// Bars that must agree on the VWAP side: `threshold * majority_fraction`
    /// rounded half-up, and never less than one.
    pub fn majority_threshold(&self) -> usize {
        let majority = (self.vwap_candle_threshold as f64 * self.majority_fraction).round();
        (majority as usize).max(1)
    }

    pub fn cash(&self) -> f64 {
        self.available_cash.unwrap_or(self.account_value)
    }

    pub fn sizer(&self) -> RiskSizer {
        RiskSizer::new(self.account_value, self.max_loss_fraction)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        let invalid = |msg: &str| Err(InputError::InvalidParams(msg.to_string()));
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid("tolerance must be > 0");
        }
        if self.vwap_candle_threshold == 0 {
            return invalid("vwap_candle_threshold must be >= 1");
        }
        if self.vwap_candle_threshold > MAX_VWAP_CANDLE_THRESHOLD {
            return invalid("vwap_candle_threshold must be <= 10000");
        }
        if !(self.majority_fraction > 0.0 && self.majority_fraction <= 1.0) {
            return invalid("majority_fraction must be in (0, 1]");
        }
        if !(self.stoploss_fraction > 0.0 && self.stoploss_fraction < 1.0) {
            return invalid("stoploss_fraction must be in (0, 1)");
        }
        if !(self.max_loss_fraction > 0.0 && self.max_loss_fraction < 1.0) {
            return invalid("max_loss_fraction must be in (0, 1)");
        }
        if !(self.account_value.is_finite() && self.account_value > 0.0) {
            return invalid("account_value must be > 0");
        }
        if matches!(self.available_cash, Some(c) if c.is_nan()) {
            return invalid("available_cash must not be NaN");
        }
        Ok(())
    }

    /// Bars the evaluator validates and reads: the majority window, and at
    /// least the current and previous bar.
    pub fn active_bars(&self) -> usize {
        self.vwap_candle_threshold.max(2)
    }
}

/// Count bars whose body midpoint is at/above and at/below their VWAP.
///
/// A bar exactly at VWAP counts toward both. Assumes VWAP was validated.
pub fn vwap_side_counts(bars: &[Bar]) -> (usize, usize) {
    bars.iter().fold((0, 0), |(above, below), bar| {
        let mid = bar.midpoint();
        let vwap = bar.vwap_value().unwrap_or(f64::NAN);
        (
            above + usize::from(mid >= vwap),
            below + usize::from(mid <= vwap),
        )
    })
}

/// Evaluate the VWAP retest strategy for the newest bar in `window`.
///
/// Returns the decision for this bar and the state to carry into the next one.
pub fn evaluate(
    window: &[Bar],
    prior_state: &SignalState,
    position: &Position,
    params: &RetestParams,
) -> Result<(Decision, SignalState), InputError> {
    params.validate()?;
    let window = Window::new(window)?;

    let mut vwap = 0.0;
    for bar in window.tail(params.active_bars()) {
        vwap = require_vwap(bar)?;
        require_indicator(bar, bar.ema_fast, "ema_fast")?;
    }
    // The loop ends on the current bar, so `vwap` is its VWAP.
    let bar = window.current();
    let prev = window.previous();

    let mut state = SignalState {
        retest_flag: SetupFlag::Neutral,
        confirmation_flag: SetupFlag::Neutral,
        soft_stop_count: prior_state.soft_stop_count,
    };

    if window.len() >= params.vwap_candle_threshold {
        if let Some(prev) = prev {
            state.retest_flag = retest_setup(&window, bar, prev, vwap, params);
            state.confirmation_flag = confirmation(prior_state.retest_flag, bar, prev, vwap);
            if state.retest_flag.is_set() || state.confirmation_flag.is_set() {
                tracing::debug!(
                    timestamp = %bar.timestamp,
                    retest = state.retest_flag.as_i8(),
                    confirmation = state.confirmation_flag.as_i8(),
                    "vwap flags updated"
                );
            }
        }
    }

    let decision = match position.side {
        PositionSide::Flat => {
            state.soft_stop_count = 0;
            open_decision(bar, vwap, state.confirmation_flag, params)
        }
        PositionSide::Long | PositionSide::Short => {
            let (decision, count) = close_decision(bar, prev, position, prior_state.soft_stop_count);
            state.soft_stop_count = count;
            decision
        }
    };

    Ok((decision, state))
}

fn retest_setup(
    window: &Window<'_>,
    bar: &Bar,
    prev: &Bar,
    vwap: f64,
    params: &RetestParams,
) -> SetupFlag {
    let (above, below) = vwap_side_counts(window.tail(params.vwap_candle_threshold));
    let majority = params.majority_threshold();
    let price_direction = bar.close - prev.close;
    let touches = |price: f64| (price - vwap).abs() / vwap <= params.tolerance;

    if above >= majority && price_direction < 0.0 {
        if touches(bar.close) || touches(bar.low) {
            return SetupFlag::Long;
        }
    } else if below >= majority
        && price_direction > 0.0
        && (touches(bar.close) || touches(bar.high))
    {
        return SetupFlag::Short;
    }
    SetupFlag::Neutral
}

fn confirmation(prior_retest: SetupFlag, bar: &Bar, prev: &Bar, vwap: f64) -> SetupFlag {
    match prior_retest {
        SetupFlag::Long if bar.close > prev.close && bar.close > vwap => SetupFlag::Long,
        SetupFlag::Short if bar.close < prev.close && bar.close < vwap => SetupFlag::Short,
        _ => SetupFlag::Neutral,
    }
}

fn open_decision(bar: &Bar, vwap: f64, confirmation: SetupFlag, params: &RetestParams) -> Decision {
    let (stop, long) = match confirmation {
        SetupFlag::Long => (vwap * (1.0 - params.stoploss_fraction), true),
        SetupFlag::Short => (vwap * (1.0 + params.stoploss_fraction), false),
        SetupFlag::Neutral => return Decision::Hold,
    };

    let size = params.sizer().size(bar.close, Some(stop), params.cash());
    if size == 0 {
        tracing::warn!(
            timestamp = %bar.timestamp,
            price = bar.close,
            cash = params.cash(),
            "confirmed retest skipped: position size is zero"
        );
        return Decision::Hold;
    }

    tracing::info!(
        timestamp = %bar.timestamp,
        side = if long { "long" } else { "short" },
        price = bar.close,
        stop_loss = stop,
        size,
        "open created"
    );
    if long {
        Decision::OpenLong {
            size,
            stop_loss: Some(stop),
        }
    } else {
        Decision::OpenShort {
            size,
            stop_loss: Some(stop),
        }
    }
}

/// Soft stop first, then EMA take-profit. Returns the decision and the new
/// soft stop counter.
fn close_decision(
    bar: &Bar,
    prev: Option<&Bar>,
    position: &Position,
    soft_stop_count: u32,
) -> (Decision, u32) {
    let breached = match (position.side, position.stop_loss_price) {
        (PositionSide::Long, Some(stop)) => bar.close <= stop,
        (PositionSide::Short, Some(stop)) => bar.close >= stop,
        _ => false,
    };
    let count = if breached { soft_stop_count + 1 } else { 0 };

    if count >= SOFT_STOP_BARS {
        tracing::info!(
            timestamp = %bar.timestamp,
            price = bar.close,
            breaches = count,
            "soft stop loss hit, close created"
        );
        return (
            Decision::Close {
                reason: CloseReason::SoftStop,
            },
            count,
        );
    }

    if let Some(prev) = prev {
        if ema_take_profit(bar, prev, position) {
            tracing::info!(
                timestamp = %bar.timestamp,
                price = bar.close,
                "close crossed fast ema, close created"
            );
            return (
                Decision::Close {
                    reason: CloseReason::EmaTakeProfit,
                },
                count,
            );
        }
    }

    (Decision::Hold, count)
}

fn ema_take_profit(bar: &Bar, prev: &Bar, position: &Position) -> bool {
    // Both EMAs were validated as part of the active window.
    let (Some(ema), Some(prev_ema)) = (bar.ema_fast_value(), prev.ema_fast_value()) else {
        return false;
    };
    match position.side {
        PositionSide::Long => {
            bar.close < ema && prev.close > prev_ema && position.entry_price <= ema
        }
        PositionSide::Short => {
            bar.close > ema && prev.close < prev_ema && position.entry_price >= ema
        }
        PositionSide::Flat => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::test_support::bar;

    /// Seven bars riding above VWAP=100, then a pullback bar closing at VWAP.
    fn long_setup_window() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..7)
            .map(|i| bar(i, 101.0, 101.5, 100.0, 100.5))
            .collect();
        bars.push(bar(7, 101.0, 100.05, 100.0, 100.5));
        bars
    }

    /// Retest bar at index 7 (VWAP 99), confirmation candle at index 8 closing at 100.
    fn long_confirmation_window() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..7).map(|i| bar(i, 100.0, 100.5, 99.0, 99.8)).collect();
        bars.push(bar(7, 100.0, 99.05, 99.0, 99.8));
        bars.push(bar(8, 99.6, 100.0, 99.0, 99.8));
        bars
    }

    fn short_confirmation_window() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..7).map(|i| bar(i, 100.0, 99.5, 100.0, 99.8)).collect();
        bars.push(bar(7, 99.5, 99.95, 100.0, 99.8));
        bars.push(bar(8, 99.9, 99.0, 100.0, 99.8));
        bars
    }

    fn short_setup_window() -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..7).map(|i| bar(i, 99.0, 98.5, 100.0, 99.5)).collect();
        bars.push(bar(7, 99.0, 99.95, 100.0, 99.5));
        bars
    }

    #[test]
    fn majority_threshold_rounds_half_up() {
        let mut p = RetestParams::default();
        assert_eq!(p.majority_threshold(), 5);
        p.vwap_candle_threshold = 5;
        p.majority_fraction = 0.5;
        assert_eq!(p.majority_threshold(), 3);
        p.vwap_candle_threshold = 10;
        p.majority_fraction = 0.6;
        assert_eq!(p.majority_threshold(), 6);
    }

    #[test]
    fn majority_threshold_is_at_least_one() {
        let p = RetestParams {
            vwap_candle_threshold: 1,
            majority_fraction: 0.4,
            ..RetestParams::default()
        };
        assert_eq!(p.majority_threshold(), 1);
    }

    #[test]
    fn oversized_threshold_rejected() {
        let mut p = RetestParams {
            vwap_candle_threshold: MAX_VWAP_CANDLE_THRESHOLD,
            ..RetestParams::default()
        };
        assert!(p.validate().is_ok());
        p.vwap_candle_threshold = 1_000_000_000_000;
        assert!(matches!(p.validate(), Err(InputError::InvalidParams(_))));
    }

    #[test]
    fn side_counts_include_bars_at_vwap_in_both() {
        let bars = vec![
            bar(0, 100.0, 100.0, 100.0, 100.0),
            bar(1, 101.0, 102.0, 100.0, 100.0),
            bar(2, 98.0, 97.0, 100.0, 100.0),
        ];
        assert_eq!(vwap_side_counts(&bars), (2, 2));
    }

    #[test]
    fn long_setup_sets_retest_flag() {
        let bars = long_setup_window();
        let (decision, state) = evaluate(
            &bars,
            &SignalState::default(),
            &Position::flat(),
            &RetestParams::default(),
        )
        .unwrap();
        assert_eq!(state.retest_flag, SetupFlag::Long);
        assert_eq!(state.confirmation_flag, SetupFlag::Neutral);
        assert_eq!(decision, Decision::Hold);
    }

    #[test]
    fn long_setup_via_low_touch() {
        let mut bars = long_setup_window();
        // Close stays 0.4% above VWAP but the wick touches it.
        bars[7] = bar(7, 101.0, 100.4, 100.0, 100.5);
        bars[7].low = 100.05;
        let (_, state) = evaluate(
            &bars,
            &SignalState::default(),
            &Position::flat(),
            &RetestParams::default(),
        )
        .unwrap();
        assert_eq!(state.retest_flag, SetupFlag::Long);
    }

    #[test]
    fn no_setup_when_close_too_far_from_vwap() {
        let mut bars = long_setup_window();
        bars[7] = bar(7, 101.5, 101.0, 100.0, 100.5);
        let (_, state) = evaluate(
            &bars,
            &SignalState::default(),
            &Position::flat(),
            &RetestParams::default(),
        )
        .unwrap();
        assert_eq!(state.retest_flag, SetupFlag::Neutral);
    }

    #[test]
    fn short_setup_sets_retest_flag() {
        let bars = short_setup_window();
        let (_, state) = evaluate(
            &bars,
            &SignalState::default(),
            &Position::flat(),
            &RetestParams::default(),
        )
        .unwrap();
        assert_eq!(state.retest_flag, SetupFlag::Short);
    }

    #[test]
    fn short_window_never_flags() {
        let bars = long_setup_window();
        let (_, state) = evaluate(
            &bars[1..],
            &SignalState {
                retest_flag: SetupFlag::Long,
                ..SignalState::default()
            },
            &Position::flat(),
            &RetestParams::default(),
        )
        .unwrap();
        assert_eq!(state.retest_flag, SetupFlag::Neutral);
        assert_eq!(state.confirmation_flag, SetupFlag::Neutral);
    }

    #[test]
    fn confirmation_opens_long_with_sized_position() {
        let bars = long_confirmation_window();
        let prior = SignalState {
            retest_flag: SetupFlag::Long,
            ..SignalState::default()
        };
        let (decision, state) =
            evaluate(&bars, &prior, &Position::flat(), &RetestParams::default()).unwrap();
        assert_eq!(state.confirmation_flag, SetupFlag::Long);
        match decision {
            Decision::OpenLong { size, stop_loss } => {
                assert_eq!(size, 39);
                assert!((stop_loss.unwrap() - 98.703).abs() < 1e-9);
            }
            other => panic!("expected OpenLong, got {other:?}"),
        }
    }

    #[test]
    fn confirmation_opens_short_with_stop_above_vwap() {
        let bars = short_confirmation_window();
        let prior = SignalState {
            retest_flag: SetupFlag::Short,
            ..SignalState::default()
        };
        let (decision, state) =
            evaluate(&bars, &prior, &Position::flat(), &RetestParams::default()).unwrap();
        assert_eq!(state.confirmation_flag, SetupFlag::Short);
        match decision {
            Decision::OpenShort { size, stop_loss } => {
                let stop = stop_loss.unwrap();
                assert!((stop - 100.3).abs() < 1e-9);
                // round(50 / 1.3) = 38
                assert_eq!(size, 38);
            }
            other => panic!("expected OpenShort, got {other:?}"),
        }
    }

    #[test]
    fn confirmation_requires_close_beyond_vwap() {
        let mut bars = long_confirmation_window();
        // Higher close than the retest bar but still below VWAP.
        bars[8] = bar(8, 99.1, 99.3, 99.5, 99.8);
        let prior = SignalState {
            retest_flag: SetupFlag::Long,
            ..SignalState::default()
        };
        let (decision, state) =
            evaluate(&bars, &prior, &Position::flat(), &RetestParams::default()).unwrap();
        assert_eq!(state.confirmation_flag, SetupFlag::Neutral);
        assert_eq!(decision, Decision::Hold);
    }

    #[test]
    fn open_clamps_to_available_cash() {
        let bars = long_confirmation_window();
        let prior = SignalState {
            retest_flag: SetupFlag::Long,
            ..SignalState::default()
        };
        let params = RetestParams::default().with_available_cash(1_050.0);
        let (decision, _) = evaluate(&bars, &prior, &Position::flat(), &params).unwrap();
        assert_eq!(
            decision,
            Decision::OpenLong {
                size: 10,
                stop_loss: Some(99.0 * (1.0 - 0.003)),
            }
        );
    }

    #[test]
    fn open_with_no_cash_holds() {
        let bars = long_confirmation_window();
        let prior = SignalState {
            retest_flag: SetupFlag::Long,
            ..SignalState::default()
        };
        let params = RetestParams::default().with_available_cash(50.0);
        let (decision, state) = evaluate(&bars, &prior, &Position::flat(), &params).unwrap();
        assert_eq!(decision, Decision::Hold);
        assert_eq!(state.confirmation_flag, SetupFlag::Long);
    }

    #[test]
    fn in_position_confirmation_does_not_reopen() {
        let bars = long_confirmation_window();
        let prior = SignalState {
            retest_flag: SetupFlag::Long,
            ..SignalState::default()
        };
        let pos = Position::new_long(95.0, 10, Some(90.0));
        let (decision, _) = evaluate(&bars, &prior, &pos, &RetestParams::default()).unwrap();
        assert_eq!(decision, Decision::Hold);
    }

    #[test]
    fn soft_stop_needs_two_consecutive_breaches() {
        let bars = vec![
            bar(0, 99.0, 99.0, 99.5, 98.0),
            bar(1, 99.0, 98.5, 99.5, 98.0),
        ];
        let pos = Position::new_long(100.0, 10, Some(98.7));
        let params = RetestParams::default();

        let (first, state) = evaluate(&bars, &SignalState::default(), &pos, &params).unwrap();
        assert_eq!(first, Decision::Hold);
        assert_eq!(state.soft_stop_count, 1);

        let mut next = bars.clone();
        next.push(bar(2, 98.5, 98.4, 99.5, 98.0));
        let (second, state) = evaluate(&next, &state, &pos, &params).unwrap();
        assert_eq!(
            second,
            Decision::Close {
                reason: CloseReason::SoftStop
            }
        );
        assert_eq!(state.soft_stop_count, 2);
    }

    #[test]
    fn soft_stop_counter_resets_on_recovery() {
        let bars = vec![
            bar(0, 99.0, 98.5, 99.5, 98.0),
            bar(1, 98.5, 99.2, 99.5, 98.0),
        ];
        let pos = Position::new_long(100.0, 10, Some(98.7));
        let prior = SignalState {
            soft_stop_count: 1,
            ..SignalState::default()
        };
        let (decision, state) =
            evaluate(&bars, &prior, &pos, &RetestParams::default()).unwrap();
        assert_eq!(decision, Decision::Hold);
        assert_eq!(state.soft_stop_count, 0);
    }

    #[test]
    fn short_soft_stop_breaches_at_or_above_stop() {
        let bars = vec![
            bar(0, 100.0, 100.3, 100.0, 101.0),
            bar(1, 100.3, 100.3, 100.0, 101.0),
        ];
        let pos = Position::new_short(99.0, 10, Some(100.3));
        let prior = SignalState {
            soft_stop_count: 1,
            ..SignalState::default()
        };
        let (decision, _) = evaluate(&bars, &prior, &pos, &RetestParams::default()).unwrap();
        assert!(decision.is_close());
    }

    #[test]
    fn long_ema_take_profit() {
        // Close crosses from above to below the EMA while entry <= EMA.
        let bars = vec![
            bar(0, 103.0, 104.0, 101.0, 103.0),
            bar(1, 104.0, 102.5, 101.0, 103.0),
        ];
        let pos = Position::new_long(100.0, 10, Some(98.0));
        let (decision, _) = evaluate(
            &bars,
            &SignalState::default(),
            &pos,
            &RetestParams::default(),
        )
        .unwrap();
        assert_eq!(
            decision,
            Decision::Close {
                reason: CloseReason::EmaTakeProfit
            }
        );
    }

    #[test]
    fn long_ema_cross_below_entry_is_not_take_profit() {
        let bars = vec![
            bar(0, 103.0, 104.0, 101.0, 103.0),
            bar(1, 104.0, 102.5, 101.0, 103.0),
        ];
        // Entry above EMA: crossing would realise a loss, so no exit.
        let pos = Position::new_long(103.5, 10, Some(98.0));
        let (decision, _) = evaluate(
            &bars,
            &SignalState::default(),
            &pos,
            &RetestParams::default(),
        )
        .unwrap();
        assert_eq!(decision, Decision::Hold);
    }

    #[test]
    fn short_ema_take_profit() {
        let bars = vec![
            bar(0, 97.0, 96.0, 99.0, 97.0),
            bar(1, 96.0, 97.5, 99.0, 97.0),
        ];
        let pos = Position::new_short(100.0, 10, Some(102.0));
        let (decision, _) = evaluate(
            &bars,
            &SignalState::default(),
            &pos,
            &RetestParams::default(),
        )
        .unwrap();
        assert!(matches!(
            decision,
            Decision::Close {
                reason: CloseReason::EmaTakeProfit
            }
        ));
    }

    #[test]
    fn soft_stop_wins_when_both_exits_fire() {
        let bars = vec![
            bar(0, 99.0, 99.2, 99.5, 99.0),
            bar(1, 99.2, 98.5, 99.5, 98.9),
        ];
        let pos = Position::new_long(98.8, 10, Some(98.7));
        let prior = SignalState {
            soft_stop_count: 1,
            ..SignalState::default()
        };
        let (decision, _) = evaluate(&bars, &prior, &pos, &RetestParams::default()).unwrap();
        assert_eq!(
            decision,
            Decision::Close {
                reason: CloseReason::SoftStop
            }
        );
    }

    #[test]
    fn flat_position_resets_soft_stop_count() {
        let bars = long_setup_window();
        let prior = SignalState {
            soft_stop_count: 3,
            ..SignalState::default()
        };
        let (_, state) =
            evaluate(&bars, &prior, &Position::flat(), &RetestParams::default()).unwrap();
        assert_eq!(state.soft_stop_count, 0);
    }

    #[test]
    fn empty_window_is_input_error() {
        let err = evaluate(
            &[],
            &SignalState::default(),
            &Position::flat(),
            &RetestParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, InputError::EmptyWindow);
    }

    #[test]
    fn zero_vwap_is_input_error() {
        let mut bars = long_setup_window();
        bars[7].vwap = Some(0.0);
        let err = evaluate(
            &bars,
            &SignalState::default(),
            &Position::flat(),
            &RetestParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InputError::InvalidVwap { .. }));
    }

    #[test]
    fn missing_ema_in_active_window_is_input_error() {
        let mut bars = long_setup_window();
        bars[3].ema_fast = None;
        let err = evaluate(
            &bars,
            &SignalState::default(),
            &Position::flat(),
            &RetestParams::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InputError::MissingIndicator {
                field: "ema_fast",
                ..
            }
        ));
    }

    #[test]
    fn bars_outside_active_window_are_not_validated() {
        let mut bars = long_setup_window();
        let mut stale = bar(0, 101.0, 101.5, 100.0, 100.5);
        stale.vwap = None;
        bars.insert(0, stale);
        assert!(evaluate(
            &bars,
            &SignalState::default(),
            &Position::flat(),
            &RetestParams::default(),
        )
        .is_ok());
    }

    #[test]
    fn invalid_params_rejected() {
        let params = RetestParams {
            vwap_candle_threshold: 0,
            ..RetestParams::default()
        };
        let err = evaluate(
            &long_setup_window(),
            &SignalState::default(),
            &Position::flat(),
            &params,
        )
        .unwrap_err();
        assert!(matches!(err, InputError::InvalidParams(_)));
    }
}
