//! The bar loop.

use chrono::NaiveDateTime;
use tracing::{debug, trace};

use super::state::{EngineConfig, EngineError, RejectReason, RejectedIntent, RunResult};
use crate::analyzers::Analyzer;
use crate::domain::{Bar, BarError, BrokerState, OrderIntent, Position, Side, Trade, TradeIdGen};
use crate::strategy::{Strategy, StrategyContext};

/// Single-instrument, single-position execution engine.
///
/// The engine itself is stateless between runs: every call to [`run`] starts
/// from a fresh broker, position and trade counter, so one engine may be
/// shared across threads.
///
/// [`run`]: ExecutionEngine::run
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    config: EngineConfig,
}

/// Mutable state for one run.
struct RunState {
    broker: BrokerState,
    position: Position,
    ids: TradeIdGen,
    trades: Vec<Trade>,
    rejected: Vec<RejectedIntent>,
    equity_curve: Vec<f64>,
    first_bar: Option<NaiveDateTime>,
    last_bar: Option<NaiveDateTime>,
}

impl ExecutionEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `strategy` over `bars`, feeding every event to `analyzer`.
    ///
    /// Bars must arrive in strictly ascending timestamp order. A strategy
    /// error aborts the run and is returned unchanged inside
    /// [`EngineError::Strategy`].
    pub fn run<I, S, A>(
        &self,
        bars: I,
        strategy: &mut S,
        analyzer: &mut A,
    ) -> Result<RunResult, EngineError>
    where
        I: IntoIterator<Item = Bar>,
        S: Strategy + ?Sized,
        A: Analyzer + ?Sized,
    {
        let mut state = RunState {
            broker: BrokerState::new(self.config.initial_cash, self.config.commission),
            position: Position::flat(),
            ids: TradeIdGen::default(),
            trades: Vec::new(),
            rejected: Vec::new(),
            equity_curve: Vec::new(),
            first_bar: None,
            last_bar: None,
        };

        debug!(
            strategy = strategy.name(),
            initial_cash = self.config.initial_cash,
            commission = self.config.commission,
            "engine run started"
        );
        analyzer.on_start(&state.broker);

        for (bar_index, bar) in bars.into_iter().enumerate() {
            self.check_bar(&state, &bar, bar_index)?;

            let intent = {
                let ctx = StrategyContext::new(&state.position, bar_index, self.config.order_size);
                strategy.on_bar(&bar, &ctx)?
            };

            if let Some(intent) = intent {
                if let Some(trade) = apply_intent(&mut state, intent, &bar, bar_index) {
                    analyzer.on_trade_close(&trade);
                    state.trades.push(trade);
                }
            }

            let unrealized = if state.position.is_open() {
                state.position.unrealized_pnl(bar.close)
            } else {
                0.0
            };
            state.broker.mark(unrealized);
            state.equity_curve.push(state.broker.equity);
            analyzer.on_bar(&bar, &state.broker);

            if state.first_bar.is_none() {
                state.first_bar = Some(bar.timestamp);
            }
            state.last_bar = Some(bar.timestamp);
        }

        let bar_count = state.equity_curve.len();
        debug!(
            strategy = strategy.name(),
            bars = bar_count,
            trades = state.trades.len(),
            rejected = state.rejected.len(),
            final_equity = state.broker.equity,
            "engine run finished"
        );

        Ok(RunResult {
            trades: state.trades,
            initial_cash: self.config.initial_cash,
            final_broker: state.broker,
            bar_count,
            first_bar: state.first_bar,
            last_bar: state.last_bar,
            open_position: state.position.is_open().then_some(state.position),
            rejected_intents: state.rejected,
            equity_curve: state.equity_curve,
        })
    }

    fn check_bar(&self, state: &RunState, bar: &Bar, bar_index: usize) -> Result<(), EngineError> {
        bar.validate()
            .map_err(|source| EngineError::Bar { bar_index, source })?;
        if let Some(previous) = state.last_bar {
            if bar.timestamp <= previous {
                return Err(EngineError::Bar {
                    bar_index,
                    source: BarError::NotAscending {
                        previous,
                        current: bar.timestamp,
                    },
                });
            }
        }
        Ok(())
    }
}

/// Apply one intent at the bar's close. Returns the trade if one closed.
fn apply_intent(
    state: &mut RunState,
    intent: OrderIntent,
    bar: &Bar,
    bar_index: usize,
) -> Option<Trade> {
    match intent {
        OrderIntent::OpenLong { size } => {
            if state.position.is_open() {
                reject(state, intent, bar, bar_index, RejectReason::AlreadyOpen);
                return None;
            }
            if !size.is_finite() || size <= 0.0 {
                reject(state, intent, bar, bar_index, RejectReason::InvalidSize);
                return None;
            }
            state.position = Position::open(size, bar.close, bar.timestamp, bar_index);
            trace!(bar_index, price = bar.close, size, "opened long");
            None
        }
        OrderIntent::Close => {
            if !state.position.is_open() {
                reject(state, intent, bar, bar_index, RejectReason::NoPosition);
                return None;
            }
            let trade = close_position(state, bar, bar_index);
            trace!(
                bar_index,
                trade = %trade.id,
                net_pnl = trade.net_pnl,
                "closed position"
            );
            Some(trade)
        }
    }
}

fn close_position(state: &mut RunState, bar: &Bar, bar_index: usize) -> Trade {
    let position = std::mem::take(&mut state.position);
    let contracts = position.contracts();
    let gross_pnl = position.unrealized_pnl(bar.close);
    let commission = state.broker.round_turn_commission(contracts);
    state.broker.settle(gross_pnl, commission);

    Trade {
        id: state.ids.next_id(),
        direction: position.side().unwrap_or(Side::Long),
        open_time: position.entry_time.unwrap_or(bar.timestamp),
        entry_bar: position.entry_bar,
        entry_price: position.entry_price,
        close_time: bar.timestamp,
        exit_bar: bar_index,
        exit_price: bar.close,
        size: contracts,
        gross_pnl,
        commission,
        net_pnl: gross_pnl - commission,
    }
}

fn reject(
    state: &mut RunState,
    intent: OrderIntent,
    bar: &Bar,
    bar_index: usize,
    reason: RejectReason,
) {
    trace!(bar_index, intent = intent.name(), ?reason, "intent ignored");
    state.rejected.push(RejectedIntent {
        bar_index,
        timestamp: bar.timestamp,
        intent,
        reason,
    });
}
