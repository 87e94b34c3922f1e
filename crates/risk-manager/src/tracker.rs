use std::collections::HashMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};
use trading_interfaces::{Event, InterfaceError, OrderSide, OrderSubmitter, PortfolioSnapshot};

use crate::models::{DailyLossConfig, DailyPnLState};

/// Owns one `DailyPnLState` per key ("global", or per `strategy_id` when
/// `per_strategy` is set) and enforces the daily loss limit.
pub struct DailyPnLTracker {
    config: DailyLossConfig,
    states: HashMap<String, DailyPnLState>,
}

impl DailyPnLTracker {
    pub fn new(config: DailyLossConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    fn key_for<'a>(&self, strategy_id: &'a str) -> &'a str {
        if self.config.per_strategy {
            strategy_id
        } else {
            "global"
        }
    }

    fn ensure_state(&mut self, key: &str, now_ns: i64, equity: Decimal) {
        if !self.states.contains_key(key) {
            let next_reset = self.config.next_reset_ns(now_ns);
            self.states
                .insert(key.to_string(), DailyPnLState::new(now_ns, equity, next_reset));
        }
    }

    pub fn can_trade(&self, key: &str) -> bool {
        self.states
            .get(key)
            .map(|s| !s.limit_triggered)
            .unwrap_or(true)
    }

    pub fn state(&self, key: &str) -> Option<&DailyPnLState> {
        self.states.get(key)
    }

    /// Clears all per-key state, yielding the same state as a freshly
    /// constructed tracker. Unlike `TimerFired("daily_reset")`, this drops
    /// keys entirely rather than re-seeding them against current equity.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    fn effective_limit(&self, starting_equity: Decimal) -> Decimal {
        match self.config.daily_loss_pct {
            Some(pct) => {
                starting_equity * Decimal::from_f64(pct).unwrap_or(Decimal::ZERO)
            }
            None => self.config.daily_loss_limit,
        }
    }

    pub async fn handle_event(
        &mut self,
        event: &Event,
        portfolio: &dyn PortfolioSnapshot,
        submitter: &dyn OrderSubmitter,
        now_ns: i64,
    ) -> Result<(), InterfaceError> {
        match event {
            Event::PositionClosed {
                realized_pnl,
                strategy_id,
            } => {
                let key = self.key_for(strategy_id).to_string();
                self.ensure_state(&key, now_ns, portfolio.equity());
                if let Some(state) = self.states.get_mut(&key) {
                    state.realized += *realized_pnl;
                }
                self.check_limit(&key, now_ns, portfolio, submitter).await?;
            }
            Event::MarkUpdate => {
                let keys: Vec<String> = self.states.keys().cloned().collect();
                for key in keys {
                    let unrealized = portfolio.unrealized_pnl(&key);
                    if let Some(state) = self.states.get_mut(&key) {
                        state.unrealized = unrealized;
                    }
                    self.check_limit(&key, now_ns, portfolio, submitter).await?;
                }
            }
            Event::PositionOpened { strategy_id, .. } | Event::PositionChanged { strategy_id, .. } => {
                let key = self.key_for(strategy_id).to_string();
                self.ensure_state(&key, now_ns, portfolio.equity());
            }
            Event::TimerFired(name) if name == "daily_reset" => {
                let equity = portfolio.equity();
                let keys: Vec<String> = self.states.keys().cloned().collect();
                for key in keys {
                    let next_reset = self.config.next_reset_ns(now_ns);
                    self.states
                        .insert(key, DailyPnLState::new(now_ns, equity, next_reset));
                }
            }
            Event::TimerFired(_) => {}
        }
        Ok(())
    }

    async fn check_limit(
        &mut self,
        key: &str,
        now_ns: i64,
        portfolio: &dyn PortfolioSnapshot,
        submitter: &dyn OrderSubmitter,
    ) -> Result<(), InterfaceError> {
        let close_positions_on_limit = self.config.close_positions_on_limit;
        let warning_threshold_pct = self.config.warning_threshold_pct;

        let (loss, effective_limit, already_triggered, already_warned, starting_equity) = {
            let state = match self.states.get(key) {
                Some(s) => s,
                None => return Ok(()),
            };
            let effective_limit = self.effective_limit(state.starting_equity);
            (
                -(state.total()),
                effective_limit,
                state.limit_triggered,
                state.warned_today,
                state.starting_equity,
            )
        };
        let _ = starting_equity;

        if !already_warned && effective_limit > Decimal::ZERO {
            let warning_level =
                effective_limit * Decimal::from_f64(warning_threshold_pct).unwrap_or(Decimal::ZERO);
            if loss >= warning_level {
                warn!(key, %loss, %effective_limit, "daily loss approaching limit");
                if let Some(state) = self.states.get_mut(key) {
                    state.warned_today = true;
                }
            }
        }

        if !already_triggered && loss >= effective_limit {
            if let Some(state) = self.states.get_mut(key) {
                state.limit_triggered = true;
                state.trigger_ns = Some(now_ns);
            }
            info!(key, %loss, %effective_limit, "limit_triggered");

            if close_positions_on_limit {
                for position in portfolio.open_positions(key) {
                    let flatten_side = match position.side {
                        OrderSide::Buy => OrderSide::Sell,
                        OrderSide::Sell => OrderSide::Buy,
                    };
                    submitter
                        .market(&position.symbol, flatten_side, position.qty, true)
                        .await?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use trading_interfaces::Position;

    struct FakePortfolio {
        equity: Decimal,
        unrealized: Decimal,
        positions: Vec<Position>,
    }

    impl PortfolioSnapshot for FakePortfolio {
        fn realized_pnl(&self, _key: &str) -> Decimal {
            Decimal::ZERO
        }
        fn unrealized_pnl(&self, _key: &str) -> Decimal {
            self.unrealized
        }
        fn open_positions(&self, _key: &str) -> Vec<Position> {
            self.positions.clone()
        }
        fn equity(&self) -> Decimal {
            self.equity
        }
    }

    #[derive(Default)]
    struct RecordingSubmitter {
        calls: Mutex<Vec<(String, OrderSide, Decimal, bool)>>,
    }

    #[async_trait::async_trait]
    impl OrderSubmitter for RecordingSubmitter {
        async fn market(
            &self,
            instrument: &str,
            side: OrderSide,
            qty: Decimal,
            reduce_only: bool,
        ) -> Result<(), InterfaceError> {
            self.calls
                .lock()
                .unwrap()
                .push((instrument.to_string(), side, qty, reduce_only));
            Ok(())
        }
    }

    #[tokio::test]
    async fn limit_triggers_and_flattens_positions() {
        let config = DailyLossConfig::new(dec!(100), None, "00:00", false, true, 0.5).unwrap();
        let mut tracker = DailyPnLTracker::new(config);
        let portfolio = FakePortfolio {
            equity: dec!(10000),
            unrealized: dec!(0),
            positions: vec![Position {
                symbol: "AAPL".into(),
                qty: dec!(10),
                side: OrderSide::Buy,
            }],
        };
        let submitter = RecordingSubmitter::default();

        tracker
            .handle_event(
                &Event::PositionClosed {
                    realized_pnl: dec!(-150),
                    strategy_id: "s1".into(),
                },
                &portfolio,
                &submitter,
                0,
            )
            .await
            .unwrap();

        assert!(!tracker.can_trade("global"));
        assert_eq!(submitter.calls.lock().unwrap().len(), 1);
        assert_eq!(submitter.calls.lock().unwrap()[0].1, OrderSide::Sell);
    }

    #[tokio::test]
    async fn reset_drops_all_state() {
        let config = DailyLossConfig::new(dec!(100), None, "00:00", false, false, 0.5).unwrap();
        let mut tracker = DailyPnLTracker::new(config);
        let portfolio = FakePortfolio {
            equity: dec!(10000),
            unrealized: dec!(0),
            positions: vec![],
        };
        let submitter = RecordingSubmitter::default();

        tracker
            .handle_event(
                &Event::PositionClosed {
                    realized_pnl: dec!(-150),
                    strategy_id: "s1".into(),
                },
                &portfolio,
                &submitter,
                0,
            )
            .await
            .unwrap();
        assert!(!tracker.can_trade("global"));
        assert!(tracker.state("global").is_some());

        tracker.reset();
        assert!(tracker.can_trade("global"));
        assert!(tracker.state("global").is_none());
    }

    #[tokio::test]
    async fn daily_reset_timer_clears_triggered_state() {
        let config = DailyLossConfig::new(dec!(100), None, "00:00", false, false, 0.5).unwrap();
        let mut tracker = DailyPnLTracker::new(config);
        let portfolio = FakePortfolio {
            equity: dec!(10000),
            unrealized: dec!(0),
            positions: vec![],
        };
        let submitter = RecordingSubmitter::default();

        tracker
            .handle_event(
                &Event::PositionClosed {
                    realized_pnl: dec!(-150),
                    strategy_id: "s1".into(),
                },
                &portfolio,
                &submitter,
                0,
            )
            .await
            .unwrap();
        assert!(!tracker.can_trade("global"));

        tracker
            .handle_event(
                &Event::TimerFired("daily_reset".into()),
                &portfolio,
                &submitter,
                1,
            )
            .await
            .unwrap();
        assert!(tracker.can_trade("global"));
        assert_eq!(tracker.state("global").unwrap().realized, Decimal::ZERO);
    }
}
