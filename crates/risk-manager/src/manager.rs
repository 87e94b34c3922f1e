use rust_decimal::Decimal;
use trading_interfaces::{Event, InterfaceError, OrderSubmitter, PortfolioSnapshot};

use crate::models::{CircuitBreakerCheck, CircuitBreakerConfig, CircuitBreakerState};
use crate::tracker::DailyPnLTracker;

/// Routes position/timer events to the Daily PnL Tracker and gates order
/// submission on it (plus the optional circuit breaker).
pub struct RiskManager {
    tracker: Option<DailyPnLTracker>,
    circuit_breaker: Option<CircuitBreakerConfig>,
    circuit_state: CircuitBreakerState,
}

impl RiskManager {
    pub fn new(tracker: Option<DailyPnLTracker>, circuit_breaker: Option<CircuitBreakerConfig>) -> Self {
        Self {
            tracker,
            circuit_breaker,
            circuit_state: CircuitBreakerState::default(),
        }
    }

    pub async fn handle_event(
        &mut self,
        event: &Event,
        portfolio: &dyn PortfolioSnapshot,
        submitter: &dyn OrderSubmitter,
        now_ns: i64,
    ) -> Result<(), InterfaceError> {
        if let Event::PositionClosed { realized_pnl, .. } = event {
            self.record_trade_outcome(*realized_pnl);
        }
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.handle_event(event, portfolio, submitter, now_ns).await?;
        }
        Ok(())
    }

    /// Deny iff the tracker reports `can_trade == false` for this key, or a
    /// circuit breaker is tripped.
    pub fn validate_order(&self, key: &str, portfolio_value: Decimal) -> bool {
        if let Some(tracker) = self.tracker.as_ref() {
            if !tracker.can_trade(key) {
                return false;
            }
        }
        self.check_circuit_breakers(portfolio_value).can_trade
    }

    pub fn set_trading_halt(&mut self, halted: bool, reason: Option<String>) {
        self.circuit_state.manual_halt = halted;
        self.circuit_state.halt_reason = reason;
    }

    fn record_trade_outcome(&mut self, pnl: Decimal) {
        if pnl < Decimal::ZERO {
            self.circuit_state.consecutive_losses += 1;
        } else {
            self.circuit_state.consecutive_losses = 0;
        }
    }

    /// Checks manual halt, consecutive losses, and drawdown-from-peak,
    /// updating the running equity peak as a side effect.
    pub fn check_circuit_breakers(&self, portfolio_value: Decimal) -> CircuitBreakerCheck {
        let mut triggered = Vec::new();

        if self.circuit_state.manual_halt {
            return CircuitBreakerCheck {
                can_trade: false,
                breakers_triggered: vec![self
                    .circuit_state
                    .halt_reason
                    .clone()
                    .unwrap_or_else(|| "manual_halt".into())],
            };
        }

        let Some(config) = self.circuit_breaker.as_ref() else {
            return CircuitBreakerCheck {
                can_trade: true,
                breakers_triggered: triggered,
            };
        };

        if self.circuit_state.consecutive_losses >= config.max_consecutive_losses {
            triggered.push(format!(
                "consecutive_losses: {} >= limit of {}",
                self.circuit_state.consecutive_losses, config.max_consecutive_losses
            ));
        }

        if let Some(peak) = self.circuit_state.peak_equity {
            if peak > Decimal::ZERO {
                let drawdown = ((peak - portfolio_value) / peak).max(Decimal::ZERO);
                let limit = Decimal::try_from(config.account_drawdown_limit_pct).unwrap_or(Decimal::ONE);
                if drawdown > limit {
                    triggered.push(format!(
                        "drawdown: {} exceeds limit of {}",
                        drawdown, limit
                    ));
                }
            }
        }

        CircuitBreakerCheck {
            can_trade: triggered.is_empty(),
            breakers_triggered: triggered,
        }
    }

    /// Updates the tracked equity peak; call once per mark update.
    pub fn update_peak(&mut self, portfolio_value: Decimal) {
        let peak = self.circuit_state.peak_equity.get_or_insert(portfolio_value);
        if portfolio_value > *peak {
            *peak = portfolio_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trading_interfaces::{OrderSide, Position};

    struct FakePortfolio;
    impl PortfolioSnapshot for FakePortfolio {
        fn realized_pnl(&self, _key: &str) -> Decimal {
            Decimal::ZERO
        }
        fn unrealized_pnl(&self, _key: &str) -> Decimal {
            Decimal::ZERO
        }
        fn open_positions(&self, _key: &str) -> Vec<Position> {
            vec![]
        }
        fn equity(&self) -> Decimal {
            dec!(10000)
        }
    }

    struct NoopSubmitter;
    #[async_trait::async_trait]
    impl OrderSubmitter for NoopSubmitter {
        async fn market(
            &self,
            _instrument: &str,
            _side: OrderSide,
            _qty: Decimal,
            _reduce_only: bool,
        ) -> Result<(), InterfaceError> {
            Ok(())
        }
    }

    #[test]
    fn manual_halt_denies_trading() {
        let mut manager = RiskManager::new(None, None);
        manager.set_trading_halt(true, Some("maintenance".into()));
        assert!(!manager.validate_order("global", dec!(10000)));
    }

    #[test]
    fn consecutive_losses_trip_breaker() {
        let config = CircuitBreakerConfig::new(2, 0.5).unwrap();
        let mut manager = RiskManager::new(None, Some(config));
        manager.record_trade_outcome(dec!(-1));
        manager.record_trade_outcome(dec!(-1));
        assert!(!manager.validate_order("global", dec!(10000)));
    }

    #[tokio::test]
    async fn no_gates_configured_always_allows() {
        let mut manager = RiskManager::new(None, None);
        let portfolio = FakePortfolio;
        let submitter = NoopSubmitter;
        manager
            .handle_event(&Event::MarkUpdate, &portfolio, &submitter, 0)
            .await
            .unwrap();
        assert!(manager.validate_order("global", dec!(10000)));
    }
}
