use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::InterfaceError;
use crate::types::{OrderSide, Position, WindowMetrics};

/// Read-only view of the host portfolio, scoped by strategy key
/// (`"global"` or a `strategy_id`).
pub trait PortfolioSnapshot: Send + Sync {
    fn realized_pnl(&self, key: &str) -> Decimal;
    fn unrealized_pnl(&self, key: &str) -> Decimal;
    fn open_positions(&self, key: &str) -> Vec<Position>;
    fn equity(&self) -> Decimal;
}

/// Order submission capability. The core only ever asks for market orders,
/// optionally reduce-only (used to flatten positions on a triggered limit).
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn market(
        &self,
        instrument: &str,
        side: OrderSide,
        qty: Decimal,
        reduce_only: bool,
    ) -> Result<(), InterfaceError>;
}

/// Host wall clock. The core never blocks on time; it only reads `now_ns`
/// and computes when it next wants to be woken (e.g. the daily reset), then
/// leaves re-arming the actual timer to the host.
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> i64;
}

/// Offline strategy evaluator invoked once per window per split (train/test)
/// by the walk-forward validator. May be backed by a remote process or an
/// in-process backtest; the core treats it as an opaque capability.
#[async_trait]
pub trait StrategyEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WindowMetrics, InterfaceError>;
}
