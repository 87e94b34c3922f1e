use rust_decimal::Decimal;

/// Position and timer events the host's event bus routes to the core.
/// There is no generic pub/sub type here — the host owns dispatch and simply
/// calls `RiskManager::handle_event` with one of these per event.
#[derive(Debug, Clone)]
pub enum Event {
    PositionOpened {
        strategy_id: String,
        symbol: String,
    },
    PositionChanged {
        strategy_id: String,
        symbol: String,
    },
    /// Realized PnL booked when a position is closed.
    PositionClosed {
        realized_pnl: Decimal,
        strategy_id: String,
    },
    /// Periodic nudge to refresh unrealized PnL from the portfolio snapshot.
    MarkUpdate,
    /// Fired by the host clock when a named timer matures (e.g. "daily_reset").
    TimerFired(String),
}
