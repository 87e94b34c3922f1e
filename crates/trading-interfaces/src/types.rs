use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Money is always a `Decimal`, never a float — matches the teacher's use of
/// `rust_decimal` for any quantity that represents currency.
pub type Money = Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// A position held by the host portfolio, as observed by the core (read-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub qty: Decimal,
    pub side: OrderSide,
}

/// Per-window evaluator output, produced once for the train slice and once for
/// the test slice of a `Window`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub sharpe: f64,
    pub calmar: f64,
    /// Fraction in [0, 1].
    pub max_drawdown: f64,
    pub total_return: f64,
    /// Fraction in [0, 1].
    pub win_rate: f64,
    pub trade_count: u32,
}

impl WindowMetrics {
    /// The zero-trade placeholder recorded when an evaluator invocation fails
    /// for a single window (spec: `EvaluatorFailure`).
    pub fn zero() -> Self {
        Self {
            sharpe: 0.0,
            calmar: 0.0,
            max_drawdown: 0.0,
            total_return: 0.0,
            win_rate: 0.0,
            trade_count: 0,
        }
    }
}
