use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Immutable configuration for the Daily PnL Tracker.
#[derive(Debug, Clone)]
pub struct DailyLossConfig {
    pub daily_loss_limit: Decimal,
    pub daily_loss_pct: Option<f64>,
    pub reset_time_utc: NaiveTime,
    pub per_strategy: bool,
    pub close_positions_on_limit: bool,
    pub warning_threshold_pct: f64,
}

impl DailyLossConfig {
    pub fn new(
        daily_loss_limit: Decimal,
        daily_loss_pct: Option<f64>,
        reset_time_utc: &str,
        per_strategy: bool,
        close_positions_on_limit: bool,
        warning_threshold_pct: f64,
    ) -> Result<Self, RiskError> {
        if daily_loss_limit <= Decimal::ZERO {
            return Err(RiskError::InvalidConfig(
                "daily_loss_limit must be > 0".into(),
            ));
        }
        if let Some(pct) = daily_loss_pct {
            if !(0.0..1.0).contains(&pct) || pct <= 0.0 {
                return Err(RiskError::InvalidConfig(
                    "daily_loss_pct must be in (0, 1)".into(),
                ));
            }
        }
        if !(0.0..1.0).contains(&warning_threshold_pct) || warning_threshold_pct <= 0.0 {
            return Err(RiskError::InvalidConfig(
                "warning_threshold_pct must be in (0, 1)".into(),
            ));
        }
        let reset_time_utc = NaiveTime::parse_from_str(reset_time_utc, "%H:%M")
            .map_err(|_| RiskError::InvalidConfig("reset_time_utc must be HH:MM".into()))?;

        Ok(Self {
            daily_loss_limit,
            daily_loss_pct,
            reset_time_utc,
            per_strategy,
            close_positions_on_limit,
            warning_threshold_pct,
        })
    }

    /// The next UTC instant, in nanoseconds, at or after `from` at which
    /// `reset_time_utc` occurs.
    pub fn next_reset_ns(&self, from_ns: i64) -> i64 {
        let from: DateTime<Utc> = Utc.timestamp_nanos(from_ns);
        let candidate = from.date_naive().and_time(self.reset_time_utc);
        let candidate = Utc.from_utc_datetime(&candidate);
        let next = if candidate > from {
            candidate
        } else {
            candidate + Duration::days(1)
        };
        next.timestamp_nanos_opt().unwrap_or(from_ns)
    }
}

/// Mutable daily PnL state, one instance per tracked key ("global" or a
/// `strategy_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPnLState {
    pub day_start_ns: i64,
    pub starting_equity: Decimal,
    pub realized: Decimal,
    pub unrealized: Decimal,
    pub limit_triggered: bool,
    pub trigger_ns: Option<i64>,
    pub next_reset_ns: i64,
    pub warned_today: bool,
}

impl DailyPnLState {
    pub fn new(day_start_ns: i64, starting_equity: Decimal, next_reset_ns: i64) -> Self {
        Self {
            day_start_ns,
            starting_equity,
            realized: Decimal::ZERO,
            unrealized: Decimal::ZERO,
            limit_triggered: false,
            trigger_ns: None,
            next_reset_ns,
            warned_today: false,
        }
    }

    pub fn total(&self) -> Decimal {
        self.realized + self.unrealized
    }
}

/// Supplemental circuit-breaker configuration: manual halt, consecutive
/// losses, and drawdown-from-peak gates, checked alongside the Daily PnL
/// Tracker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub max_consecutive_losses: u32,
    pub account_drawdown_limit_pct: f64,
}

impl CircuitBreakerConfig {
    pub fn new(
        max_consecutive_losses: u32,
        account_drawdown_limit_pct: f64,
    ) -> Result<Self, RiskError> {
        if max_consecutive_losses == 0 {
            return Err(RiskError::InvalidConfig(
                "max_consecutive_losses must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&account_drawdown_limit_pct) || account_drawdown_limit_pct <= 0.0
        {
            return Err(RiskError::InvalidConfig(
                "account_drawdown_limit_pct must be in (0, 1)".into(),
            ));
        }
        Ok(Self {
            max_consecutive_losses,
            account_drawdown_limit_pct,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerState {
    pub manual_halt: bool,
    pub halt_reason: Option<String>,
    pub consecutive_losses: u32,
    pub peak_equity: Option<Decimal>,
}

/// Outcome of a circuit-breaker evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerCheck {
    pub can_trade: bool,
    pub breakers_triggered: Vec<String>,
}
