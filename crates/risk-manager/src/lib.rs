pub mod error;
pub mod manager;
pub mod models;
pub mod tracker;

pub use error::RiskError;
pub use manager::RiskManager;
pub use models::{
    CircuitBreakerCheck, CircuitBreakerConfig, CircuitBreakerState, DailyLossConfig, DailyPnLState,
};
pub use tracker::DailyPnLTracker;
