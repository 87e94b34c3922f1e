pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use error::InterfaceError;
pub use events::Event;
pub use traits::{Clock, OrderSubmitter, PortfolioSnapshot, StrategyEvaluator};
pub use types::{Money, OrderSide, Position, WindowMetrics};
