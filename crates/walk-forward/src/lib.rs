pub mod error;
pub mod metrics;
pub mod report;
pub mod types;
pub mod validator;
pub mod windows;

pub use error::WalkForwardError;
pub use metrics::{
    deflated_sharpe_ratio, minimum_backtest_length, probability_of_backtest_overfitting,
    robustness_breakdown, RobustnessBreakdown,
};
pub use report::{render_json, render_markdown};
pub use types::{WalkForwardConfig, WalkForwardResult, Window, WindowResult};
pub use validator::validate;
pub use windows::generate_windows;
