use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalkForwardError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("insufficient data: generated {generated} windows, need at least {min_windows}")]
    InsufficientData { generated: usize, min_windows: usize },
}
