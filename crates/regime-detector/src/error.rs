use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegimeError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("insufficient data: need at least {needed} observations, have {have}")]
    InsufficientData { needed: usize, have: usize },
}
