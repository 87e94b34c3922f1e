use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
