use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizerError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
