use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderflowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Analysis(#[from] analysis_core::AnalysisError),
}
