use thiserror::Error;

/// Shared error taxonomy (spec.md §7). Each crate defines its own
/// `thiserror::Error` enum mirroring this shape for the kinds that apply to
/// it, wrapping this type with `#[from]` where it consumes `analysis-core`
/// directly (e.g. `Bar::validate`) rather than duplicating the variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient data: need at least {needed}, have {have}")]
    InsufficientData { needed: usize, have: usize },

    #[error("evaluator failed: {0}")]
    EvaluatorFailure(String),
}
