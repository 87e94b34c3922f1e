use thiserror::Error;

/// Errors surfaced by the host capabilities the core depends on.
#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("evaluator failed for window [{start} .. {end}): {reason}")]
    EvaluatorFailure {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        reason: String,
    },
}
