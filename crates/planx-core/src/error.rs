use thiserror::Error;

/// Errors raised while building or validating a plan tree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("column index {index} out of range for input of width {width}")]
    ColumnIndexOutOfRange { index: usize, width: usize },
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("{op} expects {expected} input(s), got {actual}")]
    ArityMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}
