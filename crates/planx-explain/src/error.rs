use planx_core::PlanError;
use planx_substrait::ConsumeError;
use thiserror::Error;

/// Errors raised while explaining a plan.
#[derive(Debug, Error)]
pub enum ExplainError {
    /// The input does not decode to a structurally valid plan.
    #[error("malformed plan: {0}")]
    MalformedPlan(ConsumeError),
    /// A relation type or operator that cannot be rendered.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),
}

impl From<ConsumeError> for ExplainError {
    fn from(err: ConsumeError) -> Self {
        match err.unsupported_operator() {
            Some(name) => ExplainError::UnsupportedOperator(name.to_string()),
            None => ExplainError::MalformedPlan(err),
        }
    }
}
