//! Error types.
//!
//! Only conditions the caller must act on are errors. Infeasibility and
//! exhausted search budgets are ordinary outcomes and are reported through
//! [`SolveStatus`](crate::solver::SolveStatus) instead.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type alias for scheduling operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Scheduling errors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The project failed input validation. Never retried.
    #[error("malformed project: {}", join_messages(.0))]
    MalformedProject(Vec<ValidationError>),

    /// An external solver backend failed to start or respond.
    #[error("solver unavailable: {0}")]
    SolverUnavailable(String),

    /// A solver was handed a model it cannot interpret.
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// The time-indexed model would exceed the configured cell limit.
    #[error("model too large: {cells} task-time cells exceed the limit of {limit}")]
    ModelTooLarge {
        /// Task count × (horizon + 1).
        cells: u128,
        /// Configured limit.
        limit: u64,
    },

    /// A solver returned an assignment that violates the model.
    #[error("corrupt solution: {0}")]
    CorruptSolution(String),
}

impl ScheduleError {
    /// Creates a solver-unavailable error.
    pub fn solver_unavailable(msg: impl Into<String>) -> Self {
        Self::SolverUnavailable(msg.into())
    }

    /// Creates an unsupported-model error.
    pub fn unsupported_model(msg: impl Into<String>) -> Self {
        Self::UnsupportedModel(msg.into())
    }

    /// Creates a corrupt-solution error.
    pub fn corrupt_solution(msg: impl Into<String>) -> Self {
        Self::CorruptSolution(msg.into())
    }

    /// Validation errors, if this is a malformed-project error.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::MalformedProject(errors) => errors,
            _ => &[],
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_malformed_project_message() {
        let err = ScheduleError::MalformedProject(vec![
            ValidationError::new(ValidationErrorKind::CyclicDependency, "cycle at 'A'"),
            ValidationError::new(ValidationErrorKind::InvalidPredecessor, "unknown 'Z'"),
        ]);
        assert_eq!(
            err.to_string(),
            "malformed project: cycle at 'A'; unknown 'Z'"
        );
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[test]
    fn test_other_errors_have_no_validation_errors() {
        let err = ScheduleError::solver_unavailable("glpsol not found");
        assert!(err.validation_errors().is_empty());
        assert_eq!(err.to_string(), "solver unavailable: glpsol not found");
    }

    #[test]
    fn test_model_too_large_message() {
        let err = ScheduleError::ModelTooLarge {
            cells: 20_000_001,
            limit: 1_000_000,
        };
        assert_eq!(
            err.to_string(),
            "model too large: 20000001 task-time cells exceed the limit of 1000000"
        );
    }
}
