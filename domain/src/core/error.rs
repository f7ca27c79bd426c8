//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown example project: {0}")]
    UnknownExampleProject(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid task transition for {task}: {from} -> {to}")]
    InvalidTransition {
        task: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("No epic is currently in progress")]
    NoCurrentEpic,
}

impl DomainError {
    /// Check if this error comes from an illegal task status change
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, DomainError::InvalidTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let error = DomainError::InvalidTransition {
            task: "abc".to_string(),
            from: "done",
            to: "in_progress",
        };
        assert_eq!(
            error.to_string(),
            "Invalid task transition for abc: done -> in_progress"
        );
        assert!(error.is_invalid_transition());
    }

    #[test]
    fn test_other_errors_are_not_transitions() {
        assert!(!DomainError::NoCurrentEpic.is_invalid_transition());
        assert!(!DomainError::UnknownProvider("x".to_string()).is_invalid_transition());
    }
}
