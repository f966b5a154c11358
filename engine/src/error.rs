//! Run-level error types for the workflow engine.
//!
//! Failures inside a single run are captured into that run's error list and
//! never escape far enough to crash the dispatch loop or an event producer.
//! Matching-time problems (unresolvable workflows, bad filter patterns) are
//! logged and skipped where they occur and have no types here.

use thiserror::Error;

use crate::store::StoreError;

/// Raised by a provider runtime when one step or action invocation fails.
///
/// A non-fatal error is captured into the run's error list and execution
/// continues with the next step; `fatal` stops the remaining steps.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct StepError {
    pub message: String,
    pub fatal: bool,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }
}

/// Hard failures that abort a run as a whole rather than a single step.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The workflow references provider types this deployment does not allow.
    /// Checked before any step runs.
    #[error("Workflow uses restricted providers: {}", .providers.join(", "))]
    RestrictedProviders { providers: Vec<String> },
    /// Persisting the aggregated results failed after the run completed.
    #[error("Failed to save workflow results: {0}")]
    Results(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_fatal_flag() {
        assert!(!StepError::new("timeout").fatal);
        assert!(StepError::fatal("no such provider").fatal);
    }

    #[test]
    fn test_restricted_providers_message_lists_offenders() {
        let err = ExecutionError::RestrictedProviders {
            providers: vec!["shell".to_string(), "python".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Workflow uses restricted providers: shell, python"
        );
    }
}
