use volops_core::{OperationError, OperationOutcome, TimeoutError};

/// Failures of the executor pipeline itself, as opposed to failures reported
/// by an operation through its outcome.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The caller stopped waiting. The operation may still be running.
    #[error(transparent)]
    TimedOut(#[from] TimeoutError),
    /// Every run slot was taken; the envelope was dropped without running.
    #[error("executor overloaded, operation rejected")]
    Overloaded,
    /// The blocking task running the envelope did not complete normally.
    #[error("operation task aborted: {message}")]
    Aborted { message: String },
}

impl RunnerError {
    /// Short label used for the `outcome` field of operation spans.
    #[must_use]
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::TimedOut(_) => "timeout",
            Self::Overloaded => "overloaded",
            Self::Aborted { .. } => "aborted",
        }
    }

    fn to_operation_error(&self) -> OperationError {
        match self {
            Self::TimedOut(err) => OperationError::TimedOut(err.clone()),
            Self::Overloaded | Self::Aborted { .. } => OperationError::msg(self.to_string()),
        }
    }

    /// Reports this failure on both error channels, so callers can classify
    /// it the same way as an operation-reported error.
    #[must_use]
    pub fn into_outcome(self) -> OperationOutcome {
        OperationOutcome::new(
            Some(self.to_operation_error()),
            Some(self.to_operation_error()),
        )
    }
}
