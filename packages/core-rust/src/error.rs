//! Outcome classification for volume operations.
//!
//! Callers inspect results through [`is_timeout_error`] and the
//! [`OperationError`] variant predicates rather than matching on messages.

/// A client-observed timeout.
///
/// Signals that the caller stopped waiting. It does **not** mean the
/// operation stopped: the volume plugin may still be executing it, and its
/// side effects (including hook calls) can land after this error was
/// reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TimeoutError {
    message: String,
}

impl TimeoutError {
    /// Creates a timeout error carrying `message` verbatim.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message this error was created with.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error value carried on either of an operation's two error channels.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The caller observed a timeout. See [`TimeoutError`].
    #[error(transparent)]
    TimedOut(#[from] TimeoutError),
    /// The operation panicked and the envelope recovered it. `stack` is the
    /// backtrace taken at the panic site, when one could be recorded.
    #[error("recovered from panic: {message}")]
    Panicked {
        message: String,
        stack: Option<String>,
    },
    /// Any other failure reported by the operation.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl OperationError {
    /// Shorthand for a [`OperationError::Failed`] built from a message.
    #[must_use]
    pub fn msg<M>(message: M) -> Self
    where
        M: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        Self::Failed(anyhow::Error::msg(message))
    }

    /// Exact-kind timeout check. A `TimeoutError` nested inside
    /// [`OperationError::Failed`] is not a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }

    /// Stack recorded where a recovered panic was raised.
    #[must_use]
    pub fn panic_stack(&self) -> Option<&str> {
        match self {
            Self::Panicked { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }
}

/// Returns `true` if the operation could have timed out for the client while
/// possibly still running or being processed by the volume plugin.
///
/// `None` and every non-timeout kind return `false`. No unwrapping is done.
#[must_use]
pub fn is_timeout_error(err: Option<&OperationError>) -> bool {
    err.is_some_and(OperationError::is_timeout)
}
