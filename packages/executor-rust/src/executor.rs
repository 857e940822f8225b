//! Caller-facing entry point that runs envelopes through the pipeline.

use tower::ServiceExt;
use volops_core::{OperationEnvelope, OperationOutcome};

use crate::config::ExecutorConfig;
use crate::middleware::{build_operation_pipeline, OperationPipeline};

/// Runs operation envelopes off the async runtime with a caller-side
/// timeout, a cap on envelopes running at once, and tracing.
///
/// The executor does not decide when or whether to retry, and does not
/// serialize operations on the same volume; both belong to the caller.
#[derive(Debug, Clone)]
pub struct OperationExecutor {
    pipeline: OperationPipeline,
}

impl OperationExecutor {
    #[must_use]
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            pipeline: build_operation_pipeline(config),
        }
    }

    /// Runs `envelope` and returns its outcome.
    ///
    /// Pipeline failures are folded into both error channels: a timeout
    /// shows up as a [`volops_core::TimeoutError`] (the envelope keeps
    /// running and keeps its run slot), no free run slot and task aborts as
    /// plain failures.
    pub async fn execute(&self, envelope: OperationEnvelope) -> OperationOutcome {
        let name = envelope.name().to_string();
        match self.pipeline.clone().oneshot(envelope).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(operation = %name, error = %err, "operation did not complete for caller");
                err.into_outcome()
            }
        }
    }
}

impl Default for OperationExecutor {
    fn default() -> Self {
        Self::new(&ExecutorConfig::default())
    }
}
