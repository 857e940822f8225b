//! Innermost service: runs an envelope on the blocking thread pool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::Semaphore;
use tower::Service;
use volops_core::{OperationEnvelope, OperationOutcome};

use crate::error::RunnerError;

/// Boxed future returned by every service in the pipeline.
pub type RunnerFuture =
    Pin<Box<dyn Future<Output = Result<OperationOutcome, RunnerError>> + Send>>;

/// Runs each envelope with `spawn_blocking`, bounded by a run-slot count.
///
/// A slot is taken before the envelope is handed to the blocking pool and is
/// given back only after `OperationEnvelope::run` returns, so envelopes the
/// caller stopped waiting on still occupy their slot. With no slot free the
/// envelope is dropped unrun with `RunnerError::Overloaded`.
#[derive(Debug, Clone)]
pub struct EnvelopeService {
    run_slots: Arc<Semaphore>,
}

impl EnvelopeService {
    /// Service allowing at most `max_running` envelopes to run at once.
    #[must_use]
    pub fn new(max_running: u32) -> Self {
        Self {
            run_slots: Arc::new(Semaphore::new(max_running as usize)),
        }
    }

    /// Slots not held by a running envelope.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.run_slots.available_permits()
    }
}

impl Default for EnvelopeService {
    fn default() -> Self {
        Self::new(Semaphore::MAX_PERMITS.try_into().unwrap_or(u32::MAX))
    }
}

impl Service<OperationEnvelope> for EnvelopeService {
    type Response = OperationOutcome;
    type Error = RunnerError;
    type Future = RunnerFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, envelope: OperationEnvelope) -> Self::Future {
        let Ok(slot) = self.run_slots.clone().try_acquire_owned() else {
            tracing::warn!(operation = envelope.name(), "all run slots busy, rejecting operation");
            return Box::pin(async { Err(RunnerError::Overloaded) });
        };

        let handle = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            envelope.run()
        });
        Box::pin(async move {
            handle.await.map_err(|err| RunnerError::Aborted {
                message: err.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use tower::ServiceExt;
    use volops_core::OperationError;

    use super::*;

    #[tokio::test]
    async fn runs_envelope_and_returns_its_outcome() {
        let envelope = OperationEnvelope::new("attach", || {
            OperationOutcome::new(None, Some(OperationError::msg("plugin not found")))
        });

        let outcome = EnvelopeService::default().oneshot(envelope).await.unwrap();
        assert!(outcome.event_err.is_none());
        assert_eq!(outcome.detailed_err.unwrap().to_string(), "plugin not found");
    }

    #[tokio::test]
    async fn contained_panic_is_an_outcome_not_an_abort() {
        let envelope = OperationEnvelope::new("detach", || -> OperationOutcome {
            panic!("nil volume spec")
        });

        let outcome = EnvelopeService::default().oneshot(envelope).await.unwrap();
        assert!(outcome.detailed_err.unwrap().is_panic());
    }

    #[tokio::test]
    async fn hook_panic_surfaces_as_aborted() {
        let envelope = OperationEnvelope::new("map", OperationOutcome::success)
            .with_complete(|_| panic!("completion hook broke"));

        let err = EnvelopeService::default().oneshot(envelope).await.unwrap_err();
        assert!(matches!(err, RunnerError::Aborted { .. }));
    }

    #[tokio::test]
    async fn busy_slot_rejects_without_running() {
        let svc = EnvelopeService::new(1);
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let blocker = OperationEnvelope::new("blocker", move || {
            let _ = release_rx.recv();
            OperationOutcome::success()
        });
        let first = tokio::spawn(svc.clone().oneshot(blocker));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(svc.free_slots(), 0);

        let runs = Arc::new(AtomicU32::new(0));
        let (op_runs, hook_runs) = (runs.clone(), runs.clone());
        let rejected = OperationEnvelope::new("rejected", move || {
            op_runs.fetch_add(1, Ordering::SeqCst);
            OperationOutcome::success()
        })
        .with_complete(move |_| {
            hook_runs.fetch_add(1, Ordering::SeqCst);
        });

        let err = svc.clone().oneshot(rejected).await.unwrap_err();
        assert!(matches!(err, RunnerError::Overloaded));
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        release_tx.send(()).unwrap();
        assert!(first.await.unwrap().unwrap().is_success());
        assert_eq!(svc.free_slots(), 1);
    }

    #[tokio::test]
    async fn slot_is_held_until_run_returns_even_if_caller_leaves() {
        let svc = EnvelopeService::new(1);
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let envelope = OperationEnvelope::new("abandoned", move || {
            let _ = release_rx.recv();
            OperationOutcome::success()
        })
        .with_complete(move |_| {
            let _ = done_tx.send(());
        });

        // Start the run, then stop waiting on it.
        let pending = svc.clone().oneshot(envelope);
        let _ = tokio::time::timeout(Duration::from_millis(20), pending).await;
        assert_eq!(svc.free_slots(), 0);

        release_tx.send(()).unwrap();
        done_rx.await.unwrap();
        // The slot is returned right after the hooks, on the blocking thread.
        for _ in 0..100 {
            if svc.free_slots() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(svc.free_slots(), 1);
    }
}
