//! Caller-side wait limit.
//!
//! `TimeoutLayer` gives up on the result after a fixed wait and answers with
//! `RunnerError::TimedOut`. The envelope is already on the blocking pool by
//! then and finishes on its own, hooks included.

use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};
use volops_core::{OperationEnvelope, OperationOutcome, TimeoutError};

use crate::error::RunnerError;
use crate::service::RunnerFuture;

/// Wraps a service so each call waits at most `limit` for its outcome.
#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    limit: Duration,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            limit: self.limit,
        }
    }
}

/// Produced by [`TimeoutLayer`].
#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    limit: Duration,
}

fn gave_up(operation: &str, limit: Duration) -> RunnerError {
    let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
    tracing::warn!(
        operation,
        limit_ms,
        "stopped waiting on operation; it may still be running"
    );
    TimeoutError::new(format!("operation {operation} timed out after {limit:?}")).into()
}

impl<S> Service<OperationEnvelope> for TimeoutService<S>
where
    S: Service<OperationEnvelope, Response = OperationOutcome, Error = RunnerError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationOutcome;
    type Error = RunnerError;
    type Future = RunnerFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, envelope: OperationEnvelope) -> Self::Future {
        let operation = envelope.name().to_string();
        let limit = self.limit;
        let pending = self.inner.call(envelope);
        Box::pin(async move {
            tokio::time::timeout(limit, pending)
                .await
                .unwrap_or_else(|_| Err(gave_up(&operation, limit)))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use tower::ServiceExt;

    use super::*;
    use crate::service::EnvelopeService;

    fn sleeping_envelope(name: &str, delay_ms: u64) -> OperationEnvelope {
        OperationEnvelope::new(name, move || {
            std::thread::sleep(Duration::from_millis(delay_ms));
            OperationOutcome::success()
        })
    }

    fn limited(limit_ms: u64) -> TimeoutService<EnvelopeService> {
        TimeoutLayer::new(Duration::from_millis(limit_ms)).layer(EnvelopeService::default())
    }

    #[tokio::test]
    async fn fast_operation_returns_its_outcome() {
        let outcome = limited(1000).oneshot(sleeping_envelope("fast", 10)).await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn slow_operation_reports_timeout_naming_it() {
        let err = limited(50).oneshot(sleeping_envelope("slow", 300)).await.unwrap_err();
        match err {
            RunnerError::TimedOut(timeout) => {
                assert!(timeout.message().contains("operation slow timed out"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timed_out_operation_keeps_running_and_completes() {
        let completed = Arc::new(AtomicBool::new(false));
        let (tx, rx) = tokio::sync::oneshot::channel();

        let flag = completed.clone();
        let envelope = sleeping_envelope("expand", 150).with_complete(move |_| {
            flag.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        });

        let err = limited(20).oneshot(envelope).await.unwrap_err();
        assert!(matches!(err, RunnerError::TimedOut(_)));
        assert!(!completed.load(Ordering::SeqCst));

        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("completion hook should fire after the timeout")
            .unwrap();
        assert!(completed.load(Ordering::SeqCst));
    }
}
