//! Per-operation tracing span.
//!
//! Every call runs inside an `operation` span carrying the envelope name.
//! When the call settles the span gets its elapsed time and a short result
//! label, and one `info` event summarises both.

use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{field, info_span, Instrument, Span};
use volops_core::{OperationEnvelope, OperationOutcome};

use crate::error::RunnerError;
use crate::service::RunnerFuture;

/// Adds the `operation` span around each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationSpanLayer;

impl<S> Layer<S> for OperationSpanLayer {
    type Service = OperationSpanService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OperationSpanService { inner }
    }
}

/// Produced by [`OperationSpanLayer`].
#[derive(Debug, Clone)]
pub struct OperationSpanService<S> {
    inner: S,
}

/// `ok` only when neither error channel is set; an operation-reported
/// failure on either channel is `error`.
pub(crate) fn result_label(result: &Result<OperationOutcome, RunnerError>) -> &'static str {
    match result {
        Ok(outcome) if outcome.is_success() => "ok",
        Ok(_) => "error",
        Err(err) => err.outcome_label(),
    }
}

impl<S> Service<OperationEnvelope> for OperationSpanService<S>
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
        let span = info_span!(
            "operation",
            name = envelope.name(),
            elapsed_ms = field::Empty,
            result = field::Empty,
        );
        let started = Instant::now();
        let pending = self.inner.call(envelope);

        Box::pin(
            async move {
                let result = pending.await;
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                let label = result_label(&result);

                let span = Span::current();
                span.record("elapsed_ms", elapsed_ms);
                span.record("result", label);
                tracing::info!(elapsed_ms, result = label, "operation settled");

                result
            }
            .instrument(span),
        )
    }
}
