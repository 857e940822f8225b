//! The assembled executor stack.

use tower::ServiceBuilder;

use super::span::{OperationSpanLayer, OperationSpanService};
use super::timeout::{TimeoutLayer, TimeoutService};
use crate::config::ExecutorConfig;
use crate::service::EnvelopeService;

/// Concrete service type returned by [`build_operation_pipeline`].
pub type OperationPipeline = OperationSpanService<TimeoutService<EnvelopeService>>;

/// Stacks, from the caller inwards: the `operation` span, the wait limit
/// from `default_operation_timeout_ms`, and an `EnvelopeService` with
/// `max_concurrent_operations` run slots.
///
/// The span is outermost so timeouts and slot rejections are labelled in it.
#[must_use]
pub fn build_operation_pipeline(config: &ExecutorConfig) -> OperationPipeline {
    ServiceBuilder::new()
        .layer(OperationSpanLayer)
        .layer(TimeoutLayer::new(config.operation_timeout()))
        .service(EnvelopeService::new(config.max_concurrent_operations))
}
