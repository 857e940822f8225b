//! Layers stacked around [`EnvelopeService`](crate::service::EnvelopeService).
//!
//! - [`timeout`]: how long the caller waits for an outcome
//! - [`span`]: `operation` tracing span with elapsed time and result
//! - [`pipeline`]: the assembled stack

pub mod pipeline;
pub mod span;
pub mod timeout;

pub use pipeline::{build_operation_pipeline, OperationPipeline};
pub use span::OperationSpanLayer;
pub use timeout::TimeoutLayer;
