//! Async runner for volume operation envelopes.
//!
//! Wraps `volops_core::OperationEnvelope::run` in a tower stack:
//!
//! 1. **Span** (`middleware::span`): `operation` tracing span with elapsed time and result
//! 2. **Timeout** (`middleware::timeout`): caller-side wait limit
//! 3. **Envelope service** (`service`): bounded run slots on the blocking pool

pub mod config;
pub mod error;
pub mod executor;
pub mod middleware;
pub mod service;
pub mod telemetry;

pub use config::ExecutorConfig;
pub use error::RunnerError;
pub use executor::OperationExecutor;
pub use middleware::{build_operation_pipeline, OperationPipeline};
pub use service::EnvelopeService;
pub use telemetry::{init_tracing, LogFormat, TelemetryError};
