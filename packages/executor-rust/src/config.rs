use std::time::Duration;

/// Configuration for running operation envelopes through the executor
/// pipeline.
///
/// Controls how long a caller waits on an operation and how many envelopes
/// may be running before new ones are rejected.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// How long a caller waits for an operation before reporting a timeout,
    /// in milliseconds. The operation itself keeps running past this.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of envelopes running on the blocking pool at once.
    /// A run the caller stopped waiting on counts until it returns.
    pub max_concurrent_operations: u32,
}

impl ExecutorConfig {
    /// `default_operation_timeout_ms` as a `Duration`.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.default_operation_timeout_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_operation_timeout_ms: 120_000,
            max_concurrent_operations: 1000,
        }
    }
}
