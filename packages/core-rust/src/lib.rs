//! Volume operation envelope: runs one fallible operation with ordered exit
//! hooks and panic containment, and classifies its outcome.

pub mod error;
pub mod operation;
pub mod types;

pub use error::{is_timeout_error, OperationError, TimeoutError};
pub use operation::{HookFn, OperationEnvelope, OperationFn, OperationOutcome};
pub use types::{OperationStatus, UniquePodName, UniquePvcName, VOLUME_RESIZER_KEY};
