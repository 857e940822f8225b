//! The operation envelope: one fallible unit of work plus its exit hooks.
//!
//! [`OperationEnvelope::run`] gives the following guarantees:
//!
//! 1. The operation function runs exactly once, synchronously.
//! 2. A panic in the operation function is recovered and reported as
//!    [`OperationError::Panicked`] on the detailed channel. It never
//!    propagates past `run`.
//! 3. The event recorder hook fires first with the final event error, then
//!    the completion hook fires with the final detailed error.
//!
//! Errors returned by the operation function are passed through untouched.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::error::OperationError;

/// Operation body. Returns the event and detailed error channels.
pub type OperationFn = Box<dyn FnOnce() -> OperationOutcome + Send + 'static>;

/// Exit hook with mutable access to one error slot.
pub type HookFn = Box<dyn FnOnce(&mut Option<OperationError>) + Send + 'static>;

/// The two error channels produced by an operation.
///
/// `event_err` is operator-facing (e.g. turned into a warning event);
/// `detailed_err` is for logs and includes recovered panics.
#[derive(Debug, Default)]
pub struct OperationOutcome {
    pub event_err: Option<OperationError>,
    pub detailed_err: Option<OperationError>,
}

impl OperationOutcome {
    /// Outcome with neither channel set.
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// Outcome carrying the given channels as-is.
    #[must_use]
    pub fn new(event_err: Option<OperationError>, detailed_err: Option<OperationError>) -> Self {
        Self {
            event_err,
            detailed_err,
        }
    }

    /// `true` when neither channel carries an error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.event_err.is_none() && self.detailed_err.is_none()
    }

    /// Splits into `(event_err, detailed_err)`.
    #[must_use]
    pub fn into_parts(self) -> (Option<OperationError>, Option<OperationError>) {
        (self.event_err, self.detailed_err)
    }
}

/// A named operation bound to its optional event recorder and completion
/// hooks.
///
/// The name is for external bookkeeping (e.g. resetting a shared backoff)
/// and is not interpreted here beyond logging. Envelopes are immutable once
/// built and are consumed by [`run`](Self::run).
pub struct OperationEnvelope {
    name: String,
    operation_fn: OperationFn,
    event_recorder_fn: Option<HookFn>,
    complete_fn: Option<HookFn>,
}

impl OperationEnvelope {
    /// Creates an envelope with no hooks.
    pub fn new<F>(name: impl Into<String>, operation_fn: F) -> Self
    where
        F: FnOnce() -> OperationOutcome + Send + 'static,
    {
        Self {
            name: name.into(),
            operation_fn: Box::new(operation_fn),
            event_recorder_fn: None,
            complete_fn: None,
        }
    }

    /// Sets the hook that observes the final event error.
    #[must_use]
    pub fn with_event_recorder<H>(mut self, hook: H) -> Self
    where
        H: FnOnce(&mut Option<OperationError>) + Send + 'static,
    {
        self.event_recorder_fn = Some(Box::new(hook));
        self
    }

    /// Sets the hook that observes the final detailed error.
    #[must_use]
    pub fn with_complete<H>(mut self, hook: H) -> Self
    where
        H: FnOnce(&mut Option<OperationError>) + Send + 'static,
    {
        self.complete_fn = Some(Box::new(hook));
        self
    }

    /// Name given at construction, for the caller's bookkeeping.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `run` will call an event recorder hook.
    #[must_use]
    pub fn has_event_recorder(&self) -> bool {
        self.event_recorder_fn.is_some()
    }

    /// Whether `run` will call a completion hook.
    #[must_use]
    pub fn has_complete(&self) -> bool {
        self.complete_fn.is_some()
    }

    /// Runs the operation and then its hooks, returning both error channels.
    ///
    /// Hooks are caller code and are not panic-contained. If the event
    /// recorder panics, the completion hook still runs before the panic
    /// resumes.
    ///
    /// The first call installs a process-wide panic hook that chains to the
    /// previously installed one and, on threads currently inside `run`,
    /// records the stack at the panic site for [`OperationError::Panicked`].
    pub fn run(self) -> OperationOutcome {
        let Self {
            name,
            operation_fn,
            event_recorder_fn,
            complete_fn,
        } = self;

        tracing::debug!(operation = %name, "running operation");

        let OperationOutcome {
            mut event_err,
            mut detailed_err,
        } = match catch_with_stack(operation_fn) {
            Ok(outcome) => outcome,
            Err((payload, stack)) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    operation = %name,
                    panic = %message,
                    stack = stack.as_deref().unwrap_or("<not captured>"),
                    "recovered from panic in operation"
                );
                OperationOutcome::new(None, Some(OperationError::Panicked { message, stack }))
            }
        };

        let recorder_panic = event_recorder_fn.and_then(|hook| {
            panic::catch_unwind(AssertUnwindSafe(|| hook(&mut event_err))).err()
        });

        if let Some(hook) = complete_fn {
            hook(&mut detailed_err);
        }

        if let Some(payload) = recorder_panic {
            panic::resume_unwind(payload);
        }

        tracing::debug!(
            operation = %name,
            event_err = event_err.is_some(),
            detailed_err = detailed_err.is_some(),
            "operation finished"
        );

        OperationOutcome {
            event_err,
            detailed_err,
        }
    }
}

impl fmt::Debug for OperationEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationEnvelope")
            .field("name", &self.name)
            .field("event_recorder_fn", &self.event_recorder_fn.is_some())
            .field("complete_fn", &self.complete_fn.is_some())
            .finish_non_exhaustive()
    }
}

thread_local! {
    static CAPTURE_DEPTH: Cell<u32> = const { Cell::new(0) };
    static PANIC_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

static STACK_HOOK: Once = Once::new();

fn install_stack_hook() {
    STACK_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURE_DEPTH.try_with(Cell::get).unwrap_or(0) > 0 {
                let stack = Backtrace::force_capture().to_string();
                let _ = PANIC_STACK.try_with(|slot| *slot.borrow_mut() = Some(stack));
            }
            previous(info);
        }));
    });
}

/// Marks the current thread as inside an operation until dropped.
struct CaptureGuard;

impl CaptureGuard {
    fn enter() -> Self {
        CAPTURE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        let _ = CAPTURE_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

type CaughtPanic = (Box<dyn Any + Send>, Option<String>);

/// `catch_unwind` that also returns the stack recorded at the panic site.
fn catch_with_stack(operation_fn: OperationFn) -> Result<OperationOutcome, CaughtPanic> {
    install_stack_hook();
    PANIC_STACK.with(|slot| slot.borrow_mut().take());

    let guard = CaptureGuard::enter();
    let result = panic::catch_unwind(AssertUnwindSafe(operation_fn));
    drop(guard);

    result.map_err(|payload| (payload, PANIC_STACK.with(|slot| slot.borrow_mut().take())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<OperationError>() {
        err.to_string()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
