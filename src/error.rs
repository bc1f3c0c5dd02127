//! Error types for stream primitives.
//!
//! [`FlowError`] names what went wrong. [`Failure`] is the value carried by
//! `on_error` signals: a shared handle around a `FlowError` with an optional
//! cause and a list of suppressed failures. Cloning a `Failure` keeps its
//! identity, so hooks and operators can check "is this the same failure" with
//! [`Failure::ptr_eq`].

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for stream primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Work could not be scheduled because the executor is gone or saturated.
    #[error("Scheduler unavailable")]
    SchedulerUnavailable,

    /// A rejection raised by some other executor, not yet wrapped.
    #[error("{0}")]
    RejectedExecution(String),

    /// A terminal error reached a consumer that never supplied an error callback.
    #[error("no error callback implemented")]
    ErrorCallbackNotImplemented,

    #[error("{0}")]
    IllegalArgument(String),

    #[error("{0}")]
    IllegalState(String),

    #[error("Spec. Rule 2.12 - Subscriber.onSubscribe MUST NOT be called more than once")]
    DuplicateOnSubscribe,

    #[error("Spec. Rule 3.9 - Cannot request a non strictly positive number: {0}")]
    BadRequest(i64),

    #[error("Overflow: {0}")]
    Overflow(String),

    #[error("Context does not contain key: {0}")]
    NoSuchKey(&'static str),

    #[error("Context value for key {0} has an unexpected type")]
    ValueType(&'static str),

    #[error("{0}")]
    Other(String),
}

/// Result type for fallible library calls.
pub type Result<T> = std::result::Result<T, FlowError>;

struct FailureInner {
    error: FlowError,
    cause: Option<Failure>,
    suppressed: Mutex<Vec<Failure>>,
}

/// An error signal travelling through `on_error`.
#[derive(Clone)]
pub struct Failure {
    inner: Arc<FailureInner>,
}

impl Failure {
    pub fn new(error: FlowError) -> Self {
        Self::build(error, None)
    }

    pub fn with_cause(error: FlowError, cause: Failure) -> Self {
        Self::build(error, Some(cause))
    }

    fn build(error: FlowError, cause: Option<Failure>) -> Self {
        Self {
            inner: Arc::new(FailureInner {
                error,
                cause,
                suppressed: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Free-form failure with a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(FlowError::Other(message.into()))
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(FlowError::IllegalArgument(message.into()))
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(FlowError::IllegalState(message.into()))
    }

    /// A rejection coming from an executor this crate does not own.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FlowError::RejectedExecution(message.into()))
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(FlowError::Overflow(message.into()))
    }

    /// Wrap an error that reached a consumer without an error callback.
    pub fn error_callback_not_implemented(cause: Failure) -> Self {
        Self::with_cause(FlowError::ErrorCallbackNotImplemented, cause)
    }

    /// Turn `cause` into a scheduler rejection.
    ///
    /// A failure that already is a scheduler rejection is returned as is, so
    /// callers comparing by identity still find the original instance.
    pub fn fail_with_rejected(cause: Failure) -> Self {
        if cause.is_scheduler_rejection() {
            return cause;
        }
        Self::with_cause(FlowError::SchedulerUnavailable, cause)
    }

    pub fn error(&self) -> &FlowError {
        &self.inner.error
    }

    pub fn message(&self) -> String {
        self.inner.error.to_string()
    }

    pub fn cause(&self) -> Option<&Failure> {
        self.inner.cause.as_ref()
    }

    /// Snapshot of the failures attached as suppressed.
    pub fn suppressed(&self) -> Vec<Failure> {
        self.inner.suppressed.lock().clone()
    }

    pub fn has_suppressed(&self) -> bool {
        !self.inner.suppressed.lock().is_empty()
    }

    /// Attach `other` as a secondary failure. Self-suppression is ignored.
    pub fn add_suppressed(&self, other: Failure) -> &Self {
        if !self.ptr_eq(&other) {
            self.inner.suppressed.lock().push(other);
        }
        self
    }

    /// Whether both handles refer to the same failure instance.
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_error_callback_not_implemented(&self) -> bool {
        matches!(self.inner.error, FlowError::ErrorCallbackNotImplemented)
    }

    /// Rejection produced by this crate's wrapping.
    pub fn is_scheduler_rejection(&self) -> bool {
        matches!(self.inner.error, FlowError::SchedulerUnavailable)
    }

    /// Any rejected-execution failure, wrapped or foreign.
    pub fn is_rejected_execution(&self) -> bool {
        matches!(
            self.inner.error,
            FlowError::SchedulerUnavailable | FlowError::RejectedExecution(_)
        )
    }
}

impl From<FlowError> for Failure {
    fn from(error: FlowError) -> Self {
        Failure::new(error)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.error, f)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Failure");
        out.field("error", &self.inner.error);
        if let Some(cause) = &self.inner.cause {
            out.field("cause", cause);
        }
        let suppressed = self.inner.suppressed.lock();
        if !suppressed.is_empty() {
            out.field("suppressed", &*suppressed);
        }
        out.finish()
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner
            .cause
            .as_ref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}
