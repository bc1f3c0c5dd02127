//! Pluggable handlers for dropped signals and operator failures.
//!
//! Every dispatch first looks for an override in the caller's [`Context`]
//! under the key of the hook kind, then falls back to the process-wide
//! registry, then to the built-in default:
//! - dropped values and errors are logged (see [`HooksConfig`]) and absorbed
//! - operator errors pass through unchanged
//! - rejected executions are wrapped as "Scheduler unavailable"
//!
//! # Example
//!
//! ```ignore
//! let _guard = hooks::scoped();
//! hooks::install(Hook::error_dropped(|e| eprintln!("lost: {e}")));
//!
//! // Local override for one pipeline only
//! let ctx = Context::empty().with_hook(Hook::next_dropped(|_| {}));
//! hooks::on_next_dropped(42, &ctx);
//! ```
//!
//! [`Context`]: crate::context::Context

mod dispatch;
mod registry;

pub use dispatch::{
    on_error_dropped, on_next_dropped, on_operator_error, on_operator_error_and_cancel,
    on_rejected_execution, on_rejected_execution_and_cancel,
};
pub use registry::{
    config, configure, install, install_operator_error_keyed, reset, reset_all,
    reset_operator_error_keyed, resolve, scoped, HooksConfig, HooksResetGuard,
    DEFAULT_OPERATOR_ERROR_KEY,
};

use crate::error::Failure;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Context key for a local dropped-value hook.
pub const KEY_ON_NEXT_DROPPED: &str = "flowbase.onNextDropped.local";
/// Context key for a local dropped-error hook.
pub const KEY_ON_ERROR_DROPPED: &str = "flowbase.onErrorDropped.local";
/// Context key for a local operator-error hook.
pub const KEY_ON_OPERATOR_ERROR: &str = "flowbase.onOperatorError.local";
/// Context key for a local rejected-execution hook.
pub const KEY_ON_REJECTED_EXECUTION: &str = "flowbase.onRejectedExecution.local";

/// Handler for a value nobody can receive.
pub type NextDroppedFn = Arc<dyn Fn(&dyn Any) + Send + Sync>;
/// Handler for an error nobody can receive.
pub type ErrorDroppedFn = Arc<dyn Fn(&Failure) + Send + Sync>;
/// Transformation of an error, given the value being processed if any.
pub type OperatorErrorFn = Arc<dyn Fn(Failure, Option<&dyn Any>) -> Failure + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    NextDropped,
    ErrorDropped,
    OperatorError,
    RejectedExecution,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::NextDropped,
        HookKind::ErrorDropped,
        HookKind::OperatorError,
        HookKind::RejectedExecution,
    ];

    pub fn context_key(self) -> &'static str {
        match self {
            HookKind::NextDropped => KEY_ON_NEXT_DROPPED,
            HookKind::ErrorDropped => KEY_ON_ERROR_DROPPED,
            HookKind::OperatorError => KEY_ON_OPERATOR_ERROR,
            HookKind::RejectedExecution => KEY_ON_REJECTED_EXECUTION,
        }
    }
}

/// An installed handler, tagged with its kind.
#[derive(Clone)]
pub enum Hook {
    NextDropped(NextDroppedFn),
    ErrorDropped(ErrorDroppedFn),
    OperatorError(OperatorErrorFn),
    RejectedExecution(OperatorErrorFn),
}

impl Hook {
    pub fn next_dropped<F>(f: F) -> Self
    where
        F: Fn(&dyn Any) + Send + Sync + 'static,
    {
        Hook::NextDropped(Arc::new(f))
    }

    pub fn error_dropped<F>(f: F) -> Self
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        Hook::ErrorDropped(Arc::new(f))
    }

    pub fn operator_error<F>(f: F) -> Self
    where
        F: Fn(Failure, Option<&dyn Any>) -> Failure + Send + Sync + 'static,
    {
        Hook::OperatorError(Arc::new(f))
    }

    pub fn rejected_execution<F>(f: F) -> Self
    where
        F: Fn(Failure, Option<&dyn Any>) -> Failure + Send + Sync + 'static,
    {
        Hook::RejectedExecution(Arc::new(f))
    }

    pub fn kind(&self) -> HookKind {
        match self {
            Hook::NextDropped(_) => HookKind::NextDropped,
            Hook::ErrorDropped(_) => HookKind::ErrorDropped,
            Hook::OperatorError(_) => HookKind::OperatorError,
            Hook::RejectedExecution(_) => HookKind::RejectedExecution,
        }
    }

    /// The error transformation carried by operator-error and
    /// rejected-execution hooks.
    pub(crate) fn transform(&self) -> Option<&OperatorErrorFn> {
        match self {
            Hook::OperatorError(f) | Hook::RejectedExecution(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hook").field(&self.kind()).finish()
    }
}
