//! Hook resolution and the dispatch entry points used by operators.

use super::{registry, Hook, HookKind};
use crate::context::Context;
use crate::error::Failure;
use crate::types::Subscription;
use std::any::{type_name, Any};

fn local(kind: HookKind, ctx: &Context) -> Option<Hook> {
    ctx.get_or_none::<Hook>(kind.context_key())
        .filter(|hook| hook.kind() == kind)
        .cloned()
}

/// Context override first, then the process-wide hook.
fn lookup(kind: HookKind, ctx: &Context) -> Option<Hook> {
    local(kind, ctx).or_else(|| registry::resolve(kind))
}

/// Report a value that arrived where nobody can consume it.
pub fn on_next_dropped<T: Any>(value: T, ctx: &Context) {
    match lookup(HookKind::NextDropped, ctx) {
        Some(Hook::NextDropped(f)) => f(&value),
        _ => {
            if registry::config().log_dropped_next {
                tracing::debug!(value_type = type_name::<T>(), "onNextDropped");
            }
        }
    }
}

/// Report an error that arrived where nobody can consume it.
pub fn on_error_dropped(error: Failure, ctx: &Context) {
    match lookup(HookKind::ErrorDropped, ctx) {
        Some(Hook::ErrorDropped(f)) => f(&error),
        _ => {
            if registry::config().log_dropped_errors {
                tracing::error!(error = %error, cause = ?error.cause(), "operator called default onErrorDropped");
            }
        }
    }
}

/// Let the operator-error hook transform `error` raised while processing
/// `data`.
///
/// Without a hook the error is returned unchanged; a data signal that is
/// itself a different failure is attached to it as suppressed.
pub fn on_operator_error(error: Failure, data: Option<&dyn Any>, ctx: &Context) -> Failure {
    if let Some(hook) = lookup(HookKind::OperatorError, ctx) {
        if let Some(transform) = hook.transform() {
            return transform(error, data);
        }
    }

    if let Some(signal) = data.and_then(|d| d.downcast_ref::<Failure>()) {
        error.add_suppressed(signal.clone());
    }
    error
}

/// Cancel `subscription`, then resolve the error as [`on_operator_error`].
pub fn on_operator_error_and_cancel<T>(
    subscription: &dyn Subscription<T>,
    error: Failure,
    data: Option<&dyn Any>,
    ctx: &Context,
) -> Failure {
    subscription.cancel();
    on_operator_error(error, data, ctx)
}

/// Turn a failed scheduling attempt into the error to signal downstream.
///
/// `original` is wrapped as "Scheduler unavailable" unless it already is a
/// scheduler rejection, in which case that very instance is kept.
/// `suppressed` is attached to the rejection. A rejected-execution hook,
/// local then global, takes precedence over the operator-error hooks.
pub fn on_rejected_execution(
    original: Failure,
    suppressed: Option<Failure>,
    data: Option<&dyn Any>,
    ctx: &Context,
) -> Failure {
    let rejection = Failure::fail_with_rejected(original);
    if let Some(suppressed) = suppressed {
        rejection.add_suppressed(suppressed);
    }

    match lookup(HookKind::RejectedExecution, ctx) {
        Some(hook) => match hook.transform() {
            Some(transform) => transform(rejection, data),
            None => rejection,
        },
        None => on_operator_error(rejection, data, ctx),
    }
}

/// Cancel `subscription`, then resolve as [`on_rejected_execution`].
pub fn on_rejected_execution_and_cancel<T>(
    original: Failure,
    subscription: &dyn Subscription<T>,
    suppressed: Option<Failure>,
    data: Option<&dyn Any>,
    ctx: &Context,
) -> Failure {
    subscription.cancel();
    on_rejected_execution(original, suppressed, data, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::ScalarSubscription;
    use crate::testing::Recorder;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn boom_hook(prefix: &'static str) -> Hook {
        Hook::operator_error(move |e, v| {
            let v = v
                .and_then(|v| v.downcast_ref::<&str>())
                .copied()
                .unwrap_or("null");
            Failure::with_cause(
                crate::error::FlowError::IllegalState(format!("{prefix}{v}")),
                e,
            )
        })
    }

    #[test]
    fn test_on_error_dropped_local() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let ctx = Context::empty().with_hook(Hook::error_dropped(move |e| {
            *sink.lock() = Some(e.clone());
        }));

        on_error_dropped(Failure::illegal_argument("boom"), &ctx);

        let seen = seen.lock().clone().unwrap();
        assert_eq!(seen.message(), "boom");
    }

    #[test]
    fn test_on_next_dropped_local() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let ctx = Context::empty().with_hook(Hook::next_dropped(move |v| {
            *sink.lock() = v.downcast_ref::<&str>().copied();
        }));

        on_next_dropped("foo", &ctx);

        assert_eq!(*seen.lock(), Some("foo"));
    }

    #[test]
    fn test_on_operator_error_local() {
        let ctx = Context::empty().with_hook(boom_hook("boom_"));
        let failure = Failure::illegal_argument("foo");

        let result = on_operator_error(failure.clone(), Some(&"foo" as &dyn Any), &ctx);

        assert_eq!(result.message(), "boom_foo");
        assert!(result.cause().unwrap().ptr_eq(&failure));
    }

    #[test]
    fn test_on_operator_error_without_hook_is_identity() {
        let failure = Failure::msg("plain");
        let data = Failure::msg("data");

        let result = on_operator_error(failure.clone(), Some(&data as &dyn Any), &Context::empty());

        assert!(result.ptr_eq(&failure));
        assert!(result.suppressed()[0].ptr_eq(&data));
    }

    #[test]
    fn test_on_operator_error_and_cancel() {
        let actual = Arc::new(Recorder::<i32>::new());
        let subscription = ScalarSubscription::<i32>::new(actual.clone(), 1);

        let ctx = Context::empty().with_hook(boom_hook("boom_"));
        let result =
            on_operator_error_and_cancel::<i32>(&subscription, Failure::msg("x"), None, &ctx);

        assert!(subscription.is_cancelled());
        assert_eq!(result.message(), "boom_null");
    }

    #[test]
    fn test_rejected_without_data_delegates_to_operator_error() {
        let ctx = Context::empty().with_hook(boom_hook("boom_"));
        let failure = Failure::illegal_argument("foo");

        let result = on_rejected_execution(failure.clone(), None, None, &ctx);

        assert_eq!(result.message(), "boom_null");
        assert!(!result.has_suppressed());
        let rejection = result.cause().unwrap();
        assert!(rejection.is_scheduler_rejection());
        assert_eq!(rejection.message(), "Scheduler unavailable");
        assert!(rejection.cause().unwrap().ptr_eq(&failure));
    }

    #[test]
    fn test_rejected_with_data_delegates_to_operator_error() {
        let ctx = Context::empty().with_hook(boom_hook("boom_"));
        let failure = Failure::illegal_argument("foo");

        let result = on_rejected_execution(failure.clone(), None, Some(&"bar" as &dyn Any), &ctx);

        assert_eq!(result.message(), "boom_bar");
        assert!(result.cause().unwrap().cause().unwrap().ptr_eq(&failure));
    }

    #[test]
    fn test_rejected_local_takes_precedence_over_operator_error() {
        let reject = Hook::rejected_execution(|e, v| {
            let v = v
                .and_then(|v| v.downcast_ref::<&str>())
                .copied()
                .unwrap_or("null");
            Failure::with_cause(
                crate::error::FlowError::IllegalState(format!("rejected_{v}")),
                e,
            )
        });
        let ctx = Context::empty()
            .with_hook(boom_hook("boom_"))
            .with_hook(reject);

        let result =
            on_rejected_execution(Failure::msg("foo"), None, Some(&"bar" as &dyn Any), &ctx);

        assert_eq!(result.message(), "rejected_bar");
        assert!(result.cause().unwrap().is_scheduler_rejection());
    }

    #[test]
    fn test_rejected_reuses_scheduler_rejection() {
        let original = Failure::fail_with_rejected(Failure::msg("boom"));
        let suppressed = Failure::msg("suppressed");

        let result =
            on_rejected_execution(original.clone(), Some(suppressed.clone()), None, &Context::empty());

        assert!(result.ptr_eq(&original));
        assert!(result.suppressed()[0].ptr_eq(&suppressed));
        assert_eq!(result.cause().unwrap().message(), "boom");
    }

    #[test]
    fn test_rejected_wraps_foreign_rejection() {
        let original = Failure::rejected("outside");
        let suppressed = Failure::msg("suppressed");

        let result =
            on_rejected_execution(original.clone(), Some(suppressed.clone()), None, &Context::empty());

        assert!(!result.ptr_eq(&original));
        assert_eq!(result.message(), "Scheduler unavailable");
        assert!(result.cause().unwrap().ptr_eq(&original));
        assert!(result.suppressed()[0].ptr_eq(&suppressed));
    }
}
