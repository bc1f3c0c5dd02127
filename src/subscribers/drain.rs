//! Terminal consumer for callers that supplied no subscriber of their own.

use crate::context::Context;
use crate::demand::UNBOUNDED;
use crate::error::Failure;
use crate::hooks::{on_error_dropped, on_next_dropped};
use crate::scan::{Attr, AttrValue, Scannable};
use crate::types::{Subscriber, Subscription};
use std::sync::{Arc, OnceLock};

/// Requests everything and discards it.
///
/// Values go to the dropped-value hook. Errors are never discarded quietly:
/// they reach the dropped-error hook wrapped as "no error callback
/// implemented", with the original error as cause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainSubscriber;

impl DrainSubscriber {
    pub const INSTANCE: DrainSubscriber = DrainSubscriber;
}

impl Scannable for DrainSubscriber {
    fn scan(&self, attr: Attr) -> Option<AttrValue> {
        match attr {
            Attr::Prefetch => Some(UNBOUNDED.into()),
            Attr::Terminated | Attr::Cancelled => Some(false.into()),
            _ => None,
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for DrainSubscriber {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
        subscription.request(UNBOUNDED);
    }

    fn on_next(&self, value: T) {
        on_next_dropped(value, &Context::empty());
    }

    fn on_error(&self, error: Failure) {
        on_error_dropped(
            Failure::error_callback_not_implemented(error),
            &Context::empty(),
        );
    }

    fn on_complete(&self) {
        tracing::trace!("drain subscriber completed");
    }
}

static DRAIN: OnceLock<Arc<DrainSubscriber>> = OnceLock::new();

/// The process-wide drain subscriber, for any item type.
pub fn drain_subscriber<T: Send + 'static>() -> Arc<dyn Subscriber<T>> {
    DRAIN.get_or_init(|| Arc::new(DrainSubscriber::INSTANCE)).clone()
}
