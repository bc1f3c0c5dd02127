//! Shared subscriptions standing for "already cancelled" and "already done".

use crate::error::Failure;
use crate::scan::{Addr, Attr, AttrValue, Scannable};
use crate::types::{Subscriber, Subscription};
use std::sync::{Arc, OnceLock};

/// Subscription that is already cancelled. `request` and `cancel` do nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CancelledSubscription;

impl CancelledSubscription {
    pub const INSTANCE: CancelledSubscription = CancelledSubscription;
}

impl Scannable for CancelledSubscription {
    fn scan(&self, attr: Attr) -> Option<AttrValue> {
        match attr {
            Attr::Cancelled => Some(true.into()),
            Attr::Terminated => Some(false.into()),
            _ => None,
        }
    }
}

impl<T> Subscription<T> for CancelledSubscription {
    fn request(&self, _n: i64) {}

    fn cancel(&self) {}
}

/// Subscription of a source that has nothing to emit. `request` and `cancel`
/// do nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmptySubscription;

impl EmptySubscription {
    pub const INSTANCE: EmptySubscription = EmptySubscription;
}

impl Scannable for EmptySubscription {
    fn scan(&self, attr: Attr) -> Option<AttrValue> {
        match attr {
            Attr::Terminated => Some(true.into()),
            Attr::Cancelled => Some(false.into()),
            _ => None,
        }
    }
}

impl<T> Subscription<T> for EmptySubscription {
    fn request(&self, _n: i64) {}

    fn cancel(&self) {}
}

static CANCELLED: OnceLock<Arc<CancelledSubscription>> = OnceLock::new();
static EMPTY: OnceLock<Arc<EmptySubscription>> = OnceLock::new();

fn cancelled_instance() -> &'static Arc<CancelledSubscription> {
    CANCELLED.get_or_init(|| Arc::new(CancelledSubscription::INSTANCE))
}

fn empty_instance() -> &'static Arc<EmptySubscription> {
    EMPTY.get_or_init(|| Arc::new(EmptySubscription::INSTANCE))
}

/// The process-wide cancelled subscription, for any item type.
pub fn cancelled_subscription<T>() -> Arc<dyn Subscription<T>> {
    cancelled_instance().clone()
}

/// The process-wide empty subscription, for any item type.
pub fn empty_subscription<T>() -> Arc<dyn Subscription<T>> {
    empty_instance().clone()
}

pub fn is_cancelled_subscription<T>(subscription: &Arc<dyn Subscription<T>>) -> bool {
    Addr::of(subscription) == Addr::of(cancelled_instance())
}

pub fn is_empty_subscription<T>(subscription: &Arc<dyn Subscription<T>>) -> bool {
    Addr::of(subscription) == Addr::of(empty_instance())
}

/// Subscribe `subscriber` with the empty subscription and complete it.
pub fn complete<T>(subscriber: &dyn Subscriber<T>) {
    subscriber.on_subscribe(empty_subscription());
    subscriber.on_complete();
}

/// Subscribe `subscriber` with the empty subscription and fail it.
pub fn error<T>(subscriber: &dyn Subscriber<T>, failure: Failure) {
    subscriber.on_subscribe(empty_subscription());
    subscriber.on_error(failure);
}
