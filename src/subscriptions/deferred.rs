//! Subscription that accepts demand before its upstream exists.

use crate::demand::{add_cap_atomic, validate};
use crate::error::FlowError;
use crate::scan::{Addr, Attr, AttrValue, Scannable};
use crate::slot::Link;
use crate::types::Subscription;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Accumulates demand until the real upstream is bound with [`set`], then
/// forwards everything it collected in a single request.
///
/// The upstream reference is dropped on [`cancel`] and on [`release`], so an
/// upstream that points back at its subscriber does not keep both alive.
///
/// [`set`]: DeferredSubscription::set
/// [`cancel`]: Subscription::cancel
/// [`release`]: DeferredSubscription::release
pub struct DeferredSubscription<T> {
    upstream: Link<Arc<dyn Subscription<T>>>,
    requested: AtomicI64,
    cancelled: AtomicBool,
}

impl<T> DeferredSubscription<T> {
    pub fn new() -> Self {
        Self {
            upstream: Link::unbound(),
            requested: AtomicI64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Bind the upstream. Only the first call wins; any later subscription,
    /// or one arriving after `cancel` or `release`, is cancelled. Returns
    /// whether `subscription` became the active upstream.
    pub fn set(&self, subscription: Arc<dyn Subscription<T>>) -> bool {
        if self.is_cancelled() {
            subscription.cancel();
            return false;
        }

        // `cancel` flags before it releases the link, so a bind that loses
        // to it is seen here as already cancelled.
        if let Err(late) = self.upstream.bind(Arc::clone(&subscription)) {
            late.cancel();
            if !self.is_cancelled() {
                report_subscription_set();
            }
            return false;
        }

        let pending = self.requested.swap(0, Ordering::AcqRel);
        if pending != 0 && !self.is_cancelled() {
            subscription.request(pending);
        }
        true
    }

    pub fn upstream(&self) -> Option<Arc<dyn Subscription<T>>> {
        self.upstream.get()
    }

    /// Drop the upstream without cancelling it, once it has signalled a
    /// terminal event. Later demand is kept but never forwarded.
    pub fn release(&self) {
        drop(self.upstream.release());
    }

    /// Demand collected and not yet forwarded.
    pub fn requested(&self) -> i64 {
        self.requested.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

pub(crate) fn report_subscription_set() {
    tracing::warn!(error = %FlowError::DuplicateOnSubscribe, "duplicate subscription has been detected");
}

impl<T> Default for DeferredSubscription<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scannable for DeferredSubscription<T> {
    fn scan(&self, attr: Attr) -> Option<AttrValue> {
        match attr {
            Attr::Parent => self.upstream.get().map(|s| Addr::of(&s).into()),
            Attr::RequestedFromDownstream => Some(self.requested().into()),
            Attr::Cancelled => Some(self.is_cancelled().into()),
            _ => None,
        }
    }
}

impl<T> Subscription<T> for DeferredSubscription<T> {
    fn request(&self, n: i64) {
        if !validate(n) || self.is_cancelled() {
            return;
        }

        if let Some(upstream) = self.upstream.get() {
            upstream.request(n);
            return;
        }

        add_cap_atomic(&self.requested, n);

        // The upstream may have been bound after the first check; whoever
        // swaps the counter to zero forwards it.
        if let Some(upstream) = self.upstream.get() {
            let pending = self.requested.swap(0, Ordering::AcqRel);
            if pending != 0 {
                upstream.request(pending);
            }
        }
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            if let Some(upstream) = self.upstream.release() {
                upstream.cancel();
            }
        }
    }
}
