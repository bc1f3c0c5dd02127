//! Core capabilities of the stream protocol.
//!
//! A [`Publisher`] hands a [`Subscription`] to a [`Subscriber`]; the
//! subscriber grants demand with `request`, the publisher emits at most that
//! many values, and either side may cancel at any time from any thread.

use crate::context::Context;
use crate::error::Failure;
use crate::scan::Scannable;
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

/// Link between one publisher and one subscriber.
///
/// `request` and `cancel` may be called concurrently from any thread, and are
/// no-ops once the subscription is cancelled or terminated.
pub trait Subscription<T>: Scannable + Send + Sync {
    /// Grant demand for up to `n` more values. `n` must be positive.
    fn request(&self, n: i64);

    fn cancel(&self);

    /// This subscription viewed as a synchronous pull queue, when it is one.
    fn as_queue(&self) -> Option<&dyn QueueSubscription<T>> {
        None
    }
}

/// Fusion modes negotiated through [`QueueSubscription::request_fusion`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fusion(u8);

impl Fusion {
    pub const NONE: Fusion = Fusion(0);
    /// Values are available right away; `poll` returning `None` means complete.
    pub const SYNC: Fusion = Fusion(1);
    /// Values arrive later; `on_next` only signals that `poll` may succeed.
    pub const ASYNC: Fusion = Fusion(2);
    pub const ANY: Fusion = Fusion(3);
    /// The consumer drains on another thread than the producer.
    pub const THREAD_BARRIER: Fusion = Fusion(4);

    pub fn contains(self, other: Fusion) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl BitAnd for Fusion {
    type Output = Fusion;

    fn bitand(self, rhs: Fusion) -> Fusion {
        Fusion(self.0 & rhs.0)
    }
}

impl BitOr for Fusion {
    type Output = Fusion;

    fn bitor(self, rhs: Fusion) -> Fusion {
        Fusion(self.0 | rhs.0)
    }
}

/// A subscription that also lets the consumer pull values directly.
///
/// A pulled value is owned by the caller.
pub trait QueueSubscription<T>: Subscription<T> {
    /// Negotiate a fusion mode; returns the granted mode or [`Fusion::NONE`].
    fn request_fusion(&self, requested: Fusion) -> Fusion;

    fn poll(&self) -> Option<T>;

    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn clear(&self);
}

/// Receiver of stream signals.
///
/// At most one `on_subscribe`, then any number of `on_next` bounded by the
/// granted demand, then at most one of `on_error` or `on_complete`.
pub trait Subscriber<T>: Send + Sync {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>);

    fn on_next(&self, value: T);

    fn on_error(&self, error: Failure);

    fn on_complete(&self);

    /// Context used to resolve hooks for signals concerning this subscriber.
    fn context(&self) -> Context {
        Context::empty()
    }
}

/// Source of a stream.
pub trait Publisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);
}

impl<T, F> Publisher<T> for F
where
    F: Fn(Arc<dyn Subscriber<T>>),
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self(subscriber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fusion_contains() {
        assert!(Fusion::ANY.contains(Fusion::SYNC));
        assert!(Fusion::ANY.contains(Fusion::ASYNC));
        assert!(!Fusion::SYNC.contains(Fusion::ASYNC));
        assert!(!Fusion::ANY.contains(Fusion::NONE));
        assert_eq!(Fusion::ANY & Fusion::SYNC, Fusion::SYNC);
        assert!((Fusion::SYNC | Fusion::THREAD_BARRIER).contains(Fusion::THREAD_BARRIER));
    }
}
