//! Single-value subscription that can also be drained by polling.

use crate::demand::validate;
use crate::scan::{Addr, Attr, AttrValue, Scannable};
use crate::slot::{AtomicSlot, Link};
use crate::types::{Fusion, QueueSubscription, Subscriber, Subscription};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Value not yet delivered.
const FRESH: u8 = 0;
/// `request` won the value and is signalling downstream.
const EMITTING: u8 = 1;
/// Value delivered by `request`, `poll` or discarded by `clear`.
const DONE: u8 = 2;
const CANCELLED: u8 = 3;

/// Emits exactly one value to its subscriber.
///
/// Either `request` pushes `on_next` then `on_complete`, or a fused consumer
/// takes the value with `poll`. Whichever comes first wins; `cancel` wins only
/// if it arrives before both. The subscriber is let go once the value is
/// delivered, drained or cancelled.
pub struct ScalarSubscription<T> {
    actual: Link<Arc<dyn Subscriber<T>>>,
    value: AtomicSlot<T>,
    state: AtomicU8,
}

impl<T: Send + 'static> ScalarSubscription<T> {
    pub fn new(actual: Arc<dyn Subscriber<T>>, value: T) -> Self {
        Self {
            actual: Link::bound(actual),
            value: AtomicSlot::new(value),
            state: AtomicU8::new(FRESH),
        }
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }

    /// A drained scalar also counts as cancelled: nothing is left to stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), DONE | CANCELLED)
    }
}

impl<T: Send + 'static> Scannable for ScalarSubscription<T> {
    fn scan(&self, attr: Attr) -> Option<AttrValue> {
        match attr {
            Attr::Actual => self.actual.get().map(|a| Addr::of(&a).into()),
            Attr::Terminated => Some(self.is_terminated().into()),
            Attr::Cancelled => Some(self.is_cancelled().into()),
            _ => None,
        }
    }
}

impl<T: Send + 'static> Subscription<T> for ScalarSubscription<T> {
    fn request(&self, n: i64) {
        if !validate(n) || !self.transition(FRESH, EMITTING) {
            return;
        }
        // Gone only if a cancel won before on_next started.
        let Some(actual) = self.actual.get() else {
            return;
        };
        if let Some(value) = self.value.take() {
            actual.on_next(value);
        }
        // A cancel during on_next suppresses completion.
        if self.transition(EMITTING, DONE) {
            actual.on_complete();
        }
        drop(self.actual.release());
    }

    fn cancel(&self) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current != FRESH && current != EMITTING {
                return;
            }
            match self.state.compare_exchange_weak(
                current,
                CANCELLED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => {
                    if previous == FRESH {
                        drop(self.value.take());
                    }
                    drop(self.actual.release());
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn as_queue(&self) -> Option<&dyn QueueSubscription<T>> {
        Some(self)
    }
}

impl<T: Send + 'static> QueueSubscription<T> for ScalarSubscription<T> {
    fn request_fusion(&self, requested: Fusion) -> Fusion {
        if requested.contains(Fusion::SYNC) {
            Fusion::SYNC
        } else {
            Fusion::NONE
        }
    }

    fn poll(&self) -> Option<T> {
        if self.transition(FRESH, DONE) {
            drop(self.actual.release());
            return self.value.take();
        }
        None
    }

    fn size(&self) -> usize {
        usize::from(self.state.load(Ordering::Acquire) == FRESH)
    }

    fn clear(&self) {
        if self.transition(FRESH, DONE) {
            drop(self.actual.release());
            drop(self.value.take());
        }
    }
}
