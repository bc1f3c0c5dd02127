//! Subscriber and subscription for pipelines that produce at most one value.

use crate::context::Context;
use crate::demand::{validate, UNBOUNDED};
use crate::error::Failure;
use crate::hooks::{on_error_dropped, on_next_dropped};
use crate::scan::{Addr, Attr, AttrValue, Scannable};
use crate::slot::{AtomicSlot, Link};
use crate::subscriptions::report_subscription_set;
use crate::types::{Subscriber, Subscription};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

/// Delivery state. Every transition is a single compare-and-swap.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonoState {
    NoRequestNoValue = 0,
    /// Value stored, waiting for demand.
    NoRequestHasValue = 1,
    /// Demand present, waiting for the value.
    HasRequestNoValue = 2,
    /// The value is being handed downstream.
    HasRequestHasValue = 3,
    Terminated = 4,
    Cancelled = 5,
}

impl MonoState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::NoRequestNoValue,
            1 => Self::NoRequestHasValue,
            2 => Self::HasRequestNoValue,
            3 => Self::HasRequestHasValue,
            4 => Self::Terminated,
            5 => Self::Cancelled,
            // Only discriminants of this enum are ever stored.
            other => unreachable!("invalid mono state {other}"),
        }
    }
}

/// Emits a single value to `actual` once both the value and demand exist.
///
/// Operators either feed it with [`complete`](MonoSubscriber::complete) or
/// subscribe it to a source, in which case it takes the first value and
/// cancels the source. Both links are dropped once the subscriber is
/// terminated or cancelled.
pub struct MonoSubscriber<T> {
    actual: Link<Arc<dyn Subscriber<T>>>,
    upstream: Link<Arc<dyn Subscription<T>>>,
    /// Captured from `actual` so dropped signals still reach its hooks.
    context: Context,
    value: AtomicSlot<T>,
    state: AtomicU8,
    /// An upstream signal (value or terminal) has been received.
    received: AtomicBool,
    this: Weak<Self>,
}

impl<T: Send + 'static> MonoSubscriber<T> {
    pub fn new(actual: Arc<dyn Subscriber<T>>) -> Arc<Self> {
        let context = actual.context();
        Arc::new_cyclic(|this| Self {
            actual: Link::bound(actual),
            upstream: Link::unbound(),
            context,
            value: AtomicSlot::empty(),
            state: AtomicU8::new(MonoState::NoRequestNoValue as u8),
            received: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    /// Downstream subscriber, until this subscriber terminates or is
    /// cancelled.
    pub fn actual(&self) -> Option<Arc<dyn Subscriber<T>>> {
        self.actual.get()
    }

    pub fn state(&self) -> MonoState {
        MonoState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == MonoState::Cancelled
    }

    /// A value is held or was delivered, or the sequence ended.
    pub fn is_terminated(&self) -> bool {
        matches!(
            self.state(),
            MonoState::NoRequestHasValue | MonoState::HasRequestHasValue | MonoState::Terminated
        )
    }

    fn transition(&self, from: MonoState, to: MonoState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Hand `value` downstream; called in `HasRequestHasValue`.
    fn emit(&self, value: T) {
        let Some(actual) = self.actual.get() else {
            // Cancelled before on_next started.
            on_next_dropped(value, &self.context);
            return;
        };
        actual.on_next(value);
        // A cancel during on_next suppresses completion.
        if self.transition(MonoState::HasRequestHasValue, MonoState::Terminated) {
            actual.on_complete();
        }
        self.unlink();
    }

    /// Provide the single value.
    ///
    /// With demand already present the value is emitted followed by
    /// completion; otherwise it is kept until `request`. A second value, or
    /// one arriving after cancellation, goes to the dropped-value hook.
    pub fn complete(&self, value: T) {
        let mut value = value;
        loop {
            match self.state() {
                MonoState::NoRequestNoValue => {
                    // Park the value before publishing the state so that a
                    // request winning the race finds it.
                    drop(self.value.swap(Some(value)));
                    if self.transition(MonoState::NoRequestNoValue, MonoState::NoRequestHasValue) {
                        return;
                    }
                    match self.value.take() {
                        Some(v) => value = v,
                        None => return,
                    }
                }
                MonoState::HasRequestNoValue => {
                    if self.transition(MonoState::HasRequestNoValue, MonoState::HasRequestHasValue) {
                        self.emit(value);
                        return;
                    }
                }
                _ => {
                    on_next_dropped(value, &self.context);
                    return;
                }
            }
        }
    }

    fn terminate(&self) -> bool {
        self.transition(MonoState::NoRequestNoValue, MonoState::Terminated)
            || self.transition(MonoState::HasRequestNoValue, MonoState::Terminated)
    }

    fn cancel_upstream(&self) {
        if let Some(upstream) = self.upstream.release() {
            upstream.cancel();
        }
    }

    fn unlink(&self) {
        drop(self.actual.release());
        drop(self.upstream.release());
    }
}

impl<T: Send + 'static> Scannable for MonoSubscriber<T> {
    fn scan(&self, attr: Attr) -> Option<AttrValue> {
        match attr {
            Attr::Actual => self.actual.get().map(|a| Addr::of(&a).into()),
            Attr::Parent => self.upstream.get().map(|s| Addr::of(&s).into()),
            Attr::Prefetch => Some(i64::from(i32::MAX).into()),
            Attr::Terminated => Some(self.is_terminated().into()),
            Attr::Cancelled => Some(self.is_cancelled().into()),
            _ => None,
        }
    }
}

impl<T: Send + 'static> Subscription<T> for MonoSubscriber<T> {
    fn request(&self, n: i64) {
        if !validate(n) {
            return;
        }
        loop {
            match self.state() {
                MonoState::NoRequestNoValue => {
                    if self.transition(MonoState::NoRequestNoValue, MonoState::HasRequestNoValue) {
                        return;
                    }
                }
                MonoState::NoRequestHasValue => {
                    if self.transition(MonoState::NoRequestHasValue, MonoState::HasRequestHasValue) {
                        if let Some(value) = self.value.take() {
                            self.emit(value);
                        }
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn cancel(&self) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= MonoState::Terminated as u8 {
                return;
            }
            match self.state.compare_exchange_weak(
                current,
                MonoState::Cancelled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => {
                    if previous == MonoState::NoRequestHasValue as u8 {
                        drop(self.value.take());
                    }
                    self.cancel_upstream();
                    drop(self.actual.release());
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for MonoSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
        if let Err(late) = self.upstream.bind(Arc::clone(&subscription)) {
            late.cancel();
            if !matches!(self.state(), MonoState::Terminated | MonoState::Cancelled) {
                report_subscription_set();
            }
            return;
        }
        let (Some(this), Some(actual)) = (self.this.upgrade(), self.actual.get()) else {
            return;
        };
        actual.on_subscribe(this);

        // `cancel` moves the state before releasing the link, so either it
        // cancelled the upstream already or the state shows it here.
        if self.is_cancelled() {
            self.cancel_upstream();
        } else {
            subscription.request(UNBOUNDED);
        }
    }

    fn on_next(&self, value: T) {
        if self.received.swap(true, Ordering::AcqRel) {
            on_next_dropped(value, &self.context);
            return;
        }
        self.cancel_upstream();
        self.complete(value);
    }

    fn on_error(&self, error: Failure) {
        if self.received.swap(true, Ordering::AcqRel) || !self.terminate() {
            on_error_dropped(error, &self.context);
            return;
        }
        match self.actual.release() {
            Some(actual) => actual.on_error(error),
            None => on_error_dropped(error, &self.context),
        }
        drop(self.upstream.release());
    }

    fn on_complete(&self) {
        if self.received.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.terminate() {
            if let Some(actual) = self.actual.release() {
                actual.on_complete();
            }
            drop(self.upstream.release());
        }
    }

    fn context(&self) -> Context {
        self.context.clone()
    }
}
