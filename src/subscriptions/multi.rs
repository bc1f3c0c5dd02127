//! Arbitration of a sequence of upstream subscriptions behind one stable
//! downstream subscription.
//!
//! Operators that resubscribe (retry, repeat, switch-on-empty) install each
//! new upstream with [`MultiSubscriptionSubscriber::set`] and handle upstream
//! terminal signals themselves. Demand requested by downstream and not yet
//! satisfied carries over to the replacement.
//!
//! All mutation is serialized by a work-in-progress counter: the thread that
//! moves it off zero owns the current subscription and the demand counter
//! until it brings it back to zero. Other threads leave their contribution in
//! the `missed_*` fields and the owner folds them in before releasing.

use crate::context::Context;
use crate::demand::{add_cap, add_cap_atomic, validate, UNBOUNDED};
use crate::error::Failure;
use crate::hooks::{on_error_dropped, on_next_dropped};
use crate::scan::{Addr, Attr, AttrValue, Scannable};
use crate::slot::{AtomicSlot, Link};
use crate::types::{Subscriber, Subscription};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

type Upstream<T> = Arc<dyn Subscription<T>>;

pub struct MultiSubscriptionSubscriber<T> {
    /// Released on cancel and on the terminal signal.
    actual: Link<Arc<dyn Subscriber<T>>>,
    context: Context,
    /// Only touched by the owner of `wip`.
    subscription: UnsafeCell<Option<Upstream<T>>>,
    /// Identity of `subscription` for scans from other threads; 0 when none.
    parent: AtomicUsize,
    /// Outstanding downstream demand. Written only by the owner of `wip`.
    requested: AtomicI64,
    unbounded: AtomicBool,
    missed_subscription: AtomicSlot<Upstream<T>>,
    missed_requested: AtomicI64,
    missed_produced: AtomicI64,
    wip: AtomicUsize,
    cancelled: AtomicBool,
    /// A terminal signal went downstream; no upstream is installed again.
    terminated: AtomicBool,
}

// SAFETY: `subscription` is only accessed by the thread owning `wip`; every
// other field is atomic.
unsafe impl<T> Sync for MultiSubscriptionSubscriber<T> {}

impl<T> MultiSubscriptionSubscriber<T> {
    pub fn new(actual: Arc<dyn Subscriber<T>>) -> Self {
        Self {
            context: actual.context(),
            actual: Link::bound(actual),
            subscription: UnsafeCell::new(None),
            parent: AtomicUsize::new(0),
            requested: AtomicI64::new(0),
            unbounded: AtomicBool::new(false),
            missed_subscription: AtomicSlot::empty(),
            missed_requested: AtomicI64::new(0),
            missed_produced: AtomicI64::new(0),
            wip: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        }
    }

    /// Downstream subscriber, until cancellation or the terminal signal.
    pub fn actual(&self) -> Option<Arc<dyn Subscriber<T>>> {
        self.actual.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.is_cancelled() || self.is_terminated()
    }

    /// Demand reached [`UNBOUNDED`]; accounting is skipped from now on.
    pub fn is_unbounded(&self) -> bool {
        self.unbounded.load(Ordering::Acquire)
    }

    /// Outstanding downstream demand as last folded by the owner.
    pub fn requested(&self) -> i64 {
        self.requested.load(Ordering::Acquire)
    }

    fn try_enter(&self) -> bool {
        self.wip
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release ownership, draining whatever other threads left meanwhile.
    fn leave(&self) {
        if self.wip.fetch_sub(1, Ordering::AcqRel) != 1 {
            self.drain_loop();
        }
    }

    /// # Safety
    /// The caller must own `wip`.
    #[allow(clippy::mut_from_ref)]
    unsafe fn current(&self) -> &mut Option<Upstream<T>> {
        &mut *self.subscription.get()
    }

    fn install(&self, slot: &mut Option<Upstream<T>>, next: Upstream<T>) -> Option<Upstream<T>> {
        self.parent.store(Addr::of(&next).0, Ordering::Release);
        slot.replace(next)
    }

    /// Replace the current upstream with `subscription`.
    ///
    /// The previous upstream is cancelled before the new one receives any
    /// demand, then all outstanding demand is requested from the new one. If
    /// this subscriber is cancelled or terminated, `subscription` is
    /// cancelled instead.
    pub fn set(&self, subscription: Upstream<T>) {
        if self.is_closed() {
            subscription.cancel();
            return;
        }

        if self.try_enter() {
            // SAFETY: `try_enter` made this thread the owner.
            let current = unsafe { self.current() };
            if let Some(previous) = self.install(current, Arc::clone(&subscription)) {
                previous.cancel();
            }
            let outstanding = self.requested.load(Ordering::Acquire);

            // A cancel or terminal signal that finished draining before
            // `try_enter` left the new subscription for us to cancel.
            let cancelled = self.is_closed();
            if cancelled {
                if let Some(active) = current.take() {
                    active.cancel();
                }
                self.parent.store(0, Ordering::Release);
            }
            self.leave();
            if !cancelled && outstanding != 0 {
                subscription.request(outstanding);
            }
            return;
        }

        if let Some(stale) = self.missed_subscription.swap(Some(subscription)) {
            stale.cancel();
        }
        self.drain();
    }

    /// Record `n` values emitted by the current upstream.
    pub fn produced(&self, n: i64) {
        if self.is_unbounded() {
            return;
        }

        if self.try_enter() {
            let r = self.requested.load(Ordering::Acquire);
            if r != UNBOUNDED {
                let mut u = r - n;
                if u < 0 {
                    report_more_produced(u);
                    u = 0;
                }
                self.requested.store(u, Ordering::Release);
            } else {
                self.unbounded.store(true, Ordering::Release);
            }
            self.leave();
            return;
        }

        add_cap_atomic(&self.missed_produced, n);
        self.drain();
    }

    pub fn produced_one(&self) {
        self.produced(1);
    }

    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        self.drain_loop();
    }

    fn drain_loop(&self) {
        let mut missed = 1usize;
        let mut request_amount = 0i64;
        let mut request_target: Option<Upstream<T>> = None;

        loop {
            let missed_subscription = self.missed_subscription.take();
            let missed_requested = take_counter(&self.missed_requested);
            let missed_produced = take_counter(&self.missed_produced);

            // SAFETY: drain_loop only runs while this thread owns `wip`.
            let current = unsafe { self.current() };

            if self.is_cancelled() {
                if let Some(active) = current.take() {
                    active.cancel();
                }
                self.parent.store(0, Ordering::Release);
                if let Some(missed) = missed_subscription {
                    missed.cancel();
                }
            } else if self.is_terminated() {
                // The upstream that terminated needs no cancel.
                drop(current.take());
                self.parent.store(0, Ordering::Release);
                if let Some(missed) = missed_subscription {
                    missed.cancel();
                }
            } else {
                let mut r = self.requested.load(Ordering::Acquire);
                if r != UNBOUNDED {
                    let u = add_cap(r, missed_requested);
                    if u != UNBOUNDED {
                        let mut v = u - missed_produced;
                        if v < 0 {
                            report_more_produced(v);
                            v = 0;
                        }
                        r = v;
                    } else {
                        r = u;
                        self.unbounded.store(true, Ordering::Release);
                    }
                    self.requested.store(r, Ordering::Release);
                }

                if let Some(next) = missed_subscription {
                    if let Some(previous) = self.install(current, Arc::clone(&next)) {
                        previous.cancel();
                    }
                    // `r` already covers anything collected for the
                    // replaced upstream.
                    request_amount = r;
                    request_target = Some(next);
                } else if missed_requested != 0 {
                    if let Some(active) = current.as_ref() {
                        request_amount = add_cap(request_amount, missed_requested);
                        request_target = Some(Arc::clone(active));
                    }
                }
            }

            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                if request_amount != 0 {
                    if let Some(target) = request_target {
                        target.request(request_amount);
                    }
                }
                return;
            }
        }
    }
}

fn take_counter(cell: &AtomicI64) -> i64 {
    if cell.load(Ordering::Acquire) == 0 {
        0
    } else {
        cell.swap(0, Ordering::AcqRel)
    }
}

fn report_more_produced(remaining: i64) {
    tracing::debug!(remaining, "more produced than requested");
}

impl<T> Scannable for MultiSubscriptionSubscriber<T> {
    fn scan(&self, attr: Attr) -> Option<AttrValue> {
        match attr {
            Attr::Actual => self.actual.get().map(|a| Addr::of(&a).into()),
            Attr::Parent => match self.parent.load(Ordering::Acquire) {
                0 => None,
                addr => Some(Addr(addr).into()),
            },
            Attr::RequestedFromDownstream => Some(self.requested().into()),
            Attr::Cancelled => Some(self.is_cancelled().into()),
            Attr::Terminated => Some(self.is_terminated().into()),
            _ => None,
        }
    }
}

impl<T> Subscription<T> for MultiSubscriptionSubscriber<T> {
    fn request(&self, n: i64) {
        if !validate(n) || self.is_unbounded() {
            return;
        }

        if self.try_enter() {
            let r = self.requested.load(Ordering::Acquire);
            if r != UNBOUNDED {
                let u = add_cap(r, n);
                self.requested.store(u, Ordering::Release);
                if u == UNBOUNDED {
                    self.unbounded.store(true, Ordering::Release);
                }
            }
            // SAFETY: `try_enter` made this thread the owner.
            let active = unsafe { self.current() }.clone();
            self.leave();
            if let Some(active) = active {
                active.request(n);
            }
            return;
        }

        add_cap_atomic(&self.missed_requested, n);
        self.drain();
    }

    /// Cancel the current upstream and every upstream set afterwards.
    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            drop(self.actual.release());
            self.drain();
        }
    }
}

/// Pass-through: values go to the downstream subscriber and count against
/// its demand, so a replacement upstream is only asked for what is left.
///
/// The first terminal signal ends the sequence. Upstreams subscribed after
/// it are cancelled and later signals go to the dropped hooks.
impl<T: Send + 'static> Subscriber<T> for MultiSubscriptionSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
        self.set(subscription);
    }

    fn on_next(&self, value: T) {
        let actual = match self.actual.get() {
            Some(actual) if !self.is_terminated() => actual,
            _ => {
                on_next_dropped(value, &self.context);
                return;
            }
        };
        actual.on_next(value);
        self.produced_one();
    }

    fn on_error(&self, error: Failure) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            on_error_dropped(error, &self.context);
            return;
        }
        self.drain();
        match self.actual.release() {
            Some(actual) => actual.on_error(error),
            None => on_error_dropped(error, &self.context),
        }
    }

    fn on_complete(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.drain();
        if let Some(actual) = self.actual.release() {
            actual.on_complete();
        }
    }

    fn context(&self) -> Context {
        self.context.clone()
    }
}
