//! Recording doubles shared by unit tests.

use crate::context::Context;
use crate::error::Failure;
use crate::scan::{Attr, AttrValue, Scannable};
use crate::types::{Subscriber, Subscription};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<T> {
    Subscribed,
    Next(T),
    Error(String),
    Complete,
}

/// Subscriber that records every signal it receives.
pub struct Recorder<T> {
    events: Mutex<Vec<Event<T>>>,
    subscription: Mutex<Option<Arc<dyn Subscription<T>>>>,
    context: Context,
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self::with_context(Context::empty())
    }

    pub fn with_context(context: Context) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
            context,
        }
    }

    pub fn events(&self) -> Vec<Event<T>> {
        self.events.lock().clone()
    }

    pub fn values(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn subscription(&self) -> Option<Arc<dyn Subscription<T>>> {
        self.subscription.lock().clone()
    }
}

impl<T: Send> Subscriber<T> for Recorder<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
        *self.subscription.lock() = Some(subscription);
        self.events.lock().push(Event::Subscribed);
    }

    fn on_next(&self, value: T) {
        self.events.lock().push(Event::Next(value));
    }

    fn on_error(&self, error: Failure) {
        self.events.lock().push(Event::Error(error.message()));
    }

    fn on_complete(&self) {
        self.events.lock().push(Event::Complete);
    }

    fn context(&self) -> Context {
        self.context.clone()
    }
}

/// Upstream double that records requests and cancellations.
#[derive(Default)]
pub struct CountingSubscription {
    requests: Mutex<Vec<i64>>,
    cancels: AtomicUsize,
}

impl CountingSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<i64> {
        self.requests.lock().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_count() > 0
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::Acquire)
    }
}

impl Scannable for CountingSubscription {
    fn scan(&self, attr: Attr) -> Option<AttrValue> {
        match attr {
            Attr::Cancelled => Some(self.is_cancelled().into()),
            _ => None,
        }
    }
}

impl<T> Subscription<T> for CountingSubscription {
    fn request(&self, n: i64) {
        self.requests.lock().push(n);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::AcqRel);
    }
}
