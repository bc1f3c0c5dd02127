//! Subscription primitives operators are built from.
//!
//! - [`CancelledSubscription`] and [`EmptySubscription`]: process-wide no-op
//!   subscriptions standing for a finished pairing
//! - [`DeferredSubscription`]: collects demand until the upstream is known
//! - [`ScalarSubscription`]: a single value, fusable for synchronous polling
//! - [`MultiSubscriptionSubscriber`]: keeps demand across upstream
//!   replacement
//!
//! # Example
//!
//! ```ignore
//! let deferred = DeferredSubscription::<u32>::new();
//! deferred.request(16);
//!
//! // later, once the source answers
//! deferred.set(upstream);
//! ```

mod deferred;
mod multi;
mod scalar;
mod terminal;

pub use deferred::DeferredSubscription;
pub use multi::MultiSubscriptionSubscriber;
pub use scalar::ScalarSubscription;
pub use terminal::{
    cancelled_subscription, complete, empty_subscription, error, is_cancelled_subscription,
    is_empty_subscription, CancelledSubscription, EmptySubscription,
};

pub(crate) use deferred::report_subscription_set;

use crate::types::{QueueSubscription, Subscription};
use std::sync::Arc;

/// View `subscription` as a [`QueueSubscription`] if it supports polling.
pub fn as_queue_subscription<T>(
    subscription: &Arc<dyn Subscription<T>>,
) -> Option<&dyn QueueSubscription<T>> {
    subscription.as_queue()
}
