//! # flowbase
//!
//! Building blocks for backpressured reactive streams: the pieces operators
//! share regardless of what they compute.
//!
//! ## Core Concepts
//!
//! - **Demand**: saturating arithmetic over `i64` request counts
//! - **Subscriptions**: terminal singletons, deferred binding, scalar values
//!   and upstream replacement that preserves demand
//! - **Subscribers**: single-value delivery, draining and a blocking channel
//! - **Hooks**: context-scoped or process-wide handlers for dropped signals
//!   and operator failures
//! - **Scan**: read-only introspection of any primitive
//!
//! ## Example
//!
//! ```ignore
//! use flowbase::{ChannelConfig, ChannelSubscriber, ScalarSubscription, Subscriber};
//!
//! let (subscriber, signals) = ChannelSubscriber::<u32>::new(ChannelConfig::default())?;
//! let subscription = Arc::new(ScalarSubscription::new(subscriber.clone(), 7));
//! subscriber.on_subscribe(subscription);
//!
//! let values: Vec<u32> = signals.map(|r| r.unwrap()).collect();
//! assert_eq!(values, vec![7]);
//! ```

pub mod context;
pub mod demand;
pub mod error;
pub mod hooks;
pub mod scan;
mod slot;
pub mod subscribers;
pub mod subscriptions;
#[cfg(test)]
mod testing;
pub mod types;

// Re-exports
pub use context::Context;
pub use demand::{add_cap, add_cap_atomic, UNBOUNDED};
pub use error::{Failure, FlowError, Result};
pub use hooks::{Hook, HookKind, HooksConfig};
pub use scan::{Addr, Attr, AttrValue, ScanSnapshot, Scannable};
pub use subscribers::{
    drain_subscriber, ChannelConfig, ChannelSubscriber, DrainSubscriber, MonoState,
    MonoSubscriber, Signal, SignalReceiver,
};
pub use subscriptions::{
    as_queue_subscription, cancelled_subscription, empty_subscription, CancelledSubscription,
    DeferredSubscription, EmptySubscription, MultiSubscriptionSubscriber, ScalarSubscription,
};
pub use types::*;
