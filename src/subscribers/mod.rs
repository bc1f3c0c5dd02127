//! Subscribers that sit at the end of, or inside, a pipeline.
//!
//! - [`MonoSubscriber`]: delivers at most one value once demand arrives
//! - [`DrainSubscriber`]: consumes everything for callers that supplied no
//!   subscriber, reporting errors instead of losing them
//! - [`ChannelSubscriber`]: hands signals to a blocking consumer thread
//!
//! # Example
//!
//! ```ignore
//! let (subscriber, signals) = ChannelSubscriber::<u64>::new(ChannelConfig::default())?;
//! source.subscribe(subscriber);
//!
//! for item in signals {
//!     println!("{}", item?);
//! }
//! ```

mod channel;
mod drain;
mod mono;

pub use channel::{ChannelConfig, ChannelSubscriber, Signal, SignalReceiver};
pub use drain::{drain_subscriber, DrainSubscriber};
pub use mono::{MonoState, MonoSubscriber};
