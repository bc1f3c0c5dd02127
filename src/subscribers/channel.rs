//! Blocking bridge from a publisher to a consumer thread.

use crate::context::Context;
use crate::error::{Failure, FlowError, Result};
use crate::hooks::{on_error_dropped, on_next_dropped, on_operator_error};
use crate::subscriptions::DeferredSubscription;
use crate::types::{Subscriber, Subscription};
use crossbeam_channel::{
    bounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError, TrySendError,
};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Settings for a [`ChannelSubscriber`].
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Items requested up front and the most the channel buffers.
    /// Default: 256
    pub prefetch: usize,

    /// Context exposed to upstream operators and hooks.
    pub context: Context,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            prefetch: 256,
            context: Context::empty(),
        }
    }
}

/// A signal received from upstream.
#[derive(Debug)]
pub enum Signal<T> {
    Next(T),
    Error(Failure),
    Complete,
}

impl<T> Signal<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Signal::Next(_))
    }
}

/// Forwards signals into a bounded channel read by a [`SignalReceiver`].
pub struct ChannelSubscriber<T> {
    sender: Sender<Signal<T>>,
    upstream: DeferredSubscription<T>,
    prefetch: usize,
    /// A terminal signal was forwarded, or the receiver cancelled.
    done: AtomicBool,
    context: Context,
}

impl<T: Send + 'static> ChannelSubscriber<T> {
    /// Create the subscriber and its receiving end.
    ///
    /// `prefetch` items are requested as soon as an upstream subscribes.
    pub fn new(config: ChannelConfig) -> Result<(Arc<Self>, SignalReceiver<T>)> {
        if config.prefetch == 0 {
            return Err(FlowError::IllegalArgument(
                "prefetch must be greater than zero".to_string(),
            ));
        }

        // One extra slot keeps room for the terminal signal.
        let (sender, receiver) = bounded(config.prefetch + 1);
        let subscriber = Arc::new(Self {
            sender,
            upstream: DeferredSubscription::new(),
            prefetch: config.prefetch,
            done: AtomicBool::new(false),
            context: config.context,
        });
        subscriber.upstream.request(demand(config.prefetch));

        let limit = config.prefetch - config.prefetch / 4;
        let handle = SignalReceiver {
            receiver,
            subscriber: Arc::clone(&subscriber),
            limit,
            consumed: 0,
            finished: false,
        };
        Ok((subscriber, handle))
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.done.store(true, Ordering::Release);
        self.upstream.cancel();
    }

    fn overflow(&self, value: T) {
        if self.done.swap(true, Ordering::AcqRel) {
            on_next_dropped(value, &self.context);
            return;
        }
        self.upstream.cancel();
        let failure = on_operator_error(
            Failure::overflow(format!(
                "upstream ignored demand, buffer of {} items is full",
                self.prefetch
            )),
            Some(&value as &dyn Any),
            &self.context,
        );
        tracing::warn!(error = %failure, "channel subscriber overflow");
        if let Err(rejected) = self.sender.try_send(Signal::Error(failure)) {
            if let Signal::Error(failure) = rejected.into_inner() {
                on_error_dropped(failure, &self.context);
            }
        }
    }
}

fn demand(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl<T: Send + 'static> Subscriber<T> for ChannelSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
        self.upstream.set(subscription);
    }

    fn on_next(&self, value: T) {
        if self.is_done() {
            on_next_dropped(value, &self.context);
            return;
        }
        if self.sender.len() >= self.prefetch {
            self.overflow(value);
            return;
        }
        if let Err(rejected) = self.sender.try_send(Signal::Next(value)) {
            if let Signal::Next(value) = rejected.into_inner() {
                on_next_dropped(value, &self.context);
            }
        }
    }

    fn on_error(&self, error: Failure) {
        if self.done.swap(true, Ordering::AcqRel) {
            on_error_dropped(error, &self.context);
            return;
        }
        self.upstream.release();
        if let Err(rejected) = self.sender.try_send(Signal::Error(error)) {
            if let Signal::Error(error) = rejected.into_inner() {
                on_error_dropped(error, &self.context);
            }
        }
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.upstream.release();
        match self.sender.try_send(Signal::Complete) {
            Ok(()) => {}
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("receiver dropped before completion");
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(prefetch = self.prefetch, "no room left for completion");
            }
        }
    }

    fn context(&self) -> Context {
        self.context.clone()
    }
}

/// Receiving end of a [`ChannelSubscriber`].
///
/// Consuming items replenishes upstream demand in batches. Dropping the
/// receiver cancels upstream. After a terminal signal every receive reports
/// a disconnected channel.
pub struct SignalReceiver<T> {
    receiver: Receiver<Signal<T>>,
    subscriber: Arc<ChannelSubscriber<T>>,
    limit: usize,
    consumed: usize,
    finished: bool,
}

impl<T: Send + 'static> SignalReceiver<T> {
    pub fn recv(&mut self) -> std::result::Result<Signal<T>, RecvError> {
        if self.finished {
            return Err(RecvError);
        }
        let signal = self.receiver.recv()?;
        Ok(self.track(signal))
    }

    pub fn try_recv(&mut self) -> std::result::Result<Signal<T>, TryRecvError> {
        if self.finished {
            return Err(TryRecvError::Disconnected);
        }
        let signal = self.receiver.try_recv()?;
        Ok(self.track(signal))
    }

    pub fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<Signal<T>, RecvTimeoutError> {
        if self.finished {
            return Err(RecvTimeoutError::Disconnected);
        }
        let signal = self.receiver.recv_timeout(timeout)?;
        Ok(self.track(signal))
    }

    /// Stop upstream. Signals already buffered can still be received.
    pub fn cancel(&self) {
        self.subscriber.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn track(&mut self, signal: Signal<T>) -> Signal<T> {
        if signal.is_terminal() {
            self.finished = true;
            return signal;
        }
        self.consumed += 1;
        if self.consumed == self.limit {
            self.consumed = 0;
            self.subscriber.upstream.request(demand(self.limit));
        }
        signal
    }
}

impl<T> Drop for SignalReceiver<T> {
    fn drop(&mut self) {
        self.subscriber.done.store(true, Ordering::Release);
        self.subscriber.upstream.cancel();
    }
}

/// Yields values until completion; an error is yielded once, then the
/// iterator ends.
impl<T: Send + 'static> Iterator for SignalReceiver<T> {
    type Item = std::result::Result<T, Failure>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.recv() {
            Ok(Signal::Next(value)) => Some(Ok(value)),
            Ok(Signal::Error(error)) => Some(Err(error)),
            Ok(Signal::Complete) | Err(_) => None,
        }
    }
}
