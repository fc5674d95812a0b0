//! Typed event channels bridging sibling use cases.
//!
//! When a service or software is created or edited elsewhere (the
//! submission forms, out of scope here), the owning edge publishes a typed
//! event; each catalog takes a [`Subscription`] at construction and drains
//! it at the start of its operations, applying the upsert before anything
//! is read. Delivery is synchronous within the dispatch cycle — no hidden
//! global bus, no polling task.
//!
//! At-most-once semantics: a subscriber that lags far behind loses the
//! oldest events (logged, not fatal — the next full fetch reconciles).

use tokio::sync::broadcast;
use tracing::warn;

use crate::types::{Service, Software};

/// Buffer depth per subscriber. Catalog mutations are human-paced; this is
/// generous.
const CHANNEL_CAPACITY: usize = 256;

/// Domain events about softwares, published by whatever owns the software
/// form.
#[derive(Debug, Clone)]
pub enum SoftwareEvent {
    AddedOrUpdated(Software),
}

/// Domain events about services, published by whatever owns the service
/// form.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    AddedOrUpdated(Service),
}

/// A typed publish side. Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct Channel<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone + Send + 'static> Channel<E> {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish to all current subscribers. Returns how many received it;
    /// zero subscribers is not an error.
    pub fn publish(&self, event: E) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription<E> {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }
}

impl<E: Clone + Send + 'static> Default for Channel<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// The receive side held by a use case.
#[derive(Debug)]
pub struct Subscription<E> {
    receiver: broadcast::Receiver<E>,
}

impl<E: Clone + Send + 'static> Subscription<E> {
    /// Drain every event published since the last drain, in order.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "event subscription lagged, oldest events dropped");
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_then_drain_in_order() {
        let channel: Channel<u32> = Channel::new();
        let mut subscription = channel.subscribe();

        channel.publish(1);
        channel.publish(2);
        channel.publish(3);

        assert_eq!(subscription.drain(), vec![1, 2, 3]);
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let channel: Channel<u32> = Channel::new();
        channel.publish(1);

        let mut subscription = channel.subscribe();
        channel.publish(2);

        assert_eq!(subscription.drain(), vec![2]);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let channel: Channel<u32> = Channel::new();
        assert_eq!(channel.publish(9), 0);
    }

    #[test]
    fn test_two_subscribers_both_receive() {
        let channel: Channel<u32> = Channel::new();
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        channel.publish(7);

        assert_eq!(first.drain(), vec![7]);
        assert_eq!(second.drain(), vec![7]);
    }
}
