//! In-process publish/subscribe registry for live viewers.
//!
//! Every subscriber owns a bounded queue. Publishing never waits: a message
//! that cannot be queued immediately (receiver gone, or queue full) marks the
//! subscriber as broken and it is dropped from the registry in the same pass.
//! The registry sits behind one mutex, held for the whole publish pass.

mod notification;

pub use notification::Notification;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Default per-subscriber queue depth.
pub const DEFAULT_BUFFER: usize = 64;

/// Identifies one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// A registered subscriber's receiving end.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<Arc<str>>,
}

struct Inner {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    buffer: usize,
}

/// Shared, cloneable handle to the registry.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("subscribers", &self.subscriber_count())
            .field("buffer", &self.inner.buffer)
            .finish()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl BroadcastHub {
    /// Create a hub whose subscribers can each hold `buffer` undelivered messages.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Arc<str>>>> {
        // The map stays consistent even if a holder panicked.
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber with its own queue.
    pub fn subscribe(&self) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.inner.buffer);
        let id = self.subscribe_sender(tx);
        Subscription { id, receiver }
    }

    /// Register an existing sender as a subscriber.
    pub fn subscribe_sender(&self, sender: mpsc::Sender<Arc<str>>) -> SubscriberId {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let count = {
            let mut registry = self.registry();
            registry.insert(id, sender);
            registry.len()
        };
        debug!(subscriber = id.0, subscribers = count, "Subscriber added");
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry().remove(&id).is_some();
        if removed {
            debug!(subscriber = id.0, "Subscriber removed");
        }
        removed
    }

    /// Deliver a message to every subscriber, dropping the ones that fail.
    ///
    /// Returns the number of subscribers the message was queued for.
    pub fn publish(&self, message: impl Into<Arc<str>>) -> usize {
        let message = message.into();
        let mut registry = self.registry();

        let mut delivered = 0;
        registry.retain(|id, sender| match sender.try_send(Arc::clone(&message)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = id.0, "Subscriber queue full, dropping subscriber");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = id.0, "Subscriber closed, dropping subscriber");
                false
            }
        });
        delivered
    }

    /// Publish a state-change notification.
    pub fn notify(&self, notification: &Notification) -> usize {
        self.publish(notification.to_message())
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.registry().contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let hub = BroadcastHub::default();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.notify(&Notification::TopicsChanged), 2);
        assert_eq!(&*a.receiver.recv().await.unwrap(), r#"{"type":"topicsChanged"}"#);
        assert_eq!(&*b.receiver.recv().await.unwrap(), r#"{"type":"topicsChanged"}"#);
    }

    #[tokio::test]
    async fn test_broken_subscriber_is_removed() {
        let hub = BroadcastHub::default();
        let mut live: Vec<Subscription> = (0..4).map(|_| hub.subscribe()).collect();
        let broken = live.remove(2);
        let broken_id = broken.id;
        drop(broken);

        assert_eq!(hub.publish("hello"), 3);
        assert!(!hub.is_subscribed(broken_id));
        assert_eq!(hub.subscriber_count(), 3);
        for sub in &mut live {
            assert_eq!(&*sub.receiver.recv().await.unwrap(), "hello");
        }

        // Not retried on the next publish.
        assert_eq!(hub.publish("again"), 3);
    }

    #[test]
    fn test_full_subscriber_is_removed() {
        let hub = BroadcastHub::new(1);
        let slow = hub.subscribe();
        let mut fast = hub.subscribe();

        assert_eq!(hub.publish("one"), 2);
        assert_eq!(&*fast.receiver.try_recv().unwrap(), "one");

        assert_eq!(hub.publish("two"), 1);
        assert!(!hub.is_subscribed(slow.id));
        assert!(hub.is_subscribed(fast.id));
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = BroadcastHub::default();
        let sub = hub.subscribe();
        assert!(hub.unsubscribe(sub.id));
        assert!(!hub.unsubscribe(sub.id));
        assert_eq!(hub.publish("nobody"), 0);
    }

    #[tokio::test]
    async fn test_concurrent_subscribe_and_publish() {
        let hub = BroadcastHub::new(1024);
        let mut tasks = Vec::new();
        for i in 0..16 {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                let sub = hub.subscribe();
                hub.publish(format!("from {}", i));
                if i % 2 == 0 {
                    hub.unsubscribe(sub.id);
                }
                sub
            }));
        }

        let mut kept = Vec::new();
        for task in tasks {
            kept.push(task.await.unwrap());
        }
        assert_eq!(hub.subscriber_count(), 8);
        drop(kept);
        assert_eq!(hub.publish("last"), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
