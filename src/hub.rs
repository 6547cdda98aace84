//! Live notification hub - per-user fan-out of events to connected subscribers.
//!
//! The hub is process-local and constructed once at startup, then handed to the
//! ledger through [`crate::core::context::LedgerContext`] as an [`EventSink`].
//! Publishing never blocks: every subscriber owns a bounded channel and an event
//! is dropped for a subscriber whose buffer is full. The durable
//! notification row is written independently, so a dropped live event only
//! costs latency for that user, never data.

use crate::entities::NotificationType;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Payload pushed to live subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Event type, identical to the stored notification type
    #[serde(rename = "type")]
    pub event_type: NotificationType,
    /// Event body
    pub data: EventData,
}

/// Body of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventData {
    /// Id of the stored notification row
    pub id: i64,
    /// Notification title
    pub title: String,
    /// Notification message
    pub message: String,
    /// Entity the notification is about
    pub reference_id: Option<i64>,
}

impl Event {
    /// Serialises the event as a JSON frame for streaming transports.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Destination for live events.
///
/// Implemented by [`NotificationHub`]; tests plug in a recording fake.
pub trait EventSink: Send + Sync {
    /// Delivers `event` to every live subscriber of `user_id`, without blocking.
    fn publish(&self, user_id: i64, event: Event);

    /// Delivers the same event to several users.
    fn publish_to_many(&self, user_ids: &[i64], event: &Event) {
        for &user_id in user_ids {
            self.publish(user_id, event.clone());
        }
    }
}

type SubscriberMap = HashMap<i64, HashMap<u64, mpsc::Sender<Event>>>;

#[derive(Debug)]
struct HubInner {
    subscribers: RwLock<SubscriberMap>,
    next_subscriber_id: AtomicU64,
    buffer: usize,
}

impl HubInner {
    fn remove(&self, user_id: i64, subscriber_ids: &[u64]) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // The entry may already be gone if another cleanup won the race.
        if let Some(channels) = subscribers.get_mut(&user_id) {
            for id in subscriber_ids {
                channels.remove(id);
            }
            if channels.is_empty() {
                subscribers.remove(&user_id);
            }
        }
    }
}

/// In-memory registry of live subscribers keyed by user id.
///
/// Cloning is cheap and every clone refers to the same registry.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

impl NotificationHub {
    /// Creates an empty hub whose subscribers buffer up to `buffer` events.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(HashMap::new()),
                next_subscriber_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Registers a new live subscriber for `user_id`.
    ///
    /// The subscription stays registered until it is cancelled or dropped.
    #[must_use]
    pub fn subscribe(&self, user_id: i64) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id)
            .or_default()
            .insert(id, sender);
        debug!(user_id, subscriber_id = id, "Live subscriber registered");

        Subscription {
            user_id,
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
            cancelled: false,
        }
    }

    /// Number of live subscribers for `user_id`.
    #[must_use]
    pub fn subscriber_count(&self, user_id: i64) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .map_or(0, HashMap::len)
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(16)
    }
}

impl EventSink for NotificationHub {
    fn publish(&self, user_id: i64, event: Event) {
        let mut closed = Vec::new();
        {
            let subscribers = self
                .inner
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(channels) = subscribers.get(&user_id) else {
                return;
            };

            for (&id, sender) in channels {
                match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(user_id, subscriber_id = id, "Subscriber buffer full, event dropped");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(id),
                }
            }
        }

        if !closed.is_empty() {
            debug!(user_id, count = closed.len(), "Removing disconnected subscribers");
            self.inner.remove(user_id, &closed);
        }
    }
}

/// A live event stream for one user.
///
/// Dropping the subscription unregisters it.
#[derive(Debug)]
pub struct Subscription {
    user_id: i64,
    id: u64,
    receiver: mpsc::Receiver<Event>,
    hub: Weak<HubInner>,
    cancelled: bool,
}

impl Subscription {
    /// User this subscription belongs to.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Waits for the next event. Returns `None` once the subscription is
    /// cancelled and every buffered event has been drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Returns a buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Unregisters from the hub. Safe to call more than once.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.user_id, &[self.id]);
        }
        debug!(user_id = self.user_id, subscriber_id = self.id, "Live subscriber removed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn event(id: i64) -> Event {
        Event {
            event_type: NotificationType::ExpenseApproved,
            data: EventData {
                id,
                title: "Expense Approved".to_string(),
                message: format!("message {id}"),
                reference_id: Some(id),
            },
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_only_target_user() {
        let hub = NotificationHub::new(4);
        let mut alice = hub.subscribe(1);
        let mut bob = hub.subscribe(2);

        hub.publish(1, event(10));

        assert_eq!(alice.recv().await, Some(event(10)));
        assert!(bob.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_every_subscriber_of_a_user_receives() {
        let hub = NotificationHub::new(4);
        let mut first = hub.subscribe(1);
        let mut second = hub.subscribe(1);
        assert_eq!(hub.subscriber_count(1), 2);

        hub.publish_to_many(&[1, 3], &event(5));

        assert_eq!(first.try_recv(), Some(event(5)));
        assert_eq!(second.try_recv(), Some(event(5)));
    }

    #[tokio::test]
    async fn test_full_buffer_drops_instead_of_blocking() {
        let hub = NotificationHub::new(2);
        let mut sub = hub.subscribe(1);

        for id in 0..5 {
            hub.publish(1, event(id));
        }

        assert_eq!(sub.try_recv(), Some(event(0)));
        assert_eq!(sub.try_recv(), Some(event(1)));
        assert!(sub.try_recv().is_none());
        // Still registered after dropping events
        assert_eq!(hub.subscriber_count(1), 1);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_closes_stream() {
        let hub = NotificationHub::new(4);
        let mut sub = hub.subscribe(7);
        hub.publish(7, event(1));

        sub.cancel();
        sub.cancel();
        assert_eq!(hub.subscriber_count(7), 0);

        // Buffered events drain, then the stream ends
        assert_eq!(sub.recv().await, Some(event(1)));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let hub = NotificationHub::new(4);
        {
            let _sub = hub.subscribe(3);
            assert_eq!(hub.subscriber_count(3), 1);
        }
        assert_eq!(hub.subscriber_count(3), 0);
        assert!(hub.inner.subscribers.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_after_racing_removal() {
        let hub = NotificationHub::new(4);
        let mut sub = hub.subscribe(9);

        // Another cleanup already removed the whole user entry
        hub.inner.subscribers.write().unwrap().remove(&9);

        sub.cancel();
        assert_eq!(hub.subscriber_count(9), 0);
    }

    #[tokio::test]
    async fn test_closed_receivers_are_collected_on_publish() {
        let hub = NotificationHub::new(4);
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        hub.inner
            .subscribers
            .write()
            .unwrap()
            .entry(4)
            .or_default()
            .insert(99, sender);

        hub.publish(4, event(1));
        assert_eq!(hub.subscriber_count(4), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_hub_dropped() {
        let hub = NotificationHub::new(4);
        let mut sub = hub.subscribe(1);
        drop(hub);
        sub.cancel();
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_event_json_shape() {
        let json = event(3).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"EXPENSE_APPROVED","data":{"id":3,"title":"Expense Approved","message":"message 3","reference_id":3}}"#
        );
    }
}
