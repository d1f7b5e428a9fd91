//! Manifest notifications
//!
//! Fire-and-forget broadcast of new manifest addresses. Nothing here
//! guarantees delivery; a subscriber that has gone away is simply dropped.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Broadcast primitive used after every flush
pub trait Publisher: Send + Sync {
    /// Publish `payload` on `topic`
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

impl<T: Publisher + ?Sized> Publisher for Arc<T> {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        (**self).publish(topic, payload)
    }
}

/// A published message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Notification {
    /// Payload as text (manifest addresses are published as CID strings)
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// In-process broadcast over crossbeam channels.
///
/// Every subscriber gets its own unbounded channel; publishing clones the
/// notification to each live subscriber.
#[derive(Default)]
pub struct ChannelPublisher {
    subscribers: Mutex<Vec<Sender<Notification>>>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Number of listeners still attached
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let notification = Notification {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        };

        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(notification.clone()).is_ok());

        let dropped = before - subscribers.len();
        if dropped > 0 {
            tracing::debug!(topic, dropped, "dropped disconnected subscribers");
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChannelPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPublisher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Publishes by logging, for runs with no listeners
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        tracing::info!(topic, payload = %String::from_utf8_lossy(payload), "published");
        Ok(())
    }
}
