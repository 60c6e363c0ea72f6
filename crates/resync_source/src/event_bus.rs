//! Change notification for source-side publishers.
//!
//! Every mutation of the [`Source`](crate::Source) repository is published
//! once on the [`EventBus`]. Registered [`OnResourceChanged`] subscribers
//! are called synchronously, in registration order; channel subscribers get
//! a copy of each event.
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! let rx = bus.subscribe();
//! bus.publish(&ResourceChange::created(resource));
//! assert_eq!(rx.recv()?.kind, ChangeKind::Created);
//! ```

use parking_lot::RwLock;
use resync_protocol::{ChangeKind, Resource};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::info;

/// A change to one resource of the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Kind of change.
    #[serde(rename = "changetype")]
    pub kind: ChangeKind,
    /// Resource after the change (before it, for deletions).
    #[serde(flatten)]
    pub resource: Resource,
}

impl ResourceChange {
    /// Creates a change event.
    pub fn new(resource: Resource, kind: ChangeKind) -> Self {
        Self { kind, resource }
    }

    /// Creates a creation event.
    pub fn created(resource: Resource) -> Self {
        Self::new(resource, ChangeKind::Created)
    }

    /// Creates an update event.
    pub fn updated(resource: Resource) -> Self {
        Self::new(resource, ChangeKind::Updated)
    }

    /// Creates a deletion event.
    pub fn deleted(resource: Resource) -> Self {
        Self::new(resource, ChangeKind::Deleted)
    }
}

/// Receives resource changes from the bus.
pub trait OnResourceChanged: Send + Sync {
    /// Called once per published change.
    fn on_resource_changed(&self, change: &ResourceChange);
}

/// Logs every change as a JSON line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSubscriber;

impl OnResourceChanged for LoggingSubscriber {
    fn on_resource_changed(&self, change: &ResourceChange) {
        match serde_json::to_string(change) {
            Ok(json) => info!(target: "resync::source", "{json}"),
            Err(e) => info!(target: "resync::source", uri = %change.resource.uri, error = %e, "unserializable change"),
        }
    }
}

/// Distributes resource changes to subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn OnResourceChanged>>>,
    channels: RwLock<Vec<Sender<ResourceChange>>>,
}

impl EventBus {
    /// Creates a bus without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber called on every later change.
    pub fn register(&self, subscriber: Arc<dyn OnResourceChanged>) {
        self.subscribers.write().push(subscriber);
    }

    /// Returns a receiver for every later change.
    ///
    /// Dropped receivers are pruned on the next publish.
    pub fn subscribe(&self) -> Receiver<ResourceChange> {
        let (tx, rx) = mpsc::channel();
        self.channels.write().push(tx);
        rx
    }

    /// Publishes a change to all subscribers.
    pub fn publish(&self, change: &ResourceChange) {
        for subscriber in self.subscribers.read().iter() {
            subscriber.on_resource_changed(change);
        }
        self.channels
            .write()
            .retain(|tx| tx.send(change.clone()).is_ok());
    }

    /// Returns the number of registered subscribers and open channels.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len() + self.channels.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.read().len())
            .field("channels", &self.channels.read().len())
            .finish()
    }
}
