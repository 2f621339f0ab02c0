//! In-process fan-out of entity change events.

use quotebook_protocol::ChangeEvent;
use quotebook_protocol::Entity;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::broadcast;
use tracing::trace;

/// Identifies the controller that published a notice, so it can skip its
/// own writes when they come back from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(u64);

#[derive(Debug, Clone)]
pub struct ChangeNotice<E> {
    pub origin: Option<CollectionId>,
    pub event: ChangeEvent<E>,
}

/// Typed publish/subscribe channel for one entity type.
///
/// Cloning yields another handle onto the same channel.
pub struct ChangeBus<E> {
    sender: broadcast::Sender<ChangeNotice<E>>,
    next_id: Arc<AtomicU64>,
}

impl<E> Clone for ChangeBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<E: Entity> ChangeBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub(crate) fn register(&self) -> CollectionId {
        CollectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Never blocks; having no subscribers is not an error.
    pub fn publish(&self, origin: Option<CollectionId>, event: ChangeEvent<E>) {
        trace!("publishing {} for {}", event.kind(), event.entity_id());
        let _ = self.sender.send(ChangeNotice { origin, event });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice<E>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
