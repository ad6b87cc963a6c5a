//! Process-wide event bus.

use crate::records::ReceivedRecord;
use crate::types::UnreadScope;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use super::types::{BusEvent, BusFilter, BusReceiver, BusSubscriptionId, DropReason};

/// Default queue depth per bus subscriber.
const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Internal subscriber state.
struct Subscriber {
    filter: BusFilter,
    sender: Sender<BusEvent>,
    /// Events skipped because the queue was full.
    lagged: u64,
}

/// Multi-subscriber, best-effort event bus.
///
/// Publishing never blocks. A subscriber whose queue is full misses that
/// event; a subscriber whose receiver is gone is forgotten.
pub struct EventBus {
    subscribers: RwLock<HashMap<BusSubscriptionId, Subscriber>>,
    next_id: AtomicU64,
    buffer_size: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer_size,
        }
    }

    /// Start receiving events that pass `filter`.
    pub fn subscribe(&self, filter: BusFilter) -> BusReceiver {
        let id = BusSubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.buffer_size);

        self.subscribers.write().insert(
            id,
            Subscriber {
                filter,
                sender,
                lagged: 0,
            },
        );

        BusReceiver { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: BusSubscriptionId) {
        if let Some(sub) = self.subscribers.write().remove(&id) {
            // Best effort
            let _ = sub.sender.try_send(BusEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Drop every subscriber, telling each why.
    pub fn close(&self) {
        let mut subs = self.subscribers.write();
        for (_, sub) in subs.drain() {
            let _ = sub.sender.try_send(BusEvent::Dropped {
                reason: DropReason::Closed,
            });
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Events a subscriber has missed because it fell behind.
    pub fn lagged(&self, id: BusSubscriptionId) -> Option<u64> {
        self.subscribers.read().get(&id).map(|sub| sub.lagged)
    }

    // --- Publishing ---

    pub fn publish_unread(&self, scope: UnreadScope, count: u64) -> usize {
        self.publish(BusEvent::UnreadCountChanged { scope, count })
    }

    pub fn publish_record(&self, received: &ReceivedRecord) -> usize {
        self.publish(BusEvent::RecordReceived {
            received: received.clone(),
        })
    }

    /// Hand `event` to every matching subscriber. Returns how many got it.
    pub fn publish(&self, event: BusEvent) -> usize {
        let mut delivered = 0;
        let mut lagging = Vec::new();
        let mut gone = Vec::new();

        {
            let subs = self.subscribers.read();
            for (id, sub) in subs.iter() {
                if !sub.filter.matches(&event) {
                    continue;
                }
                match sub.sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => lagging.push(*id),
                    Err(TrySendError::Disconnected(_)) => gone.push(*id),
                }
            }
        }

        if !lagging.is_empty() || !gone.is_empty() {
            let mut subs = self.subscribers.write();
            for id in lagging {
                if let Some(sub) = subs.get_mut(&id) {
                    sub.lagged += 1;
                    trace!(subscriber = id.0, lagged = sub.lagged, "bus subscriber lagging");
                }
            }
            for id in gone {
                subs.remove(&id);
            }
        }

        delivered
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
