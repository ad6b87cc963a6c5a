//! In-process loopback transport.

use super::{TopicFilter, Transport, TransportHandle, TransportSubscription};
use crate::error::{RealtimeError, Result};
use crate::types::{Action, InboundEvent, RecordKind, Topic};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Default per-subscription queue depth.
const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Internal subscription state.
struct LocalSubscription {
    topic: Topic,
    filter: TopicFilter,
    sender: Sender<InboundEvent>,
}

/// Outcome of handing one event to one subscription.
enum SendOutcome {
    Delivered,
    Full,
    Disconnected,
}

impl LocalSubscription {
    fn try_send(&self, event: InboundEvent) -> SendOutcome {
        match self.sender.try_send(event) {
            Ok(()) => SendOutcome::Delivered,
            Err(TrySendError::Full(_)) => SendOutcome::Full,
            Err(TrySendError::Disconnected(_)) => SendOutcome::Disconnected,
        }
    }
}

/// Loopback transport that delivers pushed rows to open subscriptions.
///
/// Rows can be pushed straight at a topic with [`push`](Self::push), or
/// emitted as table changes with [`emit`](Self::emit), in which case every
/// subscription whose filter matches the row receives it, the way a
/// database change feed fans out.
pub struct LocalTransport {
    subscriptions: RwLock<HashMap<TransportHandle, LocalSubscription>>,
    next_id: AtomicU64,
    opened: AtomicU64,
    buffer_size: usize,
    offline: AtomicBool,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            opened: AtomicU64::new(0),
            buffer_size,
            offline: AtomicBool::new(false),
        }
    }

    /// While offline, opening and closing subscriptions fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of currently open subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Number of open subscriptions for one topic.
    pub fn subscriptions_for(&self, topic: &Topic) -> usize {
        self.subscriptions
            .read()
            .values()
            .filter(|sub| sub.topic == *topic)
            .count()
    }

    /// Subscriptions opened over the transport's lifetime.
    pub fn total_opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Push a row to every subscription on `topic`.
    pub fn push(&self, topic: &Topic, action: Action, row: Map<String, Value>) -> usize {
        self.deliver(|sub| sub.topic == *topic, action, row)
    }

    /// Emit a table change to every subscription whose filter matches.
    pub fn emit(&self, source: RecordKind, action: Action, row: Map<String, Value>) -> usize {
        let probe = row.clone();
        self.deliver(move |sub| sub.filter.matches(source, &probe), action, row)
    }

    /// Server-side drop of every subscription on `topic`; their streams end.
    pub fn disconnect(&self, topic: &Topic) -> usize {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|_, sub| sub.topic != *topic);
        before - subs.len()
    }

    /// Internal delivery helper. Forgets subscribers whose stream is gone.
    fn deliver<F>(&self, filter: F, action: Action, row: Map<String, Value>) -> usize
    where
        F: Fn(&LocalSubscription) -> bool,
    {
        let mut delivered = 0;
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (handle, sub) in subs.iter() {
                if !filter(sub) {
                    continue;
                }
                let event = InboundEvent::new(sub.topic.clone(), action, row.clone());
                match sub.try_send(event) {
                    SendOutcome::Delivered => delivered += 1,
                    SendOutcome::Full => {
                        warn!(topic = %sub.topic, "subscription queue full, dropping event");
                    }
                    SendOutcome::Disconnected => to_remove.push(*handle),
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for handle in to_remove {
                subs.remove(&handle);
            }
        }

        delivered
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalTransport {
    fn open_subscription(
        &self,
        topic: &Topic,
        filter: &TopicFilter,
    ) -> Result<TransportSubscription> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RealtimeError::transport(topic, "transport offline"));
        }

        let handle = TransportHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, events) = bounded(self.buffer_size);

        self.subscriptions.write().insert(
            handle,
            LocalSubscription {
                topic: topic.clone(),
                filter: filter.clone(),
                sender,
            },
        );
        self.opened.fetch_add(1, Ordering::SeqCst);
        debug!(%topic, %filter, ?handle, "opened local subscription");

        Ok(TransportSubscription { handle, events })
    }

    fn close_subscription(&self, handle: TransportHandle) -> Result<()> {
        let mut subs = self.subscriptions.write();
        if self.offline.load(Ordering::SeqCst) {
            if let Some(sub) = subs.get(&handle) {
                return Err(RealtimeError::transport(&sub.topic, "transport offline"));
            }
        }
        subs.remove(&handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn message_filter(conversation: &str) -> TopicFilter {
        TopicFilter::new(RecordKind::Message, "conversation_id", conversation)
    }

    #[test]
    fn test_push_reaches_topic() {
        let transport = LocalTransport::new();
        let topic = Topic::conversation("c1");
        let sub = transport
            .open_subscription(&topic, &message_filter("c1"))
            .unwrap();

        let delivered = transport.push(&topic, Action::Insert, row(json!({"id": "m1"})));
        assert_eq!(delivered, 1);

        let event = sub.events.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event.topic, topic);
        assert_eq!(event.payload["id"], "m1");
    }

    #[test]
    fn test_emit_matches_filters() {
        let transport = LocalTransport::new();
        let conversation = transport
            .open_subscription(&Topic::conversation("c1"), &message_filter("c1"))
            .unwrap();
        let inbox = transport
            .open_subscription(
                &Topic::user_global("buyer"),
                &TopicFilter::new(RecordKind::Message, "receiver_id", "buyer"),
            )
            .unwrap();
        let other = transport
            .open_subscription(&Topic::conversation("c2"), &message_filter("c2"))
            .unwrap();

        let delivered = transport.emit(
            RecordKind::Message,
            Action::Insert,
            row(json!({"id": "m1", "conversation_id": "c1", "receiver_id": "buyer"})),
        );
        assert_eq!(delivered, 2);
        assert!(conversation.events.try_recv().is_ok());
        assert_eq!(
            inbox.events.try_recv().unwrap().topic,
            Topic::user_global("buyer")
        );
        assert!(other.events.try_recv().is_err());
    }

    #[test]
    fn test_close_stops_delivery() {
        let transport = LocalTransport::new();
        let topic = Topic::order("o1");
        let sub = transport
            .open_subscription(&topic, &TopicFilter::new(RecordKind::OrderStatusChange, "id", "o1"))
            .unwrap();

        transport.close_subscription(sub.handle).unwrap();
        assert_eq!(transport.subscription_count(), 0);
        assert_eq!(transport.push(&topic, Action::Update, Map::new()), 0);
    }

    #[test]
    fn test_offline_open_fails() {
        let transport = LocalTransport::new();
        transport.set_offline(true);
        let result = transport.open_subscription(&Topic::order("o1"), &message_filter("x"));
        assert!(matches!(result, Err(RealtimeError::Transport { .. })));
        assert_eq!(transport.total_opened(), 0);
    }

    #[test]
    fn test_disconnect_ends_stream() {
        let transport = LocalTransport::new();
        let topic = Topic::conversation("c1");
        let sub = transport
            .open_subscription(&topic, &message_filter("c1"))
            .unwrap();

        assert_eq!(transport.disconnect(&topic), 1);
        assert!(sub.events.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_full_queue_drops_event() {
        let transport = LocalTransport::with_buffer_size(1);
        let topic = Topic::conversation("c1");
        let _sub = transport
            .open_subscription(&topic, &message_filter("c1"))
            .unwrap();

        assert_eq!(transport.push(&topic, Action::Insert, Map::new()), 1);
        assert_eq!(transport.push(&topic, Action::Insert, Map::new()), 0);
        assert_eq!(transport.subscription_count(), 1);
    }
}
