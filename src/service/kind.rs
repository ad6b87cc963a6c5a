//! The three concrete subsystems.

use crate::transport::TopicFilter;
use crate::types::{RecordKind, Topic, UnreadScope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which real-time subsystem a service instance is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKind {
    /// Chat messages, one channel per conversation plus the user's inbox.
    Chat,
    /// Order status transitions, one channel per viewed order plus the
    /// user's own orders.
    Orders,
    /// Generic notifications on the user's channel.
    Notifications,
}

impl SubsystemKind {
    pub const ALL: [SubsystemKind; 3] = [
        SubsystemKind::Chat,
        SubsystemKind::Orders,
        SubsystemKind::Notifications,
    ];

    /// Record kind every payload of this subsystem decodes to.
    pub fn record_kind(self) -> RecordKind {
        match self {
            SubsystemKind::Chat => RecordKind::Message,
            SubsystemKind::Orders => RecordKind::OrderStatusChange,
            SubsystemKind::Notifications => RecordKind::Notification,
        }
    }

    /// Unread scopes this subsystem owns.
    pub fn scopes(self) -> &'static [UnreadScope] {
        match self {
            SubsystemKind::Chat => &[UnreadScope::Chat],
            SubsystemKind::Orders => &[],
            SubsystemKind::Notifications => &[UnreadScope::Notifications],
        }
    }

    /// Whether starting also subscribes to topics from the repository.
    pub fn fetches_initial_topics(self) -> bool {
        matches!(self, SubsystemKind::Chat)
    }

    /// Transport filter narrowing this subsystem's table to `topic`.
    pub fn filter_for(self, topic: &Topic) -> TopicFilter {
        let source = self.record_kind();
        match (self, topic) {
            (_, Topic::Conversation(id)) => TopicFilter::new(source, "conversation_id", id.as_str()),
            (SubsystemKind::Orders, Topic::Order(id)) => TopicFilter::new(source, "id", id.as_str()),
            (_, Topic::Order(id)) => TopicFilter::new(source, "order_id", id.as_str()),
            (SubsystemKind::Chat, Topic::UserGlobal(id)) => {
                TopicFilter::new(source, "receiver_id", id.as_str())
            }
            (SubsystemKind::Orders, Topic::UserGlobal(id)) => {
                TopicFilter::new(source, "buyer_id", id.as_str())
            }
            (SubsystemKind::Notifications, Topic::UserGlobal(id)) => {
                TopicFilter::new(source, "user_id", id.as_str())
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SubsystemKind::Chat => "chat",
            SubsystemKind::Orders => "orders",
            SubsystemKind::Notifications => "notifications",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
