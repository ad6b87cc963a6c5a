//! Typed records decoded from inbound pushes.

use crate::deeplink::DeeplinkPayload;
use crate::types::{Action, ConversationId, OrderId, RecordKind, Topic, UnreadScope, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    System,
    /// Anything this client does not know how to render.
    Other,
}

impl MessageType {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "text" => MessageType::Text,
            "image" | "photo" => MessageType::Image,
            "system" => MessageType::System,
            _ => MessageType::Other,
        }
    }
}

/// A chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: Option<UserId>,
    pub message_type: MessageType,
    /// Absent for image messages; that is a valid message, not a gap.
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Order lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
    /// A status this client predates; kept verbatim.
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Other(status) => status,
        }
    }

    /// Human-readable status line used in banners.
    pub fn describe(&self) -> String {
        match self {
            OrderStatus::Pending => "is waiting for payment".to_string(),
            OrderStatus::Paid => "has been paid".to_string(),
            OrderStatus::Shipped => "has shipped".to_string(),
            OrderStatus::Delivered => "was delivered".to_string(),
            OrderStatus::Completed => "is complete".to_string(),
            OrderStatus::Cancelled => "was cancelled".to_string(),
            OrderStatus::Refunded => "was refunded".to_string(),
            OrderStatus::Other(status) => format!("is now {status}"),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "paid" => OrderStatus::Paid,
            "shipped" => OrderStatus::Shipped,
            "delivered" => OrderStatus::Delivered,
            "completed" => OrderStatus::Completed,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "refunded" => OrderStatus::Refunded,
            _ => OrderStatus::Other(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

/// An order moved to a new status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub previous_status: Option<OrderStatus>,
    pub buyer_id: Option<UserId>,
    pub seller_id: Option<UserId>,
    /// Who caused the transition, when the feed says so.
    pub updated_by: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

/// A generic in-app notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub actor_id: Option<UserId>,
    pub deeplink: Option<DeeplinkPayload>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// The decoded form of an inbound event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum DomainRecord {
    Message(Message),
    OrderStatusChange(OrderStatusChange),
    Notification(Notification),
}

impl DomainRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            DomainRecord::Message(_) => RecordKind::Message,
            DomainRecord::OrderStatusChange(_) => RecordKind::OrderStatusChange,
            DomainRecord::Notification(_) => RecordKind::Notification,
        }
    }

    /// Identifier of the underlying row.
    pub fn id(&self) -> &str {
        match self {
            DomainRecord::Message(m) => &m.id,
            DomainRecord::OrderStatusChange(o) => o.order_id.as_str(),
            DomainRecord::Notification(n) => &n.id,
        }
    }

    /// The user who caused this record, if known.
    pub fn author(&self) -> Option<&UserId> {
        match self {
            DomainRecord::Message(m) => Some(&m.sender_id),
            DomainRecord::OrderStatusChange(o) => o.updated_by.as_ref(),
            DomainRecord::Notification(n) => n.actor_id.as_ref(),
        }
    }

    pub fn is_authored_by(&self, user: &UserId) -> bool {
        self.author() == Some(user)
    }

    /// The counter an insert of this record feeds, if any.
    pub fn unread_scope(&self) -> Option<UnreadScope> {
        match self {
            DomainRecord::Message(_) => Some(UnreadScope::Chat),
            DomainRecord::OrderStatusChange(_) => None,
            DomainRecord::Notification(_) => Some(UnreadScope::Notifications),
        }
    }

    /// The topic a screen showing this record would be focused on.
    pub fn subject_topic(&self) -> Topic {
        match self {
            DomainRecord::Message(m) => Topic::Conversation(m.conversation_id.clone()),
            DomainRecord::OrderStatusChange(o) => Topic::Order(o.order_id.clone()),
            DomainRecord::Notification(n) => Topic::UserGlobal(n.user_id.clone()),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainRecord::Message(m) => m.created_at,
            DomainRecord::OrderStatusChange(o) => o.updated_at,
            DomainRecord::Notification(n) => n.created_at,
        }
    }
}

/// A decoded record together with the channel it arrived on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceivedRecord {
    pub topic: Topic,
    pub action: Action,
    pub record: DomainRecord,
    pub received_at: DateTime<Utc>,
}

impl ReceivedRecord {
    pub fn new(topic: Topic, action: Action, record: DomainRecord) -> Self {
        Self {
            topic,
            action,
            record,
            received_at: Utc::now(),
        }
    }

    pub fn is_insert(&self) -> bool {
        self.action == Action::Insert
    }
}

/// Title and body for an in-app banner.
#[derive(Clone, Debug, PartialEq)]
pub struct Banner {
    pub title: String,
    pub body: String,
    pub received: ReceivedRecord,
}

impl Banner {
    pub fn from_received(received: &ReceivedRecord) -> Self {
        let (title, body) = match &received.record {
            DomainRecord::Message(m) => {
                let body = match (m.message_type, &m.content) {
                    (_, Some(text)) if !text.is_empty() => text.clone(),
                    (MessageType::Image, _) => "Sent a photo".to_string(),
                    _ => "New message".to_string(),
                };
                ("New message".to_string(), body)
            }
            DomainRecord::OrderStatusChange(o) => (
                "Order update".to_string(),
                format!("Order {} {}", o.order_id, o.status.describe()),
            ),
            DomainRecord::Notification(n) => (n.title.clone(), n.body.clone()),
        };

        Self {
            title,
            body,
            received: received.clone(),
        }
    }
}
