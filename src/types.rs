//! Core types shared by every part of the real-time layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }
    };
}

string_id!(
    /// The signed-in user. Every topic is scoped to exactly one of these.
    UserId
);
string_id!(
    /// A chat conversation between a buyer and a seller.
    ConversationId
);
string_id!(
    /// A marketplace order.
    OrderId
);

/// A subscription scope.
///
/// Compared structurally: two `Topic::Order` values with the same id are
/// the same topic and may only ever be backed by one channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Topic {
    Conversation(ConversationId),
    Order(OrderId),
    UserGlobal(UserId),
}

impl Topic {
    pub fn conversation(id: impl Into<ConversationId>) -> Self {
        Topic::Conversation(id.into())
    }

    pub fn order(id: impl Into<OrderId>) -> Self {
        Topic::Order(id.into())
    }

    pub fn user_global(id: impl Into<UserId>) -> Self {
        Topic::UserGlobal(id.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Conversation(id) => write!(f, "conversation:{id}"),
            Topic::Order(id) => write!(f, "order:{id}"),
            Topic::UserGlobal(id) => write!(f, "user:{id}"),
        }
    }
}

/// What happened to the row behind an inbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Insert,
    Update,
}

/// A raw push from the transport, before decoding.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    pub topic: Topic,
    pub action: Action,
    /// Loosely-structured column map as the feed delivered it.
    pub payload: Map<String, Value>,
}

impl InboundEvent {
    pub fn new(topic: Topic, action: Action, payload: Map<String, Value>) -> Self {
        Self {
            topic,
            action,
            payload,
        }
    }

    /// Build an event from a JSON value; anything but an object yields an
    /// empty payload, which the decoder then rejects.
    pub fn from_json(topic: Topic, action: Action, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(topic, action, payload)
    }
}

/// The typed record a payload is decoded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Message,
    OrderStatusChange,
    Notification,
}

impl RecordKind {
    /// Name of the remote table the records come from.
    pub fn source(self) -> &'static str {
        match self {
            RecordKind::Message => "messages",
            RecordKind::OrderStatusChange => "orders",
            RecordKind::Notification => "notifications",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Message => "message",
            RecordKind::OrderStatusChange => "order status change",
            RecordKind::Notification => "notification",
        };
        f.write_str(name)
    }
}

/// A counted unread domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreadScope {
    Chat,
    Notifications,
}

impl fmt::Display for UnreadScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnreadScope::Chat => f.write_str("chat"),
            UnreadScope::Notifications => f.write_str("notifications"),
        }
    }
}

/// What a mark-read call applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadTarget {
    /// Everything in the scope.
    All,
    /// A single record, by id.
    One(String),
    /// Every message of one conversation.
    Conversation(ConversationId),
}
