//! The push-feed transport the registry subscribes through.
//!
//! The production transport lives outside this crate. [`LocalTransport`]
//! is an in-process loopback with the same contract, for offline
//! development and tests.

mod local;

pub use local::LocalTransport;

use crate::error::Result;
use crate::types::{InboundEvent, RecordKind, Topic};
use crossbeam_channel::Receiver;
use serde_json::{Map, Value};
use std::fmt;

/// Identifies an open transport subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransportHandle(pub u64);

/// Row filter a subscription is opened with: `source.field = value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopicFilter {
    pub source: RecordKind,
    pub field: &'static str,
    pub value: String,
}

impl TopicFilter {
    pub fn new(source: RecordKind, field: &'static str, value: impl Into<String>) -> Self {
        Self {
            source,
            field,
            value: value.into(),
        }
    }

    /// Whether a row from `source` passes this filter.
    pub fn matches(&self, source: RecordKind, row: &Map<String, Value>) -> bool {
        if source != self.source {
            return false;
        }
        match row.get(self.field) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Number(n)) => n.to_string() == self.value,
            _ => false,
        }
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}=eq.{}", self.source.source(), self.field, self.value)
    }
}

/// An open subscription: its handle and the stream of pushed events.
pub struct TransportSubscription {
    pub handle: TransportHandle,
    pub events: Receiver<InboundEvent>,
}

/// Push-feed transport.
///
/// Delivery is at-least-once with no ordering across topics. The event
/// stream ends (the receiver disconnects) when the transport drops the
/// subscription.
pub trait Transport: Send + Sync {
    fn open_subscription(&self, topic: &Topic, filter: &TopicFilter)
        -> Result<TransportSubscription>;

    fn close_subscription(&self, handle: TransportHandle) -> Result<()>;
}
