//! Channel types.

use crate::transport::{TopicFilter, TransportHandle};
use crate::types::{InboundEvent, Topic};
use std::fmt;

/// Unique identifier for a channel. A topic that is unsubscribed and
/// subscribed again gets a new one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

/// Snapshot of a tracked channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub topic: Topic,
    pub handle: TransportHandle,
    /// False when `subscribe` found the channel already open.
    pub created: bool,
}

/// Where a registry's listeners send their events.
pub trait ChannelSink: Send + Sync {
    /// Transport filter for a topic.
    fn filter_for(&self, topic: &Topic) -> TopicFilter;

    /// Handle one pushed event. Runs on the topic's listener thread.
    fn deliver(&self, topic: &Topic, event: InboundEvent);
}
