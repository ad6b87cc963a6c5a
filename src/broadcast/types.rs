//! Event bus types.

use crate::records::ReceivedRecord;
use crate::types::{RecordKind, UnreadScope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named channels on the process-wide bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusTopic {
    UnreadCountChanged,
    RecordReceived,
}

impl BusTopic {
    pub fn as_str(self) -> &'static str {
        match self {
            BusTopic::UnreadCountChanged => "unread-count-changed",
            BusTopic::RecordReceived => "record-received",
        }
    }
}

impl fmt::Display for BusTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter criteria for bus subscriptions.
#[derive(Clone, Debug, Default)]
pub struct BusFilter {
    /// Bus topics to receive (None = all).
    pub topics: Option<Vec<BusTopic>>,

    /// Record kinds to receive on `record-received` (None = all).
    pub record_kinds: Option<Vec<RecordKind>>,

    /// Unread scopes to receive on `unread-count-changed` (None = all).
    pub scopes: Option<Vec<UnreadScope>>,
}

impl BusFilter {
    /// Everything published on the bus.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn topics(topics: Vec<BusTopic>) -> Self {
        Self {
            topics: Some(topics),
            ..Default::default()
        }
    }

    /// Only counter changes, optionally for one scope.
    pub fn unread_counts(scope: Option<UnreadScope>) -> Self {
        Self {
            topics: Some(vec![BusTopic::UnreadCountChanged]),
            scopes: scope.map(|s| vec![s]),
            ..Default::default()
        }
    }

    /// Every received record.
    pub fn records() -> Self {
        Self::topics(vec![BusTopic::RecordReceived])
    }

    /// Only received records of the given kinds.
    pub fn record_kinds(kinds: Vec<RecordKind>) -> Self {
        Self {
            topics: Some(vec![BusTopic::RecordReceived]),
            record_kinds: Some(kinds),
            ..Default::default()
        }
    }

    pub(crate) fn matches(&self, event: &BusEvent) -> bool {
        let Some(topic) = event.topic() else {
            // Lifecycle events go to everyone.
            return true;
        };

        if let Some(ref topics) = self.topics {
            if !topics.contains(&topic) {
                return false;
            }
        }

        match event {
            BusEvent::RecordReceived { received } => self
                .record_kinds
                .as_ref()
                .map_or(true, |kinds| kinds.contains(&received.record.kind())),
            BusEvent::UnreadCountChanged { scope, .. } => self
                .scopes
                .as_ref()
                .map_or(true, |scopes| scopes.contains(scope)),
            BusEvent::Dropped { .. } => true,
        }
    }
}

/// Events published on the bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BusEvent {
    /// An unread counter took a new value.
    UnreadCountChanged { scope: UnreadScope, count: u64 },

    /// A record arrived and was accepted.
    RecordReceived { received: ReceivedRecord },

    /// This bus subscription was ended.
    Dropped { reason: DropReason },
}

impl BusEvent {
    pub fn topic(&self) -> Option<BusTopic> {
        match self {
            BusEvent::UnreadCountChanged { .. } => Some(BusTopic::UnreadCountChanged),
            BusEvent::RecordReceived { .. } => Some(BusTopic::RecordReceived),
            BusEvent::Dropped { .. } => None,
        }
    }
}

/// Why a bus subscription was ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Explicitly unsubscribed.
    Unsubscribed,
    /// The bus was shut down.
    Closed,
}

/// Unique identifier for a bus subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BusSubscriptionId(pub u64);

/// Receiving end of a bus subscription.
pub struct BusReceiver {
    pub id: BusSubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<BusEvent>,
}

impl BusReceiver {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<BusEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<BusEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<BusEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain whatever is queued right now.
    pub fn drain(&self) -> Vec<BusEvent> {
        self.receiver.try_iter().collect()
    }
}
