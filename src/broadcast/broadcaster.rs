//! Fan-out of accepted records to delegate, bus and banner.

use super::bus::EventBus;
use crate::collaborators::UiPresenter;
use crate::counter::UnreadCounter;
use crate::records::{Banner, ReceivedRecord};
use crate::service::SessionState;
use crate::types::{RecordKind, Topic};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Callback registered by the screen that owns a subsystem.
pub trait RealtimeDelegate: Send + Sync {
    fn on_record(&self, received: &ReceivedRecord);
}

impl<F> RealtimeDelegate for F
where
    F: Fn(&ReceivedRecord) + Send + Sync,
{
    fn on_record(&self, received: &ReceivedRecord) {
        self(received)
    }
}

/// The topic currently on screen. Written by the UI only.
#[derive(Default)]
pub struct ActiveFocus {
    topic: RwLock<Option<Topic>>,
}

impl ActiveFocus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, topic: Option<Topic>) {
        *self.topic.write() = topic;
    }

    pub fn get(&self) -> Option<Topic> {
        self.topic.read().clone()
    }

    /// Whether a banner for `received` would duplicate what is on screen.
    pub fn covers(&self, received: &ReceivedRecord) -> bool {
        match &*self.topic.read() {
            Some(focus) => *focus == received.topic || *focus == received.record.subject_topic(),
            None => false,
        }
    }
}

/// What one publish did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// An unread counter was incremented.
    pub counted: bool,
    /// The delegate was called.
    pub delegated: bool,
    /// Bus subscribers that received the record.
    pub bus_deliveries: usize,
    /// A banner was requested.
    pub bannered: bool,
}

/// Fans accepted records out to every consumer of one subsystem.
pub struct EventBroadcaster {
    counter: Arc<UnreadCounter>,
    bus: Arc<EventBus>,
    presenter: Arc<dyn UiPresenter>,
    focus: Arc<ActiveFocus>,
    session: Arc<SessionState>,
    delegate: RwLock<Option<Arc<dyn RealtimeDelegate>>>,
}

impl EventBroadcaster {
    pub fn new(
        counter: Arc<UnreadCounter>,
        bus: Arc<EventBus>,
        presenter: Arc<dyn UiPresenter>,
        focus: Arc<ActiveFocus>,
        session: Arc<SessionState>,
    ) -> Self {
        Self {
            counter,
            bus,
            presenter,
            focus,
            session,
            delegate: RwLock::new(None),
        }
    }

    /// Install or remove the delegate. At most one is registered.
    pub fn set_delegate(&self, delegate: Option<Arc<dyn RealtimeDelegate>>) {
        *self.delegate.write() = delegate;
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.read().is_some()
    }

    /// Deliver one record.
    ///
    /// The counter is updated first; delegate, bus and banner follow in
    /// that order. Records arriving with no active session are ignored.
    pub fn publish(&self, received: &ReceivedRecord) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();

        let Some(me) = self.session.identity() else {
            debug!(topic = %received.topic, "no active session, ignoring record");
            return outcome;
        };
        let foreign = !received.record.is_authored_by(&me);

        if foreign && received.is_insert() {
            if let Some(scope) = received.record.unread_scope() {
                let count = self.counter.increment(scope);
                trace!(%scope, count, "counted unread insert");
                outcome.counted = true;
            }
        }

        // Clone out so the callback runs without the lock.
        let delegate = self.delegate.read().clone();
        if let Some(delegate) = delegate {
            delegate.on_record(received);
            outcome.delegated = true;
        }

        outcome.bus_deliveries = self.bus.publish_record(received);

        // Message and notification updates are read receipts and edits.
        let announces =
            received.is_insert() || received.record.kind() == RecordKind::OrderStatusChange;

        if foreign && announces && !self.focus.covers(received) {
            self.presenter.show_banner(&Banner::from_received(received));
            outcome.bannered = true;
        } else {
            trace!(topic = %received.topic, foreign, announces, "banner suppressed");
        }

        outcome
    }
}
