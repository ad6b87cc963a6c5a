//! One real-time subsystem: lifecycle, channels and delivery pipeline.

use super::kind::SubsystemKind;
use super::session::{ListenState, SessionState, StartOutcome};
use crate::broadcast::{
    ActiveFocus, BusFilter, BusReceiver, EventBroadcaster, EventBus, RealtimeDelegate,
};
use crate::collaborators::{AuthProvider, DataRepository, UiPresenter};
use crate::config::RealtimeConfig;
use crate::counter::UnreadCounter;
use crate::deeplink::{DeeplinkPayload, DeeplinkRouter, NavigationAction};
use crate::error::{RealtimeError, Result};
use crate::records::{DedupWindow, EventDecoder, ReceivedRecord};
use crate::subscriptions::{ChannelInfo, ChannelSink, SubscriptionRegistry};
use crate::transport::{TopicFilter, Transport};
use crate::types::{Action, InboundEvent, ReadTarget, Topic, UnreadScope, UserId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators and shared state every subsystem is built from.
#[derive(Clone)]
pub struct RealtimeContext {
    pub config: RealtimeConfig,
    pub transport: Arc<dyn Transport>,
    pub auth: Arc<dyn AuthProvider>,
    pub repository: Arc<dyn DataRepository>,
    pub presenter: Arc<dyn UiPresenter>,
    pub bus: Arc<EventBus>,
    pub counter: Arc<UnreadCounter>,
    pub focus: Arc<ActiveFocus>,
}

impl RealtimeContext {
    /// Wire up a fresh bus, counter and focus around the collaborators.
    pub fn new(
        config: RealtimeConfig,
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthProvider>,
        repository: Arc<dyn DataRepository>,
        presenter: Arc<dyn UiPresenter>,
    ) -> Self {
        let bus = Arc::new(EventBus::with_buffer_size(config.bus_buffer_size));
        let counter = Arc::new(UnreadCounter::new(Arc::clone(&bus)));
        Self {
            config,
            transport,
            auth,
            repository,
            presenter,
            bus,
            counter,
            focus: Arc::new(ActiveFocus::new()),
        }
    }
}

/// Decode, dedup and publish: what each listener does with an event.
struct Dispatcher {
    kind: SubsystemKind,
    decoder: EventDecoder,
    dedup: DedupWindow,
    broadcaster: Arc<EventBroadcaster>,
}

impl ChannelSink for Dispatcher {
    fn filter_for(&self, topic: &Topic) -> TopicFilter {
        self.kind.filter_for(topic)
    }

    fn deliver(&self, topic: &Topic, event: InboundEvent) {
        let record = match self.decoder.decode(&event.payload, self.kind.record_kind()) {
            Ok(record) => record,
            Err(e) => {
                warn!(subsystem = %self.kind, %topic, error = %e, "dropping undecodable event");
                return;
            }
        };

        if event.action == Action::Insert && !self.dedup.first_sighting(record.kind(), record.id()) {
            debug!(subsystem = %self.kind, %topic, id = record.id(), "dropping duplicate insert");
            return;
        }

        let received = ReceivedRecord::new(topic.clone(), event.action, record);
        let outcome = self.broadcaster.publish(&received);
        debug!(subsystem = %self.kind, %topic, ?outcome, "delivered");
    }
}

/// A real-time subsystem bound to at most one signed-in user at a time.
///
/// `start_listening` and `stop_listening` are idempotent. Between them the
/// subsystem holds one channel per topic, keeps its unread scopes current
/// and fans each accepted record out to delegate, bus and banner.
pub struct RealtimeService {
    kind: SubsystemKind,
    auth: Arc<dyn AuthProvider>,
    repository: Arc<dyn DataRepository>,
    presenter: Arc<dyn UiPresenter>,
    bus: Arc<EventBus>,
    counter: Arc<UnreadCounter>,
    focus: Arc<ActiveFocus>,
    session: Arc<SessionState>,
    /// Serializes start/stop.
    state: Mutex<ListenState>,
    /// Mirrors `state` for calls that must not wait on a start/stop.
    listening: AtomicBool,
    dispatcher: Arc<Dispatcher>,
    registry: SubscriptionRegistry,
    router: DeeplinkRouter,
}

impl RealtimeService {
    pub fn new(kind: SubsystemKind, context: &RealtimeContext) -> Self {
        let session = Arc::new(SessionState::new());
        let broadcaster = Arc::new(EventBroadcaster::new(
            Arc::clone(&context.counter),
            Arc::clone(&context.bus),
            Arc::clone(&context.presenter),
            Arc::clone(&context.focus),
            Arc::clone(&session),
        ));
        let dispatcher = Arc::new(Dispatcher {
            kind,
            decoder: EventDecoder::new(),
            dedup: DedupWindow::new(context.config.dedup_window),
            broadcaster,
        });
        let registry = SubscriptionRegistry::with_thread_prefix(
            Arc::clone(&context.transport),
            dispatcher.clone(),
            format!("{}-{}", context.config.thread_name_prefix, kind),
        );

        Self {
            kind,
            auth: Arc::clone(&context.auth),
            repository: Arc::clone(&context.repository),
            presenter: Arc::clone(&context.presenter),
            bus: Arc::clone(&context.bus),
            counter: Arc::clone(&context.counter),
            focus: Arc::clone(&context.focus),
            session,
            state: Mutex::new(ListenState::Idle),
            listening: AtomicBool::new(false),
            dispatcher,
            registry,
            router: DeeplinkRouter::new(),
        }
    }

    pub fn chat(context: &RealtimeContext) -> Self {
        Self::new(SubsystemKind::Chat, context)
    }

    pub fn orders(context: &RealtimeContext) -> Self {
        Self::new(SubsystemKind::Orders, context)
    }

    pub fn notifications(context: &RealtimeContext) -> Self {
        Self::new(SubsystemKind::Notifications, context)
    }

    // --- Lifecycle ---

    /// Begin listening for the signed-in user.
    ///
    /// Unread scopes are refreshed before any channel is opened. Without a
    /// signed-in user the subsystem stays idle.
    pub fn start_listening(&self) -> StartOutcome {
        let mut state = self.state.lock();
        if *state == ListenState::Listening {
            debug!(subsystem = %self.kind, "already listening");
            return StartOutcome::AlreadyListening;
        }

        let user = match self.auth.current_identity() {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(subsystem = %self.kind, error = %RealtimeError::AuthRequired, "not starting");
                return StartOutcome::Unauthenticated;
            }
            Err(e) => {
                warn!(subsystem = %self.kind, error = %e, "identity lookup failed, not starting");
                return StartOutcome::Unauthenticated;
            }
        };

        self.session.set(Some(user.clone()));
        *state = ListenState::Listening;
        self.listening.store(true, Ordering::SeqCst);

        for scope in self.kind.scopes() {
            self.counter.refresh(self.repository.as_ref(), &user, *scope);
        }

        let mut topics = vec![Topic::UserGlobal(user.clone())];
        if self.kind.fetches_initial_topics() {
            match self.repository.fetch_initial_topics(&user, self.kind) {
                Ok(initial) => topics.extend(initial),
                Err(e) => {
                    warn!(subsystem = %self.kind, error = %e, "could not fetch initial topics")
                }
            }
        }

        for topic in topics {
            if let Err(e) = self.registry.subscribe(topic.clone()) {
                warn!(subsystem = %self.kind, %topic, error = %e, "subscribe failed");
            }
        }

        info!(
            subsystem = %self.kind,
            user = %user,
            channels = self.registry.len(),
            "listening"
        );
        StartOutcome::Started
    }

    /// Stop listening: close every channel, forget the user, zero the
    /// subsystem's unread scopes. Returns false if it was already idle.
    ///
    /// Once this returns no listener of this subsystem delivers anything.
    pub fn stop_listening(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ListenState::Idle {
            return false;
        }

        self.listening.store(false, Ordering::SeqCst);
        if let Err(e) = self.registry.unsubscribe_all() {
            warn!(subsystem = %self.kind, error = %e, "transport close failed while stopping");
        }

        self.session.set(None);
        self.dispatcher.dedup.clear();
        for scope in self.kind.scopes() {
            self.counter.reset(*scope);
        }

        *state = ListenState::Idle;
        info!(subsystem = %self.kind, "stopped listening");
        true
    }

    pub fn state(&self) -> ListenState {
        *self.state.lock()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub fn identity(&self) -> Option<UserId> {
        self.session.identity()
    }

    pub fn kind(&self) -> SubsystemKind {
        self.kind
    }

    // --- Screen-scoped topics ---

    /// Open a channel for a screen, e.g. an open conversation or a viewed
    /// order. Requires an active session.
    pub fn subscribe_to_topic(&self, topic: Topic) -> Result<ChannelInfo> {
        if !self.is_listening() {
            return Err(RealtimeError::AuthRequired);
        }

        let info = self.registry.subscribe(topic.clone())?;

        // Lost a race with stop_listening: don't outlive the session.
        if !self.is_listening() {
            if let Err(e) = self.registry.unsubscribe(&topic) {
                warn!(
                    subsystem = %self.kind,
                    %topic,
                    error = %e,
                    "transport close failed after stop"
                );
            }
            return Err(RealtimeError::AuthRequired);
        }
        Ok(info)
    }

    /// Close a screen's channel. Returns false if none was open.
    pub fn unsubscribe_from_topic(&self, topic: &Topic) -> Result<bool> {
        self.registry.unsubscribe(topic)
    }

    pub fn subscribed_topics(&self) -> Vec<Topic> {
        self.registry.topics()
    }

    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.registry.contains(topic)
    }

    pub fn channel_count(&self) -> usize {
        self.registry.len()
    }

    // --- Unread state ---

    pub fn current_unread_count(&self, scope: UnreadScope) -> u64 {
        self.counter.get(scope)
    }

    /// Re-fetch a scope's authoritative count.
    pub fn refresh_unread(&self, scope: UnreadScope) -> Result<u64> {
        let user = self.session.identity().ok_or(RealtimeError::AuthRequired)?;
        Ok(self.counter.refresh(self.repository.as_ref(), &user, scope))
    }

    /// Persist read state, then adjust the local count.
    ///
    /// If the repository refuses, the count is left alone.
    pub fn mark_read(&self, scope: UnreadScope, target: ReadTarget) -> Result<u64> {
        let user = self.session.identity().ok_or(RealtimeError::AuthRequired)?;

        if let Err(e) = self.repository.mark_read(&user, scope, &target) {
            warn!(subsystem = %self.kind, %scope, error = %e, "mark read failed");
            return Err(e);
        }

        let count = match target {
            ReadTarget::All => self.counter.mark_all_read(scope),
            ReadTarget::One(_) => self.counter.mark_one_read(scope),
            // Unknown how many were unread there; ask.
            ReadTarget::Conversation(_) => {
                self.counter.refresh(self.repository.as_ref(), &user, scope)
            }
        };
        Ok(count)
    }

    // --- Fan-out ---

    /// Register the screen delegate, replacing any previous one.
    pub fn set_delegate(&self, delegate: Option<Arc<dyn RealtimeDelegate>>) {
        self.dispatcher.broadcaster.set_delegate(delegate);
    }

    pub fn set_active_focus(&self, topic: Option<Topic>) {
        self.focus.set(topic);
    }

    pub fn active_focus(&self) -> Option<Topic> {
        self.focus.get()
    }

    pub fn subscribe_events(&self, filter: BusFilter) -> BusReceiver {
        self.bus.subscribe(filter)
    }

    // --- Navigation ---

    /// Follow a deeplink. Unknown routes are logged and ignored.
    pub fn open_deeplink(&self, payload: &DeeplinkPayload) -> Option<NavigationAction> {
        self.router.route(payload, self.presenter.as_ref())
    }

    /// Navigate to whatever a tapped record points at.
    pub fn handle_tap(&self, received: &ReceivedRecord) -> Option<NavigationAction> {
        match self.router.for_record(&received.record) {
            Ok(action) => {
                self.presenter.navigate(&action);
                Some(action)
            }
            Err(e) => {
                warn!(subsystem = %self.kind, error = %e, "tap leads nowhere");
                None
            }
        }
    }
}

impl Drop for RealtimeService {
    fn drop(&mut self) {
        self.stop_listening();
    }
}
