//! The three subsystems side by side.

use super::kind::SubsystemKind;
use super::realtime::{RealtimeContext, RealtimeService};
use super::session::StartOutcome;
use crate::broadcast::{BusFilter, BusReceiver, EventBus};
use crate::counter::UnreadCounter;
use crate::types::{Topic, UnreadScope};
use std::sync::Arc;
use tracing::info;

/// The chat, orders and notifications subsystems over one shared bus,
/// counter and focus.
pub struct RealtimeHub {
    context: RealtimeContext,
    chat: RealtimeService,
    orders: RealtimeService,
    notifications: RealtimeService,
}

impl RealtimeHub {
    pub fn new(context: RealtimeContext) -> Self {
        Self {
            chat: RealtimeService::chat(&context),
            orders: RealtimeService::orders(&context),
            notifications: RealtimeService::notifications(&context),
            context,
        }
    }

    pub fn chat(&self) -> &RealtimeService {
        &self.chat
    }

    pub fn orders(&self) -> &RealtimeService {
        &self.orders
    }

    pub fn notifications(&self) -> &RealtimeService {
        &self.notifications
    }

    pub fn service(&self, kind: SubsystemKind) -> &RealtimeService {
        match kind {
            SubsystemKind::Chat => &self.chat,
            SubsystemKind::Orders => &self.orders,
            SubsystemKind::Notifications => &self.notifications,
        }
    }

    /// Start every subsystem, e.g. right after sign-in.
    pub fn start_all(&self) -> Vec<(SubsystemKind, StartOutcome)> {
        let outcomes: Vec<_> = SubsystemKind::ALL
            .iter()
            .map(|kind| (*kind, self.service(*kind).start_listening()))
            .collect();
        info!(?outcomes, "realtime hub started");
        outcomes
    }

    /// Stop every subsystem, e.g. on sign-out. Returns how many were
    /// listening.
    pub fn stop_all(&self) -> usize {
        let stopped = SubsystemKind::ALL
            .iter()
            .filter(|kind| self.service(**kind).stop_listening())
            .count();
        info!(stopped, "realtime hub stopped");
        stopped
    }

    /// Stop everything and close the bus; each bus subscriber receives a
    /// final `Dropped` event. The hub is not meant to be started again.
    pub fn shutdown(&self) -> usize {
        let stopped = self.stop_all();
        self.context.bus.close();
        stopped
    }

    pub fn unread_count(&self, scope: UnreadScope) -> u64 {
        self.context.counter.get(scope)
    }

    /// The topic currently on screen, shared by every subsystem.
    pub fn set_active_focus(&self, topic: Option<Topic>) {
        self.context.focus.set(topic);
    }

    pub fn subscribe_events(&self, filter: BusFilter) -> BusReceiver {
        self.context.bus.subscribe(filter)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.context.bus
    }

    pub fn counter(&self) -> &Arc<UnreadCounter> {
        &self.context.counter
    }
}
