//! Unread counters per scope.
//!
//! One authoritative fetch replaces the value outright; inbound inserts and
//! read marks adjust it in between. All mutations go through one mutex so
//! increments from concurrent listeners are never lost, and every change is
//! announced on the bus as `unread-count-changed` while the lock is held,
//! so observers see values in mutation order.

use crate::broadcast::EventBus;
use crate::collaborators::DataRepository;
use crate::types::{UnreadScope, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Non-negative unread counts keyed by scope.
pub struct UnreadCounter {
    counts: Mutex<HashMap<UnreadScope, u64>>,
    bus: Arc<EventBus>,
}

impl UnreadCounter {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            bus,
        }
    }

    /// Current value; scopes never touched read as 0.
    pub fn get(&self, scope: UnreadScope) -> u64 {
        self.counts.lock().get(&scope).copied().unwrap_or(0)
    }

    /// Replace the value with the repository's count.
    ///
    /// On failure the last known value is kept and returned. The fetch runs
    /// without the lock held; whichever fetch finishes last wins.
    pub fn refresh(&self, repository: &dyn DataRepository, user: &UserId, scope: UnreadScope) -> u64 {
        match repository.fetch_unread_count(user, scope) {
            Ok(count) => {
                debug!(%scope, count, "refreshed unread count");
                self.set(scope, count)
            }
            Err(e) => {
                let kept = self.get(scope);
                warn!(%scope, error = %e, kept, "unread count refresh failed, keeping last value");
                kept
            }
        }
    }

    /// Overwrite the value.
    pub fn set(&self, scope: UnreadScope, count: u64) -> u64 {
        self.update(scope, |_| count)
    }

    /// Add one for an unread insert.
    pub fn increment(&self, scope: UnreadScope) -> u64 {
        self.update(scope, |current| current.saturating_add(1))
    }

    /// Everything in the scope was read.
    pub fn mark_all_read(&self, scope: UnreadScope) -> u64 {
        self.update(scope, |_| 0)
    }

    /// One item was read; never goes below zero.
    pub fn mark_one_read(&self, scope: UnreadScope) -> u64 {
        self.update(scope, |current| current.saturating_sub(1))
    }

    /// Subtract `n`, floored at zero.
    pub fn mark_many_read(&self, scope: UnreadScope, n: u64) -> u64 {
        self.update(scope, |current| current.saturating_sub(n))
    }

    /// Zero the scope at the end of a session.
    pub fn reset(&self, scope: UnreadScope) -> u64 {
        self.update(scope, |_| 0)
    }

    fn update<F>(&self, scope: UnreadScope, f: F) -> u64
    where
        F: FnOnce(u64) -> u64,
    {
        let mut counts = self.counts.lock();
        let current = counts.get(&scope).copied().unwrap_or(0);
        let next = f(current);
        counts.insert(scope, next);

        if next != current {
            self.bus.publish_unread(scope, next);
        }
        next
    }
}
