//! Session identity and listening state.

use crate::types::UserId;
use parking_lot::RwLock;

/// Whether a subsystem is currently listening.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ListenState {
    #[default]
    Idle,
    Listening,
}

/// What a `start_listening` call decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// Went from idle to listening.
    Started,
    /// Was already listening; nothing done.
    AlreadyListening,
    /// No signed-in user; stayed idle.
    Unauthenticated,
}

/// The identity a subsystem is listening for, if any.
#[derive(Default)]
pub struct SessionState {
    identity: RwLock<Option<UserId>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<UserId> {
        self.identity.read().clone()
    }

    pub fn set(&self, identity: Option<UserId>) {
        *self.identity.write() = identity;
    }
}
