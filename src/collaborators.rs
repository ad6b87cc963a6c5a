//! Interfaces of the collaborators the real-time layer relies on.
//!
//! Implementations live in the app: auth session handling, the REST
//! repository, and the UI shell.

use crate::deeplink::NavigationAction;
use crate::error::Result;
use crate::records::Banner;
use crate::service::SubsystemKind;
use crate::types::{ReadTarget, Topic, UnreadScope, UserId};

/// Resolves the signed-in user.
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` when nobody is signed in. May need a network round-trip.
    fn current_identity(&self) -> Result<Option<UserId>>;
}

/// Request/response data access.
pub trait DataRepository: Send + Sync {
    /// Topics a subsystem should be listening to from the start, such as
    /// the user's existing conversations.
    fn fetch_initial_topics(&self, user: &UserId, kind: SubsystemKind) -> Result<Vec<Topic>>;

    /// Authoritative unread count for a scope.
    fn fetch_unread_count(&self, user: &UserId, scope: UnreadScope) -> Result<u64>;

    /// Persist read state.
    fn mark_read(&self, user: &UserId, scope: UnreadScope, target: &ReadTarget) -> Result<()>;
}

/// The UI shell.
pub trait UiPresenter: Send + Sync {
    fn show_banner(&self, banner: &Banner);

    fn navigate(&self, action: &NavigationAction);
}

/// Presenter that ignores every request, for headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPresenter;

impl UiPresenter for NoopPresenter {
    fn show_banner(&self, _banner: &Banner) {}

    fn navigate(&self, _action: &NavigationAction) {}
}
