//! Shared fakes and helpers for the integration tests.

#![allow(dead_code)]

use marketplace_realtime::{
    AuthProvider, Banner, DataRepository, LocalTransport, NavigationAction, ReadTarget,
    RealtimeConfig, RealtimeContext, RealtimeError, Result, SubsystemKind, Topic, UiPresenter,
    UnreadScope, UserId,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const ME: &str = "u-me";
pub const OTHER: &str = "u-other";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// --- Fakes ---

#[derive(Default)]
pub struct StaticAuth {
    identity: Mutex<Option<UserId>>,
    failing: AtomicBool,
}

impl StaticAuth {
    pub fn signed_in(user: &str) -> Self {
        let auth = Self::default();
        auth.sign_in(user);
        auth
    }

    pub fn sign_in(&self, user: &str) {
        *self.identity.lock() = Some(UserId::from(user));
    }

    pub fn sign_out(&self) {
        *self.identity.lock() = None;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl AuthProvider for StaticAuth {
    fn current_identity(&self) -> Result<Option<UserId>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RealtimeError::Auth("session expired".to_string()));
        }
        Ok(self.identity.lock().clone())
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    unread: Mutex<HashMap<UnreadScope, u64>>,
    initial_topics: Mutex<Vec<Topic>>,
    marked: Mutex<Vec<(UnreadScope, ReadTarget)>>,
    fail_counts: AtomicBool,
    fail_topics: AtomicBool,
    fail_mark_read: AtomicBool,
}

impl MemoryRepository {
    pub fn set_unread(&self, scope: UnreadScope, count: u64) {
        self.unread.lock().insert(scope, count);
    }

    pub fn set_initial_topics(&self, topics: Vec<Topic>) {
        *self.initial_topics.lock() = topics;
    }

    pub fn marked(&self) -> Vec<(UnreadScope, ReadTarget)> {
        self.marked.lock().clone()
    }

    pub fn fail_counts(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_topics(&self, fail: bool) {
        self.fail_topics.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mark_read(&self, fail: bool) {
        self.fail_mark_read.store(fail, Ordering::SeqCst);
    }
}

impl DataRepository for MemoryRepository {
    fn fetch_initial_topics(&self, _user: &UserId, kind: SubsystemKind) -> Result<Vec<Topic>> {
        if self.fail_topics.load(Ordering::SeqCst) {
            return Err(RealtimeError::Repository(format!("{kind} topics unavailable")));
        }
        Ok(self.initial_topics.lock().clone())
    }

    fn fetch_unread_count(&self, _user: &UserId, scope: UnreadScope) -> Result<u64> {
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(RealtimeError::Repository("503 from counts".to_string()));
        }
        Ok(self.unread.lock().get(&scope).copied().unwrap_or(0))
    }

    fn mark_read(&self, _user: &UserId, scope: UnreadScope, target: &ReadTarget) -> Result<()> {
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(RealtimeError::Repository("write rejected".to_string()));
        }
        let mut unread = self.unread.lock();
        let count = unread.entry(scope).or_insert(0);
        match target {
            ReadTarget::All => *count = 0,
            ReadTarget::One(_) => *count = count.saturating_sub(1),
            // Tests set the remaining count themselves.
            ReadTarget::Conversation(_) => {}
        }
        self.marked.lock().push((scope, target.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    banners: Mutex<Vec<Banner>>,
    navigations: Mutex<Vec<NavigationAction>>,
}

impl RecordingPresenter {
    pub fn banners(&self) -> Vec<Banner> {
        self.banners.lock().clone()
    }

    pub fn navigations(&self) -> Vec<NavigationAction> {
        self.navigations.lock().clone()
    }
}

impl UiPresenter for RecordingPresenter {
    fn show_banner(&self, banner: &Banner) {
        self.banners.lock().push(banner.clone());
    }

    fn navigate(&self, action: &NavigationAction) {
        self.navigations.lock().push(action.clone());
    }
}

// --- Harness ---

pub struct Harness {
    pub transport: Arc<LocalTransport>,
    pub auth: Arc<StaticAuth>,
    pub repository: Arc<MemoryRepository>,
    pub presenter: Arc<RecordingPresenter>,
    pub context: RealtimeContext,
}

impl Harness {
    pub fn signed_in() -> Self {
        Self::with_config(Some(ME), RealtimeConfig::default())
    }

    pub fn signed_out() -> Self {
        Self::with_config(None, RealtimeConfig::default())
    }

    pub fn with_config(user: Option<&str>, config: RealtimeConfig) -> Self {
        init_tracing();

        let transport = Arc::new(LocalTransport::new());
        let auth = Arc::new(match user {
            Some(user) => StaticAuth::signed_in(user),
            None => StaticAuth::default(),
        });
        let repository = Arc::new(MemoryRepository::default());
        let presenter = Arc::new(RecordingPresenter::default());

        let context = RealtimeContext::new(
            config,
            transport.clone(),
            auth.clone(),
            repository.clone(),
            presenter.clone(),
        );

        Self {
            transport,
            auth,
            repository,
            presenter,
            context,
        }
    }
}

// --- Rows ---

pub fn row(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub fn message_row(id: &str, conversation: &str, sender: &str, receiver: &str) -> Map<String, Value> {
    row(json!({
        "id": id,
        "conversation_id": conversation,
        "sender_id": sender,
        "receiver_id": receiver,
        "message_type": "text",
        "content": format!("message {id}"),
        "is_read": false,
        "created_at": "2024-05-01T09:30:00.000Z",
    }))
}

pub fn notification_row(id: &str, user: &str) -> Map<String, Value> {
    row(json!({
        "id": id,
        "user_id": user,
        "type": "order_shipped",
        "title": "Your order shipped",
        "body": "Tracking number available",
        "actor_id": OTHER,
        "created_at": "2024-05-01 09:30:00+00",
    }))
}

pub fn order_row(order: &str, buyer: &str, status: &str, updated_by: &str) -> Map<String, Value> {
    row(json!({
        "id": order,
        "buyer_id": buyer,
        "seller_id": OTHER,
        "status": status,
        "updated_by": updated_by,
        "updated_at": "2024-05-01T10:00:00Z",
    }))
}

// --- Waiting ---

/// Poll `condition` until it holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Give listeners time to process anything still queued.
pub fn settle() {
    thread::sleep(Duration::from_millis(50));
}
