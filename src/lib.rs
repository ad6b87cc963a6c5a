//! # Marketplace Realtime
//!
//! Push-based delivery of chat messages, order status changes and
//! notifications to a signed-in user.
//!
//! ## Core Concepts
//!
//! - **Topics**: A conversation, an order, or a user's own stream
//! - **Channels**: One live transport subscription and listener per topic
//! - **Records**: Pushed payloads decoded into typed domain records
//! - **Fan-out**: Delegate callback, event bus, in-app banner
//! - **Unread counts**: Per-scope counters kept in step with the server
//!
//! ## Example
//!
//! ```ignore
//! use marketplace_realtime::{RealtimeConfig, RealtimeContext, RealtimeService, Topic};
//!
//! let context = RealtimeContext::new(
//!     RealtimeConfig::default(),
//!     transport,
//!     auth,
//!     repository,
//!     presenter,
//! );
//!
//! let orders = RealtimeService::orders(&context);
//! orders.start_listening();
//!
//! // Order screen opened
//! orders.subscribe_to_topic(Topic::order("o-42"))?;
//! orders.set_delegate(Some(Arc::new(|received: &ReceivedRecord| {
//!     println!("{}", received.record.id());
//! })));
//! ```

pub mod broadcast;
pub mod collaborators;
pub mod config;
pub mod counter;
pub mod deeplink;
pub mod error;
pub mod records;
pub mod service;
pub mod subscriptions;
pub mod transport;
pub mod types;

// Re-exports
pub use broadcast::{
    ActiveFocus, BusEvent, BusFilter, BusReceiver, BusSubscriptionId, BusTopic, DropReason,
    EventBroadcaster, EventBus, PublishOutcome, RealtimeDelegate,
};
pub use collaborators::{AuthProvider, DataRepository, NoopPresenter, UiPresenter};
pub use config::RealtimeConfig;
pub use counter::UnreadCounter;
pub use deeplink::{DeeplinkPayload, DeeplinkRouter, NavigationAction};
pub use error::{DecodeError, RealtimeError, Result};
pub use records::{
    Banner, DedupWindow, DomainRecord, EventDecoder, Message, MessageType, Notification,
    OrderStatus, OrderStatusChange, ReceivedRecord,
};
pub use service::{
    ListenState, RealtimeContext, RealtimeHub, RealtimeService, SessionState, StartOutcome,
    SubsystemKind,
};
pub use subscriptions::{ChannelId, ChannelInfo, ChannelSink, SubscriptionRegistry};
pub use transport::{LocalTransport, TopicFilter, Transport, TransportHandle, TransportSubscription};
pub use types::*;
