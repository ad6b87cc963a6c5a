//! Live channels, one per topic.
//!
//! Each channel owns a transport subscription and a listener thread that
//! forwards pushed events to a [`ChannelSink`] in receipt order. Channels
//! are created on first subscribe and torn down individually or all at
//! once when the session ends. After `unsubscribe` or `unsubscribe_all`
//! returns, the affected listeners have stopped and deliver nothing more.
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriptionRegistry::new(transport, sink);
//!
//! let info = registry.subscribe(Topic::order("o-17"))?;
//! assert!(info.created);
//!
//! // Same topic again: no new channel.
//! assert!(!registry.subscribe(Topic::order("o-17"))?.created);
//!
//! registry.unsubscribe_all()?;
//! ```

mod registry;
mod types;

pub use registry::SubscriptionRegistry;
pub use types::{ChannelId, ChannelInfo, ChannelSink};
