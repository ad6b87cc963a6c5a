//! Fan-out of received records.
//!
//! Every accepted record goes, in one logical turn, to:
//! - the subsystem's delegate callback, if one is registered
//! - the process-wide [`EventBus`] (`record-received`)
//! - an in-app banner for new messages, new notifications and order
//!   status changes, unless the record's topic is on screen
//!
//! Counter changes are published on the same bus as
//! `unread-count-changed`.
//!
//! # Example
//!
//! ```ignore
//! let receiver = bus.subscribe(BusFilter::unread_counts(Some(UnreadScope::Chat)));
//!
//! loop {
//!     match receiver.recv() {
//!         Ok(BusEvent::UnreadCountChanged { count, .. }) => badge.set(count),
//!         Ok(BusEvent::Dropped { .. }) | Err(_) => break,
//!         Ok(_) => {}
//!     }
//! }
//! ```

mod broadcaster;
mod bus;
mod types;

pub use broadcaster::{ActiveFocus, EventBroadcaster, PublishOutcome, RealtimeDelegate};
pub use bus::EventBus;
pub use types::{BusEvent, BusFilter, BusReceiver, BusSubscriptionId, BusTopic, DropReason};
