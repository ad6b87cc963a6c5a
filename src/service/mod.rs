//! Real-time subsystems.
//!
//! A [`RealtimeService`] ties the pieces together for one subsystem:
//! session identity, its channels, decoding and dedup of pushed events,
//! and fan-out through the broadcaster. [`RealtimeHub`] runs the chat,
//! orders and notifications subsystems side by side.
//!
//! # Example
//!
//! ```ignore
//! let context = RealtimeContext::new(config, transport, auth, repository, presenter);
//! let hub = RealtimeHub::new(context);
//!
//! hub.start_all();
//! hub.chat().subscribe_to_topic(Topic::conversation("c-9"))?;
//! hub.set_active_focus(Some(Topic::conversation("c-9")));
//!
//! // Sign-out
//! hub.stop_all();
//! ```

mod hub;
mod kind;
mod realtime;
mod session;

pub use hub::RealtimeHub;
pub use kind::SubsystemKind;
pub use realtime::{RealtimeContext, RealtimeService};
pub use session::{ListenState, SessionState, StartOutcome};
