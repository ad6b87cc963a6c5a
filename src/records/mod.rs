//! Domain records and how inbound payloads become them.

mod decoder;
mod dedup;
mod types;

pub use decoder::{parse_timestamp, timestamp_from_value, EventDecoder};
pub use dedup::DedupWindow;
pub use types::{
    Banner, DomainRecord, Message, MessageType, Notification, OrderStatus, OrderStatusChange,
    ReceivedRecord,
};
