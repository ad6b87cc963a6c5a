//! Decoding of loosely-structured payloads into domain records.
//!
//! Every field is declared explicitly as required or optional-with-default.
//! Optional fields that are absent, null, or of an unexpected type take
//! their default; required fields that are absent or unusable reject the
//! whole event.

use super::types::{DomainRecord, Message, MessageType, Notification, OrderStatus, OrderStatusChange};
use crate::deeplink::DeeplinkPayload;
use crate::error::DecodeError;
use crate::types::{ConversationId, OrderId, RecordKind, UserId};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::trace;

/// Relaxed layouts tried after strict RFC 3339, with an explicit offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
];

/// Relaxed layouts without an offset; read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Stateless payload decoder.
#[derive(Clone, Debug, Default)]
pub struct EventDecoder;

impl EventDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a payload as the given record kind.
    pub fn decode(
        &self,
        payload: &Map<String, Value>,
        kind: RecordKind,
    ) -> Result<DomainRecord, DecodeError> {
        let fields = Fields::new(kind, payload);
        match kind {
            RecordKind::Message => decode_message(&fields).map(DomainRecord::Message),
            RecordKind::OrderStatusChange => {
                decode_order_status(&fields).map(DomainRecord::OrderStatusChange)
            }
            RecordKind::Notification => {
                decode_notification(&fields).map(DomainRecord::Notification)
            }
        }
    }
}

fn decode_message(fields: &Fields<'_>) -> Result<Message, DecodeError> {
    Ok(Message {
        id: fields.required_id("id")?,
        conversation_id: ConversationId(fields.required_id("conversation_id")?),
        sender_id: UserId(fields.required_id("sender_id")?),
        receiver_id: fields.optional_id("receiver_id").map(UserId),
        message_type: fields
            .optional_str("message_type")
            .map(|t| MessageType::parse(&t))
            .unwrap_or_default(),
        content: fields.optional_str("content"),
        image_url: fields.optional_str("image_url"),
        is_read: fields.bool_or("is_read", false),
        created_at: fields.time(&["created_at"]),
    })
}

fn decode_order_status(fields: &Fields<'_>) -> Result<OrderStatusChange, DecodeError> {
    let order_id = match fields.optional_id("order_id") {
        Some(id) => id,
        None => fields.required_id("id")?,
    };

    Ok(OrderStatusChange {
        order_id: OrderId(order_id),
        status: OrderStatus::from(fields.required_str("status")?),
        previous_status: fields
            .optional_str("previous_status")
            .map(OrderStatus::from),
        buyer_id: fields.optional_id("buyer_id").map(UserId),
        seller_id: fields.optional_id("seller_id").map(UserId),
        updated_by: fields.optional_id("updated_by").map(UserId),
        updated_at: fields.time(&["updated_at", "created_at"]),
    })
}

fn decode_notification(fields: &Fields<'_>) -> Result<Notification, DecodeError> {
    // The route may be nested under `data` or sit at the top level.
    let deeplink = fields
        .nested("data")
        .and_then(|data| deeplink_from(&data))
        .or_else(|| deeplink_from(fields));

    Ok(Notification {
        id: fields.required_id("id")?,
        user_id: UserId(fields.required_id("user_id")?),
        kind: fields
            .optional_str("kind")
            .or_else(|| fields.optional_str("type"))
            .unwrap_or_else(|| "general".to_string()),
        title: fields.optional_str("title").unwrap_or_default(),
        body: fields.optional_str("body").unwrap_or_default(),
        actor_id: fields.optional_id("actor_id").map(UserId),
        deeplink,
        is_read: fields.bool_or("is_read", false),
        created_at: fields.time(&["created_at"]),
    })
}

fn deeplink_from(fields: &Fields<'_>) -> Option<DeeplinkPayload> {
    let route = fields.optional_str("route")?;
    Some(DeeplinkPayload {
        route,
        order_id: fields
            .optional_id("order_id")
            .or_else(|| fields.optional_id("orderId"))
            .map(OrderId),
        seller_id: fields
            .optional_id("seller_id")
            .or_else(|| fields.optional_id("sellerId"))
            .map(UserId),
    })
}

/// Typed, per-field view over a payload map.
struct Fields<'a> {
    kind: RecordKind,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn new(kind: RecordKind, map: &'a Map<String, Value>) -> Self {
        Self { kind, map }
    }

    /// Present and non-null.
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    fn nested(&self, name: &str) -> Option<Fields<'a>> {
        match self.get(name) {
            Some(Value::Object(map)) => Some(Fields::new(self.kind, map)),
            _ => None,
        }
    }

    fn required_id(&self, name: &'static str) -> Result<String, DecodeError> {
        let value = self.get(name).ok_or(DecodeError::MissingField {
            kind: self.kind,
            field: name,
        })?;
        id_from(value).ok_or_else(|| DecodeError::InvalidField {
            kind: self.kind,
            field: name,
            reason: format!("expected a non-empty string or integer id, got {value}"),
        })
    }

    fn optional_id(&self, name: &str) -> Option<String> {
        self.get(name).and_then(id_from)
    }

    fn required_str(&self, name: &'static str) -> Result<String, DecodeError> {
        match self.get(name) {
            None => Err(DecodeError::MissingField {
                kind: self.kind,
                field: name,
            }),
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(other) => Err(DecodeError::InvalidField {
                kind: self.kind,
                field: name,
                reason: format!("expected a non-empty string, got {other}"),
            }),
        }
    }

    fn optional_str(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                trace!(field = name, value = %other, "ignoring non-string optional field");
                None
            }
            None => None,
        }
    }

    fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(Value::Bool(b)) => *b,
            _ => default,
        }
    }

    /// First parseable time among `names`, or now.
    fn time(&self, names: &[&str]) -> DateTime<Utc> {
        for name in names {
            if let Some(value) = self.get(name) {
                if let Some(time) = timestamp_from_value(value) {
                    return time;
                }
                trace!(field = *name, value = %value, "unparseable timestamp");
            }
        }
        Utc::now()
    }
}

fn id_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a timestamp from a JSON string or Unix epoch number.
pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw.abs() >= EPOCH_MILLIS_THRESHOLD {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

/// Parse a timestamp string.
///
/// Tries strict RFC 3339 (fractional seconds allowed) first, then relaxed
/// layouts with a space separator or a short offset, then layouts without
/// any offset, which are read as UTC.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Some(time.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(time) = DateTime::parse_from_str(input, format) {
            return Some(time.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(time) = NaiveDateTime::parse_from_str(input, format) {
            return Some(time.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, Timelike};
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn test_image_message_without_content() {
        let decoder = EventDecoder::new();
        let record = decoder
            .decode(
                &payload(json!({
                    "id": "m1",
                    "conversation_id": "c1",
                    "sender_id": "seller",
                    "message_type": "image",
                    "image_url": "https://cdn.example/a.jpg",
                    "created_at": "2024-03-01T10:15:30.123456+00:00"
                })),
                RecordKind::Message,
            )
            .unwrap();

        match record {
            DomainRecord::Message(m) => {
                assert_eq!(m.message_type, MessageType::Image);
                assert_eq!(m.content, None);
                assert_eq!(m.created_at.nanosecond(), 123_456_000);
            }
            other => panic!("Expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_null_content_is_absent() {
        let decoder = EventDecoder::new();
        let record = decoder
            .decode(
                &payload(json!({
                    "id": 5,
                    "conversation_id": 9,
                    "sender_id": "u2",
                    "content": null
                })),
                RecordKind::Message,
            )
            .unwrap();

        match record {
            DomainRecord::Message(m) => {
                assert_eq!(m.id, "5");
                assert_eq!(m.conversation_id, ConversationId::new("9"));
                assert_eq!(m.content, None);
                assert_eq!(m.message_type, MessageType::Text);
                assert!(!m.is_read);
            }
            other => panic!("Expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_sender_is_error() {
        let decoder = EventDecoder::new();
        let result = decoder.decode(
            &payload(json!({"id": "m1", "conversation_id": "c1", "content": "hi"})),
            RecordKind::Message,
        );
        assert_eq!(
            result,
            Err(DecodeError::MissingField {
                kind: RecordKind::Message,
                field: "sender_id"
            })
        );
    }

    #[test]
    fn test_invalid_required_id() {
        let decoder = EventDecoder::new();
        let result = decoder.decode(
            &payload(json!({"id": {"nested": true}, "user_id": "u1"})),
            RecordKind::Notification,
        );
        assert!(matches!(
            result,
            Err(DecodeError::InvalidField { field: "id", .. })
        ));
    }

    #[test]
    fn test_order_status_change() {
        let decoder = EventDecoder::new();
        let record = decoder
            .decode(
                &payload(json!({
                    "id": "o-7",
                    "status": "shipped",
                    "previous_status": "paid",
                    "seller_id": "s1",
                    "updated_at": "2024-03-01 10:15:30+09"
                })),
                RecordKind::OrderStatusChange,
            )
            .unwrap();

        match record {
            DomainRecord::OrderStatusChange(o) => {
                assert_eq!(o.order_id, OrderId::new("o-7"));
                assert_eq!(o.status, OrderStatus::Shipped);
                assert_eq!(o.previous_status, Some(OrderStatus::Paid));
                assert_eq!(o.updated_at.hour(), 1);
            }
            other => panic!("Expected order status change, got {:?}", other),
        }
    }

    #[test]
    fn test_order_without_status_is_error() {
        let decoder = EventDecoder::new();
        let result = decoder.decode(&payload(json!({"id": "o-7"})), RecordKind::OrderStatusChange);
        assert!(matches!(
            result,
            Err(DecodeError::MissingField { field: "status", .. })
        ));
    }

    #[test]
    fn test_notification_nested_deeplink() {
        let decoder = EventDecoder::new();
        let record = decoder
            .decode(
                &payload(json!({
                    "id": "n1",
                    "user_id": "buyer",
                    "title": "Your order shipped",
                    "data": {"route": "order_detail", "orderId": "o-7"}
                })),
                RecordKind::Notification,
            )
            .unwrap();

        match record {
            DomainRecord::Notification(n) => {
                assert_eq!(n.kind, "general");
                assert_eq!(n.body, "");
                let link = n.deeplink.unwrap();
                assert_eq!(link.route, "order_detail");
                assert_eq!(link.order_id, Some(OrderId::new("o-7")));
            }
            other => panic!("Expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_notification_flat_deeplink() {
        let decoder = EventDecoder::new();
        let record = decoder
            .decode(
                &payload(json!({
                    "id": "n2",
                    "user_id": "buyer",
                    "route": "seller_profile",
                    "seller_id": 12
                })),
                RecordKind::Notification,
            )
            .unwrap();

        match record {
            DomainRecord::Notification(n) => {
                let link = n.deeplink.unwrap();
                assert_eq!(link.seller_id, Some(UserId::new("12")));
            }
            other => panic!("Expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let strict = parse_timestamp("2024-03-01T10:15:30.5Z").unwrap();
        assert_eq!(strict.second(), 30);

        let no_fraction = parse_timestamp("2024-03-01T10:15:30+00:00").unwrap();
        assert_eq!(no_fraction.minute(), 15);

        let space = parse_timestamp("2024-03-01 10:15:30.123").unwrap();
        assert_eq!(space.day(), 1);

        let naive = parse_timestamp("2024-03-01T10:15:30").unwrap();
        assert_eq!(naive.hour(), 10);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_epoch_timestamps() {
        let seconds = timestamp_from_value(&json!(1_700_000_000)).unwrap();
        let millis = timestamp_from_value(&json!(1_700_000_000_000_i64)).unwrap();
        assert_eq!(seconds, millis);
    }

    #[test]
    fn test_bad_time_falls_back_to_now() {
        let decoder = EventDecoder::new();
        let before = Utc::now() - Duration::seconds(1);
        let record = decoder
            .decode(
                &payload(json!({
                    "id": "n1",
                    "user_id": "u1",
                    "created_at": "not a time"
                })),
                RecordKind::Notification,
            )
            .unwrap();
        assert!(record.timestamp() >= before);
    }
}
