//! Error types for the real-time layer.

use crate::types::{RecordKind, Topic};
use thiserror::Error;

/// Main error type for real-time operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("No signed-in user")]
    AuthRequired,

    #[error("Auth provider failed: {0}")]
    Auth(String),

    #[error("Transport error on {topic}: {message}")]
    Transport { topic: Topic, message: String },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Route {route} is missing parameter {parameter}")]
    MissingRouteParameter {
        route: String,
        parameter: &'static str,
    },

    #[error("Listener thread could not be started: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RealtimeError {
    /// Shorthand for a transport failure scoped to one topic.
    pub fn transport(topic: &Topic, message: impl Into<String>) -> Self {
        RealtimeError::Transport {
            topic: topic.clone(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RealtimeError {
    fn from(e: serde_json::Error) -> Self {
        RealtimeError::Config(e.to_string())
    }
}

/// Why an inbound payload could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{kind} payload is missing required field `{field}`")]
    MissingField {
        kind: RecordKind,
        field: &'static str,
    },

    #[error("{kind} payload field `{field}` is invalid: {reason}")]
    InvalidField {
        kind: RecordKind,
        field: &'static str,
        reason: String,
    },
}

/// Result type for real-time operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;
