//! API error taxonomy.
//!
//! ERROR CLASSES
//! =============
//! - validation: 4xx with a field-keyed payload, surfaced verbatim
//! - authentication: 401, drives refresh-or-logout and is never shown raw
//! - not-found: rendered inline by callers, not treated as a hard failure
//! - network: no response at all, mapped to a generic fallback message

use serde_json::{Map, Value};

const GENERIC_FALLBACK: &str = "Something went wrong. Please try again.";
const NETWORK_FALLBACK: &str = "Could not reach the server. Please try again.";
const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

/// Keys checked before any field-specific key when picking a single message.
const PRIORITY_KEYS: &[&str] = &["error", "detail", "non_field_errors"];

/// Errors produced by gateway requests and typed endpoint calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the payload with per-field messages.
    #[error("validation failed with status {status}")]
    Validation { status: u16, errors: FieldErrors },

    /// The server answered 401 and no refresh could recover it.
    #[error("unauthorized")]
    Unauthorized { body: String },

    /// The requested resource does not exist.
    #[error("not found")]
    NotFound,

    /// Any other non-success status.
    #[error("unexpected status {status}")]
    Status { status: u16, body: String },

    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// A success response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// Reading or writing the token store failed.
    #[error("token storage failed: {0}")]
    Storage(String),
}

impl ApiError {
    /// Classify a non-success response by status and body.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            401 => Self::Unauthorized { body: body.to_owned() },
            404 => Self::NotFound,
            400..=499 => match serde_json::from_str::<Value>(body) {
                Ok(Value::Object(map)) => Self::Validation { status, errors: FieldErrors(map) },
                _ => Self::Status { status, body: body.to_owned() },
            },
            _ => Self::Status { status, body: body.to_owned() },
        }
    }

    /// HTTP status carried by this error, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::NotFound => Some(404),
            Self::Network(_) | Self::Decode(_) | Self::Storage(_) => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Field errors when the server sent a validation payload.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Text suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { errors, .. } => errors
                .first_message()
                .unwrap_or_else(|| GENERIC_FALLBACK.to_owned()),
            Self::Unauthorized { .. } => SESSION_EXPIRED.to_owned(),
            Self::NotFound => "Not found.".to_owned(),
            Self::Network(_) => NETWORK_FALLBACK.to_owned(),
            Self::Status { .. } | Self::Decode(_) | Self::Storage(_) => GENERIC_FALLBACK.to_owned(),
        }
    }
}

// =============================================================================
// FIELD ERRORS
// =============================================================================

/// Field-keyed validation payload, e.g. `{"email": ["already taken"]}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(pub Map<String, Value>);

impl FieldErrors {
    /// The single most relevant message.
    ///
    /// `error`, `detail` and `non_field_errors` win over per-field keys;
    /// after that keys are visited in sorted order.
    #[must_use]
    pub fn first_message(&self) -> Option<String> {
        let priority = PRIORITY_KEYS.iter().filter_map(|k| self.0.get(*k));
        let rest = self
            .0
            .iter()
            .filter(|(k, _)| !PRIORITY_KEYS.contains(&k.as_str()))
            .map(|(_, v)| v);
        priority
            .chain(rest)
            .find_map(|v| messages(v).into_iter().next())
    }

    /// Every field with its messages: `"email: taken password: too short, too common"`.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(|(field, value)| format!("{field}: {}", messages(value).join(", ")))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages).collect(),
        Value::Object(map) => map.values().flat_map(messages).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
