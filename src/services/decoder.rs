//! Preference event decoding
//!
//! Payloads are JSON objects with `user_id`, `genre`, `artist`, `language`
//! and `timestamp`. Extraction is per field: a missing or unusable field
//! becomes `None` without affecting the others.

use serde_json::{Map, Value};

use crate::{config::DecodePolicy, models::PreferenceEvent};

/// Why a payload could not be read as a preference object at all
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeAnomaly {
    #[error("message has no payload")]
    MissingPayload,

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("payload is JSON but not an object")]
    NotAnObject,
}

/// Decodes one payload, reporting anomalies instead of filling nulls
pub fn decode(payload: Option<&[u8]>) -> Result<PreferenceEvent, DecodeAnomaly> {
    let payload = payload.ok_or(DecodeAnomaly::MissingPayload)?;
    let text = std::str::from_utf8(payload).map_err(|_| DecodeAnomaly::InvalidUtf8)?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeAnomaly::InvalidJson(e.to_string()))?;

    let object = value.as_object().ok_or(DecodeAnomaly::NotAnObject)?;

    Ok(PreferenceEvent {
        user_id: string_field(object, "user_id"),
        genre: string_field(object, "genre"),
        artist: string_field(object, "artist"),
        language: string_field(object, "language"),
        timestamp: string_field(object, "timestamp"),
    })
}

/// Decodes one payload, resolving anomalies with `policy`.
///
/// Returns `None` only when the policy drops the record.
pub fn decode_with_policy(payload: Option<&[u8]>, policy: DecodePolicy) -> Option<PreferenceEvent> {
    match decode(payload) {
        Ok(event) => Some(event),
        Err(anomaly) => {
            tracing::warn!(%anomaly, ?policy, "Undecodable preference payload");
            match policy {
                DecodePolicy::NullFill => Some(PreferenceEvent::null()),
                DecodePolicy::Drop => None,
            }
        }
    }
}

/// Reads a field as text. Strings are taken as-is; any other non-null value
/// is kept as its compact JSON text.
fn string_field(object: &Map<String, Value>, name: &str) -> Option<String> {
    match object.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
