//! Inbound event submission.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The event fields a caller may send, either at the top level or nested
/// under `data`.
///
/// Every field is optional on the wire. Which ones are actually required is
/// decided by the ingress validator, not by deserialization, so no field
/// value ever makes the body unreadable: a `token` that is not a string is
/// treated as absent, and a non-string subject, sender or content keeps its
/// JSON text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFields {
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<String>,
    #[serde(default, alias = "emailSubject", deserialize_with = "opaque_text")]
    pub email_subject: Option<String>,
    #[serde(default, alias = "emailSender", deserialize_with = "opaque_text")]
    pub email_sender: Option<String>,
    #[serde(default, alias = "emailContent", deserialize_with = "opaque_text")]
    pub email_content: Option<String>,
    /// Unix epoch seconds, as a JSON integer or a string holding one.
    #[serde(default, alias = "emailTimestream")]
    pub email_timestream: Option<Value>,
}

/// Body of `POST /process`.
///
/// Either a flat object carrying [`EventFields`], or a wrapper whose `data`
/// object carries them. When `data` is an object it wins over the outer
/// fields; any other `data` value is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSubmission {
    #[serde(flatten)]
    pub fields: EventFields,
    #[serde(
        default,
        deserialize_with = "object_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<EventFields>,
}

impl EventSubmission {
    /// Wrap `fields` as a flat submission.
    pub fn flat(fields: EventFields) -> Self {
        Self { fields, data: None }
    }

    /// Wrap `data` in an envelope that carries only the token at the top level.
    pub fn nested(token: impl Into<String>, data: EventFields) -> Self {
        Self {
            fields: EventFields {
                token: Some(token.into()),
                ..EventFields::default()
            },
            data: Some(data),
        }
    }
}

impl From<EventFields> for EventSubmission {
    fn from(fields: EventFields) -> Self {
        Self::flat(fields)
    }
}

fn string_or_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn opaque_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn object_or_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<EventFields>, D::Error> {
    match Value::deserialize(d)? {
        value @ Value::Object(_) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
