//! Submission validation.
//!
//! Validation runs in two steps:
//! 1. [`resolve`] picks the effective field set (nested `data` wins over the
//!    outer object) and the caller's token.
//! 2. [`validate_at`] checks `email_timestream` against the clock and copies
//!    the event fields into a [`ValidatedEvent`].
//!
//! Subject, sender and content are opaque and may be absent.

use evrelay_sdk::objects::{EventFields, EventSubmission, ValidatedEvent};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

/// Where the effective field set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Flat,
    Nested,
}

/// A submission reduced to the one field set that counts.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSubmission<'a> {
    /// Outer `token`, falling back to `data.token`.
    pub token: Option<&'a str>,
    pub fields: &'a EventFields,
    pub source: FieldSource,
}

/// Errors for submissions the ingress refuses to queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `email_timestream` is absent, not an integer, or out of range.
    #[error("email_timestream must be an integer Unix timestamp in seconds")]
    InvalidTimestampFormat,

    #[error("email_timestream {0} is in the future")]
    FutureTimestamp(i64),
}

/// Pick the effective field set of `submission`.
pub fn resolve(submission: &EventSubmission) -> ResolvedSubmission<'_> {
    let nested_token = submission.data.as_ref().and_then(|d| d.token.as_deref());
    let token = submission.fields.token.as_deref().or(nested_token);

    match &submission.data {
        Some(data) => ResolvedSubmission {
            token,
            fields: data,
            source: FieldSource::Nested,
        },
        None => ResolvedSubmission {
            token,
            fields: &submission.fields,
            source: FieldSource::Flat,
        },
    }
}

/// Parse an `email_timestream` value into a point in time.
pub fn parse_timestream(value: Option<&Value>) -> Result<OffsetDateTime, ValidationError> {
    let seconds = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or(ValidationError::InvalidTimestampFormat)?;

    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|_| ValidationError::InvalidTimestampFormat)
}

/// Validate `submission` against the current time.
pub fn validate(submission: &EventSubmission) -> Result<ValidatedEvent, ValidationError> {
    validate_at(submission, OffsetDateTime::now_utc())
}

/// Validate `submission` as if the current time were `now`.
///
/// A timestream equal to `now` is accepted; one strictly later is not.
pub fn validate_at(
    submission: &EventSubmission,
    now: OffsetDateTime,
) -> Result<ValidatedEvent, ValidationError> {
    let resolved = resolve(submission);
    let fields = resolved.fields;

    let timestream = parse_timestream(fields.email_timestream.as_ref())?;
    if timestream > now {
        return Err(ValidationError::FutureTimestamp(
            timestream.unix_timestamp(),
        ));
    }

    Ok(ValidatedEvent {
        email_subject: fields.email_subject.clone(),
        email_sender: fields.email_sender.clone(),
        email_timestream: timestream.unix_timestamp(),
        email_content: fields.email_content.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(NOW).unwrap()
    }

    fn submission(value: Value) -> EventSubmission {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_resolve_flat() {
        let s = submission(json!({ "token": "t", "email_subject": "outer" }));
        let resolved = resolve(&s);
        assert_eq!(resolved.source, FieldSource::Flat);
        assert_eq!(resolved.token, Some("t"));
        assert_eq!(resolved.fields.email_subject.as_deref(), Some("outer"));
    }

    #[test]
    fn test_resolve_nested_takes_precedence() {
        let s = submission(json!({
            "token": "t",
            "email_subject": "outer",
            "email_timestream": NOW - 100,
            "data": { "email_subject": "inner", "email_timestream": NOW - 10 }
        }));
        let resolved = resolve(&s);
        assert_eq!(resolved.source, FieldSource::Nested);
        assert_eq!(resolved.fields.email_subject.as_deref(), Some("inner"));

        let event = validate_at(&s, now()).unwrap();
        assert_eq!(event.email_subject.as_deref(), Some("inner"));
        assert_eq!(event.email_timestream, NOW - 10);
    }

    #[test]
    fn test_resolve_token_falls_back_to_nested() {
        let s = submission(json!({ "data": { "token": "inner-token" } }));
        assert_eq!(resolve(&s).token, Some("inner-token"));

        let s = submission(json!({ "token": "outer", "data": { "token": "inner" } }));
        assert_eq!(resolve(&s).token, Some("outer"));
    }

    #[test]
    fn test_past_and_present_timestamps_are_accepted() {
        for ts in [json!(NOW), json!(NOW - 10), json!(0), json!(format!("{}", NOW - 3600))] {
            let s = submission(json!({ "email_timestream": ts }));
            assert!(validate_at(&s, now()).is_ok(), "{ts} rejected");
        }
    }

    #[test]
    fn test_future_timestamps_are_rejected() {
        for ts in [NOW + 1, NOW + 3600, i64::from(i32::MAX) * 4] {
            let s = submission(json!({ "email_timestream": ts }));
            assert_eq!(
                validate_at(&s, now()),
                Err(ValidationError::FutureTimestamp(ts))
            );
        }
    }

    #[test]
    fn test_invalid_timestamps_are_rejected() {
        let cases = [
            json!({}),
            json!({ "email_timestream": null }),
            json!({ "email_timestream": "" }),
            json!({ "email_timestream": "yesterday" }),
            json!({ "email_timestream": "17e8" }),
            json!({ "email_timestream": 1.5 }),
            json!({ "email_timestream": true }),
            json!({ "email_timestream": [NOW] }),
            json!({ "email_timestream": i64::MAX }),
            json!({ "email_timestream": u64::MAX }),
        ];
        for case in cases {
            let s = submission(case.clone());
            assert_eq!(
                validate_at(&s, now()),
                Err(ValidationError::InvalidTimestampFormat),
                "{case} accepted"
            );
        }
    }

    #[test]
    fn test_string_timestamp_is_trimmed() {
        let s = submission(json!({ "email_timestream": format!(" {} ", NOW - 5) }));
        assert_eq!(validate_at(&s, now()).unwrap().email_timestream, NOW - 5);
    }

    #[test]
    fn test_optional_fields_are_copied() {
        let s = submission(json!({
            "token": "t",
            "email_subject": "Hi",
            "email_sender": "a@example.com",
            "email_content": "body",
            "email_timestream": NOW
        }));
        assert_eq!(
            validate_at(&s, now()).unwrap(),
            ValidatedEvent {
                email_subject: Some("Hi".to_string()),
                email_sender: Some("a@example.com".to_string()),
                email_timestream: NOW,
                email_content: Some("body".to_string()),
            }
        );
    }

    #[test]
    fn test_validate_uses_wall_clock() {
        let past = OffsetDateTime::now_utc().unix_timestamp() - 10;
        let future = OffsetDateTime::now_utc().unix_timestamp() + 3600;
        assert!(validate(&submission(json!({ "email_timestream": past }))).is_ok());
        assert!(matches!(
            validate(&submission(json!({ "email_timestream": future }))),
            Err(ValidationError::FutureTimestamp(_))
        ));
    }
}
