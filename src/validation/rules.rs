//! Field rules for CloudEvents-style events

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Minimum trimmed length of `type`, `source` and `subject`
pub const MIN_FIELD_LEN: usize = 5;

/// Reasons an event is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("event ID cannot be nil")]
    NilId,
    #[error("event type must be at least 5 characters long")]
    TypeTooShort,
    #[error("event time cannot be zero")]
    ZeroTime,
    #[error("event source must be at least 5 characters long")]
    SourceTooShort,
    #[error("event source must be a valid URI starting with http:// or https://")]
    SourceScheme,
    #[error("event subject must be at least 5 characters long")]
    SubjectTooShort,
    #[error("event data cannot be nil")]
    NullData,
}

/// The "zero" timestamp (`0001-01-01T00:00:00Z`) that producers send for an unset time
pub fn zero_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Length in bytes after trimming whitespace
fn trimmed_len(s: &str) -> usize {
    s.trim().len()
}

/// Check event fields in order: id, type, time, source, subject, data.
///
/// `time` is `None` when the field was absent on the wire.
pub fn validate_fields(
    id: &Uuid,
    event_type: &str,
    time: Option<&DateTime<Utc>>,
    source: &str,
    subject: &str,
    data: &Value,
) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::NilId);
    }

    if trimmed_len(event_type) < MIN_FIELD_LEN {
        return Err(ValidationError::TypeTooShort);
    }

    match time {
        Some(t) if *t > zero_time() => {}
        _ => return Err(ValidationError::ZeroTime),
    }

    if trimmed_len(source) < MIN_FIELD_LEN {
        return Err(ValidationError::SourceTooShort);
    }
    if !source.starts_with("http://") && !source.starts_with("https://") {
        return Err(ValidationError::SourceScheme);
    }

    if trimmed_len(subject) < MIN_FIELD_LEN {
        return Err(ValidationError::SubjectTooShort);
    }

    if data.is_null() {
        return Err(ValidationError::NullData);
    }

    Ok(())
}
