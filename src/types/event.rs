//! CloudEvents-style event record
//!
//! An [`Event`] can only be obtained through [`Event::new`] or by
//! deserializing an [`EventRecord`], and both paths validate. Fields are
//! private so an event never changes after it passes validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::validation::{validate_fields, ValidationError};

/// Event identifier
pub type EventId = Uuid;

/// Errors from turning raw bytes into an [`Event`]
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Producer-supplied fields; identifier and time are filled in by [`Event::new`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub data: Value,
}

impl Candidate {
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        subject: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            subject: subject.into(),
            data,
        }
    }
}

/// Unvalidated wire shape of an event
///
/// Missing fields deserialize to empty values so that validation, not the
/// JSON parser, reports what is wrong with them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub id: Uuid,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub data: Value,
}

impl EventRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            &self.id,
            &self.event_type,
            self.time.as_ref(),
            &self.source,
            &self.subject,
            &self.data,
        )
    }
}

/// A validated, immutable event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct Event {
    id: EventId,
    #[serde(rename = "type")]
    event_type: String,
    time: DateTime<Utc>,
    source: String,
    subject: String,
    data: Value,
}

impl Event {
    /// Build an event from a candidate with a fresh identifier and the current UTC time
    pub fn new(candidate: Candidate) -> Result<Self, ValidationError> {
        let record = EventRecord {
            id: Uuid::new_v4(),
            event_type: candidate.event_type,
            time: Some(Utc::now()),
            source: candidate.source,
            subject: candidate.subject,
            data: candidate.data,
        };
        Self::try_from(record)
    }

    /// Parse and validate an event from its JSON representation
    pub fn from_json(s: &str) -> Result<Self, EventError> {
        Self::from_slice(s.as_bytes())
    }

    /// Parse and validate an event from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EventError> {
        let record: EventRecord = serde_json::from_slice(bytes)?;
        Ok(Self::try_from(record)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Re-run the field checks
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            &self.id,
            &self.event_type,
            Some(&self.time),
            &self.source,
            &self.subject,
            &self.data,
        )
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = ValidationError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        record.validate()?;
        let EventRecord {
            id,
            event_type,
            time,
            source,
            subject,
            data,
        } = record;
        Ok(Self {
            id,
            event_type,
            time: time.ok_or(ValidationError::ZeroTime)?,
            source,
            subject,
            data,
        })
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            time: Some(event.time),
            source: event.source,
            subject: event.subject,
            data: event.data,
        }
    }
}
