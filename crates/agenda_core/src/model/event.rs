//! Event domain model.
//!
//! # Responsibility
//! - Define the canonical event record persisted by the store.
//! - Provide lifecycle helpers for soft-delete semantics.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another event.
//! - `end_ms` must not be earlier than `start_ms`; inverted ranges are
//!   rejected before they ever reach persistence.
//! - `is_deleted` is the source of truth for tombstone state.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for an event.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EventId = Uuid;

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Created but not started.
    Todo,
    /// Work is in progress. Merged events are always forced to this state.
    InProgress,
    /// Completed.
    Done,
}

impl EventStatus {
    /// Stable text form used in storage and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parses the stable text form back into a status.
    pub fn parse_str(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Validation failure for event field invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventValidationError {
    /// The nil UUID is reserved and never a valid identity.
    NilUuid,
    /// Events must carry a non-empty title.
    EmptyTitle,
    /// The time window is inverted (`end_ms < start_ms`).
    InvalidTimeWindow { start_ms: i64, end_ms: i64 },
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "event uuid must not be nil"),
            Self::EmptyTitle => write!(f, "event title must not be empty"),
            Self::InvalidTimeWindow { start_ms, end_ms } => write!(
                f,
                "event time window is inverted: start_ms={start_ms} end_ms={end_ms}"
            ),
        }
    }
}

impl Error for EventValidationError {}

/// Canonical event record.
///
/// Invitees are part of the read model: every fetch from the store returns
/// them eagerly, so business logic never has to lazy-load the relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Stable global ID used for linking and reconciliation after merges.
    pub uuid: EventId,
    /// Text label shown in listings.
    pub title: String,
    /// Optional free-form text.
    pub description: Option<String>,
    /// Start instant in Unix epoch milliseconds.
    pub start_ms: i64,
    /// End instant in Unix epoch milliseconds. Must be >= `start_ms`.
    pub end_ms: i64,
    /// Lifecycle state.
    pub status: EventStatus,
    /// Invited users, deduplicated by identity.
    pub invitees: Vec<UserId>,
    /// Soft delete tombstone.
    pub is_deleted: bool,
}

impl Event {
    /// Creates a new event with a generated stable ID and `Todo` status.
    pub fn new(title: impl Into<String>, start_ms: i64, end_ms: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            description: None,
            start_ms,
            end_ms,
            status: EventStatus::Todo,
            invitees: Vec::new(),
            is_deleted: false,
        }
    }

    /// Creates an event with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        uuid: EventId,
        title: impl Into<String>,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Self, EventValidationError> {
        if uuid.is_nil() {
            return Err(EventValidationError::NilUuid);
        }
        Ok(Self {
            uuid,
            title: title.into(),
            description: None,
            start_ms,
            end_ms,
            status: EventStatus::Todo,
            invitees: Vec::new(),
            is_deleted: false,
        })
    }

    /// Checks field invariants.
    ///
    /// Write paths must call this before any SQL mutation; read paths use it
    /// to reject invalid persisted state instead of masking it.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.uuid.is_nil() {
            return Err(EventValidationError::NilUuid);
        }
        if self.title.trim().is_empty() {
            return Err(EventValidationError::EmptyTitle);
        }
        if self.end_ms < self.start_ms {
            return Err(EventValidationError::InvalidTimeWindow {
                start_ms: self.start_ms,
                end_ms: self.end_ms,
            });
        }
        Ok(())
    }

    /// Marks this event as softly deleted (tombstoned).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Returns whether this event should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}
