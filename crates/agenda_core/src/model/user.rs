//! User domain model.
//!
//! Users exist so invitee references resolve to something; the merge logic
//! references them by identity and never mutates them.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a user.
pub type UserId = Uuid;

/// Validation failure for user field invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserValidationError {
    /// The nil UUID is reserved and never a valid identity.
    NilUuid,
    /// Users must carry a non-empty name.
    EmptyName,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "user uuid must not be nil"),
            Self::EmptyName => write!(f, "user name must not be empty"),
        }
    }
}

impl Error for UserValidationError {}

/// Registered user referenced by event invitee links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable global ID.
    pub uuid: UserId,
    /// Display name.
    pub name: String,
}

impl User {
    /// Creates a new user with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
        }
    }

    /// Creates a user with a caller-provided stable ID.
    pub fn with_id(uuid: UserId, name: impl Into<String>) -> Result<Self, UserValidationError> {
        if uuid.is_nil() {
            return Err(UserValidationError::NilUuid);
        }
        Ok(Self {
            uuid,
            name: name.into(),
        })
    }

    /// Checks field invariants before persistence.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.uuid.is_nil() {
            return Err(UserValidationError::NilUuid);
        }
        if self.name.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        Ok(())
    }
}
