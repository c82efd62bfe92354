//! Core data types for the user system.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable, time-ordered user identifier (UUIDv7).
///
/// Assigned once when the record is created and never changed or reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Allocate a fresh identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the zero identifier of an anonymous user.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The durable identity record.
///
/// A record whose `password_hash` is non-empty is *activated*; an activated
/// record always has a non-empty `unique_name` that it alone owns. A record
/// with neither is a pending invitee.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Chosen login name; empty while pending.
    #[serde(rename = "name", default)]
    pub unique_name: String,
    /// Informational contact address. Not unique.
    #[serde(default)]
    pub email: String,
    /// Argon2id PHC string; empty until the invitation is accepted.
    #[serde(default)]
    pub password_hash: String,
    /// Administrators pass every rule.
    #[serde(default)]
    pub is_admin: bool,
    /// Trust level compared against rules.
    #[serde(default)]
    pub trust: u32,
    /// Set on activation.
    #[serde(default)]
    pub active: bool,
    /// Last successful login.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl User {
    /// A pending record with a fresh id, no name and no password.
    pub fn pending(email: impl Into<String>, is_admin: bool, trust: u32) -> Self {
        Self {
            id: UserId::generate(),
            email: email.into(),
            is_admin,
            trust,
            ..Self::default()
        }
    }

    /// Whether the invitation for this record has been accepted.
    pub fn is_activated(&self) -> bool {
        !self.password_hash.is_empty()
    }

    /// Whether this record still awaits activation.
    pub fn is_pending(&self) -> bool {
        !self.is_activated()
    }

    /// The cookie-safe view of this record.
    pub fn session(&self) -> SessionUser {
        SessionUser::from(self)
    }
}

/// What a session cookie or invitation token carries: a [`User`] without
/// its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionUser {
    /// Stable identifier; empty for the anonymous user.
    #[serde(default)]
    pub id: UserId,
    /// Login name; empty for pending and anonymous users.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub trust: u32,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl SessionUser {
    /// The caller with no valid session: no id, not admin, zero trust.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Whether this is the anonymous user.
    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.unique_name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            trust: user.trust,
            active: user.active,
            last_seen: user.last_seen,
        }
    }
}
