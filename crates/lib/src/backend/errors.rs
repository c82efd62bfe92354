//! Store error types for the user backends.
//!
//! This module defines structured error types for user store operations,
//! shared by every [`BackendImpl`](super::BackendImpl) implementation.

use thiserror::Error;

/// Errors that can occur during user store operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record under the given id or name.
    #[error("User not found: {key}")]
    NotFound {
        /// The id or name that missed
        key: String,
    },

    /// Neither id nor name was supplied.
    #[error("No id or name supplied")]
    UninitializedKey,

    /// The name is owned by another record.
    #[error("Name unavailable: {name}")]
    NameUnavailable {
        /// The contested name
        name: String,
    },

    /// A rename was requested for a record that has no name yet.
    #[error("User {id} has no name to change")]
    NothingToChange {
        /// The pending record's id
        id: String,
    },

    /// Activation was requested for a record that already has a password.
    #[error("User {id} is already activated")]
    AlreadyActivated {
        /// The record's id
        id: String,
    },

    /// The record would break the dual-index invariant.
    #[error("Invalid record {id}: {reason}")]
    InvalidRecord {
        /// The record's id
        id: String,
        /// What is wrong with it
        reason: String,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// SQL backend error.
    #[cfg(feature = "sqlite")]
    #[error("SQL error: {reason}")]
    Sqlx {
        /// Context and driver message
        reason: String,
        /// The underlying sqlx error
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl StoreError {
    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this error is a name ownership conflict.
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, StoreError::NameUnavailable { .. })
    }

    /// Check if this error was caused by the caller's input rather than storage.
    pub fn is_logical_error(&self) -> bool {
        matches!(
            self,
            StoreError::UninitializedKey
                | StoreError::NothingToChange { .. }
                | StoreError::AlreadyActivated { .. }
                | StoreError::InvalidRecord { .. }
        )
    }

    /// Check if this error is related to I/O or encoding.
    pub fn is_io_error(&self) -> bool {
        match self {
            StoreError::FileIo { .. }
            | StoreError::SerializationFailed { .. }
            | StoreError::DeserializationFailed { .. } => true,
            #[cfg(feature = "sqlite")]
            StoreError::Sqlx { .. } => true,
            _ => false,
        }
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
