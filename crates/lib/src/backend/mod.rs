//! Storage backends for user records
//!
//! The [`BackendImpl`] trait is the transactional key-value surface the
//! [`UserStore`](crate::store::UserStore) is built on. Every implementation
//! keeps two regions holding the same serialized record:
//!
//! - `users`, keyed by stable id
//! - `user-name`, keyed by unique name
//!
//! Each mutating method is one write transaction. After every commit, for
//! every activated user `u`, `user-name[u.name]` holds a record with id
//! `u.id`, and no two ids own the same name.

pub mod errors;
pub mod in_memory;
#[cfg(feature = "sqlite")]
pub mod sql;

use std::any::Any;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use errors::StoreError;
pub use in_memory::InMemory;
#[cfg(feature = "sqlite")]
pub use sql::SqlxBackend;

use crate::Result;
use crate::user::{User, UserId};

/// Transactional storage for user records.
///
/// All implementations must be `Send + Sync` to be shared across request
/// tasks, and implement `Any` for downcasting in tests.
#[async_trait]
pub trait BackendImpl: Send + Sync + Any {
    /// Look up a record by id.
    async fn get_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Look up a record by unique name.
    async fn get_by_name(&self, name: &str) -> Result<Option<User>>;

    /// Upsert a record into both regions.
    ///
    /// Fails with [`StoreError::NameUnavailable`] if the name is owned by a
    /// different id. If the stored copy had a different name, that name is
    /// released in the same transaction.
    async fn save(&self, user: &User) -> Result<()>;

    /// Turn a pending record into an activated one.
    ///
    /// In one transaction: fails with [`StoreError::NotFound`] if `id` is
    /// unknown, [`StoreError::AlreadyActivated`] if the record already has a
    /// password, [`StoreError::NameUnavailable`] if `name` is taken; otherwise
    /// sets name, hash and `active` and claims the name.
    async fn activate(&self, id: &UserId, name: &str, password_hash: &str) -> Result<User>;

    /// Move a record to a new name.
    ///
    /// In one transaction: fails with [`StoreError::NameUnavailable`] if
    /// `new_name` exists, [`StoreError::NothingToChange`] if the record has no
    /// name; otherwise writes the new name key, deletes the old one and
    /// updates the id copy.
    async fn change_name(&self, id: &UserId, new_name: &str) -> Result<User>;

    /// Stamp `last_seen` on the stored record, leaving every other field as
    /// committed.
    ///
    /// In one transaction: fails with [`StoreError::NotFound`] if `id` is
    /// unknown; otherwise rewrites both regions from the re-read record.
    async fn touch(&self, id: &UserId, at: DateTime<Utc>) -> Result<User>;

    /// Insert `user` only if the `users` region is empty.
    ///
    /// Returns whether the record was inserted.
    async fn insert_first(&self, user: &User) -> Result<bool>;

    /// Number of records in the `users` region.
    async fn count(&self) -> Result<usize>;

    /// Returns a reference to the backend as a `dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Checks shared by every backend before a record is written.
pub(crate) fn validate_record(user: &User) -> std::result::Result<(), StoreError> {
    if user.id.is_empty() {
        return Err(StoreError::UninitializedKey);
    }
    if user.is_activated() && user.unique_name.is_empty() {
        return Err(StoreError::InvalidRecord {
            id: user.id.to_string(),
            reason: "activated record without a name".to_string(),
        });
    }
    Ok(())
}
