//! The user store
//!
//! [`UserStore`] is the dual-index persistence layer for [`User`] records:
//! by stable id and by unique name. It validates arguments and delegates the
//! transactional work to a [`BackendImpl`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::Result;
use crate::backend::{BackendImpl, InMemory, StoreError};
use crate::user::{User, UserId};

/// Shared handle to the user backend.
#[derive(Clone)]
pub struct UserStore {
    backend: Arc<dyn BackendImpl>,
}

impl UserStore {
    /// Wrap an existing backend.
    pub fn new(backend: Arc<dyn BackendImpl>) -> Self {
        Self { backend }
    }

    /// A store backed by [`InMemory`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// A store backed by a SQLite file at `path`.
    #[cfg(feature = "sqlite")]
    pub async fn open_sqlite(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let backend = crate::backend::SqlxBackend::open_sqlite(path).await?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn BackendImpl> {
        &self.backend
    }

    /// Upsert `user` under its id and, if named, under its name.
    pub async fn save(&self, user: &User) -> Result<()> {
        self.backend.save(user).await?;
        tracing::debug!(user_id = %user.id, name = %user.unique_name, "Saved user");
        Ok(())
    }

    /// Look up by id first, then by name.
    ///
    /// Fails with [`StoreError::UninitializedKey`] if both are empty and
    /// [`StoreError::NotFound`] if both miss.
    pub async fn load(&self, id: &UserId, name: &str) -> Result<User> {
        if id.is_empty() && name.is_empty() {
            return Err(StoreError::UninitializedKey.into());
        }
        if !id.is_empty()
            && let Some(user) = self.backend.get_by_id(id).await?
        {
            return Ok(user);
        }
        if !name.is_empty()
            && let Some(user) = self.backend.get_by_name(name).await?
        {
            return Ok(user);
        }
        let key = if id.is_empty() {
            name.to_string()
        } else {
            id.to_string()
        };
        Err(StoreError::NotFound { key }.into())
    }

    /// Look up by id only.
    pub async fn load_by_id(&self, id: &UserId) -> Result<User> {
        self.load(id, "").await
    }

    /// Look up by name only.
    pub async fn load_by_name(&self, name: &str) -> Result<User> {
        self.load(&UserId::default(), name).await
    }

    /// Move `user` to `new_name` atomically.
    ///
    /// Fails with [`StoreError::NothingToChange`] if `user` has no name yet and
    /// [`StoreError::NameUnavailable`] if `new_name` is taken.
    pub async fn change_name(&self, user: &User, new_name: &str) -> Result<User> {
        if user.unique_name.is_empty() {
            return Err(StoreError::NothingToChange {
                id: user.id.to_string(),
            }
            .into());
        }
        if new_name.is_empty() {
            return Err(StoreError::UninitializedKey.into());
        }
        let renamed = self.backend.change_name(&user.id, new_name).await?;
        tracing::info!(user_id = %user.id, from = %user.unique_name, to = new_name, "Renamed user");
        Ok(renamed)
    }

    /// Claim `name` and set `password_hash` on a pending record, in one step.
    pub async fn activate(&self, id: &UserId, name: &str, password_hash: &str) -> Result<User> {
        if id.is_empty() || name.is_empty() {
            return Err(StoreError::UninitializedKey.into());
        }
        self.backend.activate(id, name, password_hash).await
    }

    /// Record that `id` was seen at `at`, re-reading the stored record.
    pub async fn touch(&self, id: &UserId, at: DateTime<Utc>) -> Result<User> {
        if id.is_empty() {
            return Err(StoreError::UninitializedKey.into());
        }
        self.backend.touch(id, at).await
    }

    /// Insert `user` only if no record exists yet.
    pub async fn insert_first(&self, user: &User) -> Result<bool> {
        self.backend.insert_first(user).await
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<usize> {
        self.backend.count().await
    }

    /// Whether no record exists.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore").finish_non_exhaustive()
    }
}
