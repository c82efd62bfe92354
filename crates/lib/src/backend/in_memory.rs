//! In-memory user backend
//!
//! Both regions live under a single `tokio::sync::RwLock`; holding the write
//! guard for the whole of an operation makes it one transaction. State can be
//! saved to and loaded from a JSON file for development setups.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

use super::errors::StoreError;
use super::{BackendImpl, validate_record};
use crate::Result;
use crate::user::{User, UserId};

/// The current persistence file format version.
const PERSISTENCE_VERSION: u8 = 0;

fn is_v0(v: &u8) -> bool {
    *v == 0
}

fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Regions {
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    users: BTreeMap<UserId, User>,
    #[serde(rename = "user-name", default)]
    names: BTreeMap<String, User>,
}

/// A user backend held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemory {
    regions: RwLock<Regions>,
}

impl InMemory {
    /// Creates a new, empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves both regions to `path` as JSON.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let regions = self.regions.read().await.clone();
        let json = serde_json::to_string_pretty(&regions)
            .map_err(|source| StoreError::SerializationFailed { source })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| StoreError::FileIo { source }.into())
    }

    /// Loads state from `path`. A missing file yields an empty backend.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(json) => {
                let regions: Regions = serde_json::from_str(&json)
                    .map_err(|source| StoreError::DeserializationFailed { source })?;
                Ok(Self {
                    regions: RwLock::new(regions),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(StoreError::FileIo { source }.into()),
        }
    }
}

impl Regions {
    /// Name is free or already owned by `id`.
    fn name_free_for(&self, name: &str, id: &UserId) -> bool {
        self.names.get(name).is_none_or(|owner| &owner.id == id)
    }

    fn put(&mut self, user: &User) {
        self.users.insert(user.id.clone(), user.clone());
        if !user.unique_name.is_empty() {
            self.names.insert(user.unique_name.clone(), user.clone());
        }
    }
}

#[async_trait]
impl BackendImpl for InMemory {
    async fn get_by_id(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.regions.read().await.users.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self.regions.read().await.names.get(name).cloned())
    }

    async fn save(&self, user: &User) -> Result<()> {
        validate_record(user)?;
        let mut tx = self.regions.write().await;

        if !user.unique_name.is_empty() && !tx.name_free_for(&user.unique_name, &user.id) {
            return Err(StoreError::NameUnavailable {
                name: user.unique_name.clone(),
            }
            .into());
        }

        let released = tx
            .users
            .get(&user.id)
            .map(|previous| previous.unique_name.clone())
            .filter(|old| !old.is_empty() && *old != user.unique_name);
        if let Some(old) = released {
            tx.names.remove(&old);
        }

        tx.put(user);
        Ok(())
    }

    async fn activate(&self, id: &UserId, name: &str, password_hash: &str) -> Result<User> {
        let mut tx = self.regions.write().await;

        let mut user = tx
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: id.to_string() })?;
        if user.is_activated() {
            return Err(StoreError::AlreadyActivated { id: id.to_string() }.into());
        }
        if tx.names.contains_key(name) {
            return Err(StoreError::NameUnavailable {
                name: name.to_string(),
            }
            .into());
        }

        user.unique_name = name.to_string();
        user.password_hash = password_hash.to_string();
        user.active = true;
        validate_record(&user)?;

        tx.put(&user);
        Ok(user)
    }

    async fn change_name(&self, id: &UserId, new_name: &str) -> Result<User> {
        let mut tx = self.regions.write().await;

        if tx.names.contains_key(new_name) {
            return Err(StoreError::NameUnavailable {
                name: new_name.to_string(),
            }
            .into());
        }
        let mut user = tx
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: id.to_string() })?;
        if user.unique_name.is_empty() {
            return Err(StoreError::NothingToChange { id: id.to_string() }.into());
        }

        let old = std::mem::replace(&mut user.unique_name, new_name.to_string());
        tx.names.remove(&old);
        tx.put(&user);
        Ok(user)
    }

    async fn touch(&self, id: &UserId, at: DateTime<Utc>) -> Result<User> {
        let mut tx = self.regions.write().await;

        let mut user = tx
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: id.to_string() })?;
        user.last_seen = Some(at);

        tx.put(&user);
        Ok(user)
    }

    async fn insert_first(&self, user: &User) -> Result<bool> {
        validate_record(user)?;
        let mut tx = self.regions.write().await;
        if !tx.users.is_empty() {
            return Ok(false);
        }
        tx.put(user);
        Ok(true)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.regions.read().await.users.len())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
