//! SQLite user backend
//!
//! Implements [`BackendImpl`] on top of an `sqlx` SQLite pool. Every mutating
//! method runs as a single SQL transaction and additionally holds a
//! process-wide writer lock, giving the single-writer/multiple-reader
//! discipline the name index relies on: concurrent renames onto the same
//! name serialize, and the loser deterministically sees
//! [`StoreError::NameUnavailable`].

/// Schema definition and migration system.
pub mod schema;

use std::any::Any;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use tokio::sync::Mutex;

use crate::Result;
use crate::backend::errors::StoreError;
use crate::backend::{BackendImpl, validate_record};
use crate::user::{User, UserId};

/// Extension trait for sqlx Result types to simplify error handling.
///
/// Similar to `anyhow::Context`, this converts sqlx errors into
/// `StoreError::Sqlx` with a context message.
pub(crate) trait SqlxResultExt<T> {
    /// Convert sqlx error to StoreError with context message.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            StoreError::Sqlx {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

/// SQLite-backed user store.
pub struct SqlxBackend {
    pool: SqlitePool,
    writer: Mutex<()>,
}

impl SqlxBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// ```ignore
    /// use wicket::backend::SqlxBackend;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let backend = SqlxBackend::open_sqlite("users.db").await.unwrap();
    /// }
    /// ```
    pub async fn open_sqlite<P: AsRef<Path>>(path: P) -> Result<Self> {
        // - journal_mode=WAL: readers don't block the writer
        // - synchronous=NORMAL: safe with WAL
        // - busy_timeout: wait for locks held by other processes
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .sql_context("Failed to connect to SQLite")?;

        let backend = Self::from_pool(pool).await?;
        tracing::info!(path = %path.as_ref().display(), "Opened user store");
        Ok(backend)
    }

    /// Create an in-memory SQLite database.
    ///
    /// The pool is pinned to a single connection that never expires, since
    /// the database vanishes with its last connection.
    pub async fn sqlite_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .sql_context("Invalid SQLite URL")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .sql_context("Failed to connect to SQLite")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let backend = Self {
            pool,
            writer: Mutex::new(()),
        };
        schema::initialize(&backend).await?;
        Ok(backend)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .sql_context("Failed to begin transaction")
    }
}

fn encode(user: &User) -> Result<String> {
    serde_json::to_string(user).map_err(|source| StoreError::SerializationFailed { source }.into())
}

fn decode(record: &str) -> Result<User> {
    serde_json::from_str(record).map_err(|source| StoreError::DeserializationFailed { source }.into())
}

/// Map a primary-key collision on `user_name` to a name conflict.
fn name_conflict(e: sqlx::Error, name: &str, context: &str) -> crate::Error {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return StoreError::NameUnavailable {
            name: name.to_string(),
        }
        .into();
    }
    StoreError::Sqlx {
        reason: format!("{context}: {e}"),
        source: Some(e),
    }
    .into()
}

async fn select_by_id(tx: &mut Transaction<'_, Sqlite>, id: &UserId) -> Result<Option<User>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT record FROM users WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .sql_context("Failed to read user by id")?;
    row.map(|(record,)| decode(&record)).transpose()
}

async fn name_owner(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT id FROM user_name WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await
        .sql_context("Failed to read name owner")?;
    Ok(row.map(|(id,)| id))
}

async fn upsert(tx: &mut Transaction<'_, Sqlite>, user: &User) -> Result<()> {
    let record = encode(user)?;
    sqlx::query(
        "INSERT INTO users (id, record) VALUES (?, ?)
         ON CONFLICT(id) DO UPDATE SET record = excluded.record",
    )
    .bind(user.id.as_str())
    .bind(&record)
    .execute(&mut **tx)
    .await
    .sql_context("Failed to write user")?;

    if !user.unique_name.is_empty() {
        sqlx::query(
            "INSERT INTO user_name (name, id, record) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET record = excluded.record
             WHERE user_name.id = excluded.id",
        )
        .bind(&user.unique_name)
        .bind(user.id.as_str())
        .bind(&record)
        .execute(&mut **tx)
        .await
        .map_err(|e| name_conflict(e, &user.unique_name, "Failed to write user name"))?;
    }
    Ok(())
}

async fn release_name(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<()> {
    sqlx::query("DELETE FROM user_name WHERE name = ?")
        .bind(name)
        .execute(&mut **tx)
        .await
        .sql_context("Failed to release user name")?;
    Ok(())
}

#[async_trait]
impl BackendImpl for SqlxBackend {
    async fn get_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT record FROM users WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .sql_context("Failed to read user by id")?;
        row.map(|(record,)| decode(&record)).transpose()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT record FROM user_name WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .sql_context("Failed to read user by name")?;
        row.map(|(record,)| decode(&record)).transpose()
    }

    async fn save(&self, user: &User) -> Result<()> {
        validate_record(user)?;
        let _writer = self.writer.lock().await;
        let mut tx = self.begin().await?;

        if !user.unique_name.is_empty()
            && let Some(owner) = name_owner(&mut tx, &user.unique_name).await?
            && owner != user.id.as_str()
        {
            return Err(StoreError::NameUnavailable {
                name: user.unique_name.clone(),
            }
            .into());
        }

        if let Some(previous) = select_by_id(&mut tx, &user.id).await?
            && !previous.unique_name.is_empty()
            && previous.unique_name != user.unique_name
        {
            release_name(&mut tx, &previous.unique_name).await?;
        }

        upsert(&mut tx, user).await?;
        tx.commit().await.sql_context("Failed to commit save")
    }

    async fn activate(&self, id: &UserId, name: &str, password_hash: &str) -> Result<User> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin().await?;

        let mut user = select_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound { key: id.to_string() })?;
        if user.is_activated() {
            return Err(StoreError::AlreadyActivated { id: id.to_string() }.into());
        }
        if name_owner(&mut tx, name).await?.is_some() {
            return Err(StoreError::NameUnavailable {
                name: name.to_string(),
            }
            .into());
        }

        user.unique_name = name.to_string();
        user.password_hash = password_hash.to_string();
        user.active = true;
        validate_record(&user)?;

        upsert(&mut tx, &user).await?;
        tx.commit().await.sql_context("Failed to commit activation")?;
        Ok(user)
    }

    async fn change_name(&self, id: &UserId, new_name: &str) -> Result<User> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin().await?;

        if name_owner(&mut tx, new_name).await?.is_some() {
            return Err(StoreError::NameUnavailable {
                name: new_name.to_string(),
            }
            .into());
        }
        let mut user = select_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound { key: id.to_string() })?;
        if user.unique_name.is_empty() {
            return Err(StoreError::NothingToChange { id: id.to_string() }.into());
        }

        let old = std::mem::replace(&mut user.unique_name, new_name.to_string());
        release_name(&mut tx, &old).await?;
        upsert(&mut tx, &user).await?;

        // Dropping `tx` on any error above rolls back.
        tx.commit().await.sql_context("Failed to commit rename")?;
        Ok(user)
    }

    async fn touch(&self, id: &UserId, at: DateTime<Utc>) -> Result<User> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin().await?;

        let mut user = select_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound { key: id.to_string() })?;
        user.last_seen = Some(at);

        upsert(&mut tx, &user).await?;
        tx.commit().await.sql_context("Failed to commit last seen")?;
        Ok(user)
    }

    async fn insert_first(&self, user: &User) -> Result<bool> {
        validate_record(user)?;
        let _writer = self.writer.lock().await;
        let mut tx = self.begin().await?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await
            .sql_context("Failed to count users")?;
        if count > 0 {
            return Ok(false);
        }

        upsert(&mut tx, user).await?;
        tx.commit().await.sql_context("Failed to commit first user")?;
        Ok(true)
    }

    async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .sql_context("Failed to count users")?;
        Ok(count as usize)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
