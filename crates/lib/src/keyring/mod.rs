//! Rotating key ring
//!
//! The ring is an ordered, newest-first sequence of [`Key`]s with a fixed
//! capacity N. It is either absent (first run) or exactly full. Rotation
//! prepends a fresh key and evicts the oldest; reset regenerates all N.
//!
//! Readers take an immutable snapshot (`Arc<[Key]>`); writers build a new
//! ring, persist it and swap the snapshot pointer, so a decode racing a
//! rotation sees either the old or the new ring in full. Writers are
//! serialized by an async mutex that also covers the key file.
//!
//! # Capacity changes
//!
//! If the configured capacity differs from the length of the active ring,
//! [`KeyRing::rotate`] degrades to a full reset. Every outstanding token
//! stops verifying when this happens.

mod errors;
mod key;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub use errors::KeyRingError;
pub use key::{KEY_LENGTH, Key};

/// Result alias for key ring operations.
pub type KeyRingResult<T> = std::result::Result<T, KeyRingError>;

/// Shared, persisted ring of symmetric keys.
pub struct KeyRing {
    path: PathBuf,
    capacity: AtomicUsize,
    active: RwLock<Arc<[Key]>>,
    writer: Mutex<()>,
}

impl KeyRing {
    /// An empty ring bound to `path`. Call [`KeyRing::load`] or
    /// [`KeyRing::persist`] before using it.
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: AtomicUsize::new(capacity.max(1)),
            active: RwLock::new(Arc::from(Vec::new())),
            writer: Mutex::new(()),
        }
    }

    /// Load the ring from `path`, initialising it on first run.
    ///
    /// A missing file generates and persists a full ring. A file that is
    /// unreadable as a ring or holds the wrong number of keys is replaced
    /// with a fresh ring; other I/O failures are returned.
    pub async fn open(path: impl Into<PathBuf>, capacity: usize) -> KeyRingResult<Self> {
        let ring = Self::new(path, capacity);
        match ring.load().await {
            Ok(()) => {
                tracing::info!(path = %ring.path.display(), keys = ring.len(), "Loaded key ring");
            }
            Err(e) if e.is_missing_file() => {
                tracing::info!(path = %ring.path.display(), keys = ring.capacity(), "Creating key ring");
                ring.reset().await?;
            }
            Err(e @ (KeyRingError::KeyCountMismatch { .. } | KeyRingError::MalformedKeyFile { .. })) => {
                tracing::warn!(path = %ring.path.display(), error = %e, "Regenerating key ring");
                ring.reset().await?;
            }
            Err(e) => return Err(e),
        }
        Ok(ring)
    }

    /// Generate `n` fresh keys.
    pub fn generate(n: usize) -> KeyRingResult<Vec<Key>> {
        (0..n).map(|_| Key::generate()).collect()
    }

    /// Write `keys` to the key file and make them the active ring.
    pub async fn persist(&self, keys: Vec<Key>) -> KeyRingResult<()> {
        let _guard = self.writer.lock().await;
        self.persist_locked(keys).await
    }

    /// Read and decode the key file without touching the active ring.
    pub async fn read_key_file(&self) -> KeyRingResult<Vec<Key>> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| KeyRingError::FileIo {
                path: self.path.clone(),
                source,
            })?;
        let encoded: Vec<String> =
            serde_json::from_str(&json).map_err(|e| KeyRingError::MalformedKeyFile {
                reason: e.to_string(),
            })?;
        encoded.iter().map(|s| Key::decode(s)).collect()
    }

    /// Replace the active ring with the contents of the key file.
    pub async fn load(&self) -> KeyRingResult<()> {
        let _guard = self.writer.lock().await;
        let keys = self.read_key_file().await?;
        let expected = self.capacity();
        if keys.len() != expected {
            return Err(KeyRingError::KeyCountMismatch {
                expected,
                actual: keys.len(),
            });
        }
        self.swap(keys);
        Ok(())
    }

    /// Push a fresh key and drop the oldest.
    ///
    /// Falls back to a full reset when the capacity has changed since the
    /// ring was last persisted.
    pub async fn rotate(&self) -> KeyRingResult<()> {
        let _guard = self.writer.lock().await;
        let current = self.snapshot();
        if current.is_empty() {
            return Err(KeyRingError::NoActiveKeys);
        }

        let capacity = self.capacity();
        let next = if current.len() == capacity {
            let mut next = Vec::with_capacity(capacity);
            next.push(Key::generate()?);
            next.extend(current.iter().take(capacity - 1).cloned());
            next
        } else {
            tracing::warn!(
                from = current.len(),
                to = capacity,
                "Key ring capacity changed; resetting all keys"
            );
            Self::generate(capacity)?
        };

        self.persist_locked(next).await?;
        tracing::info!(keys = capacity, "Rotated key ring");
        Ok(())
    }

    /// Regenerate every key. All outstanding tokens become invalid.
    pub async fn reset(&self) -> KeyRingResult<()> {
        let _guard = self.writer.lock().await;
        let keys = Self::generate(self.capacity())?;
        self.persist_locked(keys).await?;
        tracing::info!(keys = self.capacity(), "Reset key ring");
        Ok(())
    }

    /// The active ring, newest first.
    pub fn snapshot(&self) -> Arc<[Key]> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of keys in the active ring.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the ring has been initialised.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity N.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    /// Change the configured capacity. Takes effect at the next rotation.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity.max(1), Ordering::Release);
    }

    /// Key file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist_locked(&self, keys: Vec<Key>) -> KeyRingResult<()> {
        let capacity = self.capacity();
        if keys.len() > capacity {
            return Err(KeyRingError::CapacityExceeded {
                count: keys.len(),
                capacity,
            });
        }

        let encoded: Vec<String> = keys.iter().map(Key::encode).collect();
        let json = serde_json::to_vec(&encoded).map_err(|e| KeyRingError::MalformedKeyFile {
            reason: e.to_string(),
        })?;
        write_private(&self.path, &json)
            .await
            .map_err(|source| KeyRingError::FileIo {
                path: self.path.clone(),
                source,
            })?;

        self.swap(keys);
        Ok(())
    }

    fn swap(&self, keys: Vec<Key>) {
        let next: Arc<[Key]> = Arc::from(keys);
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("path", &self.path)
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// Write `contents` to `path` via a temporary file and rename, owner-only.
async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let _ = tokio::fs::remove_file(&tmp).await;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await
}
