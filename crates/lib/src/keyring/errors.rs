//! Error types for the key ring.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while generating, loading, persisting or rotating keys.
///
/// Every variant except [`KeyRingError::NoActiveKeys`] is fatal at startup:
/// the process must not serve requests without a verified ring.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum KeyRingError {
    /// The OS randomness source failed.
    #[error("Key generation failed: {reason}")]
    KeyGeneration {
        /// Description from the RNG
        reason: String,
    },

    /// The key file holds a different number of keys than configured.
    #[error("Key count mismatch: expected {expected}, found {actual}")]
    KeyCountMismatch {
        /// Configured ring capacity
        expected: usize,
        /// Number of keys found in the file
        actual: usize,
    },

    /// Rotation was requested before the ring was loaded or initialised.
    #[error("No active keys; load or initialise the ring first")]
    NoActiveKeys,

    /// Refused to persist more keys than the ring can hold.
    #[error("Refusing to persist {count} keys into a ring of capacity {capacity}")]
    CapacityExceeded {
        /// Number of keys offered
        count: usize,
        /// Configured ring capacity
        capacity: usize,
    },

    /// Reading or writing the key file failed.
    #[error("Key file I/O error at {}", path.display())]
    FileIo {
        /// Key file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The key file could not be decoded.
    #[error("Malformed key file: {reason}")]
    MalformedKeyFile {
        /// What was wrong with it
        reason: String,
    },
}

impl KeyRingError {
    /// Check if this error belongs to the I/O class (file access or content).
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            KeyRingError::FileIo { .. }
                | KeyRingError::MalformedKeyFile { .. }
                | KeyRingError::CapacityExceeded { .. }
        )
    }

    /// Check if the key file is missing entirely.
    pub fn is_missing_file(&self) -> bool {
        matches!(
            self,
            KeyRingError::FileIo { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Check if the persisted ring no longer matches the configured capacity.
    pub fn is_count_mismatch(&self) -> bool {
        matches!(self, KeyRingError::KeyCountMismatch { .. })
    }

    /// Check if the ring was used before being initialised.
    pub fn is_no_active_keys(&self) -> bool {
        matches!(self, KeyRingError::NoActiveKeys)
    }

    /// Check if this error came from the randomness source.
    pub fn is_key_generation_error(&self) -> bool {
        matches!(self, KeyRingError::KeyGeneration { .. })
    }
}

impl From<KeyRingError> for crate::Error {
    fn from(err: KeyRingError) -> Self {
        crate::Error::KeyRing(err)
    }
}
