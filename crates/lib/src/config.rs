//! Configuration consumed by the core.
//!
//! [`Options`] mirrors the recognised option set: data directory, env prefix,
//! rotation interval, ring capacity, database file name and cookie name.
//! Unset, zero or empty values fall back to the defaults in [`crate::constants`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONFIG_PREFIX, DEFAULT_COOKIE_NAME, DEFAULT_DB_NAME, DEFAULT_DIR,
    DEFAULT_KEY_ROTATION_INTERVAL_HOURS, DEFAULT_NUMBER_OF_KEYS, JSON_FILE, KEY_FILE,
};

/// Configuration object for an [`Authority`](crate::Authority).
///
/// Construct with struct update syntax over `Options::default()` and call
/// [`Options::resolved`] (done by `Authority::open`) to fill in defaults and
/// apply the `<prefix>DATA_DIR` environment override.
///
/// ```
/// use wicket::config::Options;
///
/// let opts = Options {
///     data_dir: Some("/tmp/wicket-doc".into()),
///     number_of_keys: 4,
///     key_rotation_interval_hours: 12.0,
///     ..Options::default()
/// }
/// .resolved();
///
/// assert_eq!(opts.max_token_age().as_secs(), 4 * 12 * 3600);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Directory holding the key file and the user database.
    pub data_dir: Option<PathBuf>,
    /// Prefix for environment overrides.
    pub config_prefix: String,
    /// Hours between key rotations.
    pub key_rotation_interval_hours: f64,
    /// Ring capacity N.
    pub number_of_keys: usize,
    /// User database file name inside `data_dir`.
    pub db_name: String,
    /// Session cookie name.
    pub cookie_name: String,
}

impl Options {
    /// Fill every unset field with its default and apply environment overrides.
    pub fn resolved(mut self) -> Self {
        if self.config_prefix.is_empty() {
            self.config_prefix = DEFAULT_CONFIG_PREFIX.to_string();
        }
        if self.key_rotation_interval_hours <= 0.0 || !self.key_rotation_interval_hours.is_finite()
        {
            self.key_rotation_interval_hours = DEFAULT_KEY_ROTATION_INTERVAL_HOURS;
        }
        if self.number_of_keys == 0 {
            self.number_of_keys = DEFAULT_NUMBER_OF_KEYS;
        }
        if self.db_name.is_empty() {
            self.db_name = DEFAULT_DB_NAME.to_string();
        }
        if self.cookie_name.is_empty() {
            self.cookie_name = DEFAULT_COOKIE_NAME.to_string();
        }

        let env_key = format!("{}DATA_DIR", self.config_prefix);
        if let Ok(dir) = std::env::var(&env_key)
            && !dir.is_empty()
        {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if self.data_dir.is_none() {
            self.data_dir = Some(default_data_dir());
        }
        self
    }

    /// The data directory; the default location if unresolved.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Path of the key file.
    pub fn key_file(&self) -> PathBuf {
        self.data_dir().join(KEY_FILE)
    }

    /// Path of the user database.
    pub fn db_path(&self) -> PathBuf {
        let name = if self.db_name.is_empty() {
            DEFAULT_DB_NAME
        } else {
            self.db_name.as_str()
        };
        self.data_dir().join(name)
    }

    /// Path of the JSON snapshot used by the in-memory store.
    pub fn json_path(&self) -> PathBuf {
        self.data_dir().join(JSON_FILE)
    }

    /// Key rotation interval, saturating at [`Duration::MAX`].
    pub fn rotation_interval(&self) -> Duration {
        let hours = if self.key_rotation_interval_hours > 0.0 {
            self.key_rotation_interval_hours
        } else {
            DEFAULT_KEY_ROTATION_INTERVAL_HOURS
        };
        Duration::try_from_secs_f64(hours * 3600.0).unwrap_or(Duration::MAX)
    }

    /// Ring capacity, defaulted.
    pub fn capacity(&self) -> usize {
        if self.number_of_keys == 0 {
            DEFAULT_NUMBER_OF_KEYS
        } else {
            self.number_of_keys
        }
    }

    /// Oldest acceptable token: `capacity × rotation interval`, saturating.
    pub fn max_token_age(&self) -> Duration {
        u32::try_from(self.capacity())
            .ok()
            .and_then(|n| self.rotation_interval().checked_mul(n))
            .unwrap_or(Duration::MAX)
    }
}

/// `~/.config/wicket` on Linux, the platform equivalent elsewhere.
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join(DEFAULT_DIR))
        .unwrap_or_else(|| Path::new(".").join(DEFAULT_DIR))
}
