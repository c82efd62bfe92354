//! Constants used throughout the wicket library.
//!
//! Central definitions for default configuration values, file names and the
//! names of the two storage regions that make up the user store.

/// Directory name under the platform config dir when no data dir is given.
pub const DEFAULT_DIR: &str = "wicket";

/// Default prefix for environment overrides (e.g. `WICKET_DATA_DIR`).
pub const DEFAULT_CONFIG_PREFIX: &str = "WICKET_";

/// Default key rotation interval, in hours.
pub const DEFAULT_KEY_ROTATION_INTERVAL_HOURS: f64 = 99.0;

/// Default ring capacity.
pub const DEFAULT_NUMBER_OF_KEYS: usize = 3;

/// Default user database file name.
pub const DEFAULT_DB_NAME: &str = "wicket.db";

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "wicket";

/// Key file name inside the data directory.
pub const KEY_FILE: &str = "wicket.keys";

/// JSON snapshot of the in-memory user store inside the data directory.
pub const JSON_FILE: &str = "wicket.json";

/// Storage region holding user records keyed by stable id.
pub const USERS: &str = "users";

/// Storage region holding user records keyed by unique name.
pub const USER_NAME: &str = "user-name";

/// Value written over the session cookie on logout.
pub const LOGOUT_SENTINEL: &str = "thanks_for_visiting";

/// Trust level given to the bootstrap administrator.
pub const ROOT_TRUST: u32 = 1_000_000_000;
