//!
//! Wicket: invitation-based authentication middleware with rotating,
//! encrypted session tokens.
//!
//! ## Core Concepts
//!
//! * **KeyRing (`keyring::KeyRing`)**: A fixed-capacity, newest-first ring of symmetric keys, persisted to a key file and rotated periodically.
//! * **TokenCodec (`token::TokenCodec`)**: Seals JSON payloads with the newest key and opens them with any key in the ring, enforcing a maximum token age of `capacity × rotation interval`.
//! * **UserStore (`store::UserStore`)**: Transactional storage of user records indexed both by stable id and by unique name, over a pluggable backend (`backend::BackendImpl`).
//! * **Session (`session::Session`)**: The http-only cookie carrying a sealed `SessionUser`.
//! * **Invitations (`invite::Invitations`)**: Pending users sealed into bearer tokens, redeemed exactly once for a name and password.
//! * **Gate (`gate::wrap`)**: axum middleware admitting callers by admin flag or trust level and serving the login surface to everyone else.
//! * **Authority (`Authority`)**: The context object tying the above together.

pub mod authority;
pub mod backend;
pub mod clock;
pub mod config;
pub mod constants;
pub mod gate;
pub mod invite;
pub mod keyring;
pub mod session;
pub mod store;
pub mod token;
pub mod user;

pub use authority::Authority;
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use config::Options;
pub use gate::Rule;
pub use user::{SessionUser, User, UserId};

use axum::http::StatusCode;

/// Result type used throughout the wicket library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the wicket library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured key ring errors from the keyring module
    #[error(transparent)]
    KeyRing(keyring::KeyRingError),

    /// Structured token errors from the token module
    #[error(transparent)]
    Token(token::TokenError),

    /// Structured store errors from the backend module
    #[error(transparent)]
    Store(backend::StoreError),

    /// Structured user and invitation errors from the user module
    #[error(transparent)]
    User(user::UserError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::KeyRing(_) => "keyring",
            Error::Token(_) => "token",
            Error::Store(_) => "store",
            Error::User(_) => "user",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is authentication- or invitation-related.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::User(user_err) => user_err.is_authentication_error(),
            _ => false,
        }
    }

    /// Check if this error indicates a name conflict.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::User(user_err) => user_err.is_conflict(),
            Error::Store(store_err) => store_err.is_name_conflict(),
            _ => false,
        }
    }

    /// Check if this error was caused by invalid caller input.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::User(user_err) => user_err.is_validation_error(),
            Error::Store(store_err) => store_err.is_logical_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::KeyRing(keyring_err) => keyring_err.is_io_error(),
            Error::Store(store_err) => store_err.is_io_error(),
            _ => false,
        }
    }

    /// HTTP status to answer with at the request boundary.
    ///
    /// 401 for authentication and invitation failures, 409 for name
    /// conflicts, 400 for invalid input, 500 for everything else.
    pub fn status_code(&self) -> StatusCode {
        if self.is_authentication_error() {
            StatusCode::UNAUTHORIZED
        } else if self.is_conflict() {
            StatusCode::CONFLICT
        } else if self.is_validation_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
