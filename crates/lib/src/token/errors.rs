//! Error types for token encoding.
//!
//! There is no decode error: a token that fails to verify for
//! any reason decodes to `None`.

use thiserror::Error;

/// Errors that can occur while producing a token.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TokenError {
    /// The payload could not be serialized.
    #[error("Token payload serialization failed")]
    Serialization {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// The key ring is empty.
    #[error("No signing key available")]
    KeyUnavailable,

    /// The AEAD cipher refused the payload.
    #[error("Token encryption failed")]
    Encryption,
}

impl TokenError {
    /// Check if the failure is due to an uninitialised key ring.
    pub fn is_key_unavailable(&self) -> bool {
        matches!(self, TokenError::KeyUnavailable)
    }

    /// Check if the payload could not be serialized.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, TokenError::Serialization { .. })
    }
}

impl From<TokenError> for crate::Error {
    fn from(err: TokenError) -> Self {
        crate::Error::Token(err)
    }
}
