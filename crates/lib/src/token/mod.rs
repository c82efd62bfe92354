//! Encrypted, timestamped tokens
//!
//! A token is the URL-safe, unpadded base64 encoding of
//!
//! ```text
//! 0x80 | purpose: u8 | issued_at: u64 BE seconds | nonce: 12 bytes | AES-256-GCM ciphertext + tag
//! ```
//!
//! The version byte, purpose and timestamp are bound as associated data, so
//! none can be altered without failing authentication. A codec only opens
//! tokens of its own [`TokenPurpose`]: an invitation never reads as a session.
//! Tokens are produced with
//! the newest key in the ring and accepted if any key in the ring verifies
//! them and they are no older than `capacity × rotation interval`.
//!
//! Decoding returns `Option`: wrong key, expiry, tampering and garbage input
//! are indistinguishable to the caller.

mod errors;

use std::sync::Arc;
use std::time::Duration;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, OsRng, Payload},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Serialize, de::DeserializeOwned};

pub use errors::TokenError;

use crate::clock::Clock;
use crate::keyring::KeyRing;

/// Format version byte.
pub const TOKEN_VERSION: u8 = 0x80;

/// Tokens stamped further than this into the future are rejected.
pub const MAX_CLOCK_SKEW_SECS: u64 = 60;

const HEADER_LEN: usize = 10;

/// What a token was issued for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenPurpose {
    #[default]
    Session = 1,
    Invitation = 2,
}
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encodes and decodes tokens against a shared [`KeyRing`].
#[derive(Clone)]
pub struct TokenCodec {
    ring: Arc<KeyRing>,
    rotation_interval: Duration,
    clock: Arc<dyn Clock>,
    purpose: TokenPurpose,
}

impl TokenCodec {
    /// Create a session codec over `ring`, with tokens living for
    /// `ring.capacity() × rotation_interval`.
    pub fn new(ring: Arc<KeyRing>, rotation_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ring,
            rotation_interval,
            clock,
            purpose: TokenPurpose::Session,
        }
    }

    /// The same ring and lifetime, sealing and opening `purpose` tokens only.
    pub fn with_purpose(&self, purpose: TokenPurpose) -> Self {
        Self {
            purpose,
            ..self.clone()
        }
    }

    pub fn purpose(&self) -> TokenPurpose {
        self.purpose
    }

    /// Serialize `payload` as JSON and seal it into a token.
    pub fn encode<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, TokenError> {
        let bytes =
            serde_json::to_vec(payload).map_err(|source| TokenError::Serialization { source })?;
        self.encode_bytes(&bytes)
    }

    /// Seal raw bytes into a token using the newest key.
    pub fn encode_bytes(&self, plaintext: &[u8]) -> Result<String, TokenError> {
        let ring = self.ring.snapshot();
        let key = ring.first().ok_or(TokenError::KeyUnavailable)?;

        let mut header = [0u8; HEADER_LEN];
        header[0] = TOKEN_VERSION;
        header[1] = self.purpose as u8;
        header[2..].copy_from_slice(&self.clock.now_secs().to_be_bytes());

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = key
            .cipher()
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: &header,
                },
            )
            .map_err(|_| TokenError::Encryption)?;

        let mut raw = Vec::with_capacity(HEADER_LEN + NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&header);
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);
        Ok(Base64UrlUnpadded::encode_string(&raw))
    }

    /// Open a token, trying every key newest first.
    ///
    /// Returns `None` for any failure.
    pub fn decode(&self, token: &str) -> Option<Vec<u8>> {
        let raw = Base64UrlUnpadded::decode_vec(token.trim()).ok()?;
        if raw.len() < HEADER_LEN + NONCE_LEN + TAG_LEN
            || raw[0] != TOKEN_VERSION
            || raw[1] != self.purpose as u8
        {
            return None;
        }

        let (header, rest) = raw.split_at(HEADER_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let issued_at = u64::from_be_bytes(header[2..].try_into().ok()?);
        let nonce = Nonce::from_slice(nonce);

        let ring = self.ring.snapshot();
        let plaintext = ring.iter().find_map(|key| {
            key.cipher()
                .decrypt(
                    nonce,
                    Payload {
                        msg: ciphertext,
                        aad: header,
                    },
                )
                .ok()
        })?;

        self.is_fresh(issued_at).then_some(plaintext)
    }

    /// Open a token and deserialize its JSON payload.
    pub fn decode_as<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        let bytes = self.decode(token)?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Oldest acceptable token age under the current capacity.
    ///
    /// Saturates at [`Duration::MAX`].
    pub fn max_age(&self) -> Duration {
        u32::try_from(self.ring.capacity())
            .ok()
            .and_then(|n| self.rotation_interval.checked_mul(n))
            .unwrap_or(Duration::MAX)
    }

    /// The ring this codec reads.
    pub fn ring(&self) -> &Arc<KeyRing> {
        &self.ring
    }

    fn is_fresh(&self, issued_at: u64) -> bool {
        let now = self.clock.now_secs();
        if issued_at > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
            return false;
        }
        now.saturating_sub(issued_at) <= self.max_age().as_secs()
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("purpose", &self.purpose)
            .field("rotation_interval", &self.rotation_interval)
            .field("max_age", &self.max_age())
            .finish_non_exhaustive()
    }
}
