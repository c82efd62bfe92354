//! A single symmetric key.

use aes_gcm::Aes256Gcm;
use aes_gcm::KeyInit;
use base64ct::{Base64Url, Encoding};
use rand::{RngCore, rngs::OsRng};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::KeyRingError;

/// Key length in bytes (AES-256).
pub const KEY_LENGTH: usize = 32;

/// A 256-bit secret used to authenticate and encrypt tokens.
///
/// Immutable once generated and wiped from memory on drop. The only
/// serialized form is the base64 string written to the key file.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    bytes: [u8; KEY_LENGTH],
}

impl Key {
    /// Draw a fresh key from the OS randomness source.
    pub fn generate() -> Result<Self, KeyRingError> {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| KeyRingError::KeyGeneration {
                reason: e.to_string(),
            })?;
        Ok(Self { bytes })
    }

    /// Key-file representation.
    pub(crate) fn encode(&self) -> String {
        Base64Url::encode_string(&self.bytes)
    }

    /// Parse one entry of the key file.
    pub(crate) fn decode(encoded: &str) -> Result<Self, KeyRingError> {
        let mut decoded =
            Base64Url::decode_vec(encoded).map_err(|e| KeyRingError::MalformedKeyFile {
                reason: format!("invalid key encoding: {e}"),
            })?;
        if decoded.len() != KEY_LENGTH {
            let len = decoded.len();
            decoded.zeroize();
            return Err(KeyRingError::MalformedKeyFile {
                reason: format!("expected {KEY_LENGTH}-byte key, found {len} bytes"),
            });
        }
        let mut bytes = [0u8; KEY_LENGTH];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { bytes })
    }

    /// AEAD cipher keyed with this secret.
    pub(crate) fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(&self.bytes))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        // Not constant-time. Never compare against caller input.
        self.bytes == other.bytes
    }
}

impl Eq for Key {}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Key(<redacted>)")
    }
}
