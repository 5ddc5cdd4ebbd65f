//! Opaque token-shaped field generator
//!
//! The backend expects `encrypted_payment_token` and
//! `encrypted_authentication_id` to look like encrypted blobs but never
//! decrypts them. This produces a string of the exact expected shape:
//! AES-CBC of a zero-length (fully padded) plaintext under the field key,
//! base64-encoded and concatenated with the 16-hex-character IV string.
//! There is no decrypt direction.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use zeroize::Zeroizing;

use super::cipher::{cbc_encrypt, iv_from_hex16, random_iv_hex16};
use crate::config::KeyMaterial;
use crate::error::{XdataError, XdataResult};

/// Produces backend-shaped opaque field values
pub struct FieldObfuscator {
    key: Zeroizing<Vec<u8>>,
}

impl FieldObfuscator {
    /// Create an obfuscator from raw key bytes (16/24/32)
    pub fn new(key: &[u8]) -> XdataResult<Self> {
        match key.len() {
            16 | 24 | 32 => Ok(Self {
                key: Zeroizing::new(key.to_vec()),
            }),
            got => Err(XdataError::KeyLength { got }),
        }
    }

    /// Create an obfuscator from loaded key material
    pub fn from_keys(keys: &KeyMaterial) -> XdataResult<Self> {
        let key = keys
            .field_key()
            .ok_or_else(|| XdataError::Config("ENCRYPTED_FIELD_KEY is not configured".into()))?;
        Self::new(key)
    }

    /// Build an opaque field value with an explicit or random IV
    ///
    /// The IV hex characters are used as ASCII bytes (never hex-decoded) and
    /// appended verbatim to the base64 ciphertext. Fails soft to an empty
    /// string on a malformed IV or RNG failure.
    pub fn build(&self, iv_hex16: Option<&str>, urlsafe_b64: bool) -> String {
        match self.try_build(iv_hex16, urlsafe_b64) {
            Ok(field) => field,
            Err(e) => {
                tracing::error!("encrypted field build failed: {}", e);
                String::new()
            }
        }
    }

    /// Build an opaque field value, returning the full error
    pub fn try_build(&self, iv_hex16: Option<&str>, urlsafe_b64: bool) -> XdataResult<String> {
        let iv_hex = match iv_hex16 {
            Some(s) => s.trim().to_string(),
            None => random_iv_hex16()?,
        };
        let iv = iv_from_hex16(&iv_hex)?;
        // empty plaintext pads to exactly one block
        let ct = cbc_encrypt(&self.key, &iv, b"")?;
        let encoded = if urlsafe_b64 {
            URL_SAFE.encode(ct)
        } else {
            STANDARD.encode(ct)
        };
        Ok(encoded + &iv_hex)
    }
}
