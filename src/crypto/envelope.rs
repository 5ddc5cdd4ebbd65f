//! The xdata/xtime transport envelope codec
//!
//! Every request body sent to the backend is the pair
//! `{"xdata": <base64url ciphertext>, "xtime": <epoch ms>}`, and every
//! response comes back in the same shape. The IV is derived deterministically
//! from the millisecond timestamp, so the same `xtime` must be used for both
//! directions; a mismatch yields a padding failure, never a crash.
//!
//! Decryption holds an explicit ordered list of candidate keys (primary
//! first, retired keys after) so that key rotation does not break in-flight
//! envelopes.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::cipher::{cbc_decrypt, cbc_encrypt, decode_b64url_tolerant, BLOCK_SIZE};
use crate::config::KeyMaterial;
use crate::error::{XdataError, XdataResult};

/// The wire envelope exchanged with the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// URL-safe base64 ciphertext (padding kept)
    pub xdata: String,
    /// Epoch milliseconds captured at encryption time; also the IV seed
    pub xtime: i64,
}

/// Derive the 16-byte AES IV from an envelope timestamp
///
/// The IV is the UTF-8 bytes of the *first 16 hex characters* of
/// SHA-256(decimal string of the timestamp). The hex characters are used
/// directly as bytes, not hex-decoded. Two encryptions in the same
/// millisecond therefore share an IV; callers must take a fresh timestamp
/// per encryption.
pub fn derive_iv(xtime_ms: i64) -> [u8; BLOCK_SIZE] {
    let digest = Sha256::digest(xtime_ms.to_string().as_bytes());
    let hex_digest = hex::encode(digest);
    let mut iv = [0u8; BLOCK_SIZE];
    iv.copy_from_slice(&hex_digest.as_bytes()[..BLOCK_SIZE]);
    iv
}

/// Encrypts payloads into wire envelopes under the primary xdata key
pub struct Encryptor {
    key: Zeroizing<Vec<u8>>,
}

impl Encryptor {
    /// Create an encryptor from raw key bytes (16/24/32)
    pub fn new(key: &[u8]) -> XdataResult<Self> {
        match key.len() {
            16 | 24 | 32 => Ok(Self {
                key: Zeroizing::new(key.to_vec()),
            }),
            got => Err(XdataError::KeyLength { got }),
        }
    }

    /// Create an encryptor from loaded key material
    ///
    /// # Errors
    ///
    /// `XdataError::Config` when no primary xdata key is configured.
    pub fn from_keys(keys: &KeyMaterial) -> XdataResult<Self> {
        let key = keys
            .xdata_key()
            .ok_or_else(|| XdataError::Config("XDATA_KEY is not configured".into()))?;
        Self::new(key)
    }

    /// Encrypt a JSON-serializable payload at the given timestamp
    ///
    /// Serialization is compact (no extraneous whitespace) so the backend
    /// signs/hashes the same bytes. The operation is deterministic in
    /// `(payload, xtime_ms, key)`.
    pub fn encrypt<T: Serialize>(&self, payload: &T, xtime_ms: i64) -> XdataResult<Envelope> {
        let plain = serde_json::to_string(payload)?;
        let iv = derive_iv(xtime_ms);
        let ct = cbc_encrypt(&self.key, &iv, plain.as_bytes())?;
        Ok(Envelope {
            xdata: URL_SAFE.encode(ct),
            xtime: xtime_ms,
        })
    }
}

/// Decrypts wire envelopes, trying an ordered list of candidate keys
///
/// The first key that yields a clean PKCS7 unpad and strict UTF-8 decode
/// wins. JSON parsing happens after key selection: a payload that decrypts
/// but is not a JSON object fails soft, because this protocol only ever
/// carries objects.
pub struct Decryptor {
    candidates: Vec<Zeroizing<Vec<u8>>>,
}

impl Decryptor {
    /// Create a decryptor from an ordered candidate key list
    ///
    /// # Errors
    ///
    /// `XdataError::Config` for an empty list, `XdataError::KeyLength` for
    /// any candidate with an unusable length.
    pub fn new(candidates: Vec<Vec<u8>>) -> XdataResult<Self> {
        if candidates.is_empty() {
            return Err(XdataError::Config("no decrypt candidate keys".into()));
        }
        for key in &candidates {
            if !matches!(key.len(), 16 | 24 | 32) {
                return Err(XdataError::KeyLength { got: key.len() });
            }
        }
        Ok(Self {
            candidates: candidates.into_iter().map(Zeroizing::new).collect(),
        })
    }

    /// Create a decryptor from loaded key material (primary key first,
    /// retired keys after)
    pub fn from_keys(keys: &KeyMaterial) -> XdataResult<Self> {
        Self::new(keys.decrypt_candidates())
    }

    /// Decrypt an envelope to its plaintext string, multi-key
    ///
    /// # Errors
    ///
    /// `XdataError::Encoding` for undecodable base64, `XdataError::Crypto`
    /// when every candidate key fails.
    pub fn try_decrypt_plaintext(&self, envelope: &Envelope) -> XdataResult<String> {
        if envelope.xdata.is_empty() {
            return Err(XdataError::Encoding("empty xdata".into()));
        }
        let ct = decode_b64url_tolerant(&envelope.xdata)?;
        let iv = derive_iv(envelope.xtime);

        for key in &self.candidates {
            if let Ok(padded) = cbc_decrypt(key, &iv, &ct) {
                if let Ok(text) = String::from_utf8(padded) {
                    return Ok(text);
                }
            }
        }
        Err(XdataError::Crypto(
            "all candidate keys failed to decrypt xdata".into(),
        ))
    }

    /// Decrypt an envelope to a JSON value, multi-key
    pub fn try_decrypt(&self, envelope: &Envelope) -> XdataResult<Value> {
        let text = self.try_decrypt_plaintext(envelope)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fail-soft decrypt: always returns a JSON object map
    ///
    /// Wrong key, corrupt ciphertext, wrong timestamp, non-JSON and
    /// non-object payloads all collapse to an empty map with a logged
    /// warning. This is the external contract of the protocol layer.
    pub fn decrypt(&self, envelope: &Envelope) -> Map<String, Value> {
        match self.try_decrypt(envelope) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::warn!(
                    "decrypted xdata is not a JSON object ({})",
                    json_type_name(&other)
                );
                Map::new()
            }
            Err(e) => {
                tracing::warn!("xdata decrypt failed: {}", e);
                Map::new()
            }
        }
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
