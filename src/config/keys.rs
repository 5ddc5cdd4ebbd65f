//! Key material loading and validation
//!
//! All secrets are loaded once at startup and are immutable for the process
//! lifetime. The only rotation affordance is the ordered list of xdata
//! decrypt candidates: the primary key first, then retired keys from the
//! `XDATA_KEYS` environment list, then any keys read from an `xdata.keys`
//! file. This lets online key rotation succeed for responses still encrypted
//! under an outgoing key.
//!
//! ## Key string formats
//!
//! Each key string is one of:
//! - `hex:...` — hex-decoded bytes
//! - `b64:...` — standard-base64-decoded bytes
//! - anything else — raw UTF-8 bytes
//!
//! AES keys must decode to 16, 24, or 32 bytes (AES-128/192/256).

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

use crate::error::{XdataError, XdataResult};

/// Environment variable: primary xdata AES key (used for encryption)
pub const ENV_XDATA_KEY: &str = "XDATA_KEY";
/// Environment variable: comma-separated retired xdata keys (decrypt only)
pub const ENV_XDATA_KEYS: &str = "XDATA_KEYS";
/// Environment variable: AES key for the field obfuscator and MSISDN codec
pub const ENV_ENCRYPTED_FIELD_KEY: &str = "ENCRYPTED_FIELD_KEY";
/// Environment variable: AES key for device fingerprint generation
pub const ENV_AX_FP_KEY: &str = "AX_FP_KEY";
/// Environment variable: HMAC key for the AX API signature (ASCII)
pub const ENV_AX_API_SIG_KEY: &str = "AX_API_SIG_KEY";
/// Environment variable: HMAC base secret for the x-signature family
pub const ENV_X_API_BASE_SECRET: &str = "X_API_BASE_SECRET";

/// Default filename for extra decrypt candidates
pub const KEY_FILE_NAME: &str = "xdata.keys";

/// Parse a key string into AES key bytes
///
/// Supports `hex:`/`b64:` tagged encodings, otherwise raw UTF-8.
///
/// # Errors
///
/// Returns `XdataError::Config` for empty/undecodable strings and
/// `XdataError::KeyLength` when the decoded length is not 16/24/32.
pub fn parse_key(spec: &str) -> XdataResult<Vec<u8>> {
    let s = spec.trim();
    if s.is_empty() {
        return Err(XdataError::Config("empty key string".into()));
    }

    let bytes = if let Some(rest) = strip_tag(s, "hex:") {
        hex::decode(rest.trim())
            .map_err(|e| XdataError::Config(format!("invalid hex key: {}", e)))?
    } else if let Some(rest) = strip_tag(s, "b64:") {
        STANDARD
            .decode(rest.trim())
            .map_err(|e| XdataError::Config(format!("invalid base64 key: {}", e)))?
    } else {
        s.as_bytes().to_vec()
    };

    match bytes.len() {
        16 | 24 | 32 => Ok(bytes),
        got => Err(XdataError::KeyLength { got }),
    }
}

/// Case-insensitive prefix strip ("HEX:" and "hex:" both work)
fn strip_tag<'a>(s: &'a str, tag: &str) -> Option<&'a str> {
    if s.len() >= tag.len()
        && s.is_char_boundary(tag.len())
        && s[..tag.len()].eq_ignore_ascii_case(tag)
    {
        Some(&s[tag.len()..])
    } else {
        None
    }
}

/// Process-wide signing and encryption key material
///
/// Individual secrets are optional so that partially configured environments
/// still work for the features they cover; each consumer fails (softly or
/// with `XdataError::Config`) when the key it needs is absent.
#[derive(Default, Clone)]
pub struct KeyMaterial {
    xdata_key: Option<Zeroizing<Vec<u8>>>,
    extra_xdata_keys: Vec<Zeroizing<Vec<u8>>>,
    field_key: Option<Zeroizing<Vec<u8>>>,
    fingerprint_key: Option<Zeroizing<Vec<u8>>>,
    ax_api_sig_key: Option<String>,
    base_secret: Option<String>,
}

impl KeyMaterial {
    /// Load key material from the process environment
    ///
    /// Reads `XDATA_KEY`, `XDATA_KEYS`, `ENCRYPTED_FIELD_KEY`, `AX_FP_KEY`,
    /// `AX_API_SIG_KEY`, and `X_API_BASE_SECRET`. If an `xdata.keys` file
    /// exists in the working directory its lines are appended to the decrypt
    /// candidate list. Invalid key strings are skipped with a logged warning
    /// rather than failing the whole load.
    pub fn from_env() -> Self {
        let mut keys = Self::default();

        if let Ok(raw) = std::env::var(ENV_XDATA_KEY) {
            match parse_key(&raw) {
                Ok(k) => keys.xdata_key = Some(Zeroizing::new(k)),
                Err(e) => tracing::warn!("{}: {}", ENV_XDATA_KEY, e),
            }
        }

        if let Ok(raw) = std::env::var(ENV_XDATA_KEYS) {
            for item in raw.split(',') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                match parse_key(item) {
                    Ok(k) => keys.extra_xdata_keys.push(Zeroizing::new(k)),
                    Err(e) => tracing::warn!("{} entry skipped: {}", ENV_XDATA_KEYS, e),
                }
            }
        }

        for (var, slot) in [
            (ENV_ENCRYPTED_FIELD_KEY, &mut keys.field_key),
            (ENV_AX_FP_KEY, &mut keys.fingerprint_key),
        ] {
            if let Ok(raw) = std::env::var(var) {
                match parse_key(&raw) {
                    Ok(k) => *slot = Some(Zeroizing::new(k)),
                    Err(e) => tracing::warn!("{}: {}", var, e),
                }
            }
        }

        if let Ok(raw) = std::env::var(ENV_AX_API_SIG_KEY) {
            if !raw.trim().is_empty() {
                keys.ax_api_sig_key = Some(raw.trim().to_string());
            }
        }
        if let Ok(raw) = std::env::var(ENV_X_API_BASE_SECRET) {
            if !raw.trim().is_empty() {
                keys.base_secret = Some(raw.trim().to_string());
            }
        }

        if Path::new(KEY_FILE_NAME).exists() {
            if let Err(e) = keys.load_key_file(KEY_FILE_NAME) {
                tracing::warn!("failed reading {}: {}", KEY_FILE_NAME, e);
            }
        }

        keys
    }

    /// Append decrypt candidates from a key file (one key per line,
    /// blank lines and `#` comments ignored; invalid lines skipped)
    pub fn load_key_file(&mut self, path: impl AsRef<Path>) -> XdataResult<()> {
        let text = std::fs::read_to_string(path.as_ref())?;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_key(line) {
                Ok(k) => self.extra_xdata_keys.push(Zeroizing::new(k)),
                Err(e) => tracing::warn!("key file entry skipped: {}", e),
            }
        }
        Ok(())
    }

    /// Set the primary xdata key
    pub fn with_xdata_key(mut self, spec: &str) -> XdataResult<Self> {
        self.xdata_key = Some(Zeroizing::new(parse_key(spec)?));
        Ok(self)
    }

    /// Append a retired xdata key to the decrypt candidate list
    pub fn with_extra_xdata_key(mut self, spec: &str) -> XdataResult<Self> {
        self.extra_xdata_keys.push(Zeroizing::new(parse_key(spec)?));
        Ok(self)
    }

    /// Set the field obfuscation / MSISDN codec key
    pub fn with_field_key(mut self, spec: &str) -> XdataResult<Self> {
        self.field_key = Some(Zeroizing::new(parse_key(spec)?));
        Ok(self)
    }

    /// Set the device fingerprint key
    pub fn with_fingerprint_key(mut self, spec: &str) -> XdataResult<Self> {
        self.fingerprint_key = Some(Zeroizing::new(parse_key(spec)?));
        Ok(self)
    }

    /// Set the AX API signature HMAC key
    pub fn with_ax_api_sig_key(mut self, key: &str) -> Self {
        self.ax_api_sig_key = Some(key.to_string());
        self
    }

    /// Set the x-signature HMAC base secret
    pub fn with_base_secret(mut self, secret: &str) -> Self {
        self.base_secret = Some(secret.to_string());
        self
    }

    /// The primary xdata key, if configured
    pub fn xdata_key(&self) -> Option<&[u8]> {
        self.xdata_key.as_deref().map(|k| k.as_slice())
    }

    /// Ordered, de-duplicated decrypt candidates: primary key first,
    /// then retired keys in configuration order
    pub fn decrypt_candidates(&self) -> Vec<Vec<u8>> {
        let mut out: Vec<Vec<u8>> = Vec::new();
        let mut push = |k: &[u8]| {
            if !out.iter().any(|seen| seen.as_slice() == k) {
                out.push(k.to_vec());
            }
        };
        if let Some(k) = self.xdata_key.as_deref() {
            push(k);
        }
        for k in &self.extra_xdata_keys {
            push(k);
        }
        out
    }

    /// The field obfuscation / MSISDN codec key, if configured
    pub fn field_key(&self) -> Option<&[u8]> {
        self.field_key.as_deref().map(|k| k.as_slice())
    }

    /// The device fingerprint key, if configured
    pub fn fingerprint_key(&self) -> Option<&[u8]> {
        self.fingerprint_key.as_deref().map(|k| k.as_slice())
    }

    /// The AX API signature HMAC key, if configured
    pub fn ax_api_sig_key(&self) -> Option<&str> {
        self.ax_api_sig_key.as_deref()
    }

    /// The x-signature HMAC base secret, if configured
    pub fn base_secret(&self) -> Option<&str> {
        self.base_secret.as_deref()
    }
}

// Deliberately no Debug derive: key material must not end up in logs.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("xdata_key", &self.xdata_key.as_ref().map(|k| k.len()))
            .field("extra_xdata_keys", &self.extra_xdata_keys.len())
            .field("field_key", &self.field_key.as_ref().map(|k| k.len()))
            .field(
                "fingerprint_key",
                &self.fingerprint_key.as_ref().map(|k| k.len()),
            )
            .field("ax_api_sig_key", &self.ax_api_sig_key.is_some())
            .field("base_secret", &self.base_secret.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_raw_key() {
        let key = parse_key("0123456789abcdef").unwrap();
        assert_eq!(key, b"0123456789abcdef");
    }

    #[test]
    fn test_parse_hex_key() {
        let key = parse_key("hex:30313233343536373839616263646566").unwrap();
        assert_eq!(key, b"0123456789abcdef");
    }

    #[test]
    fn test_parse_b64_key() {
        let key = parse_key("b64:MDEyMzQ1Njc4OWFiY2RlZg==").unwrap();
        assert_eq!(key, b"0123456789abcdef");
    }

    #[test]
    fn test_parse_key_rejects_bad_length() {
        let err = parse_key("too-short").unwrap_err();
        assert!(matches!(err, XdataError::KeyLength { got: 9 }));
    }

    #[test]
    fn test_parse_key_rejects_empty() {
        assert!(parse_key("").is_err());
        assert!(parse_key("   ").is_err());
    }

    #[test]
    fn test_candidates_primary_first_and_deduped() {
        let keys = KeyMaterial::default()
            .with_xdata_key("0123456789abcdef")
            .unwrap()
            .with_extra_xdata_key("fedcba9876543210")
            .unwrap()
            .with_extra_xdata_key("0123456789abcdef")
            .unwrap();

        let candidates = keys.decrypt_candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], b"0123456789abcdef");
        assert_eq!(candidates[1], b"fedcba9876543210");
    }

    #[test]
    fn test_key_file_loading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# retired keys").unwrap();
        writeln!(file, "fedcba9876543210").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "hex:30313233343536373839616263646566").unwrap();
        writeln!(file, "garbage-len").unwrap();

        let mut keys = KeyMaterial::default();
        keys.load_key_file(file.path()).unwrap();

        let candidates = keys.decrypt_candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], b"fedcba9876543210");
        assert_eq!(candidates[1], b"0123456789abcdef");
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let keys = KeyMaterial::default()
            .with_xdata_key("0123456789abcdef")
            .unwrap();
        let rendered = format!("{:?}", keys);
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
