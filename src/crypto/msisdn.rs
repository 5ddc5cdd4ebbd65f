//! Family Circle MSISDN codec
//!
//! Phone numbers exchanged with the Family Circle endpoints travel as
//! `urlsafe_b64(AES-CBC(key, iv, pad(msisdn)))` concatenated with the
//! 16-hex-character IV string (IV characters used as ASCII bytes). Unlike
//! the field obfuscator this codec is genuinely round-tripped; decryption
//! splits the trailing 16 characters back off as the IV.
//!
//! Both directions fail soft to an empty string, never past the codec
//! boundary.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use zeroize::Zeroizing;

use super::cipher::{
    cbc_decrypt, cbc_encrypt, decode_b64url_tolerant, iv_from_hex16, random_iv_hex16,
};
use crate::config::KeyMaterial;
use crate::error::{XdataError, XdataResult};

/// Encrypts/decrypts Family Circle phone numbers
pub struct MsisdnCodec {
    key: Zeroizing<Vec<u8>>,
}

impl MsisdnCodec {
    /// Create a codec from raw key bytes (16/24/32)
    pub fn new(key: &[u8]) -> XdataResult<Self> {
        match key.len() {
            16 | 24 | 32 => Ok(Self {
                key: Zeroizing::new(key.to_vec()),
            }),
            got => Err(XdataError::KeyLength { got }),
        }
    }

    /// Create a codec from loaded key material
    pub fn from_keys(keys: &KeyMaterial) -> XdataResult<Self> {
        let key = keys
            .field_key()
            .ok_or_else(|| XdataError::Config("ENCRYPTED_FIELD_KEY is not configured".into()))?;
        Self::new(key)
    }

    /// Encrypt an MSISDN with a fresh random IV; fails soft to ""
    pub fn encrypt(&self, msisdn: &str) -> String {
        let result = random_iv_hex16().and_then(|iv| self.encrypt_with_iv(msisdn, &iv));
        match result {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!("MSISDN encrypt failed: {}", e);
                String::new()
            }
        }
    }

    /// Encrypt an MSISDN under an explicit 16-hex-character IV
    pub fn encrypt_with_iv(&self, msisdn: &str, iv_hex16: &str) -> XdataResult<String> {
        if msisdn.is_empty() {
            return Err(XdataError::Config("empty msisdn".into()));
        }
        let iv = iv_from_hex16(iv_hex16)?;
        let ct = cbc_encrypt(&self.key, &iv, msisdn.as_bytes())?;
        Ok(URL_SAFE.encode(ct) + iv_hex16)
    }

    /// Decrypt an encrypted MSISDN blob; fails soft to ""
    ///
    /// Corrupt blobs, wrong keys, and bad padding all collapse to "".
    pub fn decrypt(&self, blob: &str) -> String {
        match self.try_decrypt(blob) {
            Ok(msisdn) => msisdn,
            Err(e) => {
                tracing::warn!("MSISDN decrypt failed: {}", e);
                String::new()
            }
        }
    }

    /// Decrypt an encrypted MSISDN blob, returning the full error
    pub fn try_decrypt(&self, blob: &str) -> XdataResult<String> {
        if blob.len() <= 16 {
            return Err(XdataError::Encoding(
                "encrypted msisdn shorter than its IV suffix".into(),
            ));
        }
        let split = blob.len() - 16;
        if !blob.is_char_boundary(split) {
            return Err(XdataError::Encoding("malformed encrypted msisdn".into()));
        }
        let (ct_b64, iv_hex) = blob.split_at(split);
        let iv = iv_from_hex16(iv_hex)?;
        let ct = decode_b64url_tolerant(ct_b64)?;
        let padded = cbc_decrypt(&self.key, &iv, &ct)?;
        String::from_utf8(padded)
            .map_err(|_| XdataError::Crypto("decrypted msisdn is not UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &[u8] = b"fedcba9876543210";

    fn codec() -> MsisdnCodec {
        MsisdnCodec::new(TEST_KEY).unwrap()
    }

    #[test]
    fn test_fixed_iv_vector() {
        let blob = codec()
            .encrypt_with_iv("6281234567890", "00112233445566aa")
            .unwrap();
        assert_eq!(blob, "ddnw3KENoX_7jYPsbaBjhQ==00112233445566aa");
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let blob = codec.encrypt("6281234567890");
        assert!(!blob.is_empty());
        assert_eq!(codec.decrypt(&blob), "6281234567890");
    }

    #[test]
    fn test_round_trip_maximal_length() {
        // 15 digits is the maximal E.164 length
        let codec = codec();
        let msisdn = "628123456789012";
        let blob = codec.encrypt(msisdn);
        assert_eq!(codec.decrypt(&blob), msisdn);
    }

    #[test]
    fn test_truncated_blob_fails_to_empty() {
        let codec = codec();
        let mut blob = codec.encrypt("6281234567890");
        blob.pop();
        assert_eq!(codec.decrypt(&blob), "");
    }

    #[test]
    fn test_wrong_key_fails_to_empty() {
        let blob = codec()
            .encrypt_with_iv("6281234567890", "00112233445566aa")
            .unwrap();
        let other = MsisdnCodec::new(b"0123456789abcdef").unwrap();
        assert_eq!(other.decrypt(&blob), "");
    }

    #[test]
    fn test_short_input_fails_to_empty() {
        assert_eq!(codec().decrypt(""), "");
        assert_eq!(codec().decrypt("0011223344556677"), "");
    }

    #[test]
    fn test_empty_msisdn_rejected() {
        assert!(codec().encrypt_with_iv("", "00112233445566aa").is_err());
        assert_eq!(codec().encrypt(""), "");
    }
}
