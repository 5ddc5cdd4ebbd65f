//! Shared AES-CBC/PKCS7 primitives
//!
//! All codecs in this crate (envelope, MSISDN, field obfuscator, fingerprint)
//! use AES-CBC with PKCS7 padding, keyed by a 16/24/32-byte secret whose
//! length selects AES-128/192/256. This module does the key-length dispatch
//! once so the callers stay small.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{XdataError, XdataResult};

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Encrypt with AES-CBC/PKCS7, selecting the cipher width from the key length
pub(crate) fn cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> XdataResult<Vec<u8>> {
    let ct = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|e| XdataError::Crypto(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|e| XdataError::Crypto(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|e| XdataError::Crypto(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        got => return Err(XdataError::KeyLength { got }),
    };
    Ok(ct)
}

/// Decrypt AES-CBC/PKCS7 ciphertext
///
/// Bad padding is the usual wrong-key symptom; it surfaces as
/// `XdataError::Crypto` without distinguishing the cause.
pub(crate) fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> XdataResult<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(XdataError::Crypto(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_SIZE
        )));
    }

    let bad_pad = |_| XdataError::Crypto("bad padding (wrong key or corrupted data)".into());
    let bad_len = |e: aes::cipher::InvalidLength| XdataError::Crypto(e.to_string());

    match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(bad_len)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(bad_pad),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(bad_len)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(bad_pad),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(bad_len)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(bad_pad),
        got => Err(XdataError::KeyLength { got }),
    }
}

/// URL-safe base64 decode tolerating stripped padding and embedded whitespace
///
/// The backend occasionally hands back envelopes without `=` padding and log
/// dumps wrap lines; re-normalizing here keeps every call site simple.
pub(crate) fn decode_b64url_tolerant(s: &str) -> XdataResult<Vec<u8>> {
    let compact: String = s.split_whitespace().collect();
    let trimmed = compact.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| XdataError::Encoding(format!("base64url decode failed: {}", e)))
}

/// Validate a 16-hex-character IV string and return its ASCII bytes
///
/// The protocol uses the hex *characters* as IV bytes; they are never
/// hex-decoded.
pub(crate) fn iv_from_hex16(iv_hex: &str) -> XdataResult<[u8; BLOCK_SIZE]> {
    let s = iv_hex.trim();
    if s.len() != BLOCK_SIZE || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(XdataError::Encoding(
            "IV must be exactly 16 hex characters".into(),
        ));
    }
    let mut iv = [0u8; BLOCK_SIZE];
    iv.copy_from_slice(s.as_bytes());
    Ok(iv)
}

/// Generate a random 16-hex-character IV string (8 random bytes, hex-encoded)
pub(crate) fn random_iv_hex16() -> XdataResult<String> {
    let mut buf = [0u8; 8];
    getrandom::getrandom(&mut buf)
        .map_err(|e| XdataError::Crypto(format!("OS RNG failure: {}", e)))?;
    Ok(hex::encode(buf))
}
