//! Custom error types for xdata-envelope
//!
//! This module defines the error hierarchy for the crate using thiserror
//! for ergonomic error definitions.
//!
//! The fail-soft entry points (`Decryptor::decrypt`, `MsisdnCodec::decrypt`,
//! the signature generators) never surface these errors: they log and return
//! an empty value instead, matching the wire protocol's contract. The `try_*`
//! variants return the full error for callers that want to distinguish
//! failure modes.

use thiserror::Error;

/// The main error type for xdata-envelope operations
#[derive(Error, Debug)]
pub enum XdataError {
    /// Configuration-related errors (missing or malformed key material)
    #[error("Configuration error: {0}")]
    Config(String),

    /// AES key material with an unusable byte length
    #[error("Invalid AES key length: {got} bytes (expected 16, 24, or 32)")]
    KeyLength { got: usize },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Base64/hex decoding errors on wire data
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Cryptographic failures: bad padding, corrupt ciphertext, wrong key,
    /// non-UTF-8 plaintext. Wrong key and corrupt data are deliberately
    /// indistinguishable here; the multi-key retry already tried every
    /// candidate before this surfaces.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Signature generation failures (missing tokens, non-ASCII AX key)
    #[error("Signature error: {0}")]
    Signature(String),
}

impl XdataError {
    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::KeyLength { .. })
    }

    /// Check if this is a cryptographic failure
    pub fn is_crypto(&self) -> bool {
        matches!(self, Self::Crypto(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for XdataError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for XdataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for xdata-envelope operations
pub type XdataResult<T> = Result<T, XdataError>;
