//! Cryptographic envelope and signature layer
//!
//! This is the protocol core: everything the surrounding client needs to
//! exchange encrypted payloads with the backend.
//!
//! - `cipher`: shared AES-CBC/PKCS7 primitives
//! - `envelope`: the xdata/xtime transport envelope codec
//! - `signature`: the keyed-HMAC signature family
//! - `obfuscate`: opaque token-shaped field generator
//! - `msisdn`: Family Circle phone number codec

pub mod cipher;
pub mod envelope;
pub mod msisdn;
pub mod obfuscate;
pub mod signature;

pub use envelope::{derive_iv, Decryptor, Encryptor, Envelope};
pub use msisdn::MsisdnCodec;
pub use obfuscate::FieldObfuscator;
pub use signature::{Signer, SIGNATURE_MARKER};
