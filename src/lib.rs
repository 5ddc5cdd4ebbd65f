//! xdata-envelope - Request signing and payload encryption for the XData
//! mobile operator API
//!
//! This library implements the cryptographic envelope and signature protocol
//! a terminal client uses to exchange data with the operator backend. Every
//! request body is AES-CBC encrypted with a timestamp-derived IV and shipped
//! as `{"xdata","xtime"}`; every request carries one of several keyed-HMAC
//! signature variants; responses come back in the same envelope shape.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: key material loading and path management
//! - `error`: custom error types
//! - `crypto`: envelope codec, signature family, MSISDN codec, field obfuscator
//! - `fingerprint`: persisted device fingerprint and derived device-ID
//! - `timefmt`: protocol timestamp formats
//! - `request`: envelope + signature + header assembly
//! - `diagnostics`: configuration self-test and xdata log decoding
//!
//! # Example
//!
//! ```rust,ignore
//! use xdata_envelope::{config::KeyMaterial, request::CryptoService};
//!
//! let keys = KeyMaterial::from_env();
//! let service = CryptoService::new(&keys)?;
//! let signed = service.encrypt_and_sign("POST", "api/v8/quota", &id_token, &payload)?;
//! let headers = service.headers(&signed);
//! // hand signed.envelope and headers to the HTTP layer...
//! ```
//!
//! All fail-soft boundaries (response decryption, MSISDN decoding, signature
//! generation) return empty values instead of errors, matching the wire
//! protocol's contract; `try_*` variants expose the underlying error where
//! callers want to tell failure modes apart.

pub mod config;
pub mod crypto;
pub mod diagnostics;
pub mod error;
pub mod fingerprint;
pub mod request;
pub mod timefmt;

pub use config::KeyMaterial;
pub use crypto::{Decryptor, Encryptor, Envelope, MsisdnCodec, Signer};
pub use error::{XdataError, XdataResult};
pub use fingerprint::{DeviceInfo, FingerprintStore};
pub use request::{CryptoService, RequestHeaders, SignedRequest};
