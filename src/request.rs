//! Request assembly: envelope + signature + protocol headers
//!
//! `CryptoService` is the one-stop surface the (out-of-scope) HTTP layer
//! talks to: it encrypts a payload into a wire envelope, signs it, renders
//! the signature headers, and decrypts response envelopes. An empty
//! signature aborts assembly; a request without a valid signature must
//! never be sent.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::KeyMaterial;
use crate::crypto::{Decryptor, Encryptor, Envelope, Signer};
use crate::error::{XdataError, XdataResult};
use crate::timefmt::{java_like_timestamp, now_ms, sig_time};

/// Protocol header version
pub const HV_VERSION: &str = "v3";

/// An encrypted, signed request body ready for the HTTP layer
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Hex HMAC-SHA512 signature for the `x-signature` header
    pub x_signature: String,
    /// The `{"xdata","xtime"}` body
    pub envelope: Envelope,
}

impl SignedRequest {
    /// The signature timestamp in whole seconds
    pub fn sig_time(&self) -> i64 {
        sig_time(self.envelope.xtime)
    }
}

/// The signature-related headers accompanying every request
///
/// `x-signature-time` is decimal *seconds*; `x-request-at` is the java-like
/// timestamp with a 2-digit fraction and colon offset.
#[derive(Debug, Clone)]
pub struct RequestHeaders {
    pub x_signature: String,
    pub x_signature_time: String,
    pub x_request_id: String,
    pub x_request_at: String,
}

impl RequestHeaders {
    /// Build headers for a signed request at the given wall-clock instant
    pub fn new<Tz: TimeZone>(signed: &SignedRequest, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            x_signature: signed.x_signature.clone(),
            x_signature_time: signed.sig_time().to_string(),
            x_request_id: Uuid::new_v4().to_string(),
            x_request_at: java_like_timestamp(now),
        }
    }

    /// Render as header name/value pairs, including the fixed `x-hv`
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x-hv", HV_VERSION.to_string()),
            ("x-signature-time", self.x_signature_time.clone()),
            ("x-signature", self.x_signature.clone()),
            ("x-request-id", self.x_request_id.clone()),
            ("x-request-at", self.x_request_at.clone()),
        ]
    }
}

/// Aggregated crypto surface built from loaded key material
pub struct CryptoService {
    encryptor: Encryptor,
    decryptor: Decryptor,
    signer: Signer,
}

impl std::fmt::Debug for CryptoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoService").finish_non_exhaustive()
    }
}

impl CryptoService {
    /// Build the service from key material
    ///
    /// # Errors
    ///
    /// `XdataError::Config` when the xdata key is missing or no decrypt
    /// candidates are configured.
    pub fn new(keys: &KeyMaterial) -> XdataResult<Self> {
        let mut signer = Signer::new(keys.base_secret().unwrap_or_default());
        if let Some(ax_key) = keys.ax_api_sig_key() {
            signer = signer.with_ax_api_sig_key(ax_key);
        }
        Ok(Self {
            encryptor: Encryptor::from_keys(keys)?,
            decryptor: Decryptor::from_keys(keys)?,
            signer,
        })
    }

    /// Encrypt and sign a payload at the current instant
    pub fn encrypt_and_sign<T: Serialize>(
        &self,
        method: &str,
        path: &str,
        id_token: &str,
        payload: &T,
    ) -> XdataResult<SignedRequest> {
        self.encrypt_and_sign_at(method, path, id_token, payload, now_ms())
    }

    /// Encrypt and sign a payload at an explicit envelope timestamp
    ///
    /// # Errors
    ///
    /// `XdataError::Signature` when the generator yields an empty signature
    /// (missing token or base secret); the caller must not send the request.
    pub fn encrypt_and_sign_at<T: Serialize>(
        &self,
        method: &str,
        path: &str,
        id_token: &str,
        payload: &T,
        xtime_ms: i64,
    ) -> XdataResult<SignedRequest> {
        let envelope = self.encryptor.encrypt(payload, xtime_ms)?;
        let x_signature = self
            .signer
            .x_signature(id_token, method, path, sig_time(xtime_ms));
        if x_signature.is_empty() {
            return Err(XdataError::Signature(
                "signature generation failed; request must not be sent".into(),
            ));
        }
        Ok(SignedRequest {
            x_signature,
            envelope,
        })
    }

    /// Build the signature headers for a signed request (wall clock now)
    pub fn headers(&self, signed: &SignedRequest) -> RequestHeaders {
        RequestHeaders::new(signed, &Local::now())
    }

    /// Fail-soft decrypt of a response envelope (empty map on any failure)
    pub fn decrypt_response(&self, envelope: &Envelope) -> Map<String, Value> {
        self.decryptor.decrypt(envelope)
    }

    /// Access the signature generator for the non-generic variants
    /// (payment, bounty, loyalty, allotment, AX)
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Access the decryptor for diagnostics and log decoding
    pub fn decryptor(&self) -> &Decryptor {
        &self.decryptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timefmt::gmt7;
    use serde_json::json;

    const XTIME: i64 = 1_700_000_000_000;

    fn keys() -> KeyMaterial {
        KeyMaterial::default()
            .with_xdata_key("0123456789abcdef")
            .unwrap()
            .with_base_secret("test-base-secret")
    }

    #[test]
    fn test_encrypt_and_sign_round_trip() {
        let service = CryptoService::new(&keys()).unwrap();
        let payload = json!({"action": "get_quota"});

        let signed = service
            .encrypt_and_sign_at("POST", "api/v8/quota", "token-123", &payload, XTIME)
            .unwrap();

        assert_eq!(signed.envelope.xtime, XTIME);
        assert_eq!(signed.sig_time(), 1_700_000_000);
        assert_eq!(signed.x_signature.len(), 128); // SHA-512 hex
        assert_eq!(
            Value::Object(service.decrypt_response(&signed.envelope)),
            payload
        );
    }

    #[test]
    fn test_empty_id_token_aborts_request() {
        let service = CryptoService::new(&keys()).unwrap();
        let err = service
            .encrypt_and_sign_at("POST", "api/v8/quota", "", &json!({}), XTIME)
            .unwrap_err();
        assert!(matches!(err, XdataError::Signature(_)));
    }

    #[test]
    fn test_missing_xdata_key_is_config_error() {
        let keys = KeyMaterial::default().with_base_secret("secret");
        assert!(CryptoService::new(&keys).unwrap_err().is_config());
    }

    #[test]
    fn test_headers_contents() {
        let service = CryptoService::new(&keys()).unwrap();
        let signed = service
            .encrypt_and_sign_at("POST", "api/v8/quota", "token-123", &json!({}), XTIME)
            .unwrap();

        let now = gmt7().with_ymd_and_hms(2024, 1, 31, 9, 5, 7).unwrap();
        let headers = RequestHeaders::new(&signed, &now);
        assert_eq!(headers.x_signature_time, "1700000000");
        assert_eq!(headers.x_request_at, "2024-01-31T09:05:07.00+07:00");
        assert_eq!(headers.x_signature, signed.x_signature);

        let pairs = headers.to_pairs();
        assert_eq!(pairs[0], ("x-hv", "v3".to_string()));
        assert_eq!(pairs.len(), 5);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let service = CryptoService::new(&keys()).unwrap();
        let signed = service
            .encrypt_and_sign_at("POST", "api/v8/quota", "token-123", &json!({}), XTIME)
            .unwrap();
        let h1 = service.headers(&signed);
        let h2 = service.headers(&signed);
        assert_ne!(h1.x_request_id, h2.x_request_id);
    }
}
