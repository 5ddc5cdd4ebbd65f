//! The keyed-HMAC signature family
//!
//! Each API family binds a different subset of request context into an
//! HMAC-SHA512 hex signature; OTP submission uses a structurally different
//! HMAC-SHA256 base64 variant. The signing key for each variant is a `;`
//! joined string of the base secret and context fields, the message a `;`
//! joined (and `;` terminated) field list.
//!
//! `sig_time` is always whole seconds (envelope `xtime` / 1000). Passing
//! milliseconds here produces a signature the backend silently rejects.
//!
//! Missing required inputs yield an empty string; callers must treat an
//! empty signature as "do not send the request".

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

/// Backend-defined protocol constant embedded in several signing keys.
/// Opaque and not locally meaningful; reproduce byte-for-byte.
pub const SIGNATURE_MARKER: &str = "#ae-hei_9Tee6he+Ik3Gais5=";

/// Fixed endpoint path bound by the bounty exchange variant
pub const BOUNTY_EXCHANGE_PATH: &str = "api/v8/personalization/bounties-exchange";

fn hmac_sha512_hex(key: &str, msg: &str) -> String {
    match Hmac::<Sha512>::new_from_slice(key.as_bytes()) {
        Ok(mut mac) => {
            mac.update(msg.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        Err(e) => {
            tracing::error!("HMAC generation failed: {}", e);
            String::new()
        }
    }
}

/// Generates per-request signatures from the shared HMAC secrets
#[derive(Clone)]
pub struct Signer {
    base_secret: String,
    ax_api_sig_key: Option<String>,
}

impl Signer {
    /// Create a signer from the x-signature base secret
    pub fn new(base_secret: &str) -> Self {
        Self {
            base_secret: base_secret.to_string(),
            ax_api_sig_key: None,
        }
    }

    /// Attach the AX API signature key (used only for OTP submission)
    pub fn with_ax_api_sig_key(mut self, key: &str) -> Self {
        self.ax_api_sig_key = Some(key.to_string());
        self
    }

    /// Generic request signature
    ///
    /// Returns an empty string when `id_token` or the base secret is missing.
    pub fn x_signature(&self, id_token: &str, method: &str, path: &str, sig_time: i64) -> String {
        if self.base_secret.is_empty() || id_token.is_empty() {
            tracing::warn!("x_signature: missing base secret or id_token");
            return String::new();
        }
        let key = format!(
            "{};{};{};{};{}",
            self.base_secret, id_token, method, path, sig_time
        );
        let msg = format!("{};{};", id_token, sig_time);
        hmac_sha512_hex(&key, &msg)
    }

    /// Payment signature
    #[allow(clippy::too_many_arguments)]
    pub fn x_signature_payment(
        &self,
        access_token: &str,
        sig_time: i64,
        package_code: &str,
        token_payment: &str,
        payment_method: &str,
        payment_for: &str,
        path: &str,
    ) -> String {
        if self.base_secret.is_empty() || access_token.is_empty() {
            tracing::warn!("x_signature_payment: missing base secret or access_token");
            return String::new();
        }
        let key = format!(
            "{};{}{};POST;{};{}",
            self.base_secret, sig_time, SIGNATURE_MARKER, path, sig_time
        );
        let msg = format!(
            "{};{};{};{};{};{};",
            access_token, token_payment, sig_time, payment_for, payment_method, package_code
        );
        hmac_sha512_hex(&key, &msg)
    }

    /// Bounty exchange signature (binds the fixed bounty endpoint path)
    pub fn x_signature_bounty(
        &self,
        access_token: &str,
        sig_time: i64,
        package_code: &str,
        token_payment: &str,
    ) -> String {
        if self.base_secret.is_empty() || access_token.is_empty() {
            tracing::warn!("x_signature_bounty: missing base secret or access_token");
            return String::new();
        }
        let key = format!(
            "{};{};{}{};POST;{};{}",
            self.base_secret, access_token, sig_time, SIGNATURE_MARKER, BOUNTY_EXCHANGE_PATH, sig_time
        );
        let msg = format!(
            "{};{};{};{};",
            access_token, token_payment, sig_time, package_code
        );
        hmac_sha512_hex(&key, &msg)
    }

    /// Loyalty exchange signature
    pub fn x_signature_loyalty(
        &self,
        sig_time: i64,
        package_code: &str,
        token_confirmation: &str,
        path: &str,
    ) -> String {
        if self.base_secret.is_empty() || token_confirmation.is_empty() {
            tracing::warn!("x_signature_loyalty: missing base secret or token_confirmation");
            return String::new();
        }
        let key = format!(
            "{};{}{};POST;{};{}",
            self.base_secret, sig_time, SIGNATURE_MARKER, path, sig_time
        );
        let msg = format!("{};{};{};", token_confirmation, sig_time, package_code);
        hmac_sha512_hex(&key, &msg)
    }

    /// Bounty allotment signature (additionally binds the destination MSISDN)
    pub fn x_signature_bounty_allotment(
        &self,
        sig_time: i64,
        package_code: &str,
        token_confirmation: &str,
        path: &str,
        destination_msisdn: &str,
    ) -> String {
        if self.base_secret.is_empty() || token_confirmation.is_empty() {
            tracing::warn!("x_signature_bounty_allotment: missing base secret or token_confirmation");
            return String::new();
        }
        let key = format!(
            "{};{}{};{};POST;{};{}",
            self.base_secret, sig_time, SIGNATURE_MARKER, destination_msisdn, path, sig_time
        );
        let msg = format!(
            "{};{};{};{};",
            token_confirmation, sig_time, destination_msisdn, package_code
        );
        hmac_sha512_hex(&key, &msg)
    }

    /// AX API signature (OTP submission): HMAC-SHA256 → base64
    ///
    /// The key is interpreted as ASCII, unlike every other variant which
    /// uses UTF-8; a non-ASCII key is a configuration fault and yields an
    /// empty signature.
    pub fn ax_api_signature(
        &self,
        ts_for_sign: &str,
        contact: &str,
        code: &str,
        contact_type: &str,
    ) -> String {
        let key = match self.ax_api_sig_key.as_deref() {
            Some(k) if !k.is_empty() => k,
            _ => {
                tracing::error!("ax_api_signature: AX_API_SIG_KEY is missing");
                return String::new();
            }
        };
        if !key.is_ascii() {
            tracing::error!("ax_api_signature: AX_API_SIG_KEY must be ASCII");
            return String::new();
        }
        let preimage = format!(
            "{}password{}{}{}openid",
            ts_for_sign, contact_type, contact, code
        );
        match Hmac::<Sha256>::new_from_slice(key.as_bytes()) {
            Ok(mut mac) => {
                mac.update(preimage.as_bytes());
                STANDARD.encode(mac.finalize().into_bytes())
            }
            Err(e) => {
                tracing::error!("AX signature failed: {}", e);
                String::new()
            }
        }
    }
}
