//! Crypto diagnostics and log decoding devtools
//!
//! - `self_test` reports key presence/lengths and live round-trips without
//!   ever exposing key bytes; useful for a quick "is this environment
//!   configured" check.
//! - `decode_xdata_pairs`/`decode_xdata_file` pull `"xdata"`/`"xtime"` pairs
//!   out of free-form text (response dumps, log files) and decrypt each one
//!   fail-soft.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::KeyMaterial;
use crate::crypto::{Decryptor, Encryptor, Envelope, MsisdnCodec};
use crate::error::XdataResult;

/// Fixed timestamp so the self-test stays reproducible
const SELF_TEST_XTIME: i64 = 1_700_000_000_000;

/// Key-material health report; lengths and booleans only, never key bytes
#[derive(Debug, Clone, Serialize)]
pub struct SelfTestReport {
    pub xdata_key_len: Option<usize>,
    pub field_key_len: Option<usize>,
    pub fingerprint_key_len: Option<usize>,
    pub ax_api_sig_key_present: bool,
    pub base_secret_present: bool,
    pub xdata_roundtrip_ok: bool,
    pub msisdn_roundtrip_ok: bool,
}

/// Run the configuration self-test
pub fn self_test(keys: &KeyMaterial) -> SelfTestReport {
    let mut report = SelfTestReport {
        xdata_key_len: keys.xdata_key().map(|k| k.len()),
        field_key_len: keys.field_key().map(|k| k.len()),
        fingerprint_key_len: keys.fingerprint_key().map(|k| k.len()),
        ax_api_sig_key_present: keys.ax_api_sig_key().is_some(),
        base_secret_present: keys.base_secret().is_some(),
        xdata_roundtrip_ok: false,
        msisdn_roundtrip_ok: false,
    };

    if let (Ok(enc), Ok(dec)) = (Encryptor::from_keys(keys), Decryptor::from_keys(keys)) {
        let sample = serde_json::json!({"ping": "pong"});
        if let Ok(envelope) = enc.encrypt(&sample, SELF_TEST_XTIME) {
            report.xdata_roundtrip_ok = dec
                .try_decrypt(&envelope)
                .map(|v| v == sample)
                .unwrap_or(false);
        }
    }

    if let Ok(codec) = MsisdnCodec::from_keys(keys) {
        let msisdn = "6281234567890";
        let blob = codec.encrypt(msisdn);
        report.msisdn_roundtrip_ok = !blob.is_empty() && codec.decrypt(&blob) == msisdn;
    }

    report
}

/// Extract `"xdata": "..."` / `"xtime": N` pairs from free-form text
///
/// Best-effort: values are paired by order of appearance, like the log
/// dumps they come from. `xtime` must have at least 5 digits to avoid
/// picking up stray small integers.
pub fn extract_xdata_pairs(text: &str) -> Vec<(String, i64)> {
    let xdatas = scan_string_values(text, "\"xdata\"");
    let xtimes = scan_integer_values(text, "\"xtime\"");
    xdatas.into_iter().zip(xtimes).collect()
}

fn scan_string_values(text: &str, key: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (idx, _) in text.match_indices(key) {
        let rest = &text[idx + key.len()..];
        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix(':') else {
            continue;
        };
        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix('"') else {
            continue;
        };
        if let Some(end) = rest.find('"') {
            if end > 0 {
                out.push(rest[..end].to_string());
            }
        }
    }
    out
}

fn scan_integer_values(text: &str, key: &str) -> Vec<i64> {
    let mut out = Vec::new();
    for (idx, _) in text.match_indices(key) {
        let rest = &text[idx + key.len()..];
        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix(':') else {
            continue;
        };
        let rest = rest.trim_start();
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.len() >= 5 {
            if let Ok(n) = digits.parse() {
                out.push(n);
            }
        }
    }
    out
}

/// Decode every xdata/xtime pair found in the text, each fail-soft
pub fn decode_xdata_pairs(text: &str, decryptor: &Decryptor) -> Vec<Map<String, Value>> {
    extract_xdata_pairs(text)
        .into_iter()
        .map(|(xdata, xtime)| decryptor.decrypt(&Envelope { xdata, xtime }))
        .collect()
}

/// Decode every xdata/xtime pair found in a file (e.g. a response dump)
pub fn decode_xdata_file(
    path: impl AsRef<Path>,
    decryptor: &Decryptor,
) -> XdataResult<Vec<Map<String, Value>>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Ok(decode_xdata_pairs(&text, decryptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn keys() -> KeyMaterial {
        KeyMaterial::default()
            .with_xdata_key("0123456789abcdef")
            .unwrap()
            .with_field_key("fedcba9876543210")
            .unwrap()
            .with_ax_api_sig_key("ax-sig-key")
            .with_base_secret("test-base-secret")
    }

    #[test]
    fn test_self_test_healthy_config() {
        let report = self_test(&keys());
        assert_eq!(report.xdata_key_len, Some(16));
        assert_eq!(report.field_key_len, Some(16));
        assert_eq!(report.fingerprint_key_len, None);
        assert!(report.ax_api_sig_key_present);
        assert!(report.base_secret_present);
        assert!(report.xdata_roundtrip_ok);
        assert!(report.msisdn_roundtrip_ok);
    }

    #[test]
    fn test_self_test_empty_config() {
        let report = self_test(&KeyMaterial::default());
        assert_eq!(report.xdata_key_len, None);
        assert!(!report.xdata_roundtrip_ok);
        assert!(!report.msisdn_roundtrip_ok);
    }

    #[test]
    fn test_self_test_report_never_contains_keys() {
        let rendered = serde_json::to_string(&self_test(&keys())).unwrap();
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(!rendered.contains("test-base-secret"));
    }

    #[test]
    fn test_extract_pairs_from_dump() {
        let text = r#"
            response 1: {"xdata": "AAAA", "xtime": 1700000000000}
            response 2: {"xdata":"BBBB","xtime":1700000000001}
            noise: {"xtime": 12} {"xdata": ""}
        "#;
        let pairs = extract_xdata_pairs(text);
        assert_eq!(
            pairs,
            vec![
                ("AAAA".to_string(), 1_700_000_000_000),
                ("BBBB".to_string(), 1_700_000_000_001),
            ]
        );
    }

    #[test]
    fn test_decode_pairs_round_trip() {
        let keys = keys();
        let enc = Encryptor::from_keys(&keys).unwrap();
        let dec = Decryptor::from_keys(&keys).unwrap();

        let envelope = enc
            .encrypt(&json!({"quota": 42}), 1_700_000_000_000)
            .unwrap();
        let dump = format!(
            "1970-01-01 log line\nbody: {}\ntrailer",
            serde_json::to_string(&envelope).unwrap()
        );

        let decoded = decode_xdata_pairs(&dump, &dec);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].get("quota"), Some(&json!(42)));
    }

    #[test]
    fn test_decode_file() {
        let keys = keys();
        let enc = Encryptor::from_keys(&keys).unwrap();
        let dec = Decryptor::from_keys(&keys).unwrap();

        let envelope = enc
            .encrypt(&json!({"ok": true}), 1_700_000_000_000)
            .unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&envelope).unwrap()).unwrap();

        let decoded = decode_xdata_file(file.path(), &dec).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].get("ok"), Some(&json!(true)));
    }
}
