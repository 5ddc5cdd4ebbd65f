//! Device fingerprint generation and persistence
//!
//! The backend keys fraud heuristics off a device fingerprint: a `|` joined
//! device description string, AES-CBC encrypted under the fingerprint key
//! with an all-zero IV, standard base64. It is generated once, persisted to
//! a local file, and reused for the installation's lifetime as a stable
//! pseudo-device-ID. The device-ID sent in headers is the MD5 hex digest of
//! the fingerprint string.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};
use zeroize::Zeroizing;

use crate::config::KeyMaterial;
use crate::crypto::cipher::cbc_encrypt;
use crate::error::{XdataError, XdataResult};

/// A persisted fingerprint is only trusted past this length
const MIN_FINGERPRINT_LEN: usize = 10;

/// Device description bound into the fingerprint
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model: String,
    pub lang: String,
    pub resolution: String,
    pub tz_short: String,
    pub ip: String,
    pub font_scale: f64,
    pub android_release: String,
    pub msisdn: String,
}

impl DeviceInfo {
    /// A plausible random device (fresh installation)
    pub fn random() -> XdataResult<Self> {
        let mut buf = [0u8; 4];
        getrandom::getrandom(&mut buf)
            .map_err(|e| XdataError::Crypto(format!("OS RNG failure: {}", e)))?;
        let a = 1000 + (u16::from_le_bytes([buf[0], buf[1]]) % 9000);
        let b = 1000 + (u16::from_le_bytes([buf[2], buf[3]]) % 9000);
        Ok(Self {
            manufacturer: format!("Vertu{}", a),
            model: format!("Asterion X1 Ultra{}", b),
            lang: "en".into(),
            resolution: "720x1540".into(),
            tz_short: "GMT07:00".into(),
            ip: "127.0.0.1".into(),
            font_scale: 1.0,
            android_release: "14".into(),
            msisdn: "6281911120078".into(),
        })
    }

    /// The deterministic plaintext form: fields joined with `|`,
    /// font scale with two decimals
    pub fn fingerprint_plain(&self) -> String {
        [
            self.manufacturer.as_str(),
            self.model.as_str(),
            self.lang.as_str(),
            self.resolution.as_str(),
            self.tz_short.as_str(),
            self.ip.as_str(),
            &format!("{:.2}", self.font_scale),
            self.android_release.as_str(),
            self.msisdn.as_str(),
        ]
        .join("|")
    }
}

/// Generates, persists, and caches the device fingerprint
pub struct FingerprintStore {
    key: Zeroizing<Vec<u8>>,
    path: PathBuf,
    cached: OnceLock<String>,
}

impl FingerprintStore {
    /// Create a store from raw key bytes (16/24/32) and a fingerprint file path
    pub fn new(key: &[u8], path: impl Into<PathBuf>) -> XdataResult<Self> {
        match key.len() {
            16 | 24 | 32 => Ok(Self {
                key: Zeroizing::new(key.to_vec()),
                path: path.into(),
                cached: OnceLock::new(),
            }),
            got => Err(XdataError::KeyLength { got }),
        }
    }

    /// Create a store at the default fingerprint location
    /// (`<data dir>/ax.fp`, see [`crate::config::XdataPaths`])
    pub fn at_default_path(keys: &KeyMaterial) -> XdataResult<Self> {
        let paths = crate::config::XdataPaths::new()?;
        paths.ensure_directories()?;
        Self::from_keys(keys, paths.fingerprint_file())
    }

    /// Create a store from loaded key material
    pub fn from_keys(keys: &KeyMaterial, path: impl Into<PathBuf>) -> XdataResult<Self> {
        let key = keys
            .fingerprint_key()
            .ok_or_else(|| XdataError::Config("AX_FP_KEY is not configured".into()))?;
        Self::new(key, path)
    }

    /// Encrypt a device description into a fingerprint string
    ///
    /// AES-CBC with an all-zero IV, standard base64. Deterministic per
    /// device description and key.
    pub fn generate(&self, device: &DeviceInfo) -> XdataResult<String> {
        let iv = [0u8; 16];
        let ct = cbc_encrypt(&self.key, &iv, device.fingerprint_plain().as_bytes())?;
        Ok(STANDARD.encode(ct))
    }

    /// Load the persisted fingerprint, generating and persisting a fresh one
    /// when missing or implausibly short
    ///
    /// The result is cached in memory; concurrent first calls may race but
    /// converge on one stored value.
    pub fn load_or_create(&self) -> XdataResult<String> {
        if let Some(fp) = self.cached.get() {
            return Ok(fp.clone());
        }
        let fp = self.load_or_create_uncached()?;
        let _ = self.cached.set(fp.clone());
        Ok(fp)
    }

    fn load_or_create_uncached(&self) -> XdataResult<String> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let content = content.trim();
            if content.len() > MIN_FINGERPRINT_LEN {
                return Ok(content.to_string());
            }
        }
        let fp = self.generate(&DeviceInfo::random()?)?;
        if fp.is_empty() {
            return Err(XdataError::Crypto("generated empty fingerprint".into()));
        }
        atomic_write(&self.path, &fp)?;
        Ok(fp)
    }

    /// The device-ID derived from the fingerprint: MD5 hex digest
    pub fn device_id(&self) -> XdataResult<String> {
        let fp = self.load_or_create()?;
        Ok(hex::encode(Md5::digest(fp.as_bytes())))
    }
}

/// Write-then-rename so a crash never leaves a torn fingerprint file
fn atomic_write(path: &Path, text: &str) -> XdataResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FP_KEY: &[u8] = b"abcdefghijklmnopqrstuvwxyz012345";

    fn fixed_device() -> DeviceInfo {
        DeviceInfo {
            manufacturer: "Vertu1234".into(),
            model: "Asterion X1 Ultra5678".into(),
            lang: "en".into(),
            resolution: "720x1540".into(),
            tz_short: "GMT07:00".into(),
            ip: "127.0.0.1".into(),
            font_scale: 1.0,
            android_release: "14".into(),
            msisdn: "6281911120078".into(),
        }
    }

    #[test]
    fn test_fingerprint_plain_format() {
        assert_eq!(
            fixed_device().fingerprint_plain(),
            "Vertu1234|Asterion X1 Ultra5678|en|720x1540|GMT07:00|127.0.0.1|1.00|14|6281911120078"
        );
    }

    #[test]
    fn test_generate_vector() {
        let dir = TempDir::new().unwrap();
        let store = FingerprintStore::new(FP_KEY, dir.path().join("ax.fp")).unwrap();
        let fp = store.generate(&fixed_device()).unwrap();
        assert_eq!(
            fp,
            "1MCWU00KWyVd3otWKq48PqivAd1a/Japg8UAdg1KhjERGU06FEoluWYVW1dW+Vdb\
             dp1DDeC3mNVbuAUT2r/Og9oRQ0cG9Gb7Mw0GNDfFeIXoC3QyXDx1kkwIMrO8CNpQ"
        );
    }

    #[test]
    fn test_device_id_is_md5_of_fingerprint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ax.fp");
        std::fs::write(
            &path,
            "1MCWU00KWyVd3otWKq48PqivAd1a/Japg8UAdg1KhjERGU06FEoluWYVW1dW+Vdb\
             dp1DDeC3mNVbuAUT2r/Og9oRQ0cG9Gb7Mw0GNDfFeIXoC3QyXDx1kkwIMrO8CNpQ",
        )
        .unwrap();

        let store = FingerprintStore::new(FP_KEY, path.clone()).unwrap();
        assert_eq!(
            store.device_id().unwrap(),
            "7e268f15b8ffd4dbcdab1b54b4dd0656"
        );
    }

    #[test]
    fn test_load_or_create_persists_and_reuses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ax.fp");

        let store = FingerprintStore::new(FP_KEY, path.clone()).unwrap();
        let first = store.load_or_create().unwrap();
        assert!(path.exists());
        assert!(first.len() > MIN_FINGERPRINT_LEN);

        // a fresh store reads the same persisted value
        let store2 = FingerprintStore::new(FP_KEY, path.clone()).unwrap();
        assert_eq!(store2.load_or_create().unwrap(), first);
    }

    #[test]
    fn test_implausibly_short_file_regenerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ax.fp");
        std::fs::write(&path, "short").unwrap();

        let store = FingerprintStore::new(FP_KEY, path.clone()).unwrap();
        let fp = store.load_or_create().unwrap();
        assert_ne!(fp, "short");
        assert!(fp.len() > MIN_FINGERPRINT_LEN);
    }
}
