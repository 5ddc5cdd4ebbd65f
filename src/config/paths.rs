//! Path management for xdata-envelope
//!
//! Provides XDG-compliant path resolution for the locally persisted device
//! fingerprint and extra key files.
//!
//! ## Path Resolution Order
//!
//! 1. `XDATA_ENVELOPE_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/xdata-envelope` or `~/.config/xdata-envelope`
//! 3. Windows: `%APPDATA%\xdata-envelope`

use std::path::PathBuf;

use crate::error::XdataError;

/// Manages all paths used by xdata-envelope
#[derive(Debug, Clone)]
pub struct XdataPaths {
    /// Base directory for persisted state
    base_dir: PathBuf,
}

impl XdataPaths {
    /// Create a new XdataPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, XdataError> {
        let base_dir = if let Ok(custom) = std::env::var("XDATA_ENVELOPE_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create XdataPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/xdata-envelope/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the persisted device fingerprint
    pub fn fingerprint_file(&self) -> PathBuf {
        self.base_dir.join("ax.fp")
    }

    /// Get the path to the extra decrypt-candidate key file
    pub fn key_file(&self) -> PathBuf {
        self.base_dir.join("xdata.keys")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), XdataError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| XdataError::Io(format!("Failed to create base directory: {}", e)))?;
        Ok(())
    }
}

/// Resolve the default data directory path based on platform
#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, XdataError> {
    // Unix (Linux/macOS): Use XDG_CONFIG_HOME if set, otherwise ~/.config
    let config_base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
    Ok(config_base.join("xdata-envelope"))
}

/// Resolve the default data directory path based on platform
#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, XdataError> {
    // Windows: Use APPDATA
    let appdata = std::env::var("APPDATA")
        .map_err(|_| XdataError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("xdata-envelope"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = XdataPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.fingerprint_file(), temp_dir.path().join("ax.fp"));
        assert_eq!(paths.key_file(), temp_dir.path().join("xdata.keys"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("dir");
        let paths = XdataPaths::with_base_dir(nested.clone());

        paths.ensure_directories().unwrap();
        assert!(nested.exists());
    }
}
