//! Configuration module for xdata-envelope
//!
//! This module provides configuration management including:
//! - Key material loading and validation
//! - Data/fingerprint path resolution

pub mod keys;
pub mod paths;

pub use keys::KeyMaterial;
pub use paths::XdataPaths;
