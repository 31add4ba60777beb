//! Daemon Configuration
//!
//! Read from the JSON file named by `TONAL_CONFIG`, falling back to
//! defaults when it is unset.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use tonal_core::ServiceConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub service: ServiceConfig,

    /// Device settings file; the platform config dir when unset
    pub settings_path: Option<PathBuf>,

    /// Keep settings in memory only
    pub ephemeral: bool,

    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Let the stub host offer a vendor bundle
    pub vendor_bundle: bool,

    /// Use the vendor bundle when the host has one
    pub prefer_vendor: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            settings_path: None,
            ephemeral: false,
            log_filter: "tonal=debug".into(),
            vendor_bundle: false,
            prefer_vendor: true,
        }
    }
}

impl DaemonConfig {
    pub const ENV_VAR: &'static str = "TONAL_CONFIG";

    /// Load from `TONAL_CONFIG` if set, else defaults
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(Self::ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading daemon config {:?}", path))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing daemon config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.service
            .coordinator
            .validate()
            .map_err(anyhow::Error::msg)
            .context("coordinator config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.log_filter, "tonal=debug");
        assert!(!config.ephemeral);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: DaemonConfig =
            serde_json::from_str(r#"{ "ephemeral": true, "vendor_bundle": true }"#).unwrap();
        assert!(config.ephemeral);
        assert!(config.vendor_bundle);
        assert!(config.prefer_vendor);
        assert_eq!(config.service.coordinator.queue_capacity, 64);
    }

    #[test]
    fn test_invalid_coordinator_rejected() {
        let config: DaemonConfig =
            serde_json::from_str(r#"{ "service": { "coordinator": { "queue_capacity": 0 } } }"#)
                .unwrap();
        assert!(config.validate().is_err());
    }
}
