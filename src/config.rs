//! ProcureX client configuration loaded from `procurex.toml`.
//!
//! [`ProcurexConfig`] holds every tunable. Keys missing from the file fall
//! back to sensible defaults. `PROCUREX_API_URL` takes precedence over the
//! file for the backend address; CLI flags take precedence over both.

use std::path::Path;

use serde::Deserialize;

use crate::error::ProcurexError;
use crate::submitter::CompanyProfile;

pub const CONFIG_FILE: &str = "procurex.toml";
pub const API_URL_ENV: &str = "PROCUREX_API_URL";

/// Top-level configuration loaded from `procurex.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcurexConfig {
    /// Base URL of the analysis backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Delay between status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for a single HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Stop tracking a job after this many seconds. `0` disables the limit.
    #[serde(default = "default_max_tracking_secs")]
    pub max_tracking_secs: u64,

    /// Largest document accepted for upload, in bytes.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,

    /// Company profile sent with every submission.
    #[serde(default)]
    pub company: CompanyProfile,
}

// The backend's development address.
fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

// Three seconds: responsive without hammering a multi-minute pipeline.
fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

// Thirty minutes.
fn default_max_tracking_secs() -> u64 {
    1800
}

// The backend rejects uploads over 10 MiB.
fn default_max_document_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for ProcurexConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_tracking_secs: default_max_tracking_secs(),
            max_document_bytes: default_max_document_bytes(),
            company: CompanyProfile::default(),
        }
    }
}

impl ProcurexConfig {
    /// Loads `procurex.toml` from the current directory.
    /// Uses defaults if the file does not exist.
    pub fn load() -> Result<Self, ProcurexError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ProcurexError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<ProcurexConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_url = url.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProcurexError> {
        if self.poll_interval_ms == 0 {
            return Err(ProcurexError::Config(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ProcurexError::Config(format!(
                "api_url must start with http:// or https://, got {:?}",
                self.api_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ProcurexConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.max_tracking_secs, 1800);
        assert_eq!(config.max_document_bytes, 10 * 1024 * 1024);
        assert_eq!(config.company, CompanyProfile::default());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            poll_interval_ms = 1500

            [company]
            company_name = "Acme Infra"
            technical_team_size = 120
        "#;
        let config: ProcurexConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.poll_interval_ms, 1500);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.company.company_name, "Acme Infra");
        assert_eq!(config.company.technical_team_size, 120);
        assert_eq!(config.company.years_in_operation, 8);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "max_tracking_secs = 0\n").unwrap();
        let config = ProcurexConfig::load_from(&path).unwrap();
        assert_eq!(config.max_tracking_secs, 0);
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProcurexConfig::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.poll_interval_ms, 3000);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();
        let err = ProcurexConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ProcurexError::Toml(_)));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = ProcurexConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProcurexError::Config(_))));
    }

    #[test]
    fn api_url_must_be_http() {
        let config = ProcurexConfig {
            api_url: "localhost:8000".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
