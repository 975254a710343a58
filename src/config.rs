//! Configuration for fetching and presenting documents.
//!
//! Every key is optional; anything missing falls back to the defaults below.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// URL loaded when the caller does not supply one.
pub const DEFAULT_URL: &str = "http://www.africau.edu/images/default/sample.pdf";

/// Connect timeout used when the configuration does not set one.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Transport settings plus the presentation options handed to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// URL used by `load_pdf(None)`
    pub default_url: String,

    pub connect_timeout_secs: u64,

    /// Total request timeout, including the body. `None` means no limit.
    pub request_timeout_secs: Option<u64>,

    /// Largest body accepted. `None` means no limit.
    pub max_document_bytes: Option<u64>,

    pub user_agent: String,

    pub viewer: ViewerOptions,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            default_url: DEFAULT_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: None,
            max_document_bytes: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            viewer: ViewerOptions::default(),
        }
    }
}

impl FetchConfig {
    /// Reads and validates a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        let config: FetchConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_url.trim().is_empty() {
            return Err(ConfigError::Invalid("default_url must not be empty".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_document_bytes == Some(0) {
            return Err(ConfigError::Invalid(
                "max_document_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// How pages are scaled to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    Width,
    Height,
    #[default]
    Both,
}

/// Presentation options for the document viewer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerOptions {
    /// Zero-based page shown first
    pub default_page: usize,
    pub antialiasing: bool,
    /// Dynamic spacing so each page fits the screen on its own
    pub auto_spacing: bool,
    pub fit_policy: FitPolicy,
    pub fit_each_page: bool,
    /// Snap pages to screen boundaries
    pub page_snap: bool,
    /// A fling moves exactly one page
    pub page_fling: bool,
    pub night_mode: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        ViewerOptions {
            default_page: 0,
            antialiasing: true,
            auto_spacing: true,
            fit_policy: FitPolicy::Both,
            fit_each_page: true,
            page_snap: true,
            page_fling: true,
            night_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.default_url, DEFAULT_URL);
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), None);
        assert!(config.user_agent.starts_with("pdf-fetch/"));
        assert!(config.viewer.antialiasing);
        assert!(!config.viewer.night_mode);
        assert_eq!(config.viewer.fit_policy, FitPolicy::Both);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(FetchConfig::from_toml("").unwrap(), FetchConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = FetchConfig::from_toml(
            r#"
            default_url = "https://example.com/a.pdf"
            request_timeout_secs = 5

            [viewer]
            night_mode = true
            fit_policy = "width"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_url, "https://example.com/a.pdf");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
        assert!(config.viewer.night_mode);
        assert!(config.viewer.page_snap);
        assert_eq!(config.viewer.fit_policy, FitPolicy::Width);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = FetchConfig::from_toml("retries = 3");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_rejects_invalid_values() {
        for text in [
            "default_url = \"  \"",
            "connect_timeout_secs = 0",
            "request_timeout_secs = 0",
            "max_document_bytes = 0",
        ] {
            let result = FetchConfig::from_toml(text);
            assert!(matches!(result, Err(ConfigError::Invalid(_))), "accepted: {}", text);
        }
    }

    #[test]
    fn test_rejects_bad_fit_policy() {
        let result = FetchConfig::from_toml("[viewer]\nfit_policy = \"diagonal\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }
}
