//! Configuration for DocSight
//!
//! Settings are resolved in three layers:
//! 1. Built-in defaults
//! 2. `docsight.toml` (explicit path, `DOCSIGHT_CONFIG`, or the platform config dir)
//! 3. Environment overrides (`DOCSIGHT_AI_MAX_RETRIES`, `DOCSIGHT_AI_BACKOFF_MS`)
//!
//! Example file:
//!
//! ```toml
//! [analytics]
//! max_retries = 3
//! backoff_ms = 1500
//! chat_context_chars = 12000
//!
//! [server]
//! allowed_origins = ["http://localhost:3000"]
//! max_upload_mb = 100
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::ai::RetryPolicy;
use crate::error::{Error, Result};

/// Environment variable pointing at a config file
pub const CONFIG_PATH_ENV: &str = "DOCSIGHT_CONFIG";

/// Analytics pipeline settings
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    /// Total attempts allowed against the completion service
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
    /// Maximum characters of document text sent as chat context
    pub chat_context_chars: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(1500),
            chat_context_chars: 12_000,
        }
    }
}

impl AnalyticsSettings {
    /// Retry policy for completion calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff)
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Resolved application configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub analytics: AnalyticsSettings,
    pub server: ServerSettings,
}

impl Config {
    /// Load configuration, applying file then environment overrides
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        p.display()
                    )));
                }
                Self::from_file(&p)?
            }
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(analytics) = raw.analytics {
            if let Some(retries) = analytics.max_retries {
                if retries == 0 {
                    return Err(Error::Config("analytics.max_retries must be at least 1".into()));
                }
                config.analytics.max_retries = retries;
            }
            if let Some(ms) = analytics.backoff_ms {
                config.analytics.backoff = Duration::from_millis(ms);
            }
            if let Some(chars) = analytics.chat_context_chars {
                config.analytics.chat_context_chars = chars;
            }
        }

        if let Some(server) = raw.server {
            if let Some(origins) = server.allowed_origins {
                config.server.allowed_origins = origins;
            }
            if let Some(mb) = server.max_upload_mb {
                config.server.max_upload_bytes = mb * 1024 * 1024;
            }
        }

        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DOCSIGHT_AI_MAX_RETRIES") {
            match v.parse::<u32>() {
                Ok(n) if n > 0 => self.analytics.max_retries = n,
                _ => warn!(value = %v, "Ignoring invalid DOCSIGHT_AI_MAX_RETRIES"),
            }
        }
        if let Ok(v) = std::env::var("DOCSIGHT_AI_BACKOFF_MS") {
            match v.parse::<u64>() {
                Ok(ms) => self.analytics.backoff = Duration::from_millis(ms),
                Err(_) => warn!(value = %v, "Ignoring invalid DOCSIGHT_AI_BACKOFF_MS"),
            }
        }
    }
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("docsight").join("docsight.toml"))
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    analytics: Option<RawAnalytics>,
    server: Option<RawServer>,
}

#[derive(Debug, Deserialize)]
struct RawAnalytics {
    max_retries: Option<u32>,
    backoff_ms: Option<u64>,
    chat_context_chars: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    allowed_origins: Option<Vec<String>>,
    max_upload_mb: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analytics.max_retries, 3);
        assert_eq!(config.analytics.backoff, Duration::from_millis(1500));
        assert_eq!(config.server.max_upload_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml(
            r#"
            [analytics]
            backoff_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.analytics.max_retries, 3);
        assert_eq!(config.analytics.backoff, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_server_section() {
        let config = Config::from_toml(
            r#"
            [server]
            allowed_origins = ["http://localhost:3000"]
            max_upload_mb = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.server.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let result = Config::from_toml("[analytics]\nmax_retries = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("[analytics\n"),
            Err(Error::ConfigFile(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analytics]\nchat_context_chars = 500").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.analytics.chat_context_chars, 500);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let result = Config::load(Some(Path::new("/nonexistent/docsight.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let settings = AnalyticsSettings::default();
        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(1500));
    }
}
