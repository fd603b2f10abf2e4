//! Configuration management for lpscout
//!
//! All configuration is loaded from `./config/lpscout.toml`.
//! No hardcoded defaults exist in source code - all defaults are in the config template.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::discovery::DiscoverySettings;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/lpscout.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/lpscout.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' is out of range: {reason}")]
    OutOfRange { field: String, reason: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub extraction: ExtractionConfig,
    pub discovery: DiscoveryConfig,
    pub completion: Option<CompletionConfig>,
    pub events: EventsConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub page_timeout_secs: u64,
    pub search_timeout_secs: u64,
}

/// Share-table extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Share values below this floor are censored on the platform side
    pub share_floor_percent: f64,
}

/// Competitor discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    pub max_competitors: usize,
    pub min_before_supplement: usize,
    pub request_delay_ms: u64,
    pub max_evidence_terms: usize,
    pub hits_per_keyword: usize,
}

impl DiscoveryConfig {
    pub fn to_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            max_competitors: self.max_competitors,
            min_before_supplement: self.min_before_supplement,
            request_delay: Duration::from_millis(self.request_delay_ms),
            max_evidence_terms: self.max_evidence_terms,
            hits_per_keyword: self.hits_per_keyword,
        }
    }
}

/// Chat-completion gateway configuration. The whole section is optional;
/// without it (or without the key in the environment) discovery runs the
/// deterministic strategy only.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub endpoint: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl CompletionConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Inbound-event dedup cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.page_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.page_timeout_secs".to_string(),
            });
        }
        if self.http.search_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.search_timeout_secs".to_string(),
            });
        }

        if !(0.0..=100.0).contains(&self.extraction.share_floor_percent) {
            return Err(ConfigError::OutOfRange {
                field: "extraction.share_floor_percent".to_string(),
                reason: "must be between 0 and 100".to_string(),
            });
        }
        if self.discovery.max_competitors == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "discovery.max_competitors".to_string(),
            });
        }
        if self.discovery.min_before_supplement > self.discovery.max_competitors {
            return Err(ConfigError::OutOfRange {
                field: "discovery.min_before_supplement".to_string(),
                reason: "cannot exceed discovery.max_competitors".to_string(),
            });
        }
        if self.discovery.hits_per_keyword == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "discovery.hits_per_keyword".to_string(),
            });
        }

        if let Some(completion) = &self.completion {
            if !completion.endpoint.starts_with("https://")
                && !completion.endpoint.starts_with("http://")
            {
                return Err(ConfigError::InvalidUrl {
                    field: "completion.endpoint".to_string(),
                    url: completion.endpoint.clone(),
                });
            }
            if completion.api_key_env.is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: "completion.api_key_env".to_string(),
                });
            }
            if completion.model.is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: "completion.model".to_string(),
                });
            }
        }

        if self.events.cache_max_entries == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "events.cache_max_entries".to_string(),
            });
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        atty::is(atty::Stream::Stdin)
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Result<AppConfig, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok(), "Default config should parse: {:?}", config.err());
    }

    #[test]
    fn test_default_config_validates() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok(), "Default config should validate");
        assert_eq!(config.discovery.max_competitors, 7);
    }

    #[test]
    fn test_completion_section_is_optional() {
        let config_str = r#"
[http]
user_agent = "test/1.0"
page_timeout_secs = 10
search_timeout_secs = 15

[extraction]
share_floor_percent = 10.0

[discovery]
max_competitors = 7
min_before_supplement = 3
request_delay_ms = 0
max_evidence_terms = 10
hits_per_keyword = 5

[events]
cache_ttl_secs = 300
cache_max_entries = 4096
"#;

        let config: AppConfig = toml::from_str(config_str).expect("Config should parse");
        assert!(config.completion.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_supplement_threshold_cannot_exceed_budget() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.discovery.min_before_supplement = config.discovery.max_competitors + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_to_settings_maps_delay() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        let settings = config.discovery.to_settings();
        assert_eq!(settings.request_delay, Duration::from_millis(1000));
        assert_eq!(settings.hits_per_keyword, 5);
    }
}
