//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `PAPER_HARVEST_` (sections separated
//! by `__`, e.g. `PAPER_HARVEST_AI__API_KEY`).

mod file_config;

pub use file_config::{default_config_path, write_default_config, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::eutils::{EUTILS_BASE, PMC_ARTICLE_BASE};
use crate::utils::{HttpSettings, DEFAULT_USER_AGENT};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "PAPER_HARVEST";

/// User agent presented to publisher landing pages, which often refuse
/// obvious bots
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub downloads: DownloadsConfig,
    pub http: HttpConfig,
    pub endpoints: EndpointsConfig,
    pub citations: CitationsConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
}

impl Config {
    /// Copy safe to print, with secrets masked
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        if config.ai.api_key.is_some() {
            config.ai.api_key = Some("********".to_string());
        }
        config
    }
}

/// Download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    /// Directory receiving `<id>.pdf` / `<id>.txt` artifacts
    pub directory: PathBuf,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./downloads"),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Sent to the metadata APIs
    pub user_agent: String,

    /// Sent to DOI landing pages and mirrors
    pub browser_user_agent: String,

    pub timeout_seconds: u64,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            browser_user_agent: BROWSER_USER_AGENT.to_string(),
            timeout_seconds: 30,
            max_redirects: 5,
        }
    }
}

impl HttpConfig {
    /// Settings for the metadata API client
    pub fn api_settings(&self) -> HttpSettings {
        self.settings_with(&self.user_agent)
    }

    /// Settings for the landing-page client used during acquisition
    pub fn browser_settings(&self) -> HttpSettings {
        self.settings_with(&self.browser_user_agent)
    }

    fn settings_with(&self, user_agent: &str) -> HttpSettings {
        HttpSettings {
            user_agent: user_agent.to_string(),
            timeout: Duration::from_secs(self.timeout_seconds),
            max_redirects: self.max_redirects,
        }
    }
}

/// Upstream base URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub crossref: String,
    pub eutils: String,
    pub doi_resolver: String,
    pub pmc: String,

    /// Mirror queried by DOI when a landing page has no PDF; empty disables it
    pub mirror_base: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            crossref: crate::sources::CROSSREF_API_BASE.to_string(),
            eutils: EUTILS_BASE.to_string(),
            doi_resolver: "https://doi.org".to_string(),
            pmc: PMC_ARTICLE_BASE.to_string(),
            mirror_base: String::new(),
        }
    }
}

impl EndpointsConfig {
    pub fn mirror(&self) -> Option<&str> {
        let trimmed = self.mirror_base.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Citation enrichment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationsConfig {
    /// Concurrent lookups
    pub pool_size: usize,

    /// Cache entry lifetime
    pub ttl_seconds: u64,
}

impl Default for CitationsConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            ttl_seconds: 24 * 60 * 60,
        }
    }
}

impl CitationsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/papers.db"),
        }
    }
}

/// AI summarizer settings (OpenAI-compatible chat completions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            model: "qwen-max".to_string(),
            api_key: None,
            max_tokens: 1500,
            temperature: 0.7,
        }
    }
}

/// Load configuration from an explicit file, or the default location when
/// it exists, with environment overrides on top
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path));
        }
        None => {
            if let Some(default_path) = default_config_path() {
                builder = builder.add_source(config::File::from(default_path).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration (built-in values only)
pub fn get_config() -> Config {
    Config::default()
}
