//! Configuration file support.
//!
//! # Configuration File Format
//!
//! ```toml
//! [downloads]
//! directory = "./downloads"
//!
//! [http]
//! timeout_seconds = 30
//! max_redirects = 5
//!
//! [endpoints]
//! crossref = "https://api.crossref.org"
//! eutils = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"
//! doi_resolver = "https://doi.org"
//! pmc = "https://www.ncbi.nlm.nih.gov/pmc"
//! mirror_base = ""
//!
//! [citations]
//! pool_size = 5
//! ttl_seconds = 86400
//!
//! [database]
//! path = "./data/papers.db"
//!
//! [ai]
//! model = "qwen-max"
//! max_tokens = 1500
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// `<config dir>/paper-harvest/config.toml`, when the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
}

/// Write `config` as TOML, creating parent directories
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn write_default_config(
    config: &Config,
    path: &Path,
    force: bool,
) -> Result<(), ConfigFileError> {
    if path.exists() && !force {
        return Err(ConfigFileError::Exists(path.to_path_buf()));
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }
    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Config file already exists: {}", .0.display())]
    Exists(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.citations.pool_size = 3;
        config.ai.api_key = Some("secret".to_string());
        write_default_config(&config, &path, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.citations.pool_size, 3);
        assert_eq!(loaded.ai.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let result = write_default_config(&Config::default(), &path, false);
        assert!(matches!(result, Err(ConfigFileError::Exists(_))));
        assert!(write_default_config(&Config::default(), &path, true).is_ok());
    }

    #[test]
    fn test_default_path_is_namespaced() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("paper-harvest/config.toml"));
        }
    }
}
