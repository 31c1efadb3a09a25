//! # Application Configuration
//!
//! TOML settings file for the CLI. Every key is optional:
//!
//! ```toml
//! [store]
//! kmer_length = 31
//! canonical = true
//! max_pump_batch = 8192
//! ```
//!
//! Command-line flags override file values.

use kmerstore_core::{KmerStoreError, StoreConfig};
use serde::Deserialize;
use std::path::Path;

/// Maximum accepted size of a configuration file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Contents of a `kmerstore.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub store: StoreConfig,
}

impl AppConfig {
    /// Parse configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, KmerStoreError> {
        let config: Self =
            toml::from_str(text).map_err(|e| KmerStoreError::InvalidConfig(e.to_string()))?;
        config.store.validate()?;
        Ok(config)
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, KmerStoreError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| KmerStoreError::IoError(format!("{}: {}", path.display(), e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(KmerStoreError::InvalidConfig(format!(
                "config file {} exceeds {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| KmerStoreError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, KmerStoreError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOverrides {
    pub kmer_length: Option<usize>,
    pub canonical: bool,
    pub colour_space: bool,
}

impl StoreOverrides {
    /// Apply to `config` and re-validate.
    pub fn apply(&self, mut config: StoreConfig) -> Result<StoreConfig, KmerStoreError> {
        if let Some(k) = self.kmer_length {
            config.kmer_length = k;
        }
        config.canonical |= self.canonical;
        config.colour_space |= self.colour_space;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn partial_store_table() {
        let config = AppConfig::from_toml_str("[store]\nkmer_length = 31\ncanonical = true\n")
            .expect("parse");
        assert_eq!(config.store.kmer_length, 31);
        assert!(config.store.canonical);
        assert!(!config.store.colour_space);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(AppConfig::from_toml_str("[store]\nkmer_length = 0\n").is_err());
        assert!(AppConfig::from_toml_str("[store]\nkmer_length = \"x\"\n").is_err());
        assert!(AppConfig::from_toml_str("[other]\n").is_err());
    }

    #[test]
    fn overrides_win() {
        let overrides = StoreOverrides {
            kmer_length: Some(7),
            canonical: true,
            colour_space: false,
        };
        let config = overrides.apply(StoreConfig::default()).expect("apply");
        assert_eq!(config.kmer_length, 7);
        assert!(config.canonical);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kmerstore.toml");
        std::fs::write(&path, "[store]\ncolour_space = true\n").expect("write");
        let config = AppConfig::resolve(Some(&path)).expect("load");
        assert!(config.store.colour_space);
        assert!(AppConfig::resolve(None).is_ok());
    }
}
