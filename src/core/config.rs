//! Store configuration
//!
//! A `StoreConfig` can be built in code (see `ImffsBuilder`) or loaded from
//! a TOML document:
//!
//! ```toml
//! block_count = 64
//! save_mode = "transactional"
//! rename_policy = "reject"
//! max_name_len = 255
//! ```

use crate::error::{ImffsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Size of every block in the arena, in bytes
pub const BLOCK_SIZE: usize = 256;

pub const DEFAULT_BLOCK_COUNT: usize = 64;
pub const DEFAULT_MAX_NAME_LEN: usize = 255;

/// What `save` does with blocks it already wrote when it fails part way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveMode {
    /// Return every written block to the free map; no key is left behind
    #[default]
    Transactional,
    /// Leave written blocks marked used with nothing referencing them
    BestEffort,
}

/// What `rename` does when the target name is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenamePolicy {
    #[default]
    Reject,
    /// Delete the existing target, then rename
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of blocks in the arena (fixed for the store's lifetime)
    pub block_count: usize,
    pub save_mode: SaveMode,
    pub rename_policy: RenamePolicy,
    /// Longest accepted file name, in bytes
    pub max_name_len: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            block_count: DEFAULT_BLOCK_COUNT,
            save_mode: SaveMode::default(),
            rename_policy: RenamePolicy::default(),
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl StoreConfig {
    pub fn new(block_count: usize) -> Self {
        StoreConfig {
            block_count,
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(s).map_err(|e| ImffsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_count == 0 {
            return Err(ImffsError::InvalidBlockCount(self.block_count));
        }

        if self.block_count.checked_mul(BLOCK_SIZE).is_none() {
            return Err(ImffsError::InvalidConfig(format!(
                "block_count {} overflows the arena size",
                self.block_count
            )));
        }

        if self.max_name_len == 0 {
            return Err(ImffsError::InvalidConfig(
                "max_name_len must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.block_count, DEFAULT_BLOCK_COUNT);
        assert_eq!(config.save_mode, SaveMode::Transactional);
        assert_eq!(config.rename_policy, RenamePolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = StoreConfig::from_toml_str(
            r#"
            block_count = 5
            save_mode = "best-effort"
            rename_policy = "overwrite"
            "#,
        )
        .unwrap();

        assert_eq!(config.block_count, 5);
        assert_eq!(config.save_mode, SaveMode::BestEffort);
        assert_eq!(config.rename_policy, RenamePolicy::Overwrite);
        assert_eq!(config.max_name_len, DEFAULT_MAX_NAME_LEN);
    }

    #[test]
    fn test_from_toml_rejects_zero_blocks() {
        let result = StoreConfig::from_toml_str("block_count = 0");
        assert!(matches!(result, Err(ImffsError::InvalidBlockCount(0))));
    }

    #[test]
    fn test_from_toml_rejects_unknown_mode() {
        let result = StoreConfig::from_toml_str(r#"save_mode = "sometimes""#);
        assert!(matches!(result, Err(ImffsError::InvalidConfig(_))));
    }
}
