//! # IMFFS - In-Memory Flat File System
//!
//! `imffs` emulates a small block-structured file system inside the
//! process's memory:
//!
//! - **Fixed arena** of equal 256-byte blocks with a free map over them
//! - **First-fit allocation**: files are split over several runs when free
//!   space is fragmented
//! - **Directory index** mapping case-insensitive names to ordered runs
//! - **Defragmentation** that slides runs toward the front and merges a
//!   file's runs when they become adjacent
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imffs::{FileStore, Result};
//!
//! # fn main() -> Result<()> {
//! let mut store = FileStore::new(64)?;
//!
//! store.save_bytes("report.txt", b"Hello, World!")?;
//! let content = store.load_bytes("REPORT.TXT")?;
//! assert_eq!(content, b"Hello, World!");
//!
//! for entry in store.list() {
//!     println!("{}", entry);
//! }
//!
//! store.delete("report.txt")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust,no_run
//! use imffs::{ImffsBuilder, RenamePolicy, Result};
//!
//! # fn main() -> Result<()> {
//! let mut store = ImffsBuilder::new()
//!     .block_count(128)
//!     .rename_policy(RenamePolicy::Overwrite)
//!     .build()?;
//!
//! store.save_bytes("a", b"first")?;
//! store.save_bytes("b", b"second")?;
//! store.rename("a", "b")?; // replaces "b"
//! # Ok(())
//! # }
//! ```

// Storage layer
pub mod core;
pub mod shell;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    allocator, catalog, config, defrag, device, error, report, store, validation,
};

pub use crate::core::{
    allocator::{BlockState, Extent},
    catalog::FileKey,
    config::{RenamePolicy, SaveMode, StoreConfig, BLOCK_SIZE},
    error::{ImffsError, Result, ResultCode},
    report::{DefragReport, DirEntry, RunEntry, StoreStats},
    store::FileStore,
};

use std::path::Path;
use tracing::{debug, info};

/// Builder for customizing store creation
///
/// Provides a fluent API over `StoreConfig`.
///
/// # Examples
///
/// ```rust,no_run
/// use imffs::{ImffsBuilder, SaveMode};
///
/// # fn main() -> imffs::Result<()> {
/// let store = ImffsBuilder::new()
///     .block_count(5)
///     .save_mode(SaveMode::Transactional)
///     .build()?;
/// assert_eq!(store.block_count(), 5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImffsBuilder {
    config: StoreConfig,
}

impl ImffsBuilder {
    /// Create a new ImffsBuilder with default settings
    pub fn new() -> Self {
        ImffsBuilder {
            config: StoreConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: StoreConfig) -> Self {
        ImffsBuilder { config }
    }

    /// Start from a TOML configuration file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading store configuration from {:?}", path);
        Ok(ImffsBuilder {
            config: StoreConfig::from_toml_file(path)?,
        })
    }

    /// Set the number of blocks in the arena
    pub fn block_count(mut self, block_count: usize) -> Self {
        self.config.block_count = block_count;
        self
    }

    pub fn save_mode(mut self, mode: SaveMode) -> Self {
        self.config.save_mode = mode;
        self
    }

    pub fn rename_policy(mut self, policy: RenamePolicy) -> Self {
        self.config.rename_policy = policy;
        self
    }

    /// Set the longest accepted file name, in bytes
    pub fn max_name_len(mut self, max_name_len: usize) -> Self {
        self.config.max_name_len = max_name_len;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Build the FileStore instance
    pub fn build(self) -> Result<FileStore> {
        info!(
            "Building store with {} blocks of {} bytes",
            self.config.block_count, BLOCK_SIZE
        );
        FileStore::with_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let store = ImffsBuilder::new().build().unwrap();
        assert_eq!(store.block_count(), config::DEFAULT_BLOCK_COUNT as u64);
        assert_eq!(store.config().save_mode, SaveMode::Transactional);
        assert_eq!(store.config().rename_policy, RenamePolicy::Reject);
    }

    #[test]
    fn test_builder_options() {
        let store = ImffsBuilder::new()
            .block_count(7)
            .save_mode(SaveMode::BestEffort)
            .rename_policy(RenamePolicy::Overwrite)
            .max_name_len(8)
            .build()
            .unwrap();

        assert_eq!(store.block_count(), 7);
        assert_eq!(store.config().save_mode, SaveMode::BestEffort);
        assert_eq!(store.config().max_name_len, 8);
    }

    #[test]
    fn test_builder_rejects_zero_blocks() {
        let result = ImffsBuilder::new().block_count(0).build();
        assert_eq!(ResultCode::of(&result), ResultCode::Invalid);
    }

    #[test]
    fn test_builder_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("imffs.toml");
        std::fs::write(&path, "block_count = 12\nrename_policy = \"overwrite\"\n").unwrap();

        let store = ImffsBuilder::from_toml_file(&path).unwrap().build().unwrap();
        assert_eq!(store.block_count(), 12);
        assert_eq!(store.config().rename_policy, RenamePolicy::Overwrite);
    }

    #[test]
    fn test_max_name_len_enforced() {
        let mut store = ImffsBuilder::new()
            .block_count(4)
            .max_name_len(3)
            .build()
            .unwrap();

        assert!(store.save_bytes("abc", b"x").is_ok());
        let result = store.save_bytes("abcd", b"x");
        assert!(matches!(result, Err(ImffsError::InvalidName(_))));
    }
}
