//! Core storage layer
//!
//! - [`error`] - Error types and result codes
//! - [`config`] - Store configuration and the fixed block size
//! - [`validation`] - File name validation
//! - [`allocator`] - Free map and first-fit scanning:
//!   - [`allocator::free_map`] - One bit per block
//!   - [`allocator::extent`] - Contiguous block runs
//! - [`device`] - Block arena bundled with its free map
//! - [`catalog`] - Directory index from file identity to runs
//! - [`store`] - Save/load/delete/rename/list
//! - [`defrag`] - Compaction of runs toward the front of the arena
//! - [`report`] - Listing and statistics views

pub mod allocator;
pub mod catalog;
pub mod config;
pub mod defrag;
pub mod device;
pub mod error;
pub mod report;
pub mod store;
pub mod validation;

pub use store::FileStore;
