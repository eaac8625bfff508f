//! Read-only views returned by listing and maintenance operations

use crate::allocator::Extent;
use serde::Serialize;
use std::fmt;

/// One file in a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    /// File size in bytes
    pub size: u64,
}

impl fmt::Display for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<32} {:>10} bytes", self.name, self.size)
    }
}

/// One run of one file in a full listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEntry {
    pub name: String,
    pub size: u64,
    /// Position of this run within the file, starting at 0
    pub index: usize,
    pub run: Extent,
}

impl fmt::Display for RunEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<32} {:>10} bytes  run {:>3}: {:>5} block(s) at block {}",
            self.name, self.size, self.index, self.run.length, self.run.start
        )
    }
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub used_blocks: u64,
    pub file_count: usize,
    pub fragmentation: f64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files, {}/{} blocks used, {} free, fragmentation {:.3}",
            self.file_count, self.used_blocks, self.total_blocks, self.free_blocks, self.fragmentation
        )
    }
}

/// What a defragmentation pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DefragReport {
    /// Files whose first run was relocated
    pub files_moved: usize,
    /// Individual block moves performed
    pub blocks_moved: u64,
    /// Runs absorbed into their predecessor
    pub runs_merged: usize,
}

impl fmt::Display for DefragReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "moved {} file(s), {} block(s), merged {} run(s)",
            self.files_moved, self.blocks_moved, self.runs_merged
        )
    }
}
