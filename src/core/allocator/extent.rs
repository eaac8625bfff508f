//! Block runs
//!
//! An extent is a contiguous range of blocks. Files are stored as an
//! ordered list of extents; the order is the order of the bytes in the file.

use crate::config::BLOCK_SIZE;
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// A contiguous range of blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Extent {
    /// Starting block ID
    pub start: u64,
    /// Number of contiguous blocks
    pub length: u64,
}

impl Extent {
    pub fn new(start: u64, length: u64) -> Self {
        Extent { start, length }
    }

    /// One past the last block of the extent
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Check if this extent contains a block ID
    pub fn contains(&self, block_id: u64) -> bool {
        block_id >= self.start && block_id < self.end()
    }

    /// Check if `next` starts exactly where this extent ends
    pub fn precedes(&self, next: &Extent) -> bool {
        self.end() == next.start
    }

    /// Append `next` when it starts exactly where this extent ends
    ///
    /// Order matters: the result is only valid as a file run when `next`
    /// holds the bytes that follow this extent's bytes.
    pub fn coalesce(&self, next: &Extent) -> Option<Extent> {
        if !self.precedes(next) {
            return None;
        }

        Some(Extent {
            start: self.start,
            length: self.length + next.length,
        })
    }

    /// Block IDs covered by this extent, in ascending order
    pub fn blocks(&self) -> Range<u64> {
        self.start..self.end()
    }

    /// Capacity of the extent in bytes
    pub fn byte_len(&self) -> u64 {
        self.length * BLOCK_SIZE as u64
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.length, self.start)
    }
}
