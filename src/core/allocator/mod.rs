//! Block allocation for the arena
//!
//! Allocation is first-fit: scans always move forward from a given
//! position and never wrap. Runs of contiguous blocks are described by
//! `Extent`s.

pub mod extent;
pub mod free_map;

pub use extent::Extent;
pub use free_map::{BlockState, FreeMap};

/// Block allocator trait
///
/// Defines the scanning interface the file store and defragmenter use to
/// find space in the arena.
pub trait BlockAllocator {
    /// First free block at or after `from`, if any
    fn find_free_block(&self, from: u64) -> Option<u64>;

    /// First free block at or after `from`, extended forward while blocks
    /// stay free, capped at `max_len` blocks
    fn free_run_from(&self, from: u64, max_len: u64) -> Option<Extent>;

    /// Calculate fragmentation score (0.0 = no fragmentation, higher = more fragmented)
    fn fragmentation_score(&self) -> f64;

    /// Get total number of blocks managed
    fn total_blocks(&self) -> usize;

    /// Get number of free blocks available
    fn free_blocks(&self) -> usize;
}
