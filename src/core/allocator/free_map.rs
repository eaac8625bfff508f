//! Free map over the arena's blocks
//!
//! One bit per block packed into 64-bit words:
//! - 0 = free block
//! - 1 = used block

use crate::allocator::{BlockAllocator, Extent};
use crate::error::{ImffsError, Result};

/// Allocation state of a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Free,
    Used,
}

#[derive(Debug, Clone)]
pub struct FreeMap {
    /// Bitmap words (each word = 64 bits = 64 blocks)
    bitmap: Vec<u64>,

    /// Total number of blocks tracked
    total_blocks: usize,

    /// Number of free blocks available
    free_blocks: usize,
}

impl FreeMap {
    /// Create a free map with every block free
    pub fn new(total_blocks: usize) -> Self {
        let num_words = total_blocks.div_ceil(64);
        FreeMap {
            bitmap: vec![0u64; num_words],
            total_blocks,
            free_blocks: total_blocks,
        }
    }

    fn locate(block_id: u64) -> (usize, u64) {
        ((block_id / 64) as usize, 1u64 << (block_id % 64))
    }

    fn check_range(&self, block_id: u64) -> Result<()> {
        if block_id >= self.total_blocks as u64 {
            return Err(ImffsError::InvalidBlockId(block_id));
        }
        Ok(())
    }

    /// Check if a specific block is in use; out-of-range blocks are never in use
    pub fn is_allocated(&self, block_id: u64) -> bool {
        if block_id >= self.total_blocks as u64 {
            return false;
        }

        let (word_idx, mask) = Self::locate(block_id);
        (self.bitmap[word_idx] & mask) != 0
    }

    /// Check if a block is in range and free
    pub fn is_free(&self, block_id: u64) -> bool {
        block_id < self.total_blocks as u64 && !self.is_allocated(block_id)
    }

    /// States of every block in address order
    pub fn states(&self) -> impl Iterator<Item = BlockState> + '_ {
        (0..self.total_blocks as u64).map(move |id| {
            if self.is_allocated(id) {
                BlockState::Used
            } else {
                BlockState::Free
            }
        })
    }

    /// Mark a free block as used
    pub fn mark_allocated(&mut self, block_id: u64) -> Result<()> {
        self.check_range(block_id)?;

        let (word_idx, mask) = Self::locate(block_id);
        if self.bitmap[word_idx] & mask != 0 {
            return Err(ImffsError::BlockAlreadyAllocated(block_id));
        }

        self.bitmap[word_idx] |= mask;
        self.free_blocks -= 1;
        Ok(())
    }

    /// Return a used block to the free pool
    pub fn free_block(&mut self, block_id: u64) -> Result<()> {
        self.check_range(block_id)?;

        let (word_idx, mask) = Self::locate(block_id);
        if self.bitmap[word_idx] & mask == 0 {
            tracing::warn!("Double-free detected for block {}", block_id);
            return Ok(());
        }

        self.bitmap[word_idx] &= !mask;
        self.free_blocks += 1;
        Ok(())
    }

    /// Free every block of an extent
    pub fn free_extent(&mut self, extent: &Extent) -> Result<()> {
        if extent.end() > self.total_blocks as u64 {
            return Err(ImffsError::InvalidBlockId(extent.end() - 1));
        }

        for block_id in extent.blocks() {
            self.free_block(block_id)?;
        }
        Ok(())
    }
}

impl BlockAllocator for FreeMap {
    fn find_free_block(&self, from: u64) -> Option<u64> {
        if from >= self.total_blocks as u64 {
            return None;
        }

        let (first_word, from_mask) = Self::locate(from);
        // Treat the bits below `from` as used so the first word starts mid-way
        let mut word = self.bitmap[first_word] | (from_mask - 1);
        let mut word_idx = first_word;

        loop {
            if word != u64::MAX {
                let block_id = (word_idx * 64) as u64 + (!word).trailing_zeros() as u64;
                // Padding bits past the end read as free
                return (block_id < self.total_blocks as u64).then_some(block_id);
            }

            word_idx += 1;
            if word_idx >= self.bitmap.len() {
                return None;
            }
            word = self.bitmap[word_idx];
        }
    }

    fn free_run_from(&self, from: u64, max_len: u64) -> Option<Extent> {
        if max_len == 0 {
            return None;
        }

        let start = self.find_free_block(from)?;
        let mut length = 1;
        while length < max_len && self.is_free(start + length) {
            length += 1;
        }

        Some(Extent::new(start, length))
    }

    fn fragmentation_score(&self) -> f64 {
        if self.total_blocks == 0 {
            return 0.0;
        }

        // Count free<->used transitions; a compact layout has very few
        let mut transitions = 0usize;
        let mut prev = BlockState::Free;
        for state in self.states() {
            if state != prev {
                transitions += 1;
            }
            prev = state;
        }

        (transitions as f64) / (self.total_blocks as f64)
    }

    fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    fn free_blocks(&self) -> usize {
        self.free_blocks
    }
}
