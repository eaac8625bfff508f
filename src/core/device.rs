//! Block arena
//!
//! The arena and its free map form one ownership unit: every byte write
//! goes through a method that also updates the block's state, so a block
//! holding file data is always marked used.

use crate::allocator::{BlockAllocator, Extent, FreeMap};
use crate::config::BLOCK_SIZE;
use crate::error::{ImffsError, Result};
use std::ops::Range;

#[derive(Debug)]
pub struct Device {
    /// `block_count * BLOCK_SIZE` bytes
    arena: Vec<u8>,

    free_map: FreeMap,
}

impl Device {
    /// Allocate a zeroed arena of `block_count` blocks, all free
    pub fn new(block_count: usize) -> Result<Self> {
        if block_count == 0 {
            return Err(ImffsError::InvalidBlockCount(block_count));
        }

        let size = block_count
            .checked_mul(BLOCK_SIZE)
            .ok_or(ImffsError::InvalidBlockCount(block_count))?;

        let mut arena = Vec::new();
        arena.try_reserve_exact(size).map_err(|e| {
            ImffsError::Fatal(format!("cannot reserve {} byte arena: {}", size, e))
        })?;
        arena.resize(size, 0);

        Ok(Device {
            arena,
            free_map: FreeMap::new(block_count),
        })
    }

    pub fn block_count(&self) -> u64 {
        self.free_map.total_blocks() as u64
    }

    pub fn free_map(&self) -> &FreeMap {
        &self.free_map
    }

    pub fn is_free(&self, block_id: u64) -> bool {
        self.free_map.is_free(block_id)
    }

    fn byte_range(&self, block_id: u64) -> Result<Range<usize>> {
        if block_id >= self.block_count() {
            return Err(ImffsError::InvalidBlockId(block_id));
        }
        let offset = block_id as usize * BLOCK_SIZE;
        Ok(offset..offset + BLOCK_SIZE)
    }

    /// Raw contents of one block
    pub fn read_block(&self, block_id: u64) -> Result<&[u8]> {
        let range = self.byte_range(block_id)?;
        Ok(&self.arena[range])
    }

    /// Claim a free block and fill it with `data`, zero-padding the tail
    pub fn write_block(&mut self, block_id: u64, data: &[u8]) -> Result<()> {
        if data.len() > BLOCK_SIZE {
            return Err(ImffsError::Corruption(format!(
                "{} bytes do not fit in a {} byte block",
                data.len(),
                BLOCK_SIZE
            )));
        }

        let range = self.byte_range(block_id)?;
        self.free_map.mark_allocated(block_id)?;

        let block = &mut self.arena[range];
        block[..data.len()].copy_from_slice(data);
        block[data.len()..].fill(0);
        Ok(())
    }

    /// Move a used block's bytes into a free block, swapping their states
    pub fn move_block(&mut self, from: u64, to: u64) -> Result<()> {
        let src = self.byte_range(from)?;
        let dst = self.byte_range(to)?;

        if !self.free_map.is_allocated(from) {
            return Err(ImffsError::Corruption(format!(
                "cannot move free block {}",
                from
            )));
        }

        self.free_map.mark_allocated(to)?;
        self.arena.copy_within(src, dst.start);
        self.free_map.free_block(from)?;
        Ok(())
    }

    /// Return every block of an extent to the free pool
    pub fn release(&mut self, extent: &Extent) -> Result<()> {
        self.free_map.free_extent(extent)
    }
}
