//! File store
//!
//! Combines the arena, the first-fit allocator and the directory index into
//! save/load/delete/rename/list operations.

use crate::allocator::{BlockAllocator, Extent};
use crate::catalog::{fold_name, Catalog, CatalogEntry, FileKey};
use crate::config::{RenamePolicy, SaveMode, StoreConfig, BLOCK_SIZE};
use crate::device::Device;
use crate::error::{ImffsError, Result};
use crate::report::{DirEntry, RunEntry, StoreStats};
use crate::validation::FileName;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// In-memory file store
///
/// Owns the arena, its free map and the directory index. All mutating
/// operations leave the three consistent with each other when they return,
/// on success and on error.
#[derive(Debug)]
pub struct FileStore {
    pub(crate) config: StoreConfig,
    pub(crate) device: Device,
    pub(crate) catalog: Catalog,
}

/// Read until `buf` is full or the source is exhausted
fn fill_block<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl FileStore {
    /// Create a store of `block_count` blocks with default settings
    pub fn new(block_count: usize) -> Result<Self> {
        Self::with_config(StoreConfig::new(block_count))
    }

    pub fn with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let device = Device::new(config.block_count)?;

        info!(
            "Created store: {} blocks of {} bytes ({:?} saves)",
            config.block_count, BLOCK_SIZE, config.save_mode
        );

        Ok(FileStore {
            config,
            device,
            catalog: Catalog::new(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn block_count(&self) -> u64 {
        self.device.block_count()
    }

    fn validate_name(&self, name: &str) -> Result<FileName> {
        FileName::new(name, self.config.max_name_len)
    }

    /// Save everything `source` yields under `name`
    ///
    /// The content is written first-fit and may be split over several runs
    /// when free space is fragmented. Returns the number of bytes stored.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `name` is not a valid file name
    /// - `AlreadyExists` if a file answers to `name` already
    /// - `OutOfSpace` if the arena fills up before the source is exhausted
    /// - `Io` if reading the source fails
    ///
    /// On failure no key is added. Blocks already written are released in
    /// `SaveMode::Transactional` and left allocated in `SaveMode::BestEffort`.
    pub fn save<R: Read>(&mut self, mut source: R, name: &str) -> Result<u64> {
        let name = self.validate_name(name)?;
        if self.catalog.contains(name.as_str()) {
            return Err(ImffsError::AlreadyExists(name.into_string()));
        }

        let mut runs = Vec::new();
        match self.write_runs(&mut source, &mut runs) {
            Ok(size) => {
                debug!("Saved {} ({} bytes, {} run(s))", name, size, runs.len());
                let key = FileKey::new(name.into_string(), size);
                self.catalog.insert(CatalogEntry::new(key.clone()))?;
                for run in runs {
                    self.catalog.insert_value(&key, run);
                }
                Ok(size)
            }
            Err(e) => {
                self.abandon_runs(name.as_str(), &runs);
                Err(e)
            }
        }
    }

    /// Copy the source into free blocks, recording each contiguous run
    fn write_runs<R: Read>(&mut self, source: &mut R, runs: &mut Vec<Extent>) -> Result<u64> {
        let mut buf = [0u8; BLOCK_SIZE];
        let mut size = 0u64;
        // Free blocks found by the last scan and not yet written
        let mut free = Extent::new(0, 0);

        loop {
            let n = fill_block(source, &mut buf)?;
            if n == 0 {
                break;
            }

            if free.is_empty() {
                free = self
                    .device
                    .free_map()
                    .free_run_from(free.start, u64::MAX)
                    .ok_or(ImffsError::OutOfSpace)?;
                trace!("Starting run at block {}", free.start);
            }

            let block_id = free.start;
            self.device.write_block(block_id, &buf[..n])?;
            free = Extent::new(block_id + 1, free.length - 1);

            let block = Extent::new(block_id, 1);
            match runs.last_mut() {
                Some(run) if run.precedes(&block) => run.length += 1,
                _ => runs.push(block),
            }

            size += n as u64;

            if n < BLOCK_SIZE {
                break;
            }
        }

        Ok(size)
    }

    fn abandon_runs(&mut self, name: &str, runs: &[Extent]) {
        let blocks: u64 = runs.iter().map(|r| r.length).sum();
        if blocks == 0 {
            return;
        }

        match self.config.save_mode {
            SaveMode::Transactional => {
                for run in runs {
                    if let Err(e) = self.device.release(run) {
                        warn!("Failed to release run {} of {}: {}", run, name, e);
                    }
                }
                debug!("Rolled back {} block(s) of failed save {}", blocks, name);
            }
            SaveMode::BestEffort => {
                warn!(
                    "Save of {} failed; {} block(s) stay allocated without an owner",
                    name, blocks
                );
            }
        }
    }

    /// Save a byte slice under `name`
    pub fn save_bytes(&mut self, name: &str, content: &[u8]) -> Result<u64> {
        self.save(content, name)
    }

    /// Save a file from the host file system under `name`
    pub fn save_file<P: AsRef<Path>>(&mut self, disk_path: P, name: &str) -> Result<u64> {
        let file = File::open(disk_path.as_ref())?;
        self.save(BufReader::new(file), name)
    }

    /// Write the full content of `name` to `sink`
    ///
    /// Runs are replayed in stored order; the last block is truncated to
    /// the file size. Returns the number of bytes written.
    pub fn load<W: Write>(&self, name: &str, mut sink: W) -> Result<u64> {
        let entry = self
            .catalog
            .get(name)
            .ok_or_else(|| ImffsError::NotFound(name.to_string()))?;

        let size = entry.key.size;
        let mut remaining = size;
        let mut written = 0u64;

        'runs: for run in &entry.runs {
            for block_id in run.blocks() {
                if remaining == 0 {
                    break 'runs;
                }

                let take = remaining.min(BLOCK_SIZE as u64) as usize;
                let block = self.device.read_block(block_id)?;
                sink.write_all(&block[..take])?;

                written += take as u64;
                remaining -= take as u64;
            }
        }
        sink.flush()?;

        if written != size {
            return Err(ImffsError::ShortWrite {
                expected: size,
                actual: written,
            });
        }

        debug!("Loaded {} ({} bytes)", entry.key.name, written);
        Ok(written)
    }

    /// Read the full content of `name` into memory
    pub fn load_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let size = self.metadata(name)?.size;
        let mut content = Vec::with_capacity(size as usize);
        self.load(name, &mut content)?;
        Ok(content)
    }

    /// Write the content of `name` to a file on the host file system
    pub fn load_file<P: AsRef<Path>>(&self, name: &str, disk_path: P) -> Result<u64> {
        // Don't create the destination for a file that doesn't exist
        self.metadata(name)?;
        let file = File::create(disk_path.as_ref())?;
        self.load(name, BufWriter::new(file))
    }

    /// Delete `name`, returning all its blocks to the free pool
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let runs = self
            .catalog
            .get_values(name)
            .ok_or_else(|| ImffsError::NotFound(name.to_string()))?
            .to_vec();

        for run in &runs {
            self.device.release(run)?;
        }
        self.catalog.remove_key(name);

        debug!("Deleted {} ({} run(s) freed)", name, runs.len());
        Ok(())
    }

    /// Rename `old` to `new`, leaving size and content untouched
    ///
    /// If `new` names a different existing file, the store's
    /// `RenamePolicy` decides: `Reject` fails with `AlreadyExists`,
    /// `Overwrite` deletes the existing file first.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let new_name = self.validate_name(new)?;

        if !self.catalog.contains(old) {
            return Err(ImffsError::NotFound(old.to_string()));
        }

        if fold_name(old) != fold_name(new) && self.catalog.contains(new) {
            match self.config.rename_policy {
                RenamePolicy::Reject => {
                    return Err(ImffsError::AlreadyExists(new.to_string()));
                }
                RenamePolicy::Overwrite => {
                    debug!("Rename {} -> {} replaces existing file", old, new);
                    self.delete(new)?;
                }
            }
        }

        self.catalog.rename_key(old, new_name.as_str())?;
        debug!("Renamed {} -> {}", old, new);
        Ok(())
    }

    /// Names and sizes of all files, in index order
    pub fn list(&self) -> Vec<DirEntry> {
        self.catalog
            .keys()
            .map(|key| DirEntry {
                name: key.name.clone(),
                size: key.size,
            })
            .collect()
    }

    /// Every run of every file, in index order
    pub fn full_list(&self) -> Vec<RunEntry> {
        self.catalog
            .entries()
            .flat_map(|entry| {
                entry.runs.iter().enumerate().map(move |(index, run)| RunEntry {
                    name: entry.key.name.clone(),
                    size: entry.key.size,
                    index,
                    run: *run,
                })
            })
            .collect()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.catalog.contains(name)
    }

    pub fn metadata(&self, name: &str) -> Result<&FileKey> {
        self.catalog
            .get(name)
            .map(|e| &e.key)
            .ok_or_else(|| ImffsError::NotFound(name.to_string()))
    }

    /// Runs of `name` in file order
    pub fn runs(&self, name: &str) -> Result<&[Extent]> {
        self.catalog
            .get_values(name)
            .ok_or_else(|| ImffsError::NotFound(name.to_string()))
    }

    pub fn stats(&self) -> StoreStats {
        let free_map = self.device.free_map();
        let total = free_map.total_blocks() as u64;
        let free = free_map.free_blocks() as u64;
        StoreStats {
            total_blocks: total,
            free_blocks: free,
            used_blocks: total - free,
            file_count: self.catalog.len(),
            fragmentation: free_map.fragmentation_score(),
        }
    }

    /// Used blocks that no run references
    pub fn leaked_blocks(&self) -> Vec<u64> {
        let mut owned = vec![false; self.block_count() as usize];
        for entry in self.catalog.entries() {
            for run in &entry.runs {
                for block_id in run.blocks().filter(|&b| b < self.block_count()) {
                    owned[block_id as usize] = true;
                }
            }
        }

        (0..self.block_count())
            .filter(|&b| !self.device.is_free(b) && !owned[b as usize])
            .collect()
    }

    /// Check that the free map, the arena and the index agree
    ///
    /// Every run must lie inside the arena on used blocks, no block may
    /// belong to two runs, each file's runs must hold its size with less
    /// than one block to spare, and no used block may be unowned.
    pub fn verify(&self) -> Result<()> {
        let block_count = self.block_count();
        let mut owner: Vec<Option<&str>> = vec![None; block_count as usize];

        for entry in self.catalog.entries() {
            let name = entry.key.name.as_str();

            for run in &entry.runs {
                if run.is_empty() || run.end() > block_count {
                    return Err(ImffsError::Corruption(format!(
                        "{}: run {} lies outside the arena",
                        name, run
                    )));
                }

                for block_id in run.blocks() {
                    if self.device.is_free(block_id) {
                        return Err(ImffsError::Corruption(format!(
                            "{}: block {} is marked free",
                            name, block_id
                        )));
                    }

                    let slot = &mut owner[block_id as usize];
                    if let Some(other) = slot {
                        return Err(ImffsError::Corruption(format!(
                            "block {} belongs to both {} and {}",
                            block_id, other, name
                        )));
                    }
                    *slot = Some(name);
                }
            }

            let size = entry.key.size;
            let capacity = entry.capacity();
            let fits = if size == 0 {
                entry.runs.is_empty()
            } else {
                capacity >= size && capacity < size + BLOCK_SIZE as u64
            };
            if !fits {
                return Err(ImffsError::Corruption(format!(
                    "{}: {} bytes stored in {} bytes of runs",
                    name, size, capacity
                )));
            }
        }

        let leaked = (0..block_count)
            .filter(|&b| !self.device.is_free(b) && owner[b as usize].is_none())
            .count();
        if leaked > 0 {
            return Err(ImffsError::Corruption(format!(
                "{} used block(s) belong to no file",
                leaked
            )));
        }

        Ok(())
    }
}
