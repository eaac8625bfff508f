//! Defragmentation
//!
//! Files are visited in index order. Each file's first run is slid down to
//! the lowest position where it fits; every later run of the same file is
//! then pulled, block by block, into the free space directly after the run
//! before it, merging runs that end up adjacent. Runs are never moved to a
//! higher address and different files are never interleaved.

use crate::allocator::{BlockAllocator, Extent};
use crate::error::Result;
use crate::report::DefragReport;
use crate::store::FileStore;
use tracing::{debug, info};

impl FileStore {
    /// Compact used blocks toward the start of the arena
    ///
    /// File contents are unchanged, and no file's first run starts later
    /// than it did before.
    pub fn defrag(&mut self) -> Result<DefragReport> {
        let mut report = DefragReport::default();

        for name in self.catalog.folded_names() {
            let before = match self.catalog.get_values(&name) {
                Some(runs) if !runs.is_empty() => runs.to_vec(),
                _ => continue,
            };

            // `runs` tracks every completed block move, so the index is
            // updated even when a move fails part way through
            let mut runs = before.clone();
            let outcome = self.compact_runs(&mut runs, &mut report);
            runs.retain(|run| !run.is_empty());

            if runs != before {
                debug!("Defrag {}: {:?} -> {:?}", name, before, runs);
                self.catalog.replace_values(&name, runs)?;
            }
            outcome?;
        }

        info!("Defragmentation complete: {}", report);
        Ok(report)
    }

    fn compact_runs(&mut self, runs: &mut Vec<Extent>, report: &mut DefragReport) -> Result<()> {
        if let Some(target) = self.lowest_fit(&runs[0]) {
            let length = runs[0].length;
            self.slide_run(runs, target)?;
            report.files_moved += 1;
            report.blocks_moved += length;
        }

        let mut i = 1;
        while i < runs.len() {
            // Pull leading blocks into the free space right after the previous run
            while !runs[i].is_empty()
                && runs[i - 1].end() < runs[i].start
                && self.device.is_free(runs[i - 1].end())
            {
                self.device.move_block(runs[i].start, runs[i - 1].end())?;
                runs[i - 1].length += 1;
                runs[i].start += 1;
                runs[i].length -= 1;
                report.blocks_moved += 1;
            }

            if runs[i].is_empty() {
                runs.remove(i);
                report.runs_merged += 1;
            } else if let Some(merged) = runs[i - 1].coalesce(&runs[i]) {
                runs[i - 1] = merged;
                runs.remove(i);
                report.runs_merged += 1;
            } else {
                i += 1;
            }
        }

        Ok(())
    }

    /// Lowest start below `run.start` where the run fits
    ///
    /// A position fits when every block it would cover is free or already
    /// belongs to the run itself.
    fn lowest_fit(&self, run: &Extent) -> Option<u64> {
        let free_map = self.device.free_map();
        let block_count = self.device.block_count();

        let mut candidate = free_map.find_free_block(0)?;
        while candidate < run.start {
            let target = Extent::new(candidate, run.length);
            let fits = target.end() <= block_count
                && target
                    .blocks()
                    .all(|b| free_map.is_free(b) || run.contains(b));
            if fits {
                return Some(candidate);
            }
            candidate = free_map.find_free_block(candidate + 1)?;
        }

        None
    }

    /// Move the first run down to `target`, lowest block first
    ///
    /// Moving in ascending order means a destination inside the run's own
    /// range has always been vacated by the time it is written. While the
    /// slide is in progress `runs` holds the moved part and the remainder
    /// as two extents.
    fn slide_run(&mut self, runs: &mut Vec<Extent>, target: u64) -> Result<()> {
        let run = runs[0];
        debug_assert!(target < run.start);

        runs.insert(0, Extent::new(target, 0));
        for offset in 0..run.length {
            self.device.move_block(run.start + offset, target + offset)?;
            runs[0].length += 1;
            runs[1].start += 1;
            runs[1].length -= 1;
        }
        runs.remove(1);
        Ok(())
    }
}
