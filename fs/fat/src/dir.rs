// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The directory block layer (§4.4): a FAT chain of blocks treated as one
//! packed, ordered array of fixed-size directory entries.

use chrono::{Datelike, Local};
use vfs_ds::BackingStore;
use vfs_err::{Error, Result};
use vfs_fs::{DirEntry, TERMINATOR, TYPE_DIR};

use crate::Store;

impl<S: BackingStore> Store<S> {
    /// Writes the `.` and `..` entries that open every directory's first
    /// block (§3). `size` starts at 2 (just `.` and `..`).
    pub fn init_dir_block(&mut self, block: u32, parent_block: u32) {
        let (day, month, year) = today();
        let dot = DirEntry::new(TYPE_DIR, ".", day, month, year, 2, block as i32);
        let dotdot = DirEntry::new(TYPE_DIR, "..", day, month, year, 0, parent_block as i32);
        *self.dir_entry_mut(block, 0) = dot;
        *self.dir_entry_mut(block, 1) = dotdot;
    }

    /// Number of occupied entries in the directory whose first block is
    /// `dir` (§4.4's `size`, stored in the `.` entry).
    pub fn dir_size(&self, dir: u32) -> u32 {
        self.dir_entry(dir, 0).size() as u32
    }

    fn set_dir_size(&mut self, dir: u32, size: u32) {
        self.dir_entry_mut(dir, 0).set_size(size as i32);
    }

    /// Resolves logical entry index `n` (within a directory rooted at
    /// `dir`) to the block that holds it and the slot within that block.
    fn locate(&self, dir: u32, n: usize) -> (u32, usize) {
        let dpb = self.entries_per_block();
        let block = self.walk(dir).nth(n / dpb).expect("index within size is within the chain");
        (block, n % dpb)
    }

    pub fn dir_entry_at(&self, dir: u32, n: usize) -> &DirEntry {
        let (block, slot) = self.locate(dir, n);
        self.dir_entry(block, slot)
    }

    fn dir_entry_at_mut(&mut self, dir: u32, n: usize) -> &mut DirEntry {
        let (block, slot) = self.locate(dir, n);
        self.dir_entry_mut(block, slot)
    }

    /// Linear scan for `name` among the occupied entries of `dir` (§4.4).
    /// Entries 0 and 1 (`.`/`..`) are scanned like any other entry.
    pub fn find(&self, dir: u32, name: &str) -> Option<usize> {
        let size = self.dir_size(dir) as usize;
        (0..size).find(|&n| self.dir_entry_at(dir, n).name() == name)
    }

    /// Appends `entry` to `dir`, growing the chain by one block first if
    /// the directory is exactly full (§4.4).
    pub fn append(&mut self, dir: u32, entry: DirEntry) -> Result<()> {
        let n = self.dir_size(dir) as usize;
        let dpb = self.entries_per_block();

        if n % dpb == 0 {
            let new_block = self.allocate()?;
            let tail = self.tail(dir);
            self.set_fat_entry(tail, new_block as i32);
            self.set_fat_entry(new_block, TERMINATOR);
        }

        *self.dir_entry_at_mut(dir, n) = entry;
        self.set_dir_size(dir, n as u32 + 1);
        Ok(())
    }

    /// Removes the entry at logical index `i`, swapping the last entry
    /// into its place and releasing the tail block if it falls empty
    /// (§4.4). Forbids removing `.`/`..` (`i < 2`).
    pub fn remove_at(&mut self, dir: u32, i: usize) -> Result<()> {
        let size = self.dir_size(dir) as usize;
        if i < 2 {
            return Err(Error::InvalidOp {
                name: self.dir_entry_at(dir, i).name().to_string(),
            });
        }

        let last = size - 1;
        if i != last {
            let moved = *self.dir_entry_at(dir, last);
            *self.dir_entry_at_mut(dir, i) = moved;
        }

        let new_size = size - 1;
        if new_size % self.entries_per_block() == 0 {
            let old_tail = self.tail(dir);
            let new_tail = if old_tail == dir {
                old_tail
            } else {
                // Find the block preceding old_tail so it can be
                // re-terminated once old_tail is released.
                self.walk(dir)
                    .take_while(|&b| b != old_tail)
                    .last()
                    .unwrap_or(dir)
            };
            self.release(old_tail);
            if new_tail != old_tail {
                self.set_fat_entry(new_tail, TERMINATOR);
            }
        }

        self.set_dir_size(dir, new_size as u32);
        Ok(())
    }
}

/// Today's date as (day, month, year-offset-from-1900), per §3's
/// directory-entry date fields.
pub(crate) fn today() -> (u8, u8, u8) {
    let now = Local::now();
    (now.day() as u8, now.month() as u8, (now.year() - 1900) as u8)
}
