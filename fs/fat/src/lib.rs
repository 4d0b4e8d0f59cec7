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

//! The FAT-style store: superblock, free-block allocator, FAT chain walker,
//! directory block layer, and the path/tree operations built on top of them
//! (§4 of the spec).

mod allocator;
mod chain;
mod dir;
mod tree;

use std::path::Path;

use log::{debug, error};
use vfs_ds::BackingStore;
use vfs_ds_std::MappedFile;
use vfs_err::{Error, Result};
use vfs_fs::{BlockSize, DirEntry, FatType, Superblock, ENTRY_SIZE, FAT_ENTRY_SIZE};
use zerocopy::{FromBytes, IntoBytes};

pub use tree::FatFileSystem;

/// An attached store: the mapped backing region plus the fixed layout
/// (block size / FAT length / region offsets) computed once at
/// attach/format time (§4.1).
pub struct Store<S: BackingStore> {
    backing: S,
    block_size: u32,
    fat_entries: u32,
    fat_offset: usize,
    data_offset: usize,
}

/// Total size in bytes of a store laid out with the given parameters
/// (§4.1's `filesystem_size` computation).
pub fn total_size(block_size: BlockSize, fat_type: FatType) -> u64 {
    let block_size = block_size.bytes() as u64;
    let entries = fat_type.entries() as u64;
    block_size + entries * FAT_ENTRY_SIZE as u64 + entries * block_size
}

impl Store<MappedFile> {
    /// Attaches to `path`, creating and formatting it if it does not exist
    /// (§4.1). When the file already exists, its stored `block_size` /
    /// `fat_type` govern and `requested_block_size` / `requested_fat_type`
    /// are ignored, matching the spec.
    pub fn attach(
        path: &Path,
        requested_block_size: BlockSize,
        requested_fat_type: FatType,
    ) -> Result<Self> {
        match MappedFile::open(path)? {
            Some(mapped) => Self::open(mapped),
            None => {
                let len = total_size(requested_block_size, requested_fat_type);
                debug!(
                    "formatting virtual file-system ({len} bytes) ... please wait"
                );
                let mapped = MappedFile::create(path, len)?;
                Self::format(mapped, requested_block_size, requested_fat_type)
            }
        }
    }
}

impl<S: BackingStore> Store<S> {
    fn layout(block_size: BlockSize, fat_type: FatType) -> (u32, u32, usize, usize) {
        let block_size = block_size.bytes();
        let fat_entries = fat_type.entries();
        let fat_offset = block_size as usize;
        let data_offset = fat_offset + fat_entries as usize * FAT_ENTRY_SIZE;
        (block_size, fat_entries, fat_offset, data_offset)
    }

    /// Initialises a freshly allocated, exactly-sized backing store: the
    /// superblock, the FAT's free-list chain, and the root directory's
    /// first block (§4.1, §3's lifecycle).
    pub fn format(mut backing: S, block_size: BlockSize, fat_type: FatType) -> Result<Self> {
        let (block_size_bytes, fat_entries, fat_offset, data_offset) =
            Self::layout(block_size, fat_type);
        let expected_len = total_size(block_size, fat_type) as usize;
        if backing.len() != expected_len {
            error!(
                "backing store is {} bytes, expected {expected_len} for block_size={} fat_type={}",
                backing.len(),
                block_size.bytes(),
                fat_type.exponent()
            );
            return Err(Error::InvalidStore);
        }

        let mut store = Self {
            backing: {
                // superblock fields are written below; zero the rest so
                // stale bytes never leak into directory slots or blocks.
                backing.as_bytes_mut().fill(0);
                backing
            },
            block_size: block_size_bytes,
            fat_entries,
            fat_offset,
            data_offset,
        };

        {
            let sb = store.superblock_mut();
            sb.check_number.set(vfs_fs::CHECK_NUMBER);
            sb.block_size.set(block_size_bytes as i32);
            sb.fat_type.set(fat_type.exponent() as i32);
            sb.root_block.set(0);
            sb.free_block.set(1);
            sb.n_free_blocks.set(fat_entries - 1);
        }

        // fat[0] is the root block, never on the free list; 1..n_free are
        // chained in order and the last one terminates.
        store.set_fat_entry(0, vfs_fs::TERMINATOR);
        let n_free = fat_entries - 1;
        for block in 1..n_free {
            store.set_fat_entry(block, block as i32 + 1);
        }
        store.set_fat_entry(n_free, vfs_fs::TERMINATOR);

        store.init_dir_block(0, 0);

        debug!(
            "formatted filesystem: block_size={block_size_bytes} fat_type={} blocks={fat_entries}",
            fat_type.exponent()
        );
        Ok(store)
    }

    /// Attaches to an already-formatted backing store, validating the
    /// magic number and total size against the parameters the superblock
    /// itself records (§4.1).
    pub fn open(backing: S) -> Result<Self> {
        let (sb, _) = Superblock::ref_from_prefix(backing.as_bytes()).map_err(|_| {
            error!("backing store is too small to hold a superblock");
            Error::InvalidStore
        })?;
        if !sb.is_valid() {
            error!("bad magic number {} (expected {})", sb.check_number.get(), vfs_fs::CHECK_NUMBER);
            return Err(Error::InvalidStore);
        }
        let block_size = BlockSize::try_from(sb.block_size.get())?;
        let fat_type = sb.fat_type()?;
        if backing.len() as u64 != total_size(block_size, fat_type) {
            error!(
                "backing store is {} bytes, expected {} for block_size={} fat_type={}",
                backing.len(),
                total_size(block_size, fat_type),
                block_size.bytes(),
                fat_type.exponent()
            );
            return Err(Error::InvalidStore);
        }

        let (block_size_bytes, fat_entries, fat_offset, data_offset) =
            Self::layout(block_size, fat_type);
        Ok(Self {
            backing,
            block_size: block_size_bytes,
            fat_entries,
            fat_offset,
            data_offset,
        })
    }

    pub fn superblock(&self) -> &Superblock {
        Superblock::ref_from_prefix(self.backing.as_bytes())
            .expect("superblock region is reserved and exactly sized")
            .0
    }

    pub fn superblock_mut(&mut self) -> &mut Superblock {
        Superblock::mut_from_prefix(self.backing.as_bytes_mut())
            .expect("superblock region is reserved and exactly sized")
            .0
    }

    pub fn root_block(&self) -> u32 {
        self.superblock().root_block()
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn fat_entries(&self) -> u32 {
        self.fat_entries
    }

    /// Directory entries per block (`DPB`, §4.4).
    pub fn entries_per_block(&self) -> usize {
        self.block_size as usize / ENTRY_SIZE
    }

    fn fat_slot_offset(&self, block: u32) -> usize {
        self.fat_offset + block as usize * FAT_ENTRY_SIZE
    }

    pub fn fat_entry(&self, block: u32) -> i32 {
        let off = self.fat_slot_offset(block);
        vfs_fs::FatEntry::ref_from_bytes(&self.backing.as_bytes()[off..off + FAT_ENTRY_SIZE])
            .expect("FAT slot is exactly sized")
            .get()
    }

    pub fn set_fat_entry(&mut self, block: u32, value: i32) {
        let off = self.fat_slot_offset(block);
        vfs_fs::FatEntry::mut_from_bytes(
            &mut self.backing.as_bytes_mut()[off..off + FAT_ENTRY_SIZE],
        )
        .expect("FAT slot is exactly sized")
        .set(value);
    }

    fn block_byte_offset(&self, block: u32) -> usize {
        self.data_offset + block as usize * self.block_size as usize
    }

    pub fn block_bytes(&self, block: u32) -> &[u8] {
        let off = self.block_byte_offset(block);
        &self.backing.as_bytes()[off..off + self.block_size as usize]
    }

    pub fn block_bytes_mut(&mut self, block: u32) -> &mut [u8] {
        let off = self.block_byte_offset(block);
        let len = self.block_size as usize;
        &mut self.backing.as_bytes_mut()[off..off + len]
    }

    pub fn dir_entry(&self, block: u32, slot: usize) -> &DirEntry {
        let start = slot * ENTRY_SIZE;
        let bytes = self.block_bytes(block);
        DirEntry::ref_from_bytes(&bytes[start..start + ENTRY_SIZE])
            .expect("slot is within the block and exactly sized")
    }

    pub fn dir_entry_mut(&mut self, block: u32, slot: usize) -> &mut DirEntry {
        let start = slot * ENTRY_SIZE;
        let bytes = self.block_bytes_mut(block);
        DirEntry::mut_from_bytes(&mut bytes[start..start + ENTRY_SIZE])
            .expect("slot is within the block and exactly sized")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.backing.flush()
    }

    /// Unwraps the attached store, discarding the cached layout. Used by
    /// tests that need to round-trip a backing store through [`Store::open`].
    pub fn into_backing(self) -> S {
        self.backing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfs_ds::MemoryStore;

    pub fn formatted(block_size: BlockSize, fat_type: FatType) -> Store<MemoryStore> {
        let backing = MemoryStore::new(total_size(block_size, fat_type) as usize);
        Store::format(backing, block_size, fat_type).unwrap()
    }

    #[test]
    fn format_initialises_superblock() {
        let store = formatted(BlockSize::B256, FatType::F8);
        let sb = store.superblock();
        assert!(sb.is_valid());
        assert_eq!(sb.block_size(), 256);
        assert_eq!(sb.root_block(), 0);
        assert_eq!(sb.free_block(), 1);
        assert_eq!(sb.n_free_blocks(), 255);
    }

    #[test]
    fn format_chains_the_free_list() {
        let store = formatted(BlockSize::B256, FatType::F8);
        assert_eq!(store.fat_entry(0), vfs_fs::TERMINATOR);
        for block in 1..255 {
            assert_eq!(store.fat_entry(block), block as i32 + 1);
        }
        assert_eq!(store.fat_entry(255), vfs_fs::TERMINATOR);
    }

    #[test]
    fn reopen_roundtrips_through_bytes() {
        let block_size = BlockSize::B256;
        let fat_type = FatType::F8;
        let mut backing = MemoryStore::new(total_size(block_size, fat_type) as usize);
        {
            let mut store = Store::format(
                std::mem::replace(&mut backing, MemoryStore::new(0)),
                block_size,
                fat_type,
            )
            .unwrap();
            store.set_fat_entry(1, 42);
            backing = store.into_backing();
        }
        let store = Store::open(backing).unwrap();
        assert_eq!(store.fat_entry(1), 42);
    }

    #[test]
    fn open_rejects_bad_magic() {
        let backing = MemoryStore::new(total_size(BlockSize::B256, FatType::F8) as usize);
        assert!(matches!(Store::open(backing), Err(Error::InvalidStore)));
    }

    #[test]
    fn open_rejects_size_mismatch() {
        let block_size = BlockSize::B256;
        let fat_type = FatType::F8;
        let backing = MemoryStore::new(total_size(block_size, fat_type) as usize);
        let store = Store::format(backing, block_size, fat_type).unwrap();
        // Truncate by one byte relative to what the stored params demand.
        let mut bytes = store.backing.as_bytes().to_vec();
        bytes.pop();
        let backing = MemoryStore::from_bytes(bytes);
        assert!(matches!(Store::open(backing), Err(Error::InvalidStore)));
    }
}
