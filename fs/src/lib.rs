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

//! On-disk record types (§3, §6.2) and the tree-operation interface (§4.5)
//! every concrete file system (currently just `vfs_fs_fat`) implements.

pub use vfs_err::{Error, Result};

use zerocopy::{little_endian::I32, FromBytes, Immutable, IntoBytes, KnownLayout};

/// Magic number identifying a valid store (§3).
pub const CHECK_NUMBER: i32 = 9999;
/// FAT slot value marking the end of a chain.
pub const TERMINATOR: i32 = -1;
/// Longest name a directory entry can hold, not counting any terminator.
pub const MAX_NAME_LEN: usize = 20;

pub const TYPE_DIR: u8 = b'D';
pub const TYPE_FILE: u8 = b'F';

/// A FAT slot: either the next block of a chain, or [`TERMINATOR`].
pub type FatEntry = I32;
/// On-disk size of one FAT slot.
pub const FAT_ENTRY_SIZE: usize = core::mem::size_of::<FatEntry>();

/// Block size in bytes, one of the four values the format allows (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSize {
    B128 = 128,
    B256 = 256,
    B512 = 512,
    B1024 = 1024,
}

impl BlockSize {
    pub const DEFAULT: Self = Self::B256;

    pub fn bytes(self) -> u32 {
        self as u32
    }
}

impl TryFrom<i32> for BlockSize {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            128 => Ok(Self::B128),
            256 => Ok(Self::B256),
            512 => Ok(Self::B512),
            1024 => Ok(Self::B1024),
            _ => Err(Error::InvalidStore),
        }
    }
}

/// FAT type, selecting the FAT's entry count as `2^fat_type` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    F7 = 7,
    F8 = 8,
    F9 = 9,
    F10 = 10,
}

impl FatType {
    pub const DEFAULT: Self = Self::F8;

    pub fn exponent(self) -> u32 {
        self as u32
    }

    /// Number of entries in the FAT, i.e. the number of addressable blocks.
    pub fn entries(self) -> u32 {
        1 << self.exponent()
    }
}

impl TryFrom<i32> for FatType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            7 => Ok(Self::F7),
            8 => Ok(Self::F8),
            9 => Ok(Self::F9),
            10 => Ok(Self::F10),
            _ => Err(Error::InvalidStore),
        }
    }
}

/// The store's block 0 (§3). 24 bytes of fields, padded by the caller to a
/// full block.
#[repr(C)]
#[derive(Debug, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Superblock {
    pub check_number: I32,
    pub block_size: I32,
    pub fat_type: I32,
    pub root_block: I32,
    pub free_block: I32,
    pub n_free_blocks: I32,
}

impl Superblock {
    pub fn block_size(&self) -> u32 {
        self.block_size.get() as u32
    }

    pub fn fat_type(&self) -> Result<FatType> {
        FatType::try_from(self.fat_type.get())
    }

    pub fn root_block(&self) -> u32 {
        self.root_block.get() as u32
    }

    pub fn free_block(&self) -> i32 {
        self.free_block.get()
    }

    pub fn set_free_block(&mut self, block: i32) {
        self.free_block.set(block);
    }

    pub fn n_free_blocks(&self) -> u32 {
        self.n_free_blocks.get() as u32
    }

    pub fn set_n_free_blocks(&mut self, n: u32) {
        self.n_free_blocks.set(n as i32);
    }

    pub fn is_valid(&self) -> bool {
        self.check_number.get() == CHECK_NUMBER
    }
}

/// On-disk size of the superblock's fields, before padding to a full block.
pub const SUPERBLOCK_SIZE: usize = core::mem::size_of::<Superblock>();

/// A fixed-size directory entry (§3, §6.2): exactly 32 bytes on disk.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DirEntry {
    pub kind: u8,
    name: [u8; MAX_NAME_LEN],
    pub day: u8,
    pub month: u8,
    pub year: u8,
    pub size: I32,
    pub first_block: I32,
}

impl DirEntry {
    pub fn new(
        kind: u8,
        name: &str,
        day: u8,
        month: u8,
        year: u8,
        size: i32,
        first_block: i32,
    ) -> Self {
        let mut entry = Self {
            kind,
            name: [0; MAX_NAME_LEN],
            day,
            month,
            year,
            size: I32::new(size),
            first_block: I32::new(first_block),
        };
        entry.set_name(name);
        entry
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = [0; MAX_NAME_LEN];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
    }

    pub fn is_dir(&self) -> bool {
        self.kind == TYPE_DIR
    }

    pub fn is_file(&self) -> bool {
        self.kind == TYPE_FILE
    }

    pub fn size(&self) -> i32 {
        self.size.get()
    }

    pub fn set_size(&mut self, size: i32) {
        self.size.set(size);
    }

    pub fn first_block(&self) -> u32 {
        self.first_block.get() as u32
    }

    pub fn set_first_block(&mut self, block: u32) {
        self.first_block.set(block as i32);
    }
}

/// On-disk size of one directory entry (§6.2): 32 bytes.
pub const ENTRY_SIZE: usize = core::mem::size_of::<DirEntry>();

/// One line of `ls` output (§4.5): name, creation date, and either a
/// directory marker or a file's byte length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    pub day: u8,
    pub month: u8,
    pub year: u16,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File(u32),
}

/// The user-visible directory-tree operations (§4.5), implemented in terms
/// of the directory block layer and the allocator by `vfs_fs_fat`.
pub trait Vfs {
    fn ls(&self) -> Result<Vec<Listing>>;
    fn mkdir(&mut self, name: &str) -> Result<()>;
    fn cd(&mut self, name: &str) -> Result<()>;
    fn pwd(&self) -> Result<String>;
    fn rmdir(&mut self, name: &str) -> Result<()>;
    fn get(&mut self, host_src: &std::path::Path, vfs_dest: &str) -> Result<()>;
    fn put(&self, vfs_src: &str, host_dest: &std::path::Path) -> Result<()>;
    fn cat(&self, name: &str, out: &mut dyn std::io::Write) -> Result<()>;
    fn cp(&mut self, src: &str, dest: &str) -> Result<()>;
    fn mv(&mut self, src: &str, dest: &str) -> Result<()>;
    fn rm(&mut self, name: &str) -> Result<()>;
}
