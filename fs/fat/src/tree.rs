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

//! Path and tree operations (§4.5): `ls`, `mkdir`, `cd`, `pwd`, `rmdir`,
//! `get`, `put`, `cat`, and the unimplemented `cp`/`mv`/`rm`, built on top of
//! the directory block layer and the allocator.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use vfs_ds::BackingStore;
use vfs_err::{Error, Result};
use vfs_fs::{DirEntry, EntryKind, Listing, Vfs, MAX_NAME_LEN, TERMINATOR, TYPE_DIR, TYPE_FILE};

use crate::Store;

impl<S: BackingStore> Store<S> {
    /// Name a child directory carries in its parent's listing, found by
    /// scanning the parent for the entry whose `first_block` is `block`.
    fn name_in(&self, parent: u32, block: u32) -> String {
        let size = self.dir_size(parent) as usize;
        (2..size)
            .map(|n| self.dir_entry_at(parent, n))
            .find(|e| e.is_dir() && e.first_block() == block)
            .map(|e| e.name().to_string())
            .unwrap_or_default()
    }

    /// The absolute path of `block`, built by walking `..` up to the root
    /// (§4.5, §9 — kept as direct recursion rather than an explicit stack).
    pub fn path_of(&self, block: u32) -> String {
        if block == self.root_block() {
            return "/".to_string();
        }
        let parent = self.dir_entry_at(block, 1).first_block();
        let parent_path = self.path_of(parent);
        let name = self.name_in(parent, block);
        if parent_path == "/" {
            format!("/{name}")
        } else {
            format!("{parent_path}/{name}")
        }
    }
}

/// A mounted FAT store plus the caller's current working directory (§2, §5:
/// one mutable handle, no concurrent access).
pub struct FatFileSystem<S: BackingStore> {
    store: Store<S>,
    current_dir: u32,
}

impl<S: BackingStore> FatFileSystem<S> {
    pub fn new(store: Store<S>) -> Self {
        let current_dir = store.root_block();
        Self { store, current_dir }
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<S> {
        &mut self.store
    }

    pub fn into_store(self) -> Store<S> {
        self.store
    }
}

impl<S: BackingStore> Vfs for FatFileSystem<S> {
    fn ls(&self) -> Result<Vec<Listing>> {
        let size = self.store.dir_size(self.current_dir) as usize;
        Ok((0..size)
            .map(|n| {
                let entry = self.store.dir_entry_at(self.current_dir, n);
                Listing {
                    name: entry.name().to_string(),
                    day: entry.day,
                    month: entry.month,
                    year: 1900 + entry.year as u16,
                    kind: if entry.is_dir() {
                        EntryKind::Directory
                    } else {
                        EntryKind::File(entry.size() as u32)
                    },
                }
            })
            .collect())
    }

    fn mkdir(&mut self, name: &str) -> Result<()> {
        if name.len() > MAX_NAME_LEN {
            return Err(Error::NameTooLong {
                name: name.to_string(),
            });
        }
        if self.store.find(self.current_dir, name).is_some() {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }

        let block = self.store.allocate()?;
        self.store.init_dir_block(block, self.current_dir);
        let dot = *self.store.dir_entry_at(block, 0);
        let entry = DirEntry::new(TYPE_DIR, name, dot.day, dot.month, dot.year, 0, block as i32);

        if let Err(err) = self.store.append(self.current_dir, entry) {
            // The new block was reserved but never linked in; give it back.
            self.store.release(block);
            return Err(err);
        }
        Ok(())
    }

    fn cd(&mut self, name: &str) -> Result<()> {
        let idx = self
            .store
            .find(self.current_dir, name)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;
        let entry = self.store.dir_entry_at(self.current_dir, idx);
        if !entry.is_dir() {
            return Err(Error::NotADirectory {
                name: name.to_string(),
            });
        }
        self.current_dir = entry.first_block();
        Ok(())
    }

    fn pwd(&self) -> Result<String> {
        Ok(self.store.path_of(self.current_dir))
    }

    fn rmdir(&mut self, name: &str) -> Result<()> {
        let idx = self
            .store
            .find(self.current_dir, name)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;
        if idx < 2 {
            return Err(Error::InvalidOp {
                name: name.to_string(),
            });
        }
        let entry = *self.store.dir_entry_at(self.current_dir, idx);
        if !entry.is_dir() {
            return Err(Error::NotADirectory {
                name: name.to_string(),
            });
        }
        if self.store.dir_size(entry.first_block()) > 2 {
            return Err(Error::NotEmpty {
                name: name.to_string(),
            });
        }

        self.store.release(entry.first_block());
        self.store.remove_at(self.current_dir, idx)
    }

    fn get(&mut self, host_src: &Path, vfs_dest: &str) -> Result<()> {
        if vfs_dest.len() > MAX_NAME_LEN {
            return Err(Error::NameTooLong {
                name: vfs_dest.to_string(),
            });
        }
        if self.store.find(self.current_dir, vfs_dest).is_some() {
            return Err(Error::AlreadyExists {
                name: vfs_dest.to_string(),
            });
        }

        let not_found = || Error::HostNotFound {
            path: host_src.display().to_string(),
        };
        let mut host = File::open(host_src).map_err(|_| not_found())?;
        let f_size = host.metadata().map_err(|_| not_found())?.len();

        let block_size = self.store.block_size() as u64;
        let req = f_size.div_ceil(block_size).max(1);
        let extra =
            if self.store.dir_size(self.current_dir) as usize % self.store.entries_per_block() == 0 {
                1
            } else {
                0
            };
        if req + extra > self.store.superblock().n_free_blocks() as u64 {
            return Err(Error::Full);
        }

        // Stream the host file into freshly allocated, chained blocks. Any
        // I/O failure releases every block taken so far and leaves the
        // directory untouched (§4.7).
        let mut allocated = Vec::new();
        let first_block = self.store.allocate()?;
        allocated.push(first_block);

        let write_result: Result<()> = (|| {
            let mut buf = vec![0u8; block_size as usize];
            let mut prev = first_block;
            let mut remaining = f_size;
            loop {
                let to_read = remaining.min(block_size) as usize;
                host.read_exact(&mut buf[..to_read])?;
                self.store.block_bytes_mut(prev)[..to_read].copy_from_slice(&buf[..to_read]);
                remaining -= to_read as u64;
                if remaining == 0 {
                    self.store.set_fat_entry(prev, TERMINATOR);
                    break;
                }
                let next = self.store.allocate()?;
                allocated.push(next);
                self.store.set_fat_entry(prev, next as i32);
                prev = next;
            }
            Ok(())
        })();

        if let Err(err) = write_result {
            for block in allocated {
                self.store.release(block);
            }
            return Err(err);
        }

        let (day, month, year) = crate::dir::today();
        let entry = DirEntry::new(TYPE_FILE, vfs_dest, day, month, year, f_size as i32, first_block as i32);
        if let Err(err) = self.store.append(self.current_dir, entry) {
            for block in allocated {
                self.store.release(block);
            }
            return Err(err);
        }
        Ok(())
    }

    fn put(&self, vfs_src: &str, host_dest: &Path) -> Result<()> {
        let idx = self
            .store
            .find(self.current_dir, vfs_src)
            .ok_or_else(|| Error::NotFound {
                name: vfs_src.to_string(),
            })?;
        let entry = self.store.dir_entry_at(self.current_dir, idx);
        if !entry.is_file() {
            return Err(Error::NotAFile {
                name: vfs_src.to_string(),
            });
        }
        let size = entry.size() as u64;
        let first_block = entry.first_block();
        let block_size = self.store.block_size() as u64;

        let mut host = File::create(host_dest)?;
        let mut remaining = size;
        for block in self.store.walk(first_block) {
            let to_write = remaining.min(block_size) as usize;
            host.write_all(&self.store.block_bytes(block)[..to_write])?;
            remaining -= to_write as u64;
        }
        Ok(())
    }

    fn cat(&self, name: &str, out: &mut dyn Write) -> Result<()> {
        let idx = self
            .store
            .find(self.current_dir, name)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;
        let entry = self.store.dir_entry_at(self.current_dir, idx);
        if !entry.is_file() {
            return Err(Error::NotAFile {
                name: name.to_string(),
            });
        }
        let size = entry.size() as u64;
        let first_block = entry.first_block();
        let block_size = self.store.block_size() as u64;

        let mut remaining = size;
        for block in self.store.walk(first_block) {
            let to_write = remaining.min(block_size) as usize;
            out.write_all(&self.store.block_bytes(block)[..to_write])?;
            remaining -= to_write as u64;
        }
        Ok(())
    }

    fn cp(&mut self, _src: &str, _dest: &str) -> Result<()> {
        Err(Error::Unimplemented)
    }

    fn mv(&mut self, _src: &str, _dest: &str) -> Result<()> {
        Err(Error::Unimplemented)
    }

    fn rm(&mut self, _name: &str) -> Result<()> {
        Err(Error::Unimplemented)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use vfs_fs::{BlockSize, EntryKind, FatType, Vfs};

    use super::FatFileSystem;
    use crate::tests::formatted;

    fn fs() -> FatFileSystem<vfs_ds::MemoryStore> {
        FatFileSystem::new(formatted(BlockSize::B256, FatType::F8))
    }

    #[test]
    fn mkdir_cd_pwd_roundtrip() {
        let mut fs = fs();
        fs.mkdir("a").unwrap();
        assert_eq!(fs.pwd().unwrap(), "/");
        fs.cd("a").unwrap();
        assert_eq!(fs.pwd().unwrap(), "/a");
        fs.mkdir("b").unwrap();
        fs.cd("b").unwrap();
        assert_eq!(fs.pwd().unwrap(), "/a/b");
        fs.cd("..").unwrap();
        assert_eq!(fs.pwd().unwrap(), "/a");
    }

    #[test]
    fn mkdir_rejects_duplicate_name() {
        let mut fs = fs();
        fs.mkdir("a").unwrap();
        assert!(matches!(fs.mkdir("a"), Err(vfs_err::Error::AlreadyExists { .. })));
    }

    #[test]
    fn rmdir_rejects_nonempty_directory() {
        let mut fs = fs();
        fs.mkdir("a").unwrap();
        fs.cd("a").unwrap();
        fs.mkdir("b").unwrap();
        fs.cd("..").unwrap();
        assert!(matches!(fs.rmdir("a"), Err(vfs_err::Error::NotEmpty { .. })));
    }

    #[test]
    fn rmdir_rejects_dot_and_dotdot() {
        let mut fs = fs();
        assert!(matches!(fs.rmdir("."), Err(vfs_err::Error::InvalidOp { .. })));
        assert!(matches!(fs.rmdir(".."), Err(vfs_err::Error::InvalidOp { .. })));
    }

    #[test]
    fn rmdir_frees_the_directory_block() {
        let mut fs = fs();
        let before = fs.store().superblock().n_free_blocks();
        fs.mkdir("a").unwrap();
        fs.rmdir("a").unwrap();
        assert_eq!(fs.store().superblock().n_free_blocks(), before);
        assert!(fs.store().find(fs.store().root_block(), "a").is_none());
    }

    #[test]
    fn get_and_cat_roundtrip_binary_data() {
        let mut fs = fs();
        let dir = tempfile::tempdir().unwrap();
        let host_path = dir.path().join("payload.bin");
        let data: Vec<u8> = (0..600u32).map(|n| (n % 256) as u8).collect();
        std::fs::write(&host_path, &data).unwrap();

        fs.get(&host_path, "payload").unwrap();

        let mut out = Cursor::new(Vec::new());
        fs.cat("payload", &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn get_stamps_todays_date_not_the_directorys() {
        let mut fs = fs();
        fs.mkdir("sub").unwrap();
        let root = fs.store().root_block();
        let sub_idx = fs.store().find(root, "sub").unwrap();
        let sub_block = fs.store().dir_entry_at(root, sub_idx).first_block();

        // Backdate `sub`'s own `.` entry so a bug that inherits the
        // directory's date (instead of computing today's) is observable.
        {
            let dot = fs.store_mut().dir_entry_mut(sub_block, 0);
            dot.day = 1;
            dot.month = 1;
            dot.year = 0;
        }

        fs.cd("sub").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let host_path = dir.path().join("f.txt");
        std::fs::write(&host_path, b"x").unwrap();
        fs.get(&host_path, "f.txt").unwrap();

        let idx = fs.store().find(sub_block, "f.txt").unwrap();
        let entry = fs.store().dir_entry_at(sub_block, idx);
        let (day, month, year) = crate::dir::today();
        assert_eq!((entry.day, entry.month, entry.year), (day, month, year));
    }

    #[test]
    fn get_rejects_missing_host_file() {
        let mut fs = fs();
        let missing = Path::new("/nonexistent/path/does-not-exist");
        assert!(matches!(fs.get(missing, "x"), Err(vfs_err::Error::HostNotFound { .. })));
    }

    #[test]
    fn get_then_put_roundtrips_through_host_file() {
        let mut fs = fs();
        let dir = tempfile::tempdir().unwrap();
        let src_path = dir.path().join("in.bin");
        std::fs::write(&src_path, b"hello vfs").unwrap();
        fs.get(&src_path, "greeting").unwrap();

        let dest_path = dir.path().join("out.bin");
        fs.put("greeting", &dest_path).unwrap();
        assert_eq!(std::fs::read(&dest_path).unwrap(), b"hello vfs");
    }

    #[test]
    fn ls_reports_file_sizes_and_kinds() {
        let mut fs = fs();
        fs.mkdir("sub").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"1234").unwrap();
        fs.get(&path, "f.txt").unwrap();

        let listing = fs.ls().unwrap();
        let sub = listing.iter().find(|e| e.name == "sub").unwrap();
        assert_eq!(sub.kind, EntryKind::Directory);
        let file = listing.iter().find(|e| e.name == "f.txt").unwrap();
        assert_eq!(file.kind, EntryKind::File(4));
    }

    #[test]
    fn cp_mv_rm_are_unimplemented() {
        let mut fs = fs();
        assert!(matches!(fs.cp("a", "b"), Err(vfs_err::Error::Unimplemented)));
        assert!(matches!(fs.mv("a", "b"), Err(vfs_err::Error::Unimplemented)));
        assert!(matches!(fs.rm("a"), Err(vfs_err::Error::Unimplemented)));
    }

    /// A small store (`DPB = 4`) so the free list can be drained to an
    /// exact boundary within a handful of allocations.
    fn fs_small() -> FatFileSystem<vfs_ds::MemoryStore> {
        FatFileSystem::new(formatted(BlockSize::B128, FatType::F7))
    }

    /// Drains the free list down to exactly `remaining` blocks, bypassing
    /// `Vfs` so the test can set up a precise boundary.
    fn drain_to(fs: &mut FatFileSystem<vfs_ds::MemoryStore>, remaining: u32) {
        while fs.store().superblock().n_free_blocks() > remaining {
            fs.store_mut().allocate().unwrap();
        }
    }

    #[test]
    fn mkdir_full_releases_the_just_allocated_block() {
        let mut fs = fs_small();
        // Fill root to exactly one DPB boundary (4 entries: `.`, `..`, and
        // two subdirectories) so the next `mkdir` must grow root's chain.
        fs.mkdir("d0").unwrap();
        fs.mkdir("d1").unwrap();
        assert_eq!(fs.store().dir_size(fs.store().root_block()), 4);

        // Leave exactly one free block: enough for the new directory's own
        // block, not enough for root's required growth block.
        drain_to(&mut fs, 1);
        let free_before = fs.store().superblock().free_block();

        assert!(matches!(fs.mkdir("d2"), Err(vfs_err::Error::Full)));

        // The block taken for "d2" must have been handed straight back.
        assert_eq!(fs.store().superblock().n_free_blocks(), 1);
        assert_eq!(fs.store().superblock().free_block(), free_before);
        assert_eq!(fs.store().dir_size(fs.store().root_block()), 4);
        assert!(fs.store().find(fs.store().root_block(), "d2").is_none());
    }

    #[test]
    fn get_succeeds_exactly_at_the_free_block_boundary() {
        let mut fs = fs_small();
        let dir = tempfile::tempdir().unwrap();
        let host_path = dir.path().join("payload.bin");
        let data = vec![7u8; 256]; // exactly 2 blocks at block_size=128
        std::fs::write(&host_path, &data).unwrap();

        // Root is at size 2 (not a DPB boundary), so `get` needs exactly 2
        // blocks and no directory-growth block. Leave exactly 2 free.
        drain_to(&mut fs, 2);

        fs.get(&host_path, "payload").unwrap();
        assert_eq!(fs.store().superblock().n_free_blocks(), 0);

        let mut out = Cursor::new(Vec::new());
        fs.cat("payload", &mut out).unwrap();
        assert_eq!(out.into_inner(), data);
    }

    #[test]
    fn get_full_one_block_short_leaves_the_store_untouched() {
        let mut fs = fs_small();
        let dir = tempfile::tempdir().unwrap();
        let host_path = dir.path().join("payload.bin");
        let data = vec![7u8; 256]; // needs 2 blocks; only 1 will be free
        std::fs::write(&host_path, &data).unwrap();

        drain_to(&mut fs, 1);
        let free_before = fs.store().superblock().free_block();

        assert!(matches!(fs.get(&host_path, "payload"), Err(vfs_err::Error::Full)));

        assert_eq!(fs.store().superblock().n_free_blocks(), 1);
        assert_eq!(fs.store().superblock().free_block(), free_before);
        assert_eq!(fs.store().dir_size(fs.store().root_block()), 2);
        assert!(fs.store().find(fs.store().root_block(), "payload").is_none());
    }
}
