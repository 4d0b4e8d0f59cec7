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

//! A host file, memory-mapped as the backing store for a vfs store (§4.1).

use std::{
    fs::{File, OpenOptions},
    path::Path,
};

use log::{debug, error};
use memmap2::MmapMut;
use vfs_ds::BackingStore;
use vfs_err::{Error, Result};

pub struct MappedFile {
    mmap: MmapMut,
}

impl MappedFile {
    /// Opens an already-existing host file and maps its full current
    /// length. Returns `Ok(None)` if no file exists at `path` so the caller
    /// can fall back to [`MappedFile::create`].
    pub fn open(path: &Path) -> Result<Option<Self>> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let len = file.metadata()?.len();
        debug!("opening existing filesystem {path:?} ({len} bytes)");
        Ok(Some(Self::map(file, len)?))
    }

    /// Creates a new host file, extends it to exactly `len` bytes, and maps
    /// it read/write. Truncates any file already at `path`.
    pub fn create(path: &Path, len: u64) -> Result<Self> {
        debug!("formatting new filesystem {path:?} ({len} bytes)");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|err| {
                error!("cannot create {path:?}: {err}");
                Error::CannotCreate
            })?;
        file.set_len(len)?;
        Self::map(file, len)
    }

    fn map(file: File, len: u64) -> Result<Self> {
        // SAFETY: the mapping is exclusive to this process for the whole
        // session (§5: single mutator, no concurrency is in scope), so
        // concurrent external mutation of the file is not a case this
        // store needs to defend against.
        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|err| {
            error!("cannot map filesystem: {err}");
            Error::CannotMap
        })?;
        if mmap.len() as u64 != len {
            error!("mapped {} bytes, expected {len}", mmap.len());
            return Err(Error::CannotMap);
        }
        Ok(Self { mmap })
    }
}

impl BackingStore for MappedFile {
    fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    fn flush(&mut self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }
}
