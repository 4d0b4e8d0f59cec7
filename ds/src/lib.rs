//! The `BackingStore` abstraction a file system is laid out over (§4.1, §5).
//!
//! A store only ever needs a resizable region of bytes it can read and
//! write at arbitrary offsets; it does not care whether that region is a
//! memory-mapped host file, a plain `Vec<u8>` used in tests, or something
//! else entirely. Keeping file systems generic over this trait is what
//! lets `vfs_fs_fat` be exercised without touching the filesystem.

use vfs_err::Result;

pub trait BackingStore {
    /// The full mapped region, in byte order as stored on disk.
    fn as_bytes(&self) -> &[u8];

    /// Mutable access to the full mapped region.
    fn as_bytes_mut(&mut self) -> &mut [u8];

    /// Total length of the mapped region, in bytes.
    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush any buffered writes back to the underlying medium. A no-op for
    /// purely in-memory backing stores.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A `BackingStore` over a plain heap buffer, used by `vfs_fs_fat`'s tests so
/// the directory-block and allocator suites do not depend on real files.
#[derive(Default)]
pub struct MemoryStore(Vec<u8>);

impl MemoryStore {
    pub fn new(size: usize) -> Self {
        Self(vec![0u8; size])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl BackingStore for MemoryStore {
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}
