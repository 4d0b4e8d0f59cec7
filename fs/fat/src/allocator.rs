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

//! The free-block allocator (§4.2): a LIFO threaded through the FAT and
//! rooted at `superblock.free_block`.

use vfs_ds::BackingStore;
use vfs_err::{Error, Result};
use vfs_fs::TERMINATOR;

use crate::Store;

impl<S: BackingStore> Store<S> {
    /// Pops the head of the free list, or [`Error::Full`] if none remain.
    ///
    /// Order matters: the popped block's FAT slot is terminated before the
    /// superblock's head pointer advances, so a crash between the two
    /// writes can never leave the free list pointing at a block that is
    /// also, simultaneously, in use.
    pub fn allocate(&mut self) -> Result<u32> {
        let sb = self.superblock();
        if sb.n_free_blocks() == 0 {
            return Err(Error::Full);
        }
        let block = sb.free_block() as u32;
        let next = self.fat_entry(block);

        self.set_fat_entry(block, TERMINATOR);
        let sb = self.superblock_mut();
        sb.set_free_block(next);
        sb.set_n_free_blocks(sb.n_free_blocks() - 1);

        Ok(block)
    }

    /// Pushes `block` back onto the head of the free list.
    pub fn release(&mut self, block: u32) {
        let head = self.superblock().free_block();
        self.set_fat_entry(block, head);
        let sb = self.superblock_mut();
        sb.set_free_block(block as i32);
        sb.set_n_free_blocks(sb.n_free_blocks() + 1);
    }
}

#[cfg(test)]
mod tests {
    use vfs_fs::{BlockSize, FatType};

    use crate::tests::formatted;

    #[test]
    fn allocate_then_release_restores_free_count() {
        let mut store = formatted(BlockSize::B256, FatType::F8);
        let before = store.superblock().n_free_blocks();
        let block = store.allocate().unwrap();
        assert_eq!(store.superblock().n_free_blocks(), before - 1);
        store.release(block);
        assert_eq!(store.superblock().n_free_blocks(), before);
    }

    #[test]
    fn allocate_drains_to_full() {
        let mut store = formatted(BlockSize::B128, FatType::F7);
        let total = store.superblock().n_free_blocks();
        for _ in 0..total {
            store.allocate().unwrap();
        }
        assert!(matches!(store.allocate(), Err(super::Error::Full)));
    }

    #[test]
    fn release_pushes_onto_head() {
        let mut store = formatted(BlockSize::B256, FatType::F8);
        let a = store.allocate().unwrap();
        let b = store.allocate().unwrap();
        store.release(a);
        store.release(b);
        // b was released last, so it is the new head.
        assert_eq!(store.superblock().free_block(), b as i32);
        assert_eq!(store.fat_entry(b), a as i32);
    }
}
