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

//! The FAT chain walker (§4.3): follows successive blocks from a starting
//! point until the terminator is reached.

use vfs_ds::BackingStore;
use vfs_fs::TERMINATOR;

use crate::Store;

/// A finite, non-restartable walk over a FAT chain starting at `start`.
pub struct FatChain<'s, S: BackingStore> {
    store: &'s Store<S>,
    next: Option<u32>,
}

impl<'s, S: BackingStore> Iterator for FatChain<'s, S> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let block = self.next?;
        let successor = self.store.fat_entry(block);
        self.next = (successor != TERMINATOR).then_some(successor as u32);
        Some(block)
    }
}

impl<S: BackingStore> Store<S> {
    /// The block immediately following `block` in its chain, or `None` at
    /// the chain's end.
    pub fn fat_next(&self, block: u32) -> Option<u32> {
        let next = self.fat_entry(block);
        (next != TERMINATOR).then_some(next as u32)
    }

    /// Walks the chain rooted at `start`, yielding `start` itself first.
    pub fn walk(&self, start: u32) -> FatChain<'_, S> {
        FatChain {
            store: self,
            next: Some(start),
        }
    }

    /// The last block of the chain rooted at `start`.
    pub fn tail(&self, start: u32) -> u32 {
        self.walk(start).last().unwrap_or(start)
    }

    /// Number of blocks in the chain rooted at `start`.
    pub fn length(&self, start: u32) -> usize {
        self.walk(start).count()
    }
}

#[cfg(test)]
mod tests {
    use vfs_fs::{BlockSize, FatType};

    use crate::tests::formatted;

    #[test]
    fn walk_follows_allocated_chain() {
        let mut store = formatted(BlockSize::B256, FatType::F8);
        let a = store.allocate().unwrap();
        let b = store.allocate().unwrap();
        store.set_fat_entry(a, b as i32);
        let blocks: Vec<u32> = store.walk(a).collect();
        assert_eq!(blocks, vec![a, b]);
        assert_eq!(store.tail(a), b);
        assert_eq!(store.length(a), 2);
    }

    #[test]
    fn walk_single_block_chain() {
        let mut store = formatted(BlockSize::B256, FatType::F8);
        let a = store.allocate().unwrap();
        assert_eq!(store.walk(a).collect::<Vec<_>>(), vec![a]);
        assert_eq!(store.tail(a), a);
        assert_eq!(store.length(a), 1);
    }
}
