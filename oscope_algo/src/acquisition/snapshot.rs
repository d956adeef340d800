// Implements the snapshot producer: independent copies of a completed window taken from a
// fixed pool of blocks, so delivery never races with acquisition and never touches a heap.

// Key Features:
// - SNAPSHOT_BLOCKS blocks of SAMPLE_SIZE bytes, claimed through a bitmap
// - A `Snapshot` owns its block and gives it back when dropped
// - Exhaustion is reported to the caller, it is a transient condition

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::cell::{Cell, UnsafeCell};
use core::fmt;
use core::ops::Deref;

use critical_section::Mutex;

use super::sample_buffer::SAMPLE_SIZE;
use crate::critical::CriticalSection;

/// Snapshots that may be in flight at once, shared by all channels.
pub const SNAPSHOT_BLOCKS: usize = 4;

const _: () = assert!(SNAPSHOT_BLOCKS <= 8); // One bit per block in a u8

type Block = [u8; SAMPLE_SIZE];

/// Fixed pool of snapshot blocks.
pub struct SnapshotPool {
    blocks: [UnsafeCell<Block>; SNAPSHOT_BLOCKS],

    /// Bit n set while block n is owned by a `Snapshot`.
    claimed: Mutex<Cell<u8>>,
}

// SAFETY: a block is only reached through the single `Snapshot` that holds its claimed bit,
// and the bitmap itself is only touched inside a critical section.
unsafe impl Sync for SnapshotPool {}

impl SnapshotPool {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY: UnsafeCell<Block> = UnsafeCell::new([0; SAMPLE_SIZE]);

        Self {
            blocks: [EMPTY; SNAPSHOT_BLOCKS],
            claimed: Mutex::new(Cell::new(0)),
        }
    }

    /// Claims a free block, `None` when every block is in use.
    pub fn claim(&self) -> Option<Snapshot<'_>> {
        let cs = CriticalSection::enter();
        let claimed = self.claimed.borrow(cs.token());
        let mask = claimed.get();

        let block = (0..SNAPSHOT_BLOCKS).find(|&n| mask & (1 << n) == 0)?;
        claimed.set(mask | (1 << block));

        Some(Snapshot { pool: self, block })
    }

    /// Blocks currently free.
    pub fn available(&self) -> usize {
        let cs = CriticalSection::enter();
        let mask = self.claimed.borrow(cs.token()).get();
        SNAPSHOT_BLOCKS - mask.count_ones() as usize
    }

    fn release(&self, block: usize) {
        let cs = CriticalSection::enter();
        let claimed = self.claimed.borrow(cs.token());
        claimed.set(claimed.get() & !(1 << block));
    }
}

impl Default for SnapshotPool {
    fn default() -> Self {
        Self::new()
    }
}

/// One owned copy of a sample window.
pub struct Snapshot<'p> {
    pool: &'p SnapshotPool,
    block: usize,
}

impl<'p> Snapshot<'p> {
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: this snapshot holds the claimed bit of `block`
        unsafe { &*self.pool.blocks[self.block].get() }
    }

    /// Copies a window into the block.
    pub(crate) fn fill(&mut self, window: &[u8]) {
        // SAFETY: this snapshot holds the claimed bit of `block` and is borrowed mutably
        let block = unsafe { &mut *self.pool.blocks[self.block].get() };
        block.copy_from_slice(window);
    }
}

impl Deref for Snapshot<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Snapshot<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("block", &self.block)
            .field("len", &SAMPLE_SIZE)
            .finish()
    }
}

impl Drop for Snapshot<'_> {
    fn drop(&mut self) {
        self.pool.release(self.block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_runs_dry_and_recovers() {
        let pool = SnapshotPool::new();
        let mut held = [pool.claim(), pool.claim(), pool.claim(), pool.claim()];
        assert!(held.iter().all(Option::is_some));
        assert_eq!(pool.available(), 0);
        assert!(pool.claim().is_none());

        held[2] = None;
        assert_eq!(pool.available(), 1);
        let again = pool.claim().expect("released block is reusable");
        assert_eq!(again.block, 2);
    }

    #[test]
    fn snapshots_do_not_share_storage() {
        let pool = SnapshotPool::new();
        let mut a = pool.claim().unwrap();
        let mut b = pool.claim().unwrap();

        a.fill(&[1; SAMPLE_SIZE]);
        b.fill(&[2; SAMPLE_SIZE]);

        assert!(a.iter().all(|&v| v == 1));
        assert!(b.iter().all(|&v| v == 2));
        assert_eq!(a.len(), SAMPLE_SIZE);
    }
}
