//! Append-only block arena with bulk release.
//!
//! An [`Arena`] hands out raw blocks and keeps every one of them until
//! [`Arena::release`] frees them all at once. There is no way to return a
//! single block; callers that need slot-level reuse layer an
//! [`ObjectPool`](crate::ObjectPool) on top.

use std::alloc::Layout;
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::sys::Block;

/// Bulk-allocate, bulk-release memory owner.
///
/// # Example
///
/// ```
/// use duplex_pool::Arena;
///
/// let mut arena = Arena::new();
/// let a = arena.allocate(64);
/// let b = arena.allocate(128);
/// assert_ne!(a, b);
/// assert_eq!(arena.block_count(), 2);
///
/// arena.release();
/// assert_eq!(arena.block_count(), 0);
/// ```
#[derive(Default)]
pub struct Arena {
    blocks: Vec<Block>,
    bytes: usize,
}

impl Arena {
    /// Creates an empty arena. Nothing is allocated until the first request.
    #[inline]
    pub const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            bytes: 0,
        }
    }

    /// Allocates a fresh block of `bytes` bytes.
    ///
    /// The block is uninitialized and stays valid until the next
    /// [`release`](Self::release) or until the arena is dropped.
    ///
    /// A request for zero bytes is served as one byte, so the result is
    /// always a distinct, usable block. Aborts the process if the allocator
    /// is exhausted.
    pub fn allocate(&mut self, bytes: usize) -> NonNull<u8> {
        let layout = Layout::from_size_align(bytes, 1).expect("block size overflow");
        self.allocate_layout(layout)
    }

    /// Allocates a fresh block satisfying `layout`.
    ///
    /// Zero-sized layouts get one byte. Aborts on allocator exhaustion.
    pub fn allocate_layout(&mut self, layout: Layout) -> NonNull<u8> {
        let block = Block::alloc(layout);
        let ptr = block.as_ptr();
        self.bytes += block.size();
        self.blocks.push(block);

        trace!(
            bytes = layout.size(),
            align = layout.align(),
            blocks = self.blocks.len(),
            "arena block allocated"
        );

        ptr
    }

    /// Frees every block this arena owns.
    ///
    /// All pointers previously returned by [`allocate`](Self::allocate) are
    /// invalid afterwards. Calling this on an empty arena is a no-op.
    pub fn release(&mut self) {
        if self.blocks.is_empty() {
            return;
        }

        debug!(
            blocks = self.blocks.len(),
            bytes = self.bytes,
            "arena released"
        );

        self.blocks.clear();
        self.bytes = 0;
    }

    /// Number of blocks currently owned.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total bytes currently owned, including alignment padding.
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns `true` if the arena owns no blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("blocks", &self.blocks.len())
            .field("bytes", &self.bytes)
            .finish()
    }
}

// Blocks are plain memory with no thread affinity.
unsafe impl Send for Arena {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_empty() {
        let arena = Arena::new();
        assert!(arena.is_empty());
        assert_eq!(arena.block_count(), 0);
        assert_eq!(arena.allocated_bytes(), 0);
    }

    #[test]
    fn allocate_appends_blocks() {
        let mut arena = Arena::new();
        arena.allocate(10);
        arena.allocate(20);
        arena.allocate(30);

        assert_eq!(arena.block_count(), 3);
        assert!(arena.allocated_bytes() >= 60);
    }

    #[test]
    fn blocks_are_writable_and_distinct() {
        let mut arena = Arena::new();
        let a = arena.allocate(256);
        let b = arena.allocate(256);

        unsafe {
            std::ptr::write_bytes(a.as_ptr(), 0x11, 256);
            std::ptr::write_bytes(b.as_ptr(), 0x22, 256);
            assert_eq!(*a.as_ptr().add(255), 0x11);
            assert_eq!(*b.as_ptr(), 0x22);
        }
    }

    #[test]
    fn allocate_layout_respects_alignment() {
        let mut arena = Arena::new();
        let ptr = arena.allocate_layout(Layout::from_size_align(24, 256).unwrap());
        assert_eq!(ptr.as_ptr() as usize % 256, 0);
    }

    #[test]
    fn zero_byte_request_gets_a_real_block() {
        let mut arena = Arena::new();
        let a = arena.allocate(0);
        let b = arena.allocate(0);

        assert_ne!(a, b);
        assert_eq!(arena.block_count(), 2);
        assert!(arena.allocated_bytes() >= 2);
        unsafe { a.as_ptr().write(1) };
    }

    #[test]
    fn release_frees_everything() {
        let mut arena = Arena::new();
        for _ in 0..8 {
            arena.allocate(1024);
        }

        arena.release();
        assert!(arena.is_empty());
        assert_eq!(arena.allocated_bytes(), 0);
    }

    #[test]
    fn release_is_idempotent() {
        let mut arena = Arena::new();
        arena.allocate(64);

        arena.release();
        arena.release();
        assert!(arena.is_empty());
    }

    #[test]
    fn allocate_after_release() {
        let mut arena = Arena::new();
        arena.allocate(64);
        arena.release();

        arena.allocate(64);
        assert_eq!(arena.block_count(), 1);
    }
}
