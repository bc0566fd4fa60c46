//! Platform block allocation (internal).

use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};
use std::ptr::NonNull;

/// Smallest alignment handed out for a block.
///
/// Matches what `malloc` guarantees on 64-bit targets, so a block can host
/// any scalar the pool threads through it.
pub(crate) const MIN_ALIGN: usize = 16;

/// A raw memory region allocated from the global allocator.
///
/// Memory is freed when dropped. Contents are uninitialized.
pub(crate) struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Block {
    /// Allocate a block for `layout`, raising its alignment to [`MIN_ALIGN`]
    /// and a zero size to one byte.
    ///
    /// Exhaustion is not recoverable: it routes through
    /// [`handle_alloc_error`], which aborts the process.
    ///
    /// # Panics
    ///
    /// Panics if the padded size overflows `isize`.
    pub(crate) fn alloc(layout: Layout) -> Self {
        let layout = Layout::from_size_align(layout.size().max(1), layout.align().max(MIN_ALIGN))
            .expect("block layout overflow")
            .pad_to_align();

        let ptr = unsafe { alloc(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            handle_alloc_error(layout);
        };

        Self { ptr, layout }
    }

    /// Returns a pointer to the start of the block.
    #[inline]
    pub(crate) fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Usable size in bytes (after alignment padding).
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: ptr and layout come from the `alloc` call in `Block::alloc`
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(size: usize) -> Layout {
        Layout::from_size_align(size, 1).unwrap()
    }

    #[test]
    fn alloc_small() {
        let block = Block::alloc(bytes(1));
        assert!(block.size() >= 1);
    }

    #[test]
    fn pointer_meets_min_align() {
        let block = Block::alloc(bytes(100));
        assert_eq!(block.as_ptr().as_ptr() as usize % MIN_ALIGN, 0);
    }

    #[test]
    fn honors_larger_alignment() {
        let block = Block::alloc(Layout::from_size_align(64, 4096).unwrap());
        assert_eq!(block.as_ptr().as_ptr() as usize % 4096, 0);
    }

    #[test]
    fn can_write_entire_block() {
        let size = 4096 * 4;
        let block = Block::alloc(bytes(size));
        unsafe {
            std::ptr::write_bytes(block.as_ptr().as_ptr(), 0xAB, size);
            assert_eq!(*block.as_ptr().as_ptr(), 0xAB);
            assert_eq!(*block.as_ptr().as_ptr().add(size - 1), 0xAB);
        }
    }

    #[test]
    fn zero_size_rounds_up() {
        let block = Block::alloc(bytes(0));
        assert!(block.size() >= 1);
        unsafe { block.as_ptr().as_ptr().write(0x5A) };
    }

    #[test]
    fn zero_size_keeps_large_alignment() {
        let block = Block::alloc(Layout::from_size_align(0, 512).unwrap());
        assert_eq!(block.as_ptr().as_ptr() as usize % 512, 0);
    }

    #[test]
    fn distinct_blocks_do_not_alias() {
        let blocks: Vec<_> = (0..10).map(|_| Block::alloc(bytes(512))).collect();
        for i in 0..blocks.len() {
            for j in (i + 1)..blocks.len() {
                assert_ne!(blocks[i].as_ptr(), blocks[j].as_ptr());
            }
        }
    }
}
