//! duplex-pool - arena-backed fixed-slot allocation.
//!
//! Three layers, leaves first:
//!
//! ```text
//! Arena       - owns raw blocks, bulk release only
//!   └── ObjectPool - fixed-size slots carved from the arena in chunks,
//!                    free list threaded through unused slots
//! Owned / OwnedBuffer - move-only heap handles used at ownership seams
//! ```
//!
//! # Example
//!
//! ```
//! use duplex_pool::{ObjectPool, PoolBuilder};
//!
//! let mut pool: ObjectPool = PoolBuilder::for_type::<[u64; 4]>()
//!     .chunk_size(128)
//!     .build()?;
//!
//! let id = pool.alloc();
//! unsafe { pool.slot_ptr(id).cast::<[u64; 4]>().write([1, 2, 3, 4]) };
//! pool.free(id);
//!
//! pool.dry_up();
//! # Ok::<(), duplex_pool::PoolError>(())
//! ```
//!
//! # Fatal conditions
//!
//! Allocator exhaustion aborts the process (there is no recovery path).
//! Zero-byte arena requests are served as one byte rather than failing.
//! Freeing a slot when none is live panics. Dropping an [`ObjectPool`]
//! that still has live slots panics in debug builds.

#![warn(missing_docs)]

mod arena;
mod owned;
mod pool;
mod sys;

pub use arena::Arena;
pub use owned::{Owned, OwnedBuffer};
pub use pool::{ObjectPool, PoolBuilder, SlotId};

/// Error during pool construction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Object size was zero.
    #[error("object size must be non-zero")]
    ZeroObjectSize,
    /// Requested alignment is not a power of two.
    #[error("alignment ({0}) is not a power of two")]
    InvalidAlignment(usize),
    /// One chunk would not fit in the address space, or the slot count
    /// exceeds what a [`SlotId`] can encode.
    #[error("chunk of {chunk_size} slots with stride {stride} is too large")]
    ChunkTooLarge {
        /// Slots per chunk.
        chunk_size: usize,
        /// Bytes per slot.
        stride: usize,
    },
}
