//! Fixed-slot object pool carved from an [`Arena`].
//!
//! Slots are handed out as [`SlotId`]s: stable integer handles that stay
//! valid until the slot is freed or the pool is dried up. Unused slots form
//! a singly linked free list whose links live inside the unused memory.
//!
//! ```text
//! chunk 0: [slot 0][slot 1]...[slot 31]
//! chunk 1: [slot 32][slot 33]...[slot 63]
//!
//! free_head -> 33 -> 2 -> 34 -> ... -> NONE   (links stored in the slots)
//! ```
//!
//! When the free list runs dry, one chunk of `chunk_size` slots is carved
//! from the arena in a single allocation. Memory only goes back to the
//! system through [`ObjectPool::dry_up`] or drop.

use std::alloc::Layout;
use std::mem;
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::{Arena, Owned, PoolError};

/// Number of slots carved per chunk when the caller doesn't choose.
const DEFAULT_CHUNK_SIZE: usize = 32;

/// Free-list link stored inside a vacant slot.
type Link = u32;

/// Terminal marker for the free list.
const LINK_NONE: Link = Link::MAX;

// =============================================================================
// SlotId
// =============================================================================

/// Stable handle to a pool slot.
///
/// Encodes a global slot number: `chunk * chunk_size + offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    /// Sentinel id that never names a live slot.
    pub const NONE: SlotId = SlotId(LINK_NONE);

    /// Global slot number.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns `true` if this is the sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == LINK_NONE
    }

    /// Rebuilds an id from its global slot number.
    ///
    /// # Safety
    ///
    /// The resulting id is only meaningful for the pool that issued `raw`
    /// and only while that slot is allocated.
    #[inline]
    pub const unsafe fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ObjectPool`].
///
/// # Example
///
/// ```
/// use duplex_pool::PoolBuilder;
///
/// let pool = PoolBuilder::new(48).chunk_size(64).build().unwrap();
/// assert_eq!(pool.chunk_size(), 64);
/// assert!(pool.stride() >= 48);
/// ```
#[derive(Clone, Debug)]
pub struct PoolBuilder {
    object_size: usize,
    align: usize,
    chunk_size: usize,
}

impl PoolBuilder {
    /// Pool of `object_size`-byte slots. Alignment defaults to the link's.
    pub fn new(object_size: usize) -> Self {
        Self {
            object_size,
            align: mem::align_of::<Link>(),
            chunk_size: 0,
        }
    }

    /// Pool sized and aligned for values of `T`.
    pub fn for_type<T>() -> Self {
        Self::new(mem::size_of::<T>()).align(mem::align_of::<T>())
    }

    /// Minimum slot alignment. Must be a power of two.
    /// Raised to the free-list link's alignment if smaller.
    pub fn align(mut self, align: usize) -> Self {
        self.align = align;
        self
    }

    /// Slots carved per chunk. `0` keeps the internal default.
    pub fn chunk_size(mut self, slots: usize) -> Self {
        self.chunk_size = slots;
        self
    }

    /// Validate and build the pool. No memory is allocated yet.
    pub fn build(self) -> Result<ObjectPool, PoolError> {
        if self.object_size == 0 {
            return Err(PoolError::ZeroObjectSize);
        }
        if !self.align.is_power_of_two() {
            return Err(PoolError::InvalidAlignment(self.align));
        }

        let align = self.align.max(mem::align_of::<Link>());
        let object_size = self.object_size.max(mem::size_of::<Link>());
        let chunk_size = if self.chunk_size > 0 {
            self.chunk_size
        } else {
            DEFAULT_CHUNK_SIZE
        };
        let stride = object_size
            .checked_next_multiple_of(align)
            .ok_or(PoolError::ChunkTooLarge {
                chunk_size,
                stride: object_size,
            })?;

        let chunk_layout = stride
            .checked_mul(chunk_size)
            .filter(|_| chunk_size < LINK_NONE as usize)
            .and_then(|bytes| Layout::from_size_align(bytes, align).ok())
            .ok_or(PoolError::ChunkTooLarge { chunk_size, stride })?;

        Ok(ObjectPool {
            arena: Owned::new(Arena::new()),
            chunks: Vec::new(),
            chunk_layout,
            object_size,
            stride,
            chunk_size,
            free_head: LINK_NONE,
            live: 0,
        })
    }
}

// =============================================================================
// ObjectPool
// =============================================================================

/// Fixed-size slot allocator with a free list threaded through unused slots.
///
/// [`free`](Self::free) never runs destruction logic on the slot contents;
/// anything stored there must be finalized by the caller first.
///
/// Dropping a pool while slots are still allocated is a usage error and
/// panics in debug builds. Call [`dry_up`](Self::dry_up) once every slot
/// has been returned (or deliberately abandoned).
///
/// # Example
///
/// ```
/// use duplex_pool::ObjectPool;
///
/// let mut pool = ObjectPool::new(16).unwrap();
/// let a = pool.alloc();
/// let b = pool.alloc();
/// assert_eq!(pool.live(), 2);
///
/// pool.free(a);
/// pool.free(b);
/// pool.dry_up();
/// assert_eq!(pool.live(), 0);
/// ```
pub struct ObjectPool {
    arena: Owned<Arena>,
    chunks: Vec<NonNull<u8>>,
    chunk_layout: Layout,
    object_size: usize,
    stride: usize,
    chunk_size: usize,
    free_head: Link,
    live: usize,
}

impl ObjectPool {
    /// Pool of `object_size`-byte slots with the default chunk size.
    pub fn new(object_size: usize) -> Result<Self, PoolError> {
        PoolBuilder::new(object_size).build()
    }

    /// Returns a builder for custom alignment or chunk size.
    pub fn builder(object_size: usize) -> PoolBuilder {
        PoolBuilder::new(object_size)
    }

    /// Takes a slot off the free list, carving a new chunk if it is empty.
    ///
    /// The slot's contents are unspecified. Aborts the process if the
    /// allocator is exhausted.
    ///
    /// # Panics
    ///
    /// Panics if the pool has handed out every id a [`SlotId`] can encode.
    pub fn alloc(&mut self) -> SlotId {
        if self.free_head == LINK_NONE {
            self.replenish();
        }
        debug_assert!(self.free_head != LINK_NONE, "replenish left an empty free list");

        let id = self.free_head;
        // SAFETY: id came off the free list, so it is in bounds and holds a link
        self.free_head = unsafe { self.link_ptr(id).read() };
        self.live += 1;

        SlotId(id)
    }

    /// Pushes a slot back onto the free list.
    ///
    /// No destructor runs on whatever the slot held. Freeing the same id
    /// twice corrupts the free list.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never issued by this pool (or the pool has been
    /// dried up since), or if no slot is live. The live count never wraps,
    /// so a stray extra `free` cannot hide live slots from the drop check.
    pub fn free(&mut self, id: SlotId) {
        self.check(id);
        assert!(self.live > 0, "free with no live slots");

        // SAFETY: id validated by check()
        unsafe { self.link_ptr(id.0).write(self.free_head) };
        self.free_head = id.0;
        self.live -= 1;
    }

    /// Returns the address of a slot's storage.
    ///
    /// The pointer is aligned to the pool's alignment and valid for
    /// [`stride`](Self::stride) bytes until the pool is dried up or dropped.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range for this pool.
    #[inline]
    pub fn slot_ptr(&self, id: SlotId) -> NonNull<u8> {
        self.check(id);
        // SAFETY: id validated by check()
        unsafe { self.slot_ptr_unchecked(id) }
    }

    /// Returns the address of a slot's storage without bounds checking.
    ///
    /// # Safety
    ///
    /// `id` must be in range for this pool.
    #[inline]
    pub unsafe fn slot_ptr_unchecked(&self, id: SlotId) -> NonNull<u8> {
        let id = id.0 as usize;
        let chunk = id / self.chunk_size;
        let offset = (id % self.chunk_size) * self.stride;
        // SAFETY: caller guarantees chunk is in range, offset stays in the chunk
        unsafe { self.chunks.get_unchecked(chunk).add(offset) }
    }

    /// Releases every chunk back to the system and resets the pool.
    ///
    /// All ids become invalid. Intended for teardown, once every object has
    /// been returned; the live count is reset to zero regardless.
    pub fn dry_up(&mut self) {
        debug!(
            chunks = self.chunks.len(),
            live = self.live,
            "object pool dried up"
        );

        self.arena.release();
        self.chunks.clear();
        self.free_head = LINK_NONE;
        self.live = 0;
    }

    /// Number of slots currently allocated.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Returns `true` if no slots are allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total slots carved so far (allocated or free).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunks.len() * self.chunk_size
    }

    /// Number of chunks obtained from the arena.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Slots per chunk.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Requested object size, raised to at least one free-list link.
    #[inline]
    pub fn object_size(&self) -> usize {
        self.object_size
    }

    /// Distance in bytes between consecutive slots.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Alignment of every slot.
    #[inline]
    pub fn align(&self) -> usize {
        self.chunk_layout.align()
    }
}

// =============================================================================
// Internal
// =============================================================================

impl ObjectPool {
    /// Carve one chunk and make it the whole free list.
    fn replenish(&mut self) {
        let base = self.capacity();
        assert!(
            base + self.chunk_size <= LINK_NONE as usize,
            "object pool exhausted: slot ids overflow"
        );

        let start = self.arena.allocate_layout(self.chunk_layout);
        self.chunks.push(start);

        let base = base as Link;
        let last = (self.chunk_size - 1) as Link;
        for i in 0..last {
            // SAFETY: base + i is inside the chunk just pushed
            unsafe { self.link_ptr(base + i).write(base + i + 1) };
        }
        // SAFETY: as above
        unsafe { self.link_ptr(base + last).write(LINK_NONE) };

        self.free_head = base;

        trace!(
            chunk = self.chunks.len() - 1,
            slots = self.chunk_size,
            bytes = self.chunk_layout.size(),
            "object pool replenished"
        );
    }

    #[inline]
    fn check(&self, id: SlotId) {
        assert!(
            (id.0 as usize) < self.capacity(),
            "invalid slot id: {} (capacity {})",
            id.0,
            self.capacity()
        );
    }

    /// Free-list link stored in a slot.
    ///
    /// # Safety
    ///
    /// `id` must be in range.
    #[inline]
    unsafe fn link_ptr(&self, id: Link) -> *mut Link {
        // SAFETY: slots are aligned to at least align_of::<Link>() and at
        // least size_of::<Link>() bytes long
        unsafe { self.slot_ptr_unchecked(SlotId(id)).as_ptr() as *mut Link }
    }
}

impl Drop for ObjectPool {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.live == 0,
                "object pool dropped with {} live slots",
                self.live
            );
        }
        // chunks go back to the system when the arena drops
    }
}

impl std::fmt::Debug for ObjectPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("object_size", &self.object_size)
            .field("stride", &self.stride)
            .field("chunk_size", &self.chunk_size)
            .field("chunks", &self.chunks.len())
            .field("live", &self.live)
            .finish()
    }
}

// Chunk pointers are owned by the pool's arena.
unsafe impl Send for ObjectPool {}
