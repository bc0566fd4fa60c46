//! Storage trait for slab-like containers with stable indices.
//!
//! Storage provides insert/remove/get operations where indices remain
//! valid until explicitly removed. The index threads its two bucket chains
//! through those indices instead of through pointers.
//!
//! Two backends ship with the crate:
//!
//! | Storage | Index | Discard path |
//! |---------|-------|--------------|
//! | `slab::Slab<T>` | `usize` | record dropped, slot reused by the slab |
//! | [`PoolStorage<T>`] | `u32` | record dropped, slot pushed onto the [`ObjectPool`] free list |

use std::marker::PhantomData;

use duplex_pool::{ObjectPool, PoolBuilder, PoolError, SlotId};

use crate::{DualNode, Index};

/// Heap storage used by [`DualKeyIndex`](crate::DualKeyIndex) by default.
pub type HeapStorage<T> = slab::Slab<DualNode<T, usize>>;

/// Slab-like storage with stable indices.
///
/// # Requirements
///
/// Implementations must provide:
/// - **Stable indices**: an index remains valid until explicitly removed
/// - **O(1)** insert, remove, get operations
/// - **Slot reuse**: removed slots can be reused by future inserts
///
/// Insertion is infallible: running out of memory is fatal, never an error.
pub trait Storage<T> {
    /// Index type for this storage.
    type Index: Index;

    /// Inserts a value, returning its stable index.
    fn insert(&mut self, value: T) -> Self::Index;

    /// Removes and returns the value at `index`, if present.
    fn remove(&mut self, index: Self::Index) -> Option<T>;

    /// Returns a reference to the value at `index`, if present.
    fn get(&self, index: Self::Index) -> Option<&T>;

    /// Returns a mutable reference to the value at `index`, if present.
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T>;

    /// Returns a reference without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be valid and occupied.
    unsafe fn get_unchecked(&self, index: Self::Index) -> &T;

    /// Returns a mutable reference without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be valid and occupied.
    unsafe fn get_unchecked_mut(&mut self, index: Self::Index) -> &mut T;

    /// Number of occupied slots.
    fn len(&self) -> usize;

    /// Returns `true` if no slots are occupied.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// slab::Slab implementation
// =============================================================================

impl<T> Storage<T> for slab::Slab<T> {
    type Index = usize;

    #[inline]
    fn insert(&mut self, value: T) -> Self::Index {
        slab::Slab::insert(self, value)
    }

    #[inline]
    fn remove(&mut self, index: Self::Index) -> Option<T> {
        self.try_remove(index)
    }

    #[inline]
    fn get(&self, index: Self::Index) -> Option<&T> {
        self.get(index)
    }

    #[inline]
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T> {
        self.get_mut(index)
    }

    #[inline]
    unsafe fn get_unchecked(&self, index: Self::Index) -> &T {
        unsafe { self.get(index).unwrap_unchecked() }
    }

    #[inline]
    unsafe fn get_unchecked_mut(&mut self, index: Self::Index) -> &mut T {
        unsafe { self.get_mut(index).unwrap_unchecked() }
    }

    #[inline]
    fn len(&self) -> usize {
        slab::Slab::len(self)
    }
}

// =============================================================================
// PoolStorage - typed storage over an ObjectPool
// =============================================================================

/// Typed storage whose slots come from an [`ObjectPool`].
///
/// Values are written into pool slots in place. An occupancy bitmap sits
/// alongside the pool so lookups through a stale index return `None`
/// instead of reading a free-list link.
///
/// Removing a value moves it out of its slot before the slot goes back to
/// the pool, so the value's destructor always runs (in the caller's hands).
///
/// # Example
///
/// ```
/// use duplex_index::{PoolStorage, Storage};
///
/// let mut storage: PoolStorage<String> = PoolStorage::new().unwrap();
/// let idx = storage.insert("hello".into());
/// assert_eq!(storage.get(idx).map(String::as_str), Some("hello"));
/// assert_eq!(storage.remove(idx).as_deref(), Some("hello"));
/// assert!(storage.get(idx).is_none());
/// ```
pub struct PoolStorage<T> {
    pool: ObjectPool,
    occupied: Vec<u64>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> PoolStorage<T> {
    /// Storage with the pool's default chunk size.
    pub fn new() -> Result<Self, PoolError> {
        Self::with_chunk_size(0)
    }

    /// Storage carving `chunk_size` slots at a time (`0` = default).
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self, PoolError> {
        let pool = PoolBuilder::for_type::<T>().chunk_size(chunk_size).build()?;
        Ok(Self {
            pool,
            occupied: Vec::new(),
            len: 0,
            _marker: PhantomData,
        })
    }

    /// The backing pool, for inspection.
    #[inline]
    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }

    /// Drops every stored value and returns every slot to the pool.
    ///
    /// The pool keeps its chunks for reuse.
    pub fn clear(&mut self) {
        for word_idx in 0..self.occupied.len() {
            let mut word = self.occupied[word_idx];
            while word != 0 {
                let bit = word.trailing_zeros() as usize;
                word &= word - 1;

                let i = word_idx * 64 + bit;
                // SAFETY: bit set means the slot holds an initialized T
                unsafe {
                    let slot = SlotId::from_raw(i as u32);
                    self.pool.slot_ptr(slot).cast::<T>().drop_in_place();
                    self.pool.free(slot);
                }
            }
            self.occupied[word_idx] = 0;
        }
        self.len = 0;
    }

    /// Drops every stored value and releases the pool's memory.
    pub fn dry_up(&mut self) {
        self.clear();
        self.occupied.clear();
        self.pool.dry_up();
    }

    #[inline]
    fn is_occupied(&self, i: usize) -> bool {
        self.occupied
            .get(i / 64)
            .is_some_and(|word| word & (1 << (i % 64)) != 0)
    }

    #[inline]
    fn slot(&self, index: u32) -> *mut T {
        // SAFETY: callers only pass indices that are in range of the pool
        unsafe { self.pool.slot_ptr_unchecked(SlotId::from_raw(index)) }
            .cast::<T>()
            .as_ptr()
    }
}

impl<T> Storage<T> for PoolStorage<T> {
    type Index = u32;

    fn insert(&mut self, value: T) -> Self::Index {
        let id = self.pool.alloc();
        let i = id.index() as usize;

        let words = self.pool.capacity().div_ceil(64);
        if self.occupied.len() < words {
            self.occupied.resize(words, 0);
        }

        // SAFETY: freshly allocated slot, sized and aligned for T
        unsafe { self.pool.slot_ptr(id).cast::<T>().write(value) };
        self.occupied[i / 64] |= 1 << (i % 64);
        self.len += 1;

        id.index()
    }

    fn remove(&mut self, index: Self::Index) -> Option<T> {
        let i = index as usize;
        if !self.is_occupied(i) {
            return None;
        }

        self.occupied[i / 64] &= !(1 << (i % 64));
        // SAFETY: slot was occupied; the bit is cleared so it is read once
        let value = unsafe { self.slot(index).read() };
        // SAFETY: index was occupied, so it came from this pool
        self.pool.free(unsafe { SlotId::from_raw(index) });
        self.len -= 1;

        Some(value)
    }

    #[inline]
    fn get(&self, index: Self::Index) -> Option<&T> {
        if !self.is_occupied(index as usize) {
            return None;
        }
        // SAFETY: occupied slot holds an initialized T
        Some(unsafe { &*self.slot(index) })
    }

    #[inline]
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T> {
        if !self.is_occupied(index as usize) {
            return None;
        }
        // SAFETY: occupied slot holds an initialized T
        Some(unsafe { &mut *self.slot(index) })
    }

    #[inline]
    unsafe fn get_unchecked(&self, index: Self::Index) -> &T {
        unsafe { &*self.slot(index) }
    }

    #[inline]
    unsafe fn get_unchecked_mut(&mut self, index: Self::Index) -> &mut T {
        unsafe { &mut *self.slot(index) }
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }
}

impl<T> Drop for PoolStorage<T> {
    fn drop(&mut self) {
        self.dry_up();
    }
}

impl<T> std::fmt::Debug for PoolStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolStorage")
            .field("len", &self.len)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn send_follows_value_type() {
        fn assert_send<T: Send>() {}
        assert_send::<PoolStorage<String>>();
        assert_send::<PoolStorage<DualNode<Vec<u8>, u32>>>();
    }

    #[test]
    fn new_is_empty() {
        let storage: PoolStorage<u64> = PoolStorage::new().unwrap();
        assert!(Storage::is_empty(&storage));
        assert_eq!(storage.pool().chunk_count(), 0);
    }

    #[test]
    fn insert_get_remove() {
        let mut storage: PoolStorage<u64> = PoolStorage::new().unwrap();

        let idx = storage.insert(42);
        assert_eq!(Storage::len(&storage), 1);
        assert_eq!(storage.get(idx), Some(&42));

        assert_eq!(storage.remove(idx), Some(42));
        assert_eq!(storage.get(idx), None);
        assert_eq!(Storage::len(&storage), 0);
    }

    #[test]
    fn get_mut() {
        let mut storage: PoolStorage<u64> = PoolStorage::new().unwrap();

        let idx = storage.insert(10);
        *storage.get_mut(idx).unwrap() = 20;

        assert_eq!(storage.get(idx), Some(&20));
    }

    #[test]
    fn remove_nonexistent() {
        let mut storage: PoolStorage<u64> = PoolStorage::new().unwrap();

        let idx = storage.insert(42);
        storage.remove(idx);

        // Double remove returns None
        assert_eq!(storage.remove(idx), None);
        // Never-issued index returns None
        assert_eq!(storage.remove(9_999), None);
    }

    #[test]
    fn slot_reuse() {
        let mut storage: PoolStorage<u64> = PoolStorage::new().unwrap();

        let k0 = storage.insert(0);
        let _k1 = storage.insert(1);

        storage.remove(k0);

        // Next insert reuses k0's slot (LIFO)
        let k2 = storage.insert(2);
        assert_eq!(k2, k0);
    }

    #[test]
    fn grows_past_one_chunk() {
        let mut storage: PoolStorage<u64> = PoolStorage::with_chunk_size(8).unwrap();

        let keys: Vec<_> = (0..100).map(|i| storage.insert(i)).collect();
        assert_eq!(storage.pool().chunk_count(), 13);

        for (i, key) in keys.iter().enumerate() {
            assert_eq!(storage.get(*key), Some(&(i as u64)));
        }
    }

    #[test]
    fn remove_runs_destructor_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut storage = PoolStorage::new().unwrap();

        let idx = storage.insert(DropCounter(drops.clone()));
        let value = storage.remove(idx);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(value);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(storage.pool().live(), 0);
    }

    #[test]
    fn drop_cleans_up() {
        let drops = Arc::new(AtomicUsize::new(0));

        {
            let mut storage = PoolStorage::new().unwrap();
            storage.insert(DropCounter(drops.clone()));
            storage.insert(DropCounter(drops.clone()));
            storage.insert(DropCounter(drops.clone()));
        }

        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn clear_keeps_chunks() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut storage = PoolStorage::with_chunk_size(4).unwrap();
        for _ in 0..10 {
            storage.insert(DropCounter(drops.clone()));
        }

        storage.clear();
        assert_eq!(drops.load(Ordering::SeqCst), 10);
        assert_eq!(storage.pool().live(), 0);
        assert_eq!(storage.pool().chunk_count(), 3);
    }

    #[test]
    fn slab_backend() {
        let mut storage = slab::Slab::new();

        let idx = Storage::insert(&mut storage, 42u64);
        assert_eq!(Storage::get(&storage, idx), Some(&42));

        assert_eq!(Storage::remove(&mut storage, idx), Some(42));
        assert_eq!(Storage::get(&storage, idx), None);
        assert_eq!(Storage::remove(&mut storage, idx), None);
    }

    #[test]
    fn slab_slot_reuse() {
        let mut storage = slab::Slab::new();

        let idx1 = Storage::insert(&mut storage, 1u64);
        Storage::remove(&mut storage, idx1);

        let idx2 = Storage::insert(&mut storage, 2u64);
        assert_eq!(idx1, idx2);
    }
}
