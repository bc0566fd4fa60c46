//! DualKeyIndex - a fixed-size hash table with two interleaved chain sets.
//!
//! Every record lives in exactly one storage slot. The slot carries two
//! links: `next1` threads the chain of the record's primary bucket and
//! `next2` the chain of its secondary bucket. Bucket heads are storage
//! indices, so the table never holds a pointer into storage.
//!
//! ```text
//! primary   [ 0 ][ 1 ][ 2 ] ...        secondary [ 0 ][ 1 ][ 2 ] ...
//!             |                                         |
//!             v                                         v
//!           slot 7 --next1--> slot 3     slot 3 --next2--> slot 9
//! ```
//!
//! The table size is fixed at construction; there is no rehashing.

use std::fmt;
use std::marker::PhantomData;

use duplex_pool::OwnedBuffer;
use tracing::{debug, warn};

use crate::iter::{Iter, Matching};
use crate::storage::HeapStorage;
use crate::{DualKeyed, DualNode, Index, IndexError, Key, Storage, key};

/// Bucket count used when none is given (a prime).
pub const DEFAULT_TABLE_SIZE: usize = 5003;

/// Largest accepted bucket count.
pub const MAX_TABLE_SIZE: usize = u32::MAX as usize;

/// A hash table over records addressable by a unique primary key and a
/// shared secondary key.
///
/// Lookups by `key1` find at most one record; lookups by `key2` may find
/// many. Both lookups scan one bucket chain. Records are owned by the
/// index from [`add`](Self::add) until [`remove1`](Self::remove1) hands
/// them back or [`remove_all`](Self::remove_all) drops them.
///
/// Dropping an index that still holds records is a usage error, reported
/// by a debug assertion: call [`remove_all`](Self::remove_all) first.
///
/// # Example
///
/// ```
/// use duplex_index::{DualKeyIndex, DualKeyed, Key};
///
/// struct Fill {
///     order_id: Key,
///     account: Key,
///     qty: u32,
/// }
///
/// impl DualKeyed for Fill {
///     fn key1(&self) -> Key { self.order_id }
///     fn key2(&self) -> Key { self.account }
/// }
///
/// let mut fills: DualKeyIndex<Fill> = DualKeyIndex::new();
/// fills.add(Fill { order_id: 1, account: 7, qty: 100 });
/// fills.add(Fill { order_id: 2, account: 7, qty: 50 });
/// fills.add(Fill { order_id: 3, account: 8, qty: 10 });
///
/// assert_eq!(fills.get1(2).map(|f| f.qty), Some(50));
/// assert_eq!(fills.get_all2(7).map(|f| f.qty).sum::<u32>(), 150);
///
/// let fill = fills.remove1(1).unwrap();
/// assert_eq!(fill.qty, 100);
///
/// fills.remove_all();
/// ```
pub struct DualKeyIndex<T, S = HeapStorage<T>, Idx = usize>
where
    T: DualKeyed,
    Idx: Index,
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
    storage: S,
    primary: OwnedBuffer<Idx>,
    secondary: OwnedBuffer<Idx>,
    _marker: PhantomData<T>,
}

impl<T: DualKeyed> DualKeyIndex<T> {
    /// Creates a heap-backed index with [`DEFAULT_TABLE_SIZE`] buckets.
    pub fn new() -> Self {
        Self::with_table_size(DEFAULT_TABLE_SIZE)
    }

    /// Creates a heap-backed index with `table_size` buckets.
    ///
    /// A size of `0` selects [`DEFAULT_TABLE_SIZE`].
    ///
    /// # Panics
    ///
    /// Panics if `table_size` exceeds [`MAX_TABLE_SIZE`].
    pub fn with_table_size(table_size: usize) -> Self {
        assert!(
            table_size <= MAX_TABLE_SIZE,
            "table size {table_size} exceeds {MAX_TABLE_SIZE}"
        );
        Self::with_storage(slab::Slab::new(), table_size)
    }

    /// Returns a builder for configuring an index.
    pub fn builder() -> IndexBuilder {
        IndexBuilder::new()
    }
}

impl<T: DualKeyed> Default for DualKeyIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, Idx> DualKeyIndex<T, S, Idx>
where
    T: DualKeyed,
    Idx: Index,
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
    /// Creates an index over caller-provided storage.
    ///
    /// A `table_size` of `0` selects [`DEFAULT_TABLE_SIZE`].
    ///
    /// # Panics
    ///
    /// Panics if `storage` already holds values.
    pub fn with_storage(storage: S, table_size: usize) -> Self {
        assert!(storage.is_empty(), "index storage must start empty");
        let table_size = if table_size == 0 {
            DEFAULT_TABLE_SIZE
        } else {
            table_size
        };

        Self {
            storage,
            primary: OwnedBuffer::filled(Idx::NONE, table_size),
            secondary: OwnedBuffer::filled(Idx::NONE, table_size),
            _marker: PhantomData,
        }
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if the index holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Number of buckets in each of the two bucket arrays.
    #[inline]
    pub fn table_size(&self) -> usize {
        self.primary.len()
    }

    /// Bucket that `key` selects in this table.
    #[inline]
    pub fn bucket_of(&self, key: Key) -> usize {
        key::bucket_of(key, self.table_size())
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Adds a record, taking ownership of it. Returns its handle.
    ///
    /// The record goes to the head of both of its chains, so the most
    /// recently added record is found first.
    ///
    /// The caller must not add a record whose `key1` is already present;
    /// debug builds panic if it is.
    pub fn add(&mut self, record: T) -> Idx {
        let key1 = record.key1();
        let key2 = record.key2();
        debug_assert!(
            self.find1(key1).is_none(),
            "duplicate key1 {key1} added to dual-key index"
        );

        let b1 = self.bucket_of(key1);
        let b2 = self.bucket_of(key2);

        let mut node = DualNode::new(record);
        node.next1 = self.primary[b1];
        node.next2 = self.secondary[b2];

        let idx = self.storage.insert(node);
        self.primary[b1] = idx;
        self.secondary[b2] = idx;
        idx
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Returns the record whose `key1` equals `key`.
    #[inline]
    pub fn get1(&self, key: Key) -> Option<&T> {
        self.handle1(key).map(|idx| {
            // Safety: find1 only returns occupied indices
            unsafe { &self.storage.get_unchecked(idx).record }
        })
    }

    /// Returns the record whose `key1` equals `key`, mutably.
    ///
    /// Changing either key through this reference leaves the record in the
    /// wrong buckets until [`rebuild`](Self::rebuild) runs.
    #[inline]
    pub fn get1_mut(&mut self, key: Key) -> Option<&mut T> {
        let idx = self.handle1(key)?;
        // Safety: find1 only returns occupied indices
        Some(unsafe { &mut self.storage.get_unchecked_mut(idx).record })
    }

    /// Returns the most recently added record whose `key2` equals `key`.
    #[inline]
    pub fn get_first2(&self, key: Key) -> Option<&T> {
        let idx = self.find2(key);
        if idx.is_none() {
            return None;
        }
        // Safety: find2 only returns occupied indices
        Some(unsafe { &self.storage.get_unchecked(idx).record })
    }

    /// Returns the most recently added record whose `key2` equals `key`,
    /// mutably.
    #[inline]
    pub fn get_first2_mut(&mut self, key: Key) -> Option<&mut T> {
        let idx = self.find2(key);
        if idx.is_none() {
            return None;
        }
        // Safety: find2 only returns occupied indices
        Some(unsafe { &mut self.storage.get_unchecked_mut(idx).record })
    }

    /// Iterates every record whose `key2` equals `key`, most recent first.
    ///
    /// Records that share the bucket but carry a different `key2` are
    /// skipped.
    #[inline]
    pub fn get_all2(&self, key: Key) -> Matching<'_, T, S, Idx> {
        Matching::new(&self.storage, self.secondary[self.bucket_of(key)], key)
    }

    /// Returns `true` if a record with this `key1` is present.
    #[inline]
    pub fn contains1(&self, key: Key) -> bool {
        self.find1(key).is_some()
    }

    /// Returns the handle of the record whose `key1` equals `key`.
    ///
    /// Handles stay valid until the record is removed; [`rebuild`](Self::rebuild)
    /// does not change them.
    #[inline]
    pub fn handle1(&self, key: Key) -> Option<Idx> {
        let idx = self.find1(key);
        if idx.is_none() { None } else { Some(idx) }
    }

    /// Returns the record stored under `handle`.
    #[inline]
    pub fn get(&self, handle: Idx) -> Option<&T> {
        self.storage.get(handle).map(DualNode::record)
    }

    /// Returns the record stored under `handle`, mutably.
    #[inline]
    pub fn get_mut(&mut self, handle: Idx) -> Option<&mut T> {
        self.storage.get_mut(handle).map(|node| &mut node.record)
    }

    /// Iterates the secondary chain starting at the record under `handle`,
    /// yielding it and every later record with the same `key2`.
    ///
    /// Empty if `handle` is not occupied.
    pub fn chain2_from(&self, handle: Idx) -> Matching<'_, T, S, Idx> {
        match self.storage.get(handle) {
            Some(node) => Matching::new(&self.storage, handle, node.record.key2()),
            None => Matching::new(&self.storage, Idx::NONE, 0),
        }
    }

    /// Iterates every record, bucket by bucket in ascending order and most
    /// recent first within a bucket.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T, S, Idx> {
        Iter::new(&self.storage, &self.primary, self.len())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes the record whose `key1` equals `key` and hands it back.
    ///
    /// The record is unlinked from its primary chain and from the secondary
    /// chain its current `key2` selects. If its `key2` was changed in place
    /// without a [`rebuild`](Self::rebuild), the record is not in that chain;
    /// the secondary buckets are then searched for it, a warning is logged,
    /// and the removal still completes.
    pub fn remove1(&mut self, key: Key) -> Option<T> {
        let b1 = self.bucket_of(key);

        let mut prev = Idx::NONE;
        let mut cur = self.primary[b1];
        while cur.is_some() {
            // Safety: chain links always point at occupied slots
            let node = unsafe { self.storage.get_unchecked(cur) };
            if node.record.key1() == key {
                break;
            }
            prev = cur;
            cur = node.next1;
        }
        if cur.is_none() {
            return None;
        }

        // Safety: cur is occupied
        let (next1, key2) = {
            let node = unsafe { self.storage.get_unchecked(cur) };
            (node.next1, node.record.key2())
        };
        if prev.is_none() {
            self.primary[b1] = next1;
        } else {
            // Safety: prev is occupied
            unsafe { self.storage.get_unchecked_mut(prev) }.next1 = next1;
        }

        let expected = self.bucket_of(key2);
        if !self.unlink2(expected, cur) {
            let Some(found) = (0..self.table_size()).find(|&b| self.chain2_holds(b, cur)) else {
                panic!("record with key1 {key} is missing from every secondary chain");
            };
            warn!(
                key1 = key,
                key2,
                expected,
                found,
                "key2 changed without rebuild; unlinked record from stale secondary chain"
            );
            self.unlink2(found, cur);
        }

        self.storage.remove(cur).map(|node| node.record)
    }

    /// Drops every record and empties both bucket arrays.
    pub fn remove_all(&mut self) {
        let removed = self.len();

        for bucket in 0..self.table_size() {
            let mut cur = std::mem::replace(&mut self.primary[bucket], Idx::NONE);
            while cur.is_some() {
                match self.storage.remove(cur) {
                    Some(node) => cur = node.next1,
                    None => break,
                }
            }
        }
        self.secondary.fill(Idx::NONE);

        debug!(removed, "dual-key index cleared");
    }

    /// Relinks every record under its current keys.
    ///
    /// Call this after changing keys in place through `get1_mut` and
    /// friends. Both bucket arrays are cleared first, so no record remains
    /// reachable under a key it no longer carries. Handles are unchanged.
    pub fn rebuild(&mut self) {
        let mut handles = Vec::with_capacity(self.len());
        for bucket in 0..self.table_size() {
            let mut cur = self.primary[bucket];
            while cur.is_some() {
                handles.push(cur);
                // Safety: chain links always point at occupied slots
                cur = unsafe { self.storage.get_unchecked(cur) }.next1;
            }
        }

        self.primary.fill(Idx::NONE);
        self.secondary.fill(Idx::NONE);

        for &idx in &handles {
            // Safety: idx was collected from a chain above
            let (key1, key2) = {
                let record = unsafe { &self.storage.get_unchecked(idx).record };
                (record.key1(), record.key2())
            };
            debug_assert!(
                self.find1(key1).is_none(),
                "duplicate key1 {key1} found while rebuilding dual-key index"
            );

            let b1 = self.bucket_of(key1);
            let b2 = self.bucket_of(key2);
            // Safety: idx is occupied
            let node = unsafe { self.storage.get_unchecked_mut(idx) };
            node.next1 = self.primary[b1];
            node.next2 = self.secondary[b2];
            self.primary[b1] = idx;
            self.secondary[b2] = idx;
        }

        debug!(records = handles.len(), "dual-key index rebuilt");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn find1(&self, key: Key) -> Idx {
        let mut cur = self.primary[self.bucket_of(key)];
        while cur.is_some() {
            // Safety: chain links always point at occupied slots
            let node = unsafe { self.storage.get_unchecked(cur) };
            if node.record.key1() == key {
                return cur;
            }
            cur = node.next1;
        }
        Idx::NONE
    }

    fn find2(&self, key: Key) -> Idx {
        let mut cur = self.secondary[self.bucket_of(key)];
        while cur.is_some() {
            // Safety: chain links always point at occupied slots
            let node = unsafe { self.storage.get_unchecked(cur) };
            if node.record.key2() == key {
                return cur;
            }
            cur = node.next2;
        }
        Idx::NONE
    }

    fn chain2_holds(&self, bucket: usize, target: Idx) -> bool {
        let mut cur = self.secondary[bucket];
        while cur.is_some() {
            if cur == target {
                return true;
            }
            // Safety: chain links always point at occupied slots
            cur = unsafe { self.storage.get_unchecked(cur) }.next2;
        }
        false
    }

    /// Unlinks `target` from the secondary chain of `bucket`.
    /// Returns `false` if the chain does not hold it.
    fn unlink2(&mut self, bucket: usize, target: Idx) -> bool {
        let mut prev = Idx::NONE;
        let mut cur = self.secondary[bucket];
        while cur.is_some() {
            // Safety: chain links always point at occupied slots
            let next = unsafe { self.storage.get_unchecked(cur) }.next2;
            if cur == target {
                if prev.is_none() {
                    self.secondary[bucket] = next;
                } else {
                    // Safety: prev is occupied
                    unsafe { self.storage.get_unchecked_mut(prev) }.next2 = next;
                }
                return true;
            }
            prev = cur;
            cur = next;
        }
        false
    }
}

impl<T, S, Idx> Drop for DualKeyIndex<T, S, Idx>
where
    T: DualKeyed,
    Idx: Index,
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.is_empty(),
                "dual-key index dropped with {} records; call remove_all() first",
                self.len()
            );
        }
        // storage drops whatever is left
    }
}

impl<T, S, Idx> Extend<T> for DualKeyIndex<T, S, Idx>
where
    T: DualKeyed,
    Idx: Index,
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for record in iter {
            self.add(record);
        }
    }
}

impl<'a, T, S, Idx> IntoIterator for &'a DualKeyIndex<T, S, Idx>
where
    T: DualKeyed,
    Idx: Index,
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, S, Idx>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S, Idx> fmt::Debug for DualKeyIndex<T, S, Idx>
where
    T: DualKeyed + fmt::Debug,
    Idx: Index,
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// =============================================================================
// IndexBuilder
// =============================================================================

/// Builder for [`DualKeyIndex`] and [`PooledDualKeyIndex`](crate::PooledDualKeyIndex).
///
/// # Example
///
/// ```
/// use duplex_index::{DualKeyIndex, DualKeyed, IndexBuilder, Key};
///
/// struct Pair(Key, Key);
///
/// impl DualKeyed for Pair {
///     fn key1(&self) -> Key { self.0 }
///     fn key2(&self) -> Key { self.1 }
/// }
///
/// let index: DualKeyIndex<Pair> = IndexBuilder::new().table_size(101).build()?;
/// assert_eq!(index.table_size(), 101);
///
/// let pooled = IndexBuilder::new().chunk_size(64).build_pooled::<Pair>()?;
/// assert_eq!(pooled.table_size(), duplex_index::DEFAULT_TABLE_SIZE);
/// # Ok::<(), duplex_index::IndexError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBuilder {
    pub(crate) table_size: usize,
    pub(crate) chunk_size: usize,
}

impl IndexBuilder {
    /// Creates a builder with default settings.
    pub const fn new() -> Self {
        Self {
            table_size: 0,
            chunk_size: 0,
        }
    }

    /// Sets the bucket count (`0` = [`DEFAULT_TABLE_SIZE`]).
    pub fn table_size(mut self, table_size: usize) -> Self {
        self.table_size = table_size;
        self
    }

    /// Sets the pool chunk size for pooled indices (`0` = pool default).
    ///
    /// Ignored by [`build`](Self::build).
    pub fn chunk_size(mut self, slots: usize) -> Self {
        self.chunk_size = slots;
        self
    }

    /// Builds a heap-backed index.
    pub fn build<T: DualKeyed>(self) -> Result<DualKeyIndex<T>, IndexError> {
        self.check_table_size()?;
        Ok(DualKeyIndex::with_table_size(self.table_size))
    }

    pub(crate) fn check_table_size(&self) -> Result<(), IndexError> {
        if self.table_size > MAX_TABLE_SIZE {
            return Err(IndexError::TableTooLarge(self.table_size));
        }
        Ok(())
    }
}
