//! PooledDualKeyIndex - a dual-key index whose nodes live in an object pool.

use std::fmt;

use crate::iter::{Iter, Matching};
use crate::{DualKeyIndex, DualKeyed, DualNode, IndexBuilder, IndexError, Key, PoolStorage};

type Nodes<T> = PoolStorage<DualNode<T, u32>>;

/// A [`DualKeyIndex`] backed by an [`ObjectPool`](duplex_pool::ObjectPool).
///
/// Nodes are carved from the pool in chunks and their slots are reused
/// after removal, so steady add/remove churn stops touching the system
/// allocator. Removed records are moved out of their slot (and dropped, or
/// returned by [`remove1`](Self::remove1)) before the slot goes back to the
/// pool.
///
/// Unlike the heap-backed index, dropping a non-empty pooled index is
/// fine: it removes every record and dries up its pool.
///
/// # Example
///
/// ```
/// use duplex_index::{DualKeyed, Key, PooledDualKeyIndex};
///
/// struct Quote {
///     id: Key,
///     venue: Key,
///     px: f64,
/// }
///
/// impl DualKeyed for Quote {
///     fn key1(&self) -> Key { self.id }
///     fn key2(&self) -> Key { self.venue }
/// }
///
/// let mut quotes = PooledDualKeyIndex::new()?;
/// quotes.add(Quote { id: 1, venue: 4, px: 10.5 });
/// quotes.add(Quote { id: 2, venue: 4, px: 10.25 });
///
/// assert_eq!(quotes.get_all2(4).count(), 2);
/// assert_eq!(quotes.pool_live(), 2);
///
/// quotes.remove1(1);
/// assert_eq!(quotes.pool_live(), 1);
/// # Ok::<(), duplex_index::IndexError>(())
/// ```
pub struct PooledDualKeyIndex<T: DualKeyed> {
    inner: DualKeyIndex<T, Nodes<T>, u32>,
}

impl<T: DualKeyed> PooledDualKeyIndex<T> {
    /// Creates a pooled index with the default table and chunk sizes.
    pub fn new() -> Result<Self, IndexError> {
        IndexBuilder::new().build_pooled()
    }

    /// Creates a pooled index with `table_size` buckets (`0` = default).
    pub fn with_table_size(table_size: usize) -> Result<Self, IndexError> {
        IndexBuilder::new().table_size(table_size).build_pooled()
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the index holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of buckets in each bucket array.
    #[inline]
    pub fn table_size(&self) -> usize {
        self.inner.table_size()
    }

    /// Bucket that `key` selects in this table.
    #[inline]
    pub fn bucket_of(&self, key: Key) -> usize {
        self.inner.bucket_of(key)
    }

    /// Adds a record. See [`DualKeyIndex::add`].
    #[inline]
    pub fn add(&mut self, record: T) -> u32 {
        self.inner.add(record)
    }

    /// See [`DualKeyIndex::get1`].
    #[inline]
    pub fn get1(&self, key: Key) -> Option<&T> {
        self.inner.get1(key)
    }

    /// See [`DualKeyIndex::get1_mut`].
    #[inline]
    pub fn get1_mut(&mut self, key: Key) -> Option<&mut T> {
        self.inner.get1_mut(key)
    }

    /// See [`DualKeyIndex::get_first2`].
    #[inline]
    pub fn get_first2(&self, key: Key) -> Option<&T> {
        self.inner.get_first2(key)
    }

    /// See [`DualKeyIndex::get_first2_mut`].
    #[inline]
    pub fn get_first2_mut(&mut self, key: Key) -> Option<&mut T> {
        self.inner.get_first2_mut(key)
    }

    /// See [`DualKeyIndex::get_all2`].
    #[inline]
    pub fn get_all2(&self, key: Key) -> Matching<'_, T, Nodes<T>, u32> {
        self.inner.get_all2(key)
    }

    /// See [`DualKeyIndex::contains1`].
    #[inline]
    pub fn contains1(&self, key: Key) -> bool {
        self.inner.contains1(key)
    }

    /// See [`DualKeyIndex::handle1`].
    #[inline]
    pub fn handle1(&self, key: Key) -> Option<u32> {
        self.inner.handle1(key)
    }

    /// See [`DualKeyIndex::get`].
    #[inline]
    pub fn get(&self, handle: u32) -> Option<&T> {
        self.inner.get(handle)
    }

    /// See [`DualKeyIndex::get_mut`].
    #[inline]
    pub fn get_mut(&mut self, handle: u32) -> Option<&mut T> {
        self.inner.get_mut(handle)
    }

    /// See [`DualKeyIndex::chain2_from`].
    #[inline]
    pub fn chain2_from(&self, handle: u32) -> Matching<'_, T, Nodes<T>, u32> {
        self.inner.chain2_from(handle)
    }

    /// See [`DualKeyIndex::iter`].
    #[inline]
    pub fn iter(&self) -> Iter<'_, T, Nodes<T>, u32> {
        self.inner.iter()
    }

    /// Removes a record and hands it back; its slot returns to the pool.
    #[inline]
    pub fn remove1(&mut self, key: Key) -> Option<T> {
        self.inner.remove1(key)
    }

    /// Drops every record. The pool keeps its chunks for reuse.
    #[inline]
    pub fn remove_all(&mut self) {
        self.inner.remove_all();
    }

    /// See [`DualKeyIndex::rebuild`].
    #[inline]
    pub fn rebuild(&mut self) {
        self.inner.rebuild();
    }

    /// Pool slots currently holding records.
    #[inline]
    pub fn pool_live(&self) -> usize {
        self.inner.storage().pool().live()
    }

    /// Pool slots carved so far, live or free.
    #[inline]
    pub fn pool_capacity(&self) -> usize {
        self.inner.storage().pool().capacity()
    }

    /// Chunks the pool has carved.
    #[inline]
    pub fn pool_chunks(&self) -> usize {
        self.inner.storage().pool().chunk_count()
    }
}

impl<T: DualKeyed> Drop for PooledDualKeyIndex<T> {
    fn drop(&mut self) {
        self.inner.remove_all();
        self.inner.storage_mut().dry_up();
    }
}

impl<T: DualKeyed> Extend<T> for PooledDualKeyIndex<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<'a, T: DualKeyed> IntoIterator for &'a PooledDualKeyIndex<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, Nodes<T>, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: DualKeyed + fmt::Debug> fmt::Debug for PooledDualKeyIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl IndexBuilder {
    /// Builds a pool-backed index.
    pub fn build_pooled<T: DualKeyed>(self) -> Result<PooledDualKeyIndex<T>, IndexError> {
        self.check_table_size()?;
        let storage = PoolStorage::with_chunk_size(self.chunk_size)?;
        Ok(PooledDualKeyIndex {
            inner: DualKeyIndex::with_storage(storage, self.table_size),
        })
    }
}
