//! Borrowing iterators over a [`DualKeyIndex`](crate::DualKeyIndex).
//!
//! Both hold a shared borrow of the index, so the index cannot be changed
//! while one is alive.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::{DualKeyed, DualNode, Index, Key, Storage};

// =============================================================================
// Matching
// =============================================================================

/// Records along one secondary chain whose `key2` equals a captured key.
///
/// Created by [`get_all2`](crate::DualKeyIndex::get_all2) and
/// [`chain2_from`](crate::DualKeyIndex::chain2_from). Records that share
/// the bucket under a different `key2` are skipped.
pub struct Matching<'a, T, S, Idx: Index> {
    storage: &'a S,
    cursor: Idx,
    key: Key,
    _marker: PhantomData<T>,
}

impl<'a, T, S, Idx: Index> Matching<'a, T, S, Idx> {
    #[inline]
    pub(crate) fn new(storage: &'a S, head: Idx, key: Key) -> Self {
        Self {
            storage,
            cursor: head,
            key,
            _marker: PhantomData,
        }
    }

    /// The `key2` this iterator matches.
    #[inline]
    pub fn key(&self) -> Key {
        self.key
    }
}

impl<'a, T: 'a, S, Idx: Index + 'a> Iterator for Matching<'a, T, S, Idx>
where
    T: DualKeyed,
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor.is_some() {
            // Safety: chain links always point at occupied slots
            let node = unsafe { self.storage.get_unchecked(self.cursor) };
            self.cursor = node.next2;
            if node.record.key2() == self.key {
                return Some(&node.record);
            }
        }
        None
    }
}

impl<'a, T: 'a, S, Idx: Index + 'a> FusedIterator for Matching<'a, T, S, Idx>
where
    T: DualKeyed,
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
}

impl<T, S, Idx: Index> Clone for Matching<'_, T, S, Idx> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage,
            cursor: self.cursor,
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T, S, Idx: Index> std::fmt::Debug for Matching<'_, T, S, Idx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matching")
            .field("key", &self.key)
            .field("cursor", &self.cursor)
            .finish()
    }
}

// =============================================================================
// Iter
// =============================================================================

/// Every record in the index, following the primary chains.
///
/// Buckets are visited in ascending order; within a bucket the most
/// recently added record comes first. Created by
/// [`iter`](crate::DualKeyIndex::iter).
pub struct Iter<'a, T, S, Idx: Index> {
    storage: &'a S,
    buckets: &'a [Idx],
    bucket: usize,
    cursor: Idx,
    remaining: usize,
    _marker: PhantomData<T>,
}

impl<'a, T, S, Idx: Index> Iter<'a, T, S, Idx> {
    #[inline]
    pub(crate) fn new(storage: &'a S, buckets: &'a [Idx], len: usize) -> Self {
        Self {
            storage,
            buckets,
            bucket: 0,
            cursor: buckets.first().copied().unwrap_or(Idx::NONE),
            remaining: len,
            _marker: PhantomData,
        }
    }
}

impl<'a, T: 'a, S, Idx: Index + 'a> Iterator for Iter<'a, T, S, Idx>
where
    S: Storage<DualNode<T, Idx>, Index = Idx>,
{
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        while self.cursor.is_none() {
            self.bucket += 1;
            self.cursor = *self.buckets.get(self.bucket)?;
        }

        // Safety: chain links always point at occupied slots
        let node = unsafe { self.storage.get_unchecked(self.cursor) };
        self.cursor = node.next1;
        self.remaining -= 1;

        Some(&node.record)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: 'a, S, Idx: Index + 'a> ExactSizeIterator for Iter<'a, T, S, Idx> where
    S: Storage<DualNode<T, Idx>, Index = Idx>
{
}

impl<'a, T: 'a, S, Idx: Index + 'a> FusedIterator for Iter<'a, T, S, Idx> where
    S: Storage<DualNode<T, Idx>, Index = Idx>
{
}

impl<T, S, Idx: Index> std::fmt::Debug for Iter<'_, T, S, Idx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iter")
            .field("bucket", &self.bucket)
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{DualKeyIndex, DualKeyed, Key};

    #[derive(Debug)]
    struct Pair(Key, Key);

    impl DualKeyed for Pair {
        fn key1(&self) -> Key {
            self.0
        }
        fn key2(&self) -> Key {
            self.1
        }
    }

    #[test]
    fn matching_on_empty_bucket() {
        let idx: DualKeyIndex<Pair> = DualKeyIndex::with_table_size(3);
        let mut m = idx.get_all2(1);
        assert_eq!(m.key(), 1);
        assert!(m.next().is_none());
        assert!(m.next().is_none());
    }

    #[test]
    fn matching_nth_advances() {
        let mut idx: DualKeyIndex<Pair> = DualKeyIndex::with_table_size(3);
        idx.extend((0..6).map(|i| Pair(i, 0)));

        let mut m = idx.get_all2(0);
        assert_eq!(m.nth(2).map(|p| p.0), Some(3));
        assert_eq!(m.next().map(|p| p.0), Some(2));
        assert!(m.nth(5).is_none());
        assert!(m.next().is_none());

        idx.remove_all();
    }

    #[test]
    fn matching_clone_restarts_independently() {
        let mut idx: DualKeyIndex<Pair> = DualKeyIndex::with_table_size(3);
        idx.extend((0..3).map(|i| Pair(i, 1)));

        let mut a = idx.get_all2(1);
        a.next();
        let b = a.clone();
        assert_eq!(a.count(), 2);
        assert_eq!(b.count(), 2);

        idx.remove_all();
    }

    #[test]
    fn iter_skips_trailing_empty_buckets() {
        let mut idx: DualKeyIndex<Pair> = DualKeyIndex::with_table_size(100);
        idx.add(Pair(0, 0));

        let mut it = idx.iter();
        assert_eq!(it.len(), 1);
        assert_eq!(it.next().map(|p| p.0), Some(0));
        assert_eq!(it.len(), 0);
        assert!(it.next().is_none());

        idx.remove_all();
    }

    #[test]
    fn iter_reaches_last_bucket() {
        let mut idx: DualKeyIndex<Pair> = DualKeyIndex::with_table_size(10);
        idx.add(Pair(9, 0));
        idx.add(Pair(19, 0));

        let keys: Vec<_> = idx.iter().map(|p| p.0).collect();
        assert_eq!(keys, vec![19, 9]);

        idx.remove_all();
    }

    #[test]
    fn iter_single_bucket_table() {
        let mut idx: DualKeyIndex<Pair> = DualKeyIndex::with_table_size(1);
        idx.extend((0..4).map(|i| Pair(i, i)));
        assert_eq!(idx.iter().map(|p| p.0).collect::<Vec<_>>(), vec![3, 2, 1, 0]);
        idx.remove_all();
    }
}
