//! The dual-key record capability and the slot that carries its links.

use crate::{Index, Key};

/// A record addressable by two keys.
///
/// `key1` must be unique among the records in one index at a time;
/// `key2` may be shared by any number of records. Both must be
/// deterministic: the index relies on them returning the same value until
/// the record is removed or [`rebuild`](crate::DualKeyIndex::rebuild) runs.
///
/// # Example
///
/// ```
/// use duplex_index::{DualKeyed, Key, string_to_key};
///
/// struct Order {
///     id: u64,
///     symbol: String,
///     qty: u32,
/// }
///
/// impl DualKeyed for Order {
///     fn key1(&self) -> Key { self.id as Key }
///     fn key2(&self) -> Key { string_to_key(&self.symbol) }
/// }
/// ```
pub trait DualKeyed {
    /// Primary (unique) key.
    fn key1(&self) -> Key;

    /// Secondary (shared) key.
    fn key2(&self) -> Key;

    /// Returns `true` if both keys equal `other`'s.
    #[inline]
    fn same_keys(&self, other: &Self) -> bool {
        self.key1() == other.key1() && self.key2() == other.key2()
    }
}

/// A bare `(key1, key2)` pair.
impl DualKeyed for (Key, Key) {
    #[inline]
    fn key1(&self) -> Key {
        self.0
    }

    #[inline]
    fn key2(&self) -> Key {
        self.1
    }
}

/// A record plus its two chain links, as stored in an index's storage.
///
/// `next1` threads the primary bucket chain and `next2` the secondary one.
/// Both are storage indices, `Idx::NONE` at the end of a chain.
#[derive(Debug)]
pub struct DualNode<T, Idx: Index = usize> {
    pub(crate) record: T,
    pub(crate) next1: Idx,
    pub(crate) next2: Idx,
}

impl<T, Idx: Index> DualNode<T, Idx> {
    /// Creates an unlinked node.
    #[inline]
    pub(crate) fn new(record: T) -> Self {
        Self {
            record,
            next1: Idx::NONE,
            next2: Idx::NONE,
        }
    }

    /// The stored record.
    #[inline]
    pub fn record(&self) -> &T {
        &self.record
    }
}
