//! duplex-index - a fixed-size hash table indexed by two keys at once.
//!
//! Records implement [`DualKeyed`]: a unique primary key and a secondary
//! key that many records may share. A [`DualKeyIndex`] keeps two bucket
//! arrays over one set of records, so a record can be found by either key
//! without being stored twice.
//!
//! ```text
//! DualKeyIndex<T, S>
//!   ├── primary buckets   ──next1──> chains by key1
//!   ├── secondary buckets ──next2──> chains by key2
//!   └── S: Storage        ── owns DualNode { record, next1, next2 }
//! ```
//!
//! # Storage backends
//!
//! | Type | Storage | Handle |
//! |------|---------|--------|
//! | [`DualKeyIndex<T>`] | `slab::Slab` (heap) | `usize` |
//! | [`PooledDualKeyIndex<T>`] | [`PoolStorage`] over an [`ObjectPool`](duplex_pool::ObjectPool) | `u32` |
//!
//! # Keys
//!
//! Keys are fixed-width integers ([`Key`]). String identifiers are folded
//! into keys by [`string_to_key`]; any [`KeySource`] can produce one.
//!
//! # Example
//!
//! ```
//! use duplex_index::{DualKeyIndex, DualKeyed, Key, KeySource};
//!
//! #[derive(Debug)]
//! struct Position {
//!     id: Key,
//!     symbol: &'static str,
//!     qty: i64,
//! }
//!
//! impl DualKeyed for Position {
//!     fn key1(&self) -> Key { self.id }
//!     fn key2(&self) -> Key { self.symbol.to_key() }
//! }
//!
//! let mut book: DualKeyIndex<Position> = DualKeyIndex::new();
//! book.add(Position { id: 1, symbol: "IBM", qty: 100 });
//! book.add(Position { id: 2, symbol: "IBM", qty: -40 });
//! book.add(Position { id: 3, symbol: "MSFT", qty: 10 });
//!
//! let net: i64 = book.get_all2("IBM".to_key()).map(|p| p.qty).sum();
//! assert_eq!(net, 60);
//!
//! book.remove_all();
//! ```
//!
//! # Usage errors
//!
//! Adding a duplicate `key1`, or dropping a heap-backed index that still
//! holds records, panics in debug builds. Lookups that find nothing return
//! `None`.

#![warn(missing_docs)]

mod index;
mod iter;
mod key;
mod pooled;
mod record;
mod storage;
mod table;

pub use duplex_pool::PoolError;
pub use index::Index;
pub use iter::{Iter, Matching};
pub use key::{Key, KeySource, bucket_of, string_to_key};
pub use pooled::PooledDualKeyIndex;
pub use record::{DualKeyed, DualNode};
pub use storage::{HeapStorage, PoolStorage, Storage};
pub use table::{DEFAULT_TABLE_SIZE, DualKeyIndex, IndexBuilder, MAX_TABLE_SIZE};

/// Error during index construction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Requested bucket count exceeds [`MAX_TABLE_SIZE`].
    #[error("table size {0} exceeds the maximum of {MAX_TABLE_SIZE}")]
    TableTooLarge(usize),
    /// The node pool could not be configured.
    #[error("node pool: {0}")]
    Pool(#[from] PoolError),
}
