//! Fixed-width keys and the string-to-key hash.
//!
//! Every record in a [`DualKeyIndex`](crate::DualKeyIndex) is addressed by
//! two [`Key`]s. Numeric identifiers are used as-is; string identifiers are
//! folded into a `Key` by [`string_to_key`]. The fold is deterministic for
//! equal inputs but makes no collision-free promise, so distinct strings
//! can share a key.

use std::mem;

/// Fixed-width signed key.
pub type Key = i64;

/// Accumulator seed for [`string_to_key`] (the 100,000th prime).
const SEED: Key = 1_299_827;

/// Bytes per key; string bytes are folded in at `offset % WORD` positions.
const WORD: usize = mem::size_of::<Key>();

/// Folds the bytes of `s` into a [`Key`].
///
/// Each byte is shifted to a byte lane chosen by its offset modulo the key
/// width and added (wrapping) to an accumulator seeded with a fixed prime.
///
/// ```
/// use duplex_index::string_to_key;
///
/// assert_eq!(string_to_key("AAPL"), string_to_key("AAPL"));
/// assert_ne!(string_to_key("AAPL"), string_to_key("MSFT"));
/// ```
pub fn string_to_key(s: &str) -> Key {
    s.bytes().enumerate().fold(SEED, |hash, (i, b)| {
        hash.wrapping_add(Key::from(b) << (8 * (i % WORD)))
    })
}

/// Bucket for `key` in a table of `table_size` buckets.
///
/// The key is reinterpreted as unsigned before the modulo, so negative keys
/// land in range too.
///
/// # Panics
///
/// Panics if `table_size` is zero.
#[inline]
pub fn bucket_of(key: Key, table_size: usize) -> usize {
    (key as u64 % table_size as u64) as usize
}

/// Types that identify a record and can be turned into a [`Key`].
///
/// Integers convert directly; strings go through [`string_to_key`].
///
/// ```
/// use duplex_index::{KeySource, string_to_key};
///
/// assert_eq!(42u32.to_key(), 42);
/// assert_eq!("IBM".to_key(), string_to_key("IBM"));
/// assert_eq!(String::from("IBM").to_key(), "IBM".to_key());
/// ```
pub trait KeySource {
    /// Derives the key for this identifier.
    fn to_key(&self) -> Key;
}

macro_rules! impl_key_source_for_int {
    ($($ty:ty),*) => {
        $(
            impl KeySource for $ty {
                #[inline]
                fn to_key(&self) -> Key {
                    *self as Key
                }
            }
        )*
    };
}

impl_key_source_for_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl KeySource for str {
    #[inline]
    fn to_key(&self) -> Key {
        string_to_key(self)
    }
}

impl KeySource for String {
    #[inline]
    fn to_key(&self) -> Key {
        string_to_key(self)
    }
}

impl<K: KeySource + ?Sized> KeySource for &K {
    #[inline]
    fn to_key(&self) -> Key {
        (**self).to_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_seed() {
        assert_eq!(string_to_key(""), SEED);
    }

    #[test]
    fn single_byte_adds_in_lowest_lane() {
        assert_eq!(string_to_key("a"), SEED + 97);
    }

    #[test]
    fn bytes_land_in_successive_lanes() {
        let expected = SEED + 0x41 + (0x42 << 8) + (0x43 << 16);
        assert_eq!(string_to_key("ABC"), expected);
    }

    #[test]
    fn lanes_wrap_after_word() {
        // byte 8 shares lane 0 with byte 0
        let s = "A0000000B";
        let lanes: Key = s
            .bytes()
            .take(WORD)
            .enumerate()
            .map(|(i, b)| Key::from(b) << (8 * i))
            .fold(0, Key::wrapping_add);
        assert_eq!(string_to_key(s), SEED.wrapping_add(lanes).wrapping_add(0x42));
    }

    #[test]
    fn order_matters() {
        assert_ne!(string_to_key("ab"), string_to_key("ba"));
    }

    #[test]
    fn deterministic() {
        let a = String::from("some-long-identifier-with-many-bytes");
        assert_eq!(string_to_key(&a), string_to_key(&a.clone()));
    }

    #[test]
    fn high_bytes_do_not_panic() {
        let s = "\u{00ff}\u{00ff}\u{00ff}\u{00ff}\u{00ff}\u{00ff}\u{00ff}\u{00ff}";
        let _ = string_to_key(s);
    }

    #[test]
    fn bucket_in_range_for_negative_keys() {
        for key in [-1, -5003, Key::MIN, Key::MAX, 0, 5003] {
            assert!(bucket_of(key, 5003) < 5003);
        }
        assert_eq!(bucket_of(5004, 5003), 1);
    }

    #[test]
    fn key_source_ints_are_identity() {
        assert_eq!((-7i32).to_key(), -7);
        assert_eq!(7usize.to_key(), 7);
        assert_eq!((&&9u16).to_key(), 9);
    }
}
