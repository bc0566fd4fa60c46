//! Sentinel-based index trait for zero-cost optional indices.
//!
//! Uses a reserved sentinel value (e.g., `usize::MAX`) instead of `Option<Idx>`
//! so chain links and bucket heads stay one word wide.

/// A copyable index type with a sentinel "none" value.
///
/// # Example
///
/// ```
/// use duplex_index::Index;
///
/// let idx: u32 = 5;
/// let none: u32 = u32::NONE;
///
/// assert!(idx.is_some());
/// assert!(none.is_none());
/// ```
pub trait Index: Copy + Eq + std::fmt::Debug {
    /// Sentinel value representing "no index" / end of chain.
    const NONE: Self;

    /// Returns `true` if this is the sentinel value.
    #[inline]
    fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Returns `true` if this is not the sentinel value.
    #[inline]
    fn is_some(self) -> bool {
        !self.is_none()
    }
}

macro_rules! impl_index_for_unsigned {
    ($($ty:ty),*) => {
        $(
            impl Index for $ty {
                const NONE: Self = <$ty>::MAX;
            }
        )*
    };
}

// `u32` links pool-backed tables, `usize` the slab-backed default.
impl_index_for_unsigned!(u32, usize);

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_index_sentinel {
        ($($ty:ty => $name:ident),*) => {
            $(
                #[test]
                fn $name() {
                    assert!(<$ty>::NONE.is_none());
                    assert!(!<$ty>::NONE.is_some());
                    assert!((0 as $ty).is_some());
                    assert!((<$ty>::MAX - 1).is_some());
                }
            )*
        };
    }

    test_index_sentinel!(
        u32 => u32_sentinel,
        usize => usize_sentinel
    );

    #[test]
    fn pool_slot_sentinel_matches_u32() {
        assert_eq!(duplex_pool::SlotId::NONE.index(), u32::NONE);
    }
}
