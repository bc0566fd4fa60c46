//! Single-owner heap handles.
//!
//! [`Owned`] wraps one heap object and [`OwnedBuffer`] wraps one heap array.
//! Both are move-only: the only way to transfer ownership is to move the
//! handle, after which the compiler rejects any use of the source.
//!
//! ```compile_fail
//! use duplex_pool::Owned;
//!
//! let a = Owned::new(5u32);
//! let b = a;
//! let _ = Owned::get(&a); // error[E0382]: borrow of moved value: `a`
//! ```
//!
//! Releasing hands the allocation back to the caller as a `Box`, leaving
//! nothing behind to free twice.
//!
//! Like `Box`, [`Owned`] exposes its own operations as associated functions
//! (`Owned::release(handle)`), so method calls on a handle always reach
//! the pointee.

use std::fmt;
use std::ops::{Deref, DerefMut, Index, IndexMut};

/// Move-only owning handle for a single heap object.
///
/// Dropping the handle frees the object exactly once.
///
/// # Example
///
/// ```
/// use duplex_pool::Owned;
///
/// let a = Owned::new(String::from("ledger"));
/// let b = a; // ownership moves, `a` is gone
/// assert_eq!(Owned::get(&b), "ledger");
/// assert_eq!(b.len(), 6); // methods go through to the String
///
/// let boxed: Box<String> = Owned::release(b);
/// assert_eq!(*boxed, "ledger");
/// ```
pub struct Owned<T: ?Sized> {
    inner: Box<T>,
}

impl<T> Owned<T> {
    /// Moves `value` to the heap and takes ownership of it.
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            inner: Box::new(value),
        }
    }

    /// Consumes the handle and returns the owned value.
    #[inline]
    pub fn into_inner(this: Self) -> T {
        *this.inner
    }
}

impl<T: ?Sized> Owned<T> {
    /// Takes ownership of an existing heap allocation.
    #[inline]
    pub fn from_box(inner: Box<T>) -> Self {
        Self { inner }
    }

    /// Borrows the object without transferring ownership.
    #[inline]
    pub fn get(this: &Self) -> &T {
        &this.inner
    }

    /// Mutably borrows the object without transferring ownership.
    #[inline]
    pub fn get_mut(this: &mut Self) -> &mut T {
        &mut this.inner
    }

    /// Relinquishes ownership to the caller.
    #[inline]
    pub fn release(this: Self) -> Box<T> {
        this.inner
    }
}

impl<T: ?Sized> Deref for Owned<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> DerefMut for Owned<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: ?Sized> From<Box<T>> for Owned<T> {
    #[inline]
    fn from(inner: Box<T>) -> Self {
        Self::from_box(inner)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&&*self.inner).finish()
    }
}

/// Move-only owning handle for a fixed-length heap array.
///
/// The length is fixed at construction. Dropping the handle frees the array
/// (and drops every element) exactly once.
///
/// # Example
///
/// ```
/// use duplex_pool::OwnedBuffer;
///
/// let mut buckets = OwnedBuffer::filled(u32::MAX, 7);
/// buckets[3] = 42;
/// assert_eq!(buckets.len(), 7);
///
/// buckets.fill(u32::MAX);
/// assert!(buckets.iter().all(|&b| b == u32::MAX));
/// ```
pub struct OwnedBuffer<T> {
    inner: Box<[T]>,
}

impl<T: Clone> OwnedBuffer<T> {
    /// Allocates `len` elements, each a clone of `value`.
    pub fn filled(value: T, len: usize) -> Self {
        Self {
            inner: vec![value; len].into_boxed_slice(),
        }
    }

    /// Overwrites every element with a clone of `value`.
    #[inline]
    pub fn fill(&mut self, value: T) {
        self.inner.fill(value);
    }
}

impl<T> OwnedBuffer<T> {
    /// Takes ownership of an existing heap array.
    #[inline]
    pub fn from_boxed_slice(inner: Box<[T]>) -> Self {
        Self { inner }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the buffer has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Borrows the elements without transferring ownership.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.inner
    }

    /// Mutably borrows the elements.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.inner
    }

    /// Relinquishes ownership of the array to the caller.
    #[inline]
    pub fn release(self) -> Box<[T]> {
        self.inner
    }
}

impl<T> Deref for OwnedBuffer<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        &self.inner
    }
}

impl<T> DerefMut for OwnedBuffer<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.inner
    }
}

impl<T> Index<usize> for OwnedBuffer<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.inner[index]
    }
}

impl<T> IndexMut<usize> for OwnedBuffer<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.inner[index]
    }
}

impl<T> From<Vec<T>> for OwnedBuffer<T> {
    #[inline]
    fn from(vec: Vec<T>) -> Self {
        Self::from_boxed_slice(vec.into_boxed_slice())
    }
}

impl<T: fmt::Debug> fmt::Debug for OwnedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn move_transfers_sole_ownership() {
        let drops = Arc::new(AtomicUsize::new(0));

        let a = Owned::new(DropCounter(drops.clone()));
        let b = a;
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(b);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reassignment_frees_previous_once() {
        let drops = Arc::new(AtomicUsize::new(0));

        let mut a = Owned::new(DropCounter(drops.clone()));
        a = Owned::new(DropCounter(drops.clone()));
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        drop(a);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn release_hands_over_without_freeing() {
        let drops = Arc::new(AtomicUsize::new(0));

        let a = Owned::new(DropCounter(drops.clone()));
        let boxed = Owned::release(a);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(boxed);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_does_not_transfer() {
        let mut a = Owned::new(10u64);
        assert_eq!(*Owned::get(&a), 10);
        *Owned::get_mut(&mut a) += 1;
        assert_eq!(*a, 11);
        assert_eq!(Owned::into_inner(a), 11);
    }

    struct Ledger {
        entries: Vec<u32>,
    }

    impl Ledger {
        fn release(&mut self) -> usize {
            let n = self.entries.len();
            self.entries.clear();
            n
        }

        fn get(&self) -> Option<&u32> {
            self.entries.first()
        }
    }

    #[test]
    fn method_calls_reach_the_pointee() {
        let mut ledger = Owned::new(Ledger {
            entries: vec![4, 5],
        });

        // same names as the handle's associated functions
        assert_eq!(ledger.get(), Some(&4));
        assert_eq!(ledger.release(), 2);
        assert!(ledger.entries.is_empty());

        // the handle is still ours and still owns the value
        assert_eq!(Owned::into_inner(ledger).entries.len(), 0);
    }

    #[test]
    fn owned_unsized_from_box() {
        let a: Owned<[u8]> = Owned::from_box(vec![1, 2, 3].into_boxed_slice());
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn buffer_fill_and_index() {
        let mut buf = OwnedBuffer::filled(0u32, 5);
        buf[2] = 9;
        assert_eq!(buf.as_slice(), &[0, 0, 9, 0, 0]);

        buf.fill(7);
        assert_eq!(buf.as_slice(), &[7; 5]);
    }

    #[test]
    fn buffer_drops_each_element_once() {
        let drops = Arc::new(AtomicUsize::new(0));

        let items: Vec<_> = (0..4).map(|_| DropCounter(drops.clone())).collect();
        let a = OwnedBuffer::from(items);
        let b = a;
        drop(b);

        assert_eq!(drops.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn buffer_release() {
        let buf = OwnedBuffer::filled(1u8, 3);
        let raw = buf.release();
        assert_eq!(&*raw, &[1, 1, 1]);
    }

    #[test]
    #[should_panic]
    fn buffer_index_out_of_bounds_panics() {
        let buf = OwnedBuffer::filled(0u8, 2);
        let _ = buf[2];
    }
}
