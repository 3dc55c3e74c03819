//! Paged sparse-set storage for a single component type.
//!
//! A [`SparseSet`] maps a dense 32-bit index to a value through two layers:
//!
//! - a *sparse* table, split into lazily allocated fixed-size pages, mapping
//!   `index -> dense slot` (or [`ABSENT`]);
//! - parallel *dense* arrays holding the packed indices and values.
//!
//! Inserts append to the dense arrays; erases swap the last element into
//! the vacated slot and truncate. Both are O(1), at the cost of not
//! preserving iteration order across erases. Pages bound sparse memory to
//! the regions of the index space actually touched, so a set holding a few
//! values at large indices stays small.
//!
//! References returned by [`SparseSet::get`] and friends are invalidated by
//! the next mutating call on the same set (the dense arrays may reallocate
//! or swap-compact); the borrow checker enforces this.

use std::any::Any;

/// Sentinel stored in the sparse table when an index has no value.
pub const ABSENT: u32 = u32::MAX;

const PAGE_BITS: u32 = 11;
/// Number of sparse slots per lazily allocated page.
pub const PAGE_SIZE: usize = 1 << PAGE_BITS;
const PAGE_MASK: u32 = (PAGE_SIZE as u32) - 1;

/// A sparse set of values keyed by dense 32-bit indices.
pub struct SparseSet<T> {
    /// `pages[p][o]` is the dense slot for index `(p << PAGE_BITS) | o`.
    pages: Vec<Option<Box<[u32; PAGE_SIZE]>>>,
    /// Packed indices; `dense[sparse[i]] == i` for every present `i`.
    dense: Vec<u32>,
    /// Packed values, parallel to `dense`.
    values: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SparseSet<T> {
    /// Create an empty set. No pages are allocated until first insert.
    pub fn new() -> SparseSet<T> {
        SparseSet {
            pages: Vec::new(),
            dense: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns true if the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// The packed slice of present indices, in current physical order.
    pub fn indices(&self) -> &[u32] {
        &self.dense
    }

    /// Read the sparse slot for `index` without allocating pages.
    fn slot(&self, index: u32) -> Option<usize> {
        let page = (index >> PAGE_BITS) as usize;
        let entry = self.pages.get(page)?.as_ref()?[(index & PAGE_MASK) as usize];
        if entry == ABSENT {
            None
        } else {
            Some(entry as usize)
        }
    }

    /// Mutable access to the sparse slot for `index`, allocating (and
    /// `ABSENT`-filling) its page on first touch.
    fn slot_mut(&mut self, index: u32) -> &mut u32 {
        let page = (index >> PAGE_BITS) as usize;
        if page >= self.pages.len() {
            self.pages.resize_with(page + 1, || None);
        }
        let page = self.pages[page].get_or_insert_with(|| Box::new([ABSENT; PAGE_SIZE]));
        &mut page[(index & PAGE_MASK) as usize]
    }

    /// Check whether `index` has a value. O(1).
    pub fn contains(&self, index: u32) -> bool {
        // The back-pointer check keeps a stale sparse entry from reading as
        // present.
        match self.slot(index) {
            Some(slot) => self.dense.get(slot).copied() == Some(index),
            None => false,
        }
    }

    /// Insert or overwrite the value for `index`, returning a reference to
    /// the stored value. O(1) amortized.
    pub fn insert(&mut self, index: u32, value: T) -> &mut T {
        assert!(index != ABSENT, "index u32::MAX is reserved as sentinel");

        if let Some(slot) = self.slot(index) {
            if self.dense[slot] == index {
                self.values[slot] = value;
                return &mut self.values[slot];
            }
        }

        let slot = self.dense.len() as u32;
        *self.slot_mut(index) = slot;
        self.dense.push(index);
        self.values.push(value);
        self.values.last_mut().unwrap()
    }

    /// Access the value for `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not present; check [`contains`](Self::contains)
    /// first. A missing value here is a caller bug, not a runtime condition.
    pub fn get(&self, index: u32) -> &T {
        assert!(self.contains(index), "no value stored for index {}", index);
        &self.values[self.slot(index).unwrap()]
    }

    /// Mutable access to the value for `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not present; check [`contains`](Self::contains)
    /// first.
    pub fn get_mut(&mut self, index: u32) -> &mut T {
        assert!(self.contains(index), "no value stored for index {}", index);
        let slot = self.slot(index).unwrap();
        &mut self.values[slot]
    }

    /// Non-panicking lookup, used where absence is an expected condition.
    pub(crate) fn try_get_mut(&mut self, index: u32) -> Option<&mut T> {
        if !self.contains(index) {
            return None;
        }
        let slot = self.slot(index).unwrap();
        Some(&mut self.values[slot])
    }

    /// Erase the value for `index`, if any. O(1).
    ///
    /// The last dense element is swapped into the vacated slot, so the
    /// physical order of the remaining values changes.
    pub fn erase(&mut self, index: u32) {
        let slot = match self.slot(index) {
            Some(slot) if self.dense.get(slot).copied() == Some(index) => slot,
            _ => return,
        };

        self.dense.swap_remove(slot);
        self.values.swap_remove(slot);

        // The former tail now lives in `slot`; repoint its sparse entry.
        if slot < self.dense.len() {
            let moved = self.dense[slot];
            *self.slot_mut(moved) = slot as u32;
        }
        *self.slot_mut(index) = ABSENT;
    }

    /// Visit every `(index, value)` pair in current physical order.
    ///
    /// Values may be mutated during the visit. Inserting into or erasing
    /// from this set while iterating is impossible (the set is exclusively
    /// borrowed for the duration of the call).
    pub fn for_each(&mut self, mut f: impl FnMut(u32, &mut T)) {
        for (index, value) in self.dense.iter().copied().zip(self.values.iter_mut()) {
            f(index, value);
        }
    }

    /// Iterate over `(index, &value)` pairs in current physical order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.dense.iter().copied().zip(self.values.iter())
    }
}

/// Type-erased face of a [`SparseSet`], keyed by
/// [`ComponentTypeID`](crate::ComponentTypeID) in the world's store registry.
/// Concrete access is recovered with a checked downcast.
#[doc(hidden)]
pub trait AnyStore {
    fn erase(&mut self, index: u32);
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AnyStore for SparseSet<T> {
    fn erase(&mut self, index: u32) {
        SparseSet::erase(self, index);
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
