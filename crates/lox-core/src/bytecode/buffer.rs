//! Growable buffer: contiguous, owned, amortized-doubling array.
//!
//! The element count lives in the backing `Vec`; the capacity is tracked
//! separately so that it always follows the growth rule exactly
//! (`0 → 8 → 16 → 32 …`) whatever the heap hands back.

use core::{mem, slice};

use crate::{memory::Allocator, CoreError, CoreResult};

/// Capacity of the first growth from empty.
pub const MIN_CAPACITY: usize = 8;

/// Next capacity for a full buffer: at least [`MIN_CAPACITY`], then doubling.
///
/// Returns `None` if doubling overflows `usize`.
pub const fn grow_capacity(capacity: usize) -> Option<usize> {
    if capacity < MIN_CAPACITY {
        Some(MIN_CAPACITY)
    } else {
        capacity.checked_mul(2)
    }
}

/// Dynamic array whose storage is resized only through an [`Allocator`].
///
/// Invariant: `len() <= capacity()`, and the storage can hold `capacity()`
/// elements.
#[derive(Debug)]
pub struct GrowableBuffer<T> {
    storage: Vec<T>,
    capacity: usize,
}

impl<T> GrowableBuffer<T> {
    /// Empty buffer; does not allocate.
    pub const fn new() -> Self { Self { storage: Vec::new(), capacity: 0 } }

    /// Number of stored elements.
    pub fn len(&self) -> usize { self.storage.len() }

    /// Whether the buffer holds no element.
    pub fn is_empty(&self) -> bool { self.storage.is_empty() }

    /// Number of slots available before the next growth.
    pub const fn capacity(&self) -> usize { self.capacity }

    /// Element at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> { self.storage.get(index) }

    /// Stored elements as a slice.
    pub fn as_slice(&self) -> &[T] { &self.storage }

    /// Iterate over stored elements.
    pub fn iter(&self) -> slice::Iter<'_, T> { self.storage.iter() }

    /// Append `value` and return its index, growing first if full.
    pub fn push<A: Allocator>(&mut self, value: T, alloc: &mut A) -> CoreResult<usize> {
        self.reserve_one(alloc)?;
        Ok(self.push_reserved(value))
    }

    /// Make sure one more element fits, growing if the buffer is full.
    ///
    /// On error nothing changes: count, capacity and contents are intact.
    pub fn reserve_one<A: Allocator>(&mut self, alloc: &mut A) -> CoreResult<()> {
        if self.storage.len() < self.capacity {
            return Ok(());
        }

        let old_capacity = self.capacity;
        let new_capacity =
            grow_capacity(old_capacity).ok_or(CoreError::CapacityOverflow { capacity: old_capacity })?;
        let elem = mem::size_of::<T>();
        let old_size = old_capacity * elem;
        let new_size = new_capacity
            .checked_mul(elem)
            .ok_or(CoreError::CapacityOverflow { capacity: old_capacity })?;

        alloc.reallocate(&mut self.storage, old_size, new_size)?;
        self.capacity = new_capacity;
        log::trace!(
            "grow {}: capacity {old_capacity} -> {new_capacity} ({old_size} -> {new_size} bytes)",
            core::any::type_name::<T>()
        );
        Ok(())
    }

    /// Store `value` in a slot previously secured by [`reserve_one`](Self::reserve_one).
    pub(crate) fn push_reserved(&mut self, value: T) -> usize {
        debug_assert!(self.storage.len() < self.capacity, "push_reserved without a free slot");
        let index = self.storage.len();
        self.storage.push(value);
        index
    }

    /// Release the storage and reset to empty. Idempotent.
    pub fn free<A: Allocator>(&mut self, alloc: &mut A) {
        if self.capacity == 0 && self.storage.capacity() == 0 {
            return;
        }
        let old_size = self.capacity * mem::size_of::<T>();
        let released = alloc.reallocate(&mut self.storage, old_size, 0);
        debug_assert!(released.is_ok(), "releasing storage cannot fail");
        self.storage = Vec::new();
        self.capacity = 0;
        log::debug!("free {}: released {old_size} bytes", core::any::type_name::<T>());
    }
}

impl<T> Default for GrowableBuffer<T> {
    fn default() -> Self { Self::new() }
}

impl<'a, T> IntoIterator for &'a GrowableBuffer<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/* ─────────────────────────── Tests ─────────────────────────── */
