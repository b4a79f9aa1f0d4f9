//! Allocation primitive shared by every growable buffer.
//!
//! All growth and release of buffer storage funnels through
//! [`Allocator::reallocate`]. Sizes are expressed in bytes
//! (`capacity * size_of::<T>()`), and a `new_size` of zero is the only way
//! storage is released.
//!
//! Two strategies ship with the crate:
//! - [`SystemAllocator`]: the global heap, with refusals surfaced as
//!   [`CoreError::OutOfMemory`] instead of an abort.
//! - [`BudgetAllocator`]: same, but capped to a total number of live bytes.

use core::mem;

use crate::{CoreError, CoreResult};

/// Strategy used by buffers to resize their backing storage.
pub trait Allocator {
    /// Resize `storage` from `old_size` to `new_size` bytes.
    ///
    /// - `new_size == 0` releases the storage and leaves an empty,
    ///   non-allocating vector behind. This never fails.
    /// - Otherwise the storage can hold at least `new_size / size_of::<T>()`
    ///   elements afterwards, and the first `min(old, new)` elements are kept.
    ///
    /// On failure `storage` is left exactly as it was.
    fn reallocate<T>(&mut self, storage: &mut Vec<T>, old_size: usize, new_size: usize) -> CoreResult<()>;
}

impl<A: Allocator> Allocator for &mut A {
    fn reallocate<T>(&mut self, storage: &mut Vec<T>, old_size: usize, new_size: usize) -> CoreResult<()> {
        (**self).reallocate(storage, old_size, new_size)
    }
}

/* ─────────────────────────── System ─────────────────────────── */

/// Global heap allocator (the default for every chunk).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn reallocate<T>(&mut self, storage: &mut Vec<T>, old_size: usize, new_size: usize) -> CoreResult<()> {
        resize_storage(storage, old_size, new_size)
    }
}

/* ─────────────────────────── Budget ─────────────────────────── */

/// Allocator that refuses to keep more than `limit` bytes alive.
///
/// Live bytes are tracked from the sizes passed to `reallocate`, so the
/// accounting is exact as long as every buffer using it releases through it
/// (which [`Chunk`](crate::bytecode::chunk::Chunk) does on `free` and drop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetAllocator {
    limit: usize,
    in_use: usize,
    peak: usize,
}

impl BudgetAllocator {
    /// New allocator with a cap of `limit` live bytes.
    pub const fn new(limit: usize) -> Self { Self { limit, in_use: 0, peak: 0 } }

    /// Unbounded variant, useful to measure peak usage only.
    pub const fn unlimited() -> Self { Self::new(usize::MAX) }

    /// Configured cap.
    pub const fn limit(&self) -> usize { self.limit }

    /// Bytes currently alive.
    pub const fn in_use(&self) -> usize { self.in_use }

    /// Highest value `in_use` ever reached.
    pub const fn peak(&self) -> usize { self.peak }

    /// Bytes still available under the cap.
    pub const fn remaining(&self) -> usize { self.limit.saturating_sub(self.in_use) }
}

impl Allocator for BudgetAllocator {
    fn reallocate<T>(&mut self, storage: &mut Vec<T>, old_size: usize, new_size: usize) -> CoreResult<()> {
        let base = self.in_use.saturating_sub(old_size);
        let next = base.checked_add(new_size);
        match next {
            Some(total) if total <= self.limit => {}
            _ => {
                log::debug!(
                    "budget refused {old_size} -> {new_size} bytes ({}/{} in use)",
                    self.in_use,
                    self.limit
                );
                return Err(CoreError::BudgetExceeded {
                    requested: new_size,
                    in_use: self.in_use,
                    limit: self.limit,
                });
            }
        }

        resize_storage(storage, old_size, new_size)?;
        self.in_use = base + new_size;
        self.peak = self.peak.max(self.in_use);
        Ok(())
    }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

fn resize_storage<T>(storage: &mut Vec<T>, old_size: usize, new_size: usize) -> CoreResult<()> {
    if new_size == 0 {
        // Replacing drops the old block; `Vec::new` does not allocate.
        *storage = Vec::new();
        return Ok(());
    }

    let slots = new_size / mem::size_of::<T>().max(1);
    if slots < storage.len() {
        storage.truncate(slots);
        storage.shrink_to(slots);
        return Ok(());
    }

    let additional = slots - storage.len();
    storage
        .try_reserve_exact(additional)
        .map_err(|_| CoreError::OutOfMemory { old_size, new_size })
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_size_releases_storage() -> CoreResult<()> {
        let mut storage: Vec<u32> = vec![1, 2, 3];
        SystemAllocator.reallocate(&mut storage, 12, 0)?;
        assert!(storage.is_empty());
        assert_eq!(storage.capacity(), 0);

        // Releasing an already empty block is a no-op.
        SystemAllocator.reallocate(&mut storage, 0, 0)?;
        assert_eq!(storage.capacity(), 0);
        Ok(())
    }

    #[test]
    fn growth_preserves_prefix() -> CoreResult<()> {
        let mut storage: Vec<u16> = vec![7, 8, 9];
        SystemAllocator.reallocate(&mut storage, 6, 32)?;
        assert!(storage.capacity() >= 16);
        assert_eq!(storage, vec![7, 8, 9]);
        Ok(())
    }

    #[test]
    fn shrink_keeps_leading_elements() -> CoreResult<()> {
        let mut storage: Vec<u8> = (0..10).collect();
        SystemAllocator.reallocate(&mut storage, 10, 4)?;
        assert_eq!(storage, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn system_allocator_reports_impossible_requests() {
        let mut storage: Vec<u64> = Vec::new();
        let err = SystemAllocator.reallocate(&mut storage, 0, usize::MAX).unwrap_err();
        assert_eq!(err, CoreError::OutOfMemory { old_size: 0, new_size: usize::MAX });
        assert_eq!(storage.capacity(), 0);
    }

    #[test]
    fn budget_tracks_live_and_peak_bytes() -> CoreResult<()> {
        let mut budget = BudgetAllocator::new(64);
        let mut a: Vec<u8> = Vec::new();
        let mut b: Vec<u8> = Vec::new();

        budget.reallocate(&mut a, 0, 16)?;
        budget.reallocate(&mut b, 0, 32)?;
        assert_eq!(budget.in_use(), 48);

        budget.reallocate(&mut a, 16, 0)?;
        assert_eq!(budget.in_use(), 32);
        assert_eq!(budget.peak(), 48);
        assert_eq!(budget.remaining(), 32);
        Ok(())
    }

    #[test]
    fn budget_refusal_leaves_storage_untouched() -> CoreResult<()> {
        let mut budget = BudgetAllocator::new(16);
        let mut storage: Vec<u8> = Vec::new();
        budget.reallocate(&mut storage, 0, 8)?;
        storage.extend_from_slice(b"abc");

        let err = budget.reallocate(&mut storage, 8, 32).unwrap_err();
        assert_eq!(err, CoreError::BudgetExceeded { requested: 32, in_use: 8, limit: 16 });
        assert_eq!(storage, b"abc".to_vec());
        assert_eq!(budget.in_use(), 8);
        Ok(())
    }

    #[test]
    fn borrowed_allocator_shares_accounting() -> CoreResult<()> {
        fn reserve_with<A: Allocator>(mut alloc: A) -> CoreResult<Vec<u32>> {
            let mut storage = Vec::new();
            alloc.reallocate(&mut storage, 0, 32)?;
            Ok(storage)
        }

        let mut budget = BudgetAllocator::unlimited();
        let storage = reserve_with(&mut budget)?;
        assert!(storage.capacity() >= 8);
        assert_eq!(budget.in_use(), 32);
        Ok(())
    }
}
