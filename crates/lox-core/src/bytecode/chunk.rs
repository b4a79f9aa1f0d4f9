//! Chunk: instruction bytes, a parallel line map and a constant pool.
//!
//! A chunk only grows. `code` and `lines` always have the same length once a
//! call returns, including when the call fails.

use core::{fmt, iter::Enumerate, ops::Range, slice};

use crate::{
    bytecode::{buffer::GrowableBuffer, opcode::OpCode},
    memory::{Allocator, SystemAllocator},
    value::Value,
    CoreResult,
};

/* ─────────────────────────── Constant pool ─────────────────────────── */

/// Append-only constant pool with stable 0-based indices.
///
/// No deduplication: equal values added twice get two indices.
#[derive(Debug, Default)]
pub struct ConstPool {
    values: GrowableBuffer<Value>,
}

impl ConstPool {
    /// Create an empty pool.
    pub const fn new() -> Self { Self { values: GrowableBuffer::new() } }

    /// Number of stored constants.
    pub fn len(&self) -> usize { self.values.len() }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Slots available before the next growth.
    pub const fn capacity(&self) -> usize { self.values.capacity() }

    /// Lookup a constant by index.
    pub fn get(&self, idx: usize) -> Option<&Value> { self.values.get(idx) }

    /// Stored constants as a slice.
    pub fn as_slice(&self) -> &[Value] { self.values.as_slice() }

    /// Iterate as `(index, &Value)`.
    pub fn iter(&self) -> ConstIter<'_> { ConstIter { inner: self.values.iter().enumerate() } }

    /// Push a value and return its index.
    pub fn add<A: Allocator>(&mut self, value: Value, alloc: &mut A) -> CoreResult<usize> {
        self.values.push(value, alloc)
    }

    fn free<A: Allocator>(&mut self, alloc: &mut A) { self.values.free(alloc); }
}

/// Iterator returned by [`ConstPool::iter`].
pub struct ConstIter<'a> {
    inner: Enumerate<slice::Iter<'a, Value>>,
}

impl<'a> Iterator for ConstIter<'a> {
    type Item = (usize, &'a Value);

    fn next(&mut self) -> Option<Self::Item> { self.inner.next() }
}

impl<'a> IntoIterator for &'a ConstPool {
    type Item = (usize, &'a Value);
    type IntoIter = ConstIter<'a>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/* ─────────────────────────── Line runs ─────────────────────────── */

/// Iterator yielding contiguous line ranges `(start..end, line)`.
pub struct LineRuns<'a> {
    lines: &'a [u32],
    index: usize,
}

impl Iterator for LineRuns<'_> {
    type Item = (Range<usize>, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.index;
        let line = *self.lines.get(start)?;
        self.index += 1;
        while self.lines.get(self.index) == Some(&line) {
            self.index += 1;
        }
        Some((start..self.index, line))
    }
}

/* ─────────────────────────── Chunk ─────────────────────────── */

/// Unit of compiled output: bytecode, source lines and constants.
///
/// Every buffer grows through the chunk's allocator `A`. Dropping the chunk
/// releases through it too, so a [`BudgetAllocator`](crate::memory::BudgetAllocator)
/// borrowed as `&mut` sees its accounting return to zero.
pub struct Chunk<A: Allocator = SystemAllocator> {
    code: GrowableBuffer<u8>,
    lines: GrowableBuffer<u32>,
    constants: ConstPool,
    alloc: A,
}

impl Chunk {
    /// Empty chunk backed by the system allocator.
    pub const fn new() -> Self { Self::with_allocator(SystemAllocator) }
}

impl Default for Chunk {
    fn default() -> Self { Self::new() }
}

impl<A: Allocator> Chunk<A> {
    /// Empty chunk backed by `alloc`. Nothing is allocated until the first write.
    pub const fn with_allocator(alloc: A) -> Self {
        Self {
            code: GrowableBuffer::new(),
            lines: GrowableBuffer::new(),
            constants: ConstPool::new(),
            alloc,
        }
    }

    /// Append one instruction byte and the source line that produced it.
    ///
    /// Both buffers get their slot before either is written, so a growth
    /// failure leaves the chunk exactly as it was.
    pub fn write(&mut self, byte: u8, line: u32) -> CoreResult<()> {
        self.code.reserve_one(&mut self.alloc)?;
        self.lines.reserve_one(&mut self.alloc)?;
        self.code.push_reserved(byte);
        self.lines.push_reserved(line);
        Ok(())
    }

    /// Append an opcode tag.
    pub fn write_op(&mut self, op: OpCode, line: u32) -> CoreResult<()> { self.write(op.into(), line) }

    /// Append a constant and return its pool index.
    ///
    /// `CONSTANT` encodes the index in one byte; indices above 255 are the
    /// producer's problem.
    pub fn add_constant(&mut self, value: Value) -> CoreResult<usize> {
        self.constants.add(value, &mut self.alloc)
    }

    /// Release all three buffers. The chunk stays usable.
    pub fn free(&mut self) {
        self.code.free(&mut self.alloc);
        self.lines.free(&mut self.alloc);
        self.constants.free(&mut self.alloc);
    }

    /// Instruction stream.
    pub fn code(&self) -> &[u8] { self.code.as_slice() }

    /// Source line of every instruction byte.
    pub fn lines(&self) -> &[u32] { self.lines.as_slice() }

    /// Constant pool.
    pub const fn constants(&self) -> &ConstPool { &self.constants }

    /// Backing buffer of the instruction stream (capacity inspection).
    pub const fn code_buffer(&self) -> &GrowableBuffer<u8> { &self.code }

    /// Backing buffer of the line map.
    pub const fn lines_buffer(&self) -> &GrowableBuffer<u32> { &self.lines }

    /// Number of instruction bytes.
    pub fn len(&self) -> usize { self.code.len() }

    /// Whether no byte was written yet.
    pub fn is_empty(&self) -> bool { self.code.is_empty() }

    /// Source line of the byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> { self.lines.get(offset).copied() }

    /// Contiguous runs of bytes sharing a source line.
    pub fn line_runs(&self) -> LineRuns<'_> { LineRuns { lines: self.lines.as_slice(), index: 0 } }

    /// Allocator backing this chunk.
    pub const fn allocator(&self) -> &A { &self.alloc }
}

impl<A: Allocator> Drop for Chunk<A> {
    fn drop(&mut self) { self.free(); }
}

impl<A: Allocator> fmt::Debug for Chunk<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("code", &self.code.as_slice())
            .field("lines", &self.lines.as_slice())
            .field("constants", &self.constants.as_slice())
            .finish_non_exhaustive()
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
