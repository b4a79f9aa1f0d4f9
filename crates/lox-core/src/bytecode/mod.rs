//! Bytecode primitives: growable buffers, the chunk, the opcode table and
//! the tools that read a chunk back (disassembler, decoder) or build one from
//! text (assembler).

/// Amortized-doubling buffer backing every chunk array.
pub mod buffer;
/// Chunk (instruction stream + line map + constant pool).
pub mod chunk;
/// One-byte instruction tags and their operand widths.
pub mod opcode;
/// Human readable disassembly.
pub mod disasm;
/// Structured, serializable instruction view.
pub mod decode;
/// Minimal text assembler.
pub mod asm;

pub use buffer::GrowableBuffer;
pub use chunk::{Chunk, ConstPool, LineRuns};
pub use decode::{Instruction, Instructions};
pub use opcode::OpCode;
