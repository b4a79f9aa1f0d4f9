//! Structured view of the instruction stream.
//!
//! Same walk as the disassembler, but yields data instead of text so that
//! tooling can filter, count or serialize instructions.

use crate::{
    bytecode::{chunk::Chunk, opcode::OpCode},
    memory::Allocator,
    value::Value,
};

#[cfg(feature = "serde")]
use serde::Serialize;

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Instruction {
    /// Offset of the tag byte.
    pub offset: usize,
    /// Source line of the tag byte.
    pub line: u32,
    /// Raw tag byte.
    pub raw: u8,
    /// Decoded tag, `None` for unknown bytes.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub opcode: Option<OpCode>,
    /// Operand byte (only for opcodes with an operand, when present).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub operand: Option<u8>,
    /// Constant referenced by a `CONSTANT` operand, when the index is valid.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub constant: Option<Value>,
    /// Offset of the following instruction.
    pub next: usize,
}

impl Instruction {
    /// Mnemonic, or `"UNKNOWN"` for unrecognized bytes.
    pub fn mnemonic(&self) -> &'static str { self.opcode.map_or("UNKNOWN", OpCode::mnemonic) }

    /// Whether the tag byte is not a known opcode.
    pub const fn is_unknown(&self) -> bool { self.opcode.is_none() }
}

/// Decode the instruction starting at `offset`; `None` past the end.
pub fn decode_at<A: Allocator>(chunk: &Chunk<A>, offset: usize) -> Option<Instruction> {
    let raw = *chunk.code().get(offset)?;
    let line = chunk.line_at(offset).unwrap_or_default();

    let Ok(op) = OpCode::try_from(raw) else {
        log::warn!("offset {offset}: unknown opcode {raw}");
        return Some(Instruction {
            offset,
            line,
            raw,
            opcode: None,
            operand: None,
            constant: None,
            next: offset + 1,
        });
    };

    let operand = match op.operand_width() {
        0 => None,
        _ => chunk.code().get(offset + 1).copied(),
    };
    let constant = match op {
        OpCode::Constant => operand.and_then(|ix| chunk.constants().get(usize::from(ix)).copied()),
        _ => None,
    };

    Some(Instruction {
        offset,
        line,
        raw,
        opcode: Some(op),
        operand,
        constant,
        next: offset + op.encoded_len(),
    })
}

/// Iterator over every instruction of a chunk.
pub struct Instructions<'a, A: Allocator> {
    chunk: &'a Chunk<A>,
    offset: usize,
}

impl<A: Allocator> Iterator for Instructions<'_, A> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Self::Item> {
        let ins = decode_at(self.chunk, self.offset)?;
        self.offset = ins.next;
        Some(ins)
    }
}

impl<A: Allocator> Chunk<A> {
    /// Walk the instruction stream from offset 0.
    pub const fn instructions(&self) -> Instructions<'_, A> { Instructions { chunk: self, offset: 0 } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreResult;
    use pretty_assertions::assert_eq;

    #[test]
    fn walks_with_operand_widths() -> CoreResult<()> {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::Bool(false))?;
        chunk.write_op(OpCode::Constant, 1)?;
        chunk.write(u8::try_from(idx).unwrap(), 1)?;
        chunk.write(200, 2)?;
        chunk.write_op(OpCode::Return, 3)?;

        let all: Vec<_> = chunk.instructions().collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].opcode, Some(OpCode::Constant));
        assert_eq!(all[0].constant, Some(Value::Bool(false)));
        assert_eq!(all[0].next, 2);
        assert!(all[1].is_unknown());
        assert_eq!((all[1].raw, all[1].next), (200, 3));
        assert_eq!(all[2].mnemonic(), "OP_RETURN");
        assert_eq!(all[2].line, 3);
        Ok(())
    }

    #[test]
    fn past_the_end_is_none() {
        assert_eq!(decode_at(&Chunk::new(), 0), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_without_empty_fields() -> CoreResult<()> {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Nil, 5)?;
        let ins = decode_at(&chunk, 0).unwrap();
        let json = serde_json::to_value(&ins).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "offset": 0, "line": 5, "raw": 1, "opcode": "Nil", "next": 1 })
        );
        Ok(())
    }
}
