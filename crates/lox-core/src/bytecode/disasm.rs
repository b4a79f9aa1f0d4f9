//! Textual disassembly of a chunk.
//!
//! Output format, one instruction per line:
//!
//! ```text
//! == demo ==
//! 0000    1 OP_CONSTANT         0 '1.2'
//! 0002    | OP_NEGATE
//! 0003    2 OP_RETURN
//! ```
//!
//! The line column shows `|` when the byte shares its source line with the
//! previous byte. Unknown bytes are reported inline and skipped; disassembly
//! never fails on malformed input.

use core::fmt::{self, Write};

use crate::{
    bytecode::{chunk::Chunk, opcode::OpCode},
    memory::Allocator,
};

/// Print `== name ==` followed by every instruction of `chunk`.
pub fn disassemble_chunk<A: Allocator, W: Write>(chunk: &Chunk<A>, name: &str, out: &mut W) -> fmt::Result {
    writeln!(out, "== {name} ==")?;
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, out)?;
    }
    Ok(())
}

/// Print the instruction at `offset` and return the offset of the next one.
pub fn disassemble_instruction<A: Allocator, W: Write>(
    chunk: &Chunk<A>,
    offset: usize,
    out: &mut W,
) -> Result<usize, fmt::Error> {
    write!(out, "{offset:04} ")?;
    let line = chunk.line_at(offset);
    match line {
        Some(_) if offset > 0 && line == chunk.line_at(offset - 1) => out.write_str("   | ")?,
        Some(l) => write!(out, "{l:>4} ")?,
        None => out.write_str("   ? ")?,
    }

    let Some(&byte) = chunk.code().get(offset) else {
        writeln!(out, "<end of chunk>")?;
        return Ok(offset + 1);
    };

    match OpCode::try_from(byte) {
        Ok(op) => match op {
            OpCode::Constant => constant_instruction(op, chunk, offset, out),
            OpCode::Nil
            | OpCode::True
            | OpCode::False
            | OpCode::Negate
            | OpCode::Not
            | OpCode::Equal
            | OpCode::Greater
            | OpCode::Less
            | OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Return => simple_instruction(op, offset, out),
        },
        Err(unknown) => {
            log::debug!("offset {offset}: {unknown}");
            writeln!(out, "Unknown opcode {byte}")?;
            Ok(offset + 1)
        }
    }
}

/// Disassemble into a fresh `String`.
pub fn disassemble_to_string<A: Allocator>(chunk: &Chunk<A>, name: &str) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = disassemble_chunk(chunk, name, &mut out);
    out
}

/// Disassemble to standard output.
pub fn print_chunk<A: Allocator>(chunk: &Chunk<A>, name: &str) {
    print!("{}", disassemble_to_string(chunk, name));
}

fn simple_instruction<W: Write>(op: OpCode, offset: usize, out: &mut W) -> Result<usize, fmt::Error> {
    writeln!(out, "{op}")?;
    Ok(offset + 1)
}

fn constant_instruction<A: Allocator, W: Write>(
    op: OpCode,
    chunk: &Chunk<A>,
    offset: usize,
    out: &mut W,
) -> Result<usize, fmt::Error> {
    let Some(&index) = chunk.code().get(offset + 1) else {
        writeln!(out, "{op:<16} <truncated>")?;
        return Ok(offset + 2);
    };
    match chunk.constants().get(usize::from(index)) {
        Some(value) => writeln!(out, "{op:<16} {index:>4} '{value}'")?,
        None => writeln!(out, "{op:<16} {index:>4} '<invalid>'")?,
    }
    Ok(offset + 2)
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{value::Value, CoreResult};
    use pretty_assertions::assert_eq;

    fn render_one<A: Allocator>(chunk: &Chunk<A>, offset: usize) -> (String, usize) {
        let mut out = String::new();
        let next = disassemble_instruction(chunk, offset, &mut out).unwrap();
        (out, next)
    }

    #[test]
    fn constant_instruction_format() -> CoreResult<()> {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::Number(1.2))?;
        chunk.write_op(OpCode::Constant, 1)?;
        chunk.write(u8::try_from(idx).unwrap(), 1)?;

        let (text, next) = render_one(&chunk, 0);
        assert_eq!(text, "0000    1 OP_CONSTANT         0 '1.2'\n");
        assert_eq!(next, 2);
        Ok(())
    }

    #[test]
    fn simple_instructions_advance_by_one() -> CoreResult<()> {
        let mut chunk = Chunk::new();
        for op in OpCode::ALL.iter().filter(|op| op.operand_width() == 0) {
            chunk.write_op(*op, 7)?;
        }
        let mut offset = 0;
        while offset < chunk.len() {
            let (text, next) = render_one(&chunk, offset);
            assert_eq!(next, offset + 1);
            assert!(text.trim_end().ends_with(OpCode::try_from(chunk.code()[offset]).unwrap().mnemonic()));
            offset = next;
        }
        Ok(())
    }

    #[test]
    fn repeated_line_prints_marker() -> CoreResult<()> {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Nil, 3)?;
        chunk.write_op(OpCode::Not, 3)?;
        chunk.write_op(OpCode::Return, 4)?;

        assert_eq!(render_one(&chunk, 0).0, "0000    3 OP_NIL\n");
        assert_eq!(render_one(&chunk, 1).0, "0001    | OP_NOT\n");
        assert_eq!(render_one(&chunk, 2).0, "0002    4 OP_RETURN\n");
        Ok(())
    }

    #[test]
    fn unknown_opcode_is_reported_and_skipped() -> CoreResult<()> {
        let mut chunk = Chunk::new();
        for _ in 0..5 {
            chunk.write_op(OpCode::Nil, 1)?;
        }
        chunk.write_op(OpCode::Return, 2)?;
        chunk.write(0xFF, 2)?;
        chunk.write_op(OpCode::Return, 3)?;

        let (text, next) = render_one(&chunk, 6);
        assert_eq!(text, "0006    | Unknown opcode 255\n");
        assert_eq!(next, 7);

        let listing = disassemble_to_string(&chunk, "mutated");
        assert!(listing.ends_with("0007    3 OP_RETURN\n"), "{listing}");
        Ok(())
    }

    #[test]
    fn full_listing() -> CoreResult<()> {
        let mut chunk = Chunk::new();
        let a = chunk.add_constant(Value::Number(1.2))?;
        let b = chunk.add_constant(Value::Number(3.4))?;
        chunk.write_op(OpCode::Constant, 123)?;
        chunk.write(u8::try_from(a).unwrap(), 123)?;
        chunk.write_op(OpCode::Constant, 123)?;
        chunk.write(u8::try_from(b).unwrap(), 123)?;
        chunk.write_op(OpCode::Add, 123)?;
        chunk.write_op(OpCode::Negate, 124)?;
        chunk.write_op(OpCode::Return, 124)?;

        let expected = "\
== test chunk ==
0000  123 OP_CONSTANT         0 '1.2'
0002    | OP_CONSTANT         1 '3.4'
0004    | OP_ADD
0005  124 OP_NEGATE
0006    | OP_RETURN
";
        assert_eq!(disassemble_to_string(&chunk, "test chunk"), expected);
        Ok(())
    }

    #[test]
    fn malformed_constant_operands_do_not_panic() -> CoreResult<()> {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1)?;
        chunk.write(9, 1)?;
        chunk.write_op(OpCode::Constant, 2)?;

        assert_eq!(render_one(&chunk, 0), ("0000    1 OP_CONSTANT         9 '<invalid>'\n".into(), 2));
        assert_eq!(render_one(&chunk, 2), ("0002    2 OP_CONSTANT      <truncated>\n".into(), 4));
        Ok(())
    }

    #[test]
    fn empty_chunk_prints_header_only() {
        assert_eq!(disassemble_to_string(&Chunk::new(), "empty"), "== empty ==\n");
    }
}
