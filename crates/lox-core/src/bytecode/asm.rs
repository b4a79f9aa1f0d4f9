//! Small text assembler, used by tooling and tests to build chunks without a
//! compiler.
//!
//! ```text
//! ; a comment
//! CONSTANT 1.2          ; adds 1.2 to the pool and emits CONSTANT <idx>
//! 3: NEGATE             ; `N:` forces the source line of this statement
//! 3: OP_RETURN
//! ```
//!
//! Other forms:
//! - `CONSTANT #<n>` emits an explicit pool index.
//! - `.const <literal>` adds a constant without emitting anything.
//! - `.byte <n>` / `.byte 0xNN` emits a raw byte (handy for unknown opcodes).
//!
//! Literals are `nil`, `true`, `false` or a number. Without an `N:` prefix the
//! source line is the line number in the assembly text.

use thiserror::Error;

use crate::{
    bytecode::{chunk::Chunk, opcode::OpCode},
    memory::{Allocator, SystemAllocator},
    value::Value,
    CoreError,
};

/// Assembly failure, tagged with the offending text line (1-based).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {kind}")]
pub struct AsmError {
    /// Line in the assembly text.
    pub line: usize,
    /// What went wrong.
    pub kind: AsmErrorKind,
}

/// Reasons an assembly line is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AsmErrorKind {
    /// Not a known mnemonic or directive.
    #[error("unknown instruction `{0}`")]
    UnknownInstruction(String),
    /// Operand expected but absent.
    #[error("`{0}` expects an operand")]
    MissingOperand(&'static str),
    /// Operand given to an instruction that takes none.
    #[error("`{mnemonic}` takes no operand, found `{found}`")]
    UnexpectedOperand {
        /// Instruction or directive name.
        mnemonic: &'static str,
        /// Extra text.
        found: String,
    },
    /// Literal that is neither nil, a boolean nor a number.
    #[error("invalid literal `{0}`")]
    InvalidLiteral(String),
    /// `.byte` / `#index` value outside `0..=255`.
    #[error("invalid byte `{0}`")]
    InvalidByte(String),
    /// More than one operand on a statement.
    #[error("unexpected trailing input `{0}`")]
    TrailingInput(String),
    /// `N:` prefix that is not a line number.
    #[error("invalid line marker `{0}`")]
    InvalidLineMarker(String),
    /// Pool index that does not fit the one-byte `CONSTANT` operand.
    #[error("constant index {0} does not fit in a one-byte operand")]
    ConstantOverflow(usize),
    /// Growth failure while writing the chunk.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Assemble `source` into a chunk backed by the system allocator.
pub fn assemble(source: &str) -> Result<Chunk, AsmError> { assemble_with(source, SystemAllocator) }

/// Assemble `source` into a chunk backed by `alloc`.
pub fn assemble_with<A: Allocator>(source: &str, alloc: A) -> Result<Chunk<A>, AsmError> {
    let mut chunk = Chunk::with_allocator(alloc);

    for (idx, raw_line) in source.lines().enumerate() {
        let text_line = idx + 1;
        let body = raw_line.split(';').next().unwrap_or_default().trim();
        if body.is_empty() {
            continue;
        }
        assemble_statement(&mut chunk, body, text_line)
            .map_err(|kind| AsmError { line: text_line, kind })?;
    }

    log::debug!(
        "assembled {} bytes, {} constants",
        chunk.len(),
        chunk.constants().len()
    );
    Ok(chunk)
}

fn assemble_statement<A: Allocator>(chunk: &mut Chunk<A>, body: &str, text_line: usize) -> Result<(), AsmErrorKind> {
    let (line, stmt) = split_line_marker(body, text_line)?;

    let mut words = stmt.split_whitespace();
    let head = words.next().unwrap_or_default();
    let operand = words.next();
    if let Some(extra) = words.next() {
        return Err(AsmErrorKind::TrailingInput(extra.to_owned()));
    }

    match head {
        ".const" => {
            let literal = operand.ok_or(AsmErrorKind::MissingOperand(".const"))?;
            chunk.add_constant(parse_literal(literal)?)?;
        }
        ".byte" => {
            let raw = operand.ok_or(AsmErrorKind::MissingOperand(".byte"))?;
            chunk.write(parse_byte(raw)?, line)?;
        }
        _ => {
            let op: OpCode = head
                .parse()
                .map_err(|_| AsmErrorKind::UnknownInstruction(head.to_owned()))?;
            match (op, operand) {
                (OpCode::Constant, None) => return Err(AsmErrorKind::MissingOperand(op.mnemonic())),
                (OpCode::Constant, Some(arg)) => {
                    let index = match arg.strip_prefix('#') {
                        Some(explicit) => parse_byte(explicit)?,
                        None => {
                            let idx = chunk.add_constant(parse_literal(arg)?)?;
                            u8::try_from(idx).map_err(|_| AsmErrorKind::ConstantOverflow(idx))?
                        }
                    };
                    chunk.write_op(op, line)?;
                    chunk.write(index, line)?;
                }
                (_, Some(found)) => {
                    return Err(AsmErrorKind::UnexpectedOperand {
                        mnemonic: op.mnemonic(),
                        found: found.to_owned(),
                    })
                }
                (_, None) => chunk.write_op(op, line)?,
            }
        }
    }
    Ok(())
}

/// Split an optional `N:` prefix off a statement.
fn split_line_marker(body: &str, text_line: usize) -> Result<(u32, &str), AsmErrorKind> {
    if let Some((marker, rest)) = body.split_once(':') {
        let marker = marker.trim();
        let line = marker
            .parse::<u32>()
            .map_err(|_| AsmErrorKind::InvalidLineMarker(marker.to_owned()))?;
        return Ok((line, rest.trim()));
    }
    let line = u32::try_from(text_line).map_err(|_| AsmErrorKind::InvalidLineMarker(text_line.to_string()))?;
    Ok((line, body))
}

fn parse_literal(text: &str) -> Result<Value, AsmErrorKind> {
    match text {
        "nil" => Ok(Value::Nil),
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => text
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| AsmErrorKind::InvalidLiteral(text.to_owned())),
    }
}

fn parse_byte(text: &str) -> Result<u8, AsmErrorKind> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => text.parse::<u8>(),
    };
    parsed.map_err(|_| AsmErrorKind::InvalidByte(text.to_owned()))
}
