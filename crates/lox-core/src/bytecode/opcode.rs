//! Instruction set.
//!
//! Every instruction is a one-byte tag, optionally followed by fixed-width
//! operand bytes. The table below is the single source of truth for the
//! byte values and operand widths shared by the disassembler, the decoder,
//! the assembler and the execution loop.

use core::{fmt, str::FromStr};

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One-byte instruction tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum OpCode {
    /// Push `constants[operand]`. One operand byte.
    Constant = 0,
    /// Push `nil`.
    Nil = 1,
    /// Push `true`.
    True = 2,
    /// Push `false`.
    False = 3,
    /// Arithmetic negation of the top of stack.
    Negate = 4,
    /// Logical not of the top of stack.
    Not = 5,
    /// `a == b`.
    Equal = 6,
    /// `a > b`.
    Greater = 7,
    /// `a < b`.
    Less = 8,
    /// `a + b`.
    Add = 9,
    /// `a - b`.
    Subtract = 10,
    /// `a * b`.
    Multiply = 11,
    /// `a / b`.
    Divide = 12,
    /// Return from the current chunk.
    Return = 13,
}

impl OpCode {
    /// Every opcode, in byte order.
    pub const ALL: [OpCode; 14] = [
        OpCode::Constant,
        OpCode::Nil,
        OpCode::True,
        OpCode::False,
        OpCode::Negate,
        OpCode::Not,
        OpCode::Equal,
        OpCode::Greater,
        OpCode::Less,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Return,
    ];

    /// Name printed by the disassembler.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Nil => "OP_NIL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Not => "OP_NOT",
            OpCode::Equal => "OP_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::Less => "OP_LESS",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Return => "OP_RETURN",
        }
    }

    /// Number of operand bytes following the tag.
    pub const fn operand_width(self) -> usize {
        match self {
            OpCode::Constant => 1,
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
            | OpCode::Return => 0,
        }
    }

    /// Total encoded size (tag + operands).
    pub const fn encoded_len(self) -> usize { 1 + self.operand_width() }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self { op as u8 }
}

/// Byte that does not name any opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown opcode {0}")]
pub struct UnknownOpCode(pub u8);

impl TryFrom<u8> for OpCode {
    type Error = UnknownOpCode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL.get(usize::from(byte)).copied().ok_or(UnknownOpCode(byte))
    }
}

/// Mnemonic that does not name any opcode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mnemonic `{0}`")]
pub struct UnknownMnemonic(pub String);

impl FromStr for OpCode {
    type Err = UnknownMnemonic;

    /// Accepts `OP_ADD`, `ADD`, `add`, …
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("OP_").unwrap_or(&upper);
        OpCode::ALL
            .iter()
            .copied()
            .find(|op| &op.mnemonic()[3..] == bare)
            .ok_or_else(|| UnknownMnemonic(s.to_owned()))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` keeps width/alignment flags working (`{:<16}`).
        f.pad(self.mnemonic())
    }
}
