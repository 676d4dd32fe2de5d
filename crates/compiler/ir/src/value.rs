//! # IR Values
//!
//! This module defines values and operands in the IR.
//! Values represent data that flows through the program.

use crate::{ArgumentId, InstructionId, PrettyPrint};

/// Represents any value in the program: constants, arguments, instruction results.
///
/// # Design Notes
///
/// - Literals are embedded directly in the operand
/// - Only `Instruction` values have a defining instruction that can be traced
/// - The type is Copy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum Value {
    /// The result of an instruction in the same function
    Instruction(InstructionId),

    /// A compile-time constant
    Literal(Literal),

    /// An argument of the enclosing function
    Argument(ArgumentId),
}

/// Literal constant values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum Literal {
    /// Integer literal with its bit width
    Integer { value: i64, bits: u32 },

    /// The null address
    Null,
}

impl Value {
    /// Creates a new 64-bit integer literal value
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer { value, bits: 64 })
    }

    /// Creates a new integer literal value of the given width
    pub const fn integer_of_width(value: i64, bits: u32) -> Self {
        Self::Literal(Literal::Integer { value, bits })
    }

    pub const fn null() -> Self {
        Self::Literal(Literal::Null)
    }

    pub const fn instruction(id: InstructionId) -> Self {
        Self::Instruction(id)
    }

    pub const fn argument(id: ArgumentId) -> Self {
        Self::Argument(id)
    }

    /// Returns true if this is a literal value
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Returns true if this value is produced by an instruction
    pub const fn is_instruction(&self) -> bool {
        matches!(self, Self::Instruction(_))
    }

    /// Returns the defining instruction if this is an instruction result
    pub const fn as_instruction(&self) -> Option<InstructionId> {
        match self {
            Self::Instruction(id) => Some(*id),
            _ => None,
        }
    }

    /// Attempts to evaluate this value as a constant integer
    pub const fn as_const_integer(&self) -> Option<i64> {
        match self {
            Self::Literal(Literal::Integer { value, .. }) => Some(*value),
            _ => None,
        }
    }
}

impl Literal {
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer { value, .. } => Some(*value),
            Self::Null => None,
        }
    }
}

impl PrettyPrint for Value {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Instruction(id) => id.pretty_print(0),
            Self::Literal(lit) => lit.pretty_print(0),
            Self::Argument(id) => id.pretty_print(0),
        }
    }
}

impl PrettyPrint for Literal {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Integer { value, .. } => value.to_string(),
            Self::Null => "null".to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}

// Convenience conversion methods
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::integer_of_width(i64::from(value), 32)
    }
}

impl From<InstructionId> for Value {
    fn from(id: InstructionId) -> Self {
        Self::Instruction(id)
    }
}

impl From<ArgumentId> for Value {
    fn from(id: ArgumentId) -> Self {
        Self::Argument(id)
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}
