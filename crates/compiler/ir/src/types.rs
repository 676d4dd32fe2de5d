//! # IR Type System
//!
//! Just enough type information to tell integers of different widths apart
//! from addresses.

use crate::PrettyPrint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrType {
    /// Integer of the given bit width
    Int(u32),

    /// An address
    Ptr,

    /// No value (stores, void calls)
    Void,
}

impl IrType {
    pub const fn i32() -> Self {
        Self::Int(32)
    }

    pub const fn i64() -> Self {
        Self::Int(64)
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_pointer(&self) -> bool {
        matches!(self, Self::Ptr)
    }

    /// Returns the bit width of an integer type
    pub const fn bit_width(&self) -> Option<u32> {
        match self {
            Self::Int(bits) => Some(*bits),
            _ => None,
        }
    }
}

impl PrettyPrint for IrType {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Int(bits) => format!("i{bits}"),
            Self::Ptr => "ptr".to_string(),
            Self::Void => "void".to_string(),
        }
    }
}

impl std::fmt::Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}
