//! # HLS Intermediate Representation
//!
//! This crate defines the program representation consumed by the HLS analysis
//! passes. It is a small, LLVM-shaped SSA form: functions are ordered lists of
//! basic blocks, basic blocks are ordered lists of instructions, and every
//! instruction has a fixed-arity operand list and a set of users.
//!
//! ## Architecture
//!
//! ```text
//! Module
//! functions: IndexVec<FunctionId, Function>
//!
//! Function
//! instructions: IndexVec<InstructionId, Instruction>   (arena, identity = id)
//! basic_blocks: IndexVec<BasicBlockId, BasicBlock>
//! users: InstructionId -> [InstructionId]              (recorded use order)
//!
//! BasicBlock
//! instructions: Vec<InstructionId>
//! terminator: Terminator
//! ```
//!
//! Analyses only ever hold `InstructionId`s; instructions are never copied out
//! of the arena.

pub use basic_block::BasicBlock;
pub use builder::FunctionBuilder;
pub use function::Function;
pub use instruction::{BinaryOp, CastOp, CompareOp, Instruction, InstructionKind, Opcode};
pub use module::Module;
pub use terminator::Terminator;
pub use types::IrType;
pub use value::{Literal, Value};

pub mod basic_block;
pub mod builder;
pub mod function;
pub mod instruction;
pub mod module;
pub mod terminator;
pub mod types;
pub mod value;

// --- Core Identifiers ---

index_vec::define_index_type! {
    /// Unique identifier for a function within a module
    pub struct FunctionId = usize;
}

index_vec::define_index_type! {
    /// Unique identifier for a basic block within a function
    pub struct BasicBlockId = usize;
}

index_vec::define_index_type! {
    /// Unique identifier for an instruction within a function
    pub struct InstructionId = usize;
}

index_vec::define_index_type! {
    /// Position of a function argument
    pub struct ArgumentId = usize;
}

// --- Pretty Printing Support ---

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self, indent: usize) -> String;
}

/// Helper function to create indentation
pub(crate) fn indent_str(level: usize) -> String {
    "  ".repeat(level)
}

impl PrettyPrint for InstructionId {
    fn pretty_print(&self, _indent: usize) -> String {
        format!("%{}", self.index())
    }
}

impl PrettyPrint for BasicBlockId {
    fn pretty_print(&self, _indent: usize) -> String {
        format!("%bb{}", self.index())
    }
}

impl PrettyPrint for ArgumentId {
    fn pretty_print(&self, _indent: usize) -> String {
        format!("%arg{}", self.index())
    }
}
