//! # IR Basic Block
//!
//! A basic block is a straight-line sequence of instructions with exactly one
//! entry point and one exit point.

use crate::{InstructionId, Terminator};

/// A basic block in the Control Flow Graph
///
/// The block only stores instruction ids in execution order; the instructions
/// themselves live in the owning function's arena.
///
/// # Invariants
///
/// - Phi instructions come before every other instruction
/// - Every basic block ends with exactly one terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Optional name for debugging
    pub name: Option<String>,

    /// The instructions of this block, in order
    pub instructions: Vec<InstructionId>,

    /// The terminator that ends this block and transfers control
    pub terminator: Terminator,
}

impl BasicBlock {
    /// Creates a new empty basic block with an unreachable terminator
    pub const fn new() -> Self {
        Self {
            name: None,
            instructions: Vec::new(),
            terminator: Terminator::Unreachable,
        }
    }

    pub const fn with_name(name: String) -> Self {
        Self {
            name: Some(name),
            instructions: Vec::new(),
            terminator: Terminator::Unreachable,
        }
    }

    pub fn set_terminator(&mut self, terminator: Terminator) {
        self.terminator = terminator;
    }

    /// Returns true if this block has a meaningful terminator
    pub const fn is_terminated(&self) -> bool {
        !matches!(self.terminator, Terminator::Unreachable)
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the successor blocks of this block
    pub fn successors(&self) -> Vec<crate::BasicBlockId> {
        self.terminator.target_blocks()
    }
}

impl Default for BasicBlock {
    fn default() -> Self {
        Self::new()
    }
}
