//! # IR Terminators
//!
//! This module defines terminators, which end basic blocks and transfer control flow.
//! Every basic block must end with exactly one terminator.

use crate::{BasicBlockId, InstructionId, PrettyPrint, Value};

/// A terminator ends a basic block and transfers control
///
/// Terminators are not instructions: they have no identity in the
/// instruction arena and never appear in a use list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump: `br target`
    Jump { target: BasicBlockId },

    /// Conditional branch: `br condition, then_target, else_target`
    Branch {
        condition: Value,
        then_target: BasicBlockId,
        else_target: BasicBlockId,
    },

    /// Function return: `ret value?`
    Return { value: Option<Value> },

    /// Placeholder until the real terminator is set
    Unreachable,
}

impl Terminator {
    pub const fn jump(target: BasicBlockId) -> Self {
        Self::Jump { target }
    }

    pub const fn branch(
        condition: Value,
        then_target: BasicBlockId,
        else_target: BasicBlockId,
    ) -> Self {
        Self::Branch {
            condition,
            then_target,
            else_target,
        }
    }

    pub const fn return_value(value: Value) -> Self {
        Self::Return { value: Some(value) }
    }

    pub const fn return_void() -> Self {
        Self::Return { value: None }
    }

    /// Returns all basic block targets of this terminator
    pub fn target_blocks(&self) -> Vec<BasicBlockId> {
        match self {
            Self::Jump { target } => vec![*target],
            Self::Branch {
                then_target,
                else_target,
                ..
            } => {
                if then_target == else_target {
                    vec![*then_target]
                } else {
                    vec![*then_target, *else_target]
                }
            }
            Self::Return { .. } | Self::Unreachable => vec![],
        }
    }

    /// Returns the instructions whose results this terminator reads
    pub fn used_instructions(&self) -> Vec<InstructionId> {
        match self {
            Self::Branch { condition, .. } => condition.as_instruction().into_iter().collect(),
            Self::Return { value: Some(value) } => value.as_instruction().into_iter().collect(),
            Self::Return { value: None } | Self::Jump { .. } | Self::Unreachable => vec![],
        }
    }
}

impl PrettyPrint for Terminator {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Jump { target } => format!("br {}", target.pretty_print(0)),
            Self::Branch {
                condition,
                then_target,
                else_target,
            } => format!(
                "br {}, {}, {}",
                condition.pretty_print(0),
                then_target.pretty_print(0),
                else_target.pretty_print(0)
            ),
            Self::Return { value: Some(value) } => format!("ret {}", value.pretty_print(0)),
            Self::Return { value: None } => "ret void".to_string(),
            Self::Unreachable => "unreachable".to_string(),
        }
    }
}
