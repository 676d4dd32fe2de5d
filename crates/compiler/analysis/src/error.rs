//! Errors raised by analyses and passes.
//!
//! An instruction that is simply not eligible for a transform is never an
//! error; only broken structural assumptions and misconfiguration are.

use hls_compiler_ir::{InstructionId, Value};

use crate::passes::AnalysisKind;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The IR does not have the shape an analysis relies on.
    /// Not recoverable for the function being analyzed.
    #[error("contract violation: {message} (at {value})")]
    ContractViolation { message: String, value: Value },

    #[error("analysis {0:?} was not declared as required by the running pass")]
    MissingAnalysis(AnalysisKind),

    #[error("instruction {0:?} does not belong to the function under analysis")]
    UnknownInstruction(InstructionId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn contract_violation(message: impl Into<String>, value: Value) -> Self {
        Self::ContractViolation {
            message: message.into(),
            value,
        }
    }

    /// Returns true for errors that mean the IR broke a structural assumption
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation { .. })
    }
}
