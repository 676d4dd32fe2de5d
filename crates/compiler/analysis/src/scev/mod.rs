//! # Symbolic Evolution
//!
//! Describes how integer values change across loop iterations. The
//! [`SymbolicEvolution`] trait is the query interface passes consume;
//! [`ScalarEvolution`] is the implementation computed by the pass manager.

pub mod analysis;
pub mod expr;

#[cfg(test)]
mod tests;

pub use analysis::ScalarEvolution;
pub use expr::{RecurrenceDegree, RecurrenceDescriptor, ScevExpr};

use hls_compiler_ir::InstructionId;

/// Closed-form queries over the instructions of one function
pub trait SymbolicEvolution {
    /// The symbolic value of `id`, or `None` if it produces no value
    fn evolution_of(&self, id: InstructionId) -> Option<&ScevExpr>;

    /// The recurrence `id` follows, if its value is an add-recurrence
    fn recurrence_of(&self, id: InstructionId) -> Option<RecurrenceDescriptor> {
        self.evolution_of(id)
            .and_then(ScevExpr::as_recurrence)
            .cloned()
    }
}
