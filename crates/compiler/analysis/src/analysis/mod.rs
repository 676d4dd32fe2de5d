//! # CFG Analyses
//!
//! Dominance and natural-loop detection. Both are recomputed per function
//! and never cached across functions.

pub mod dominance;
pub mod loops;


pub use dominance::{compute_reverse_postorder, DominatorTree};
pub use loops::{Loop, LoopForest, LoopId};
