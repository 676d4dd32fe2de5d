//! # HLS Analyses
//!
//! Function-level analyses over the HLS IR and the passes built on them.
//!
//! ## Architecture
//!
//! ```text
//! PassManager
//!   computes the analyses each FunctionPass declares, then runs it
//!
//! FunctionAnalyses
//!   dominance:          DominatorTree
//!   loop_structure:     LoopForest
//!   symbolic_evolution: ScalarEvolution  (recurrence oracle)
//!   target_cost:        TargetCostInfo
//!
//! ArrayAccessPattern (FunctionPass)
//!   tracer      IntToPtr roots -> AccessSet
//!   classifier  add + AccessSet + oracle -> AccessClassification
//!   resolver    sext/zext chain -> loop phi
//! ```
//!
//! The access pattern pass only detects and classifies address recurrences;
//! acting on a candidate is delegated to a [`CandidateHandler`].

pub mod access_pattern;
pub mod analysis;
pub mod config;
pub mod error;
pub mod passes;
pub mod scev;
pub mod target;

pub use access_pattern::{
    classify_access, resolve_recurrence_origin, trace_memory_accesses, AccessCandidate,
    AccessClassification, AccessPatternReport, AccessSet, ArrayAccessPattern, CandidateHandler,
    DiagnosticLog, Ineligibility, RecordingHandler,
};
pub use analysis::{DominatorTree, Loop, LoopForest, LoopId};
pub use config::{AccessPatternConfig, PointerUsePolicy};
pub use error::{AnalysisError, Result};
pub use passes::{AnalysisKind, AnalysisUsage, FunctionAnalyses, FunctionPass, PassManager};
pub use scev::{
    RecurrenceDegree, RecurrenceDescriptor, ScalarEvolution, ScevExpr, SymbolicEvolution,
};
pub use target::TargetCostInfo;
