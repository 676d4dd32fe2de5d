//! # Array Access Pattern
//!
//! Finds the additions that produce array addresses inside loops and
//! classifies how those addresses evolve across iterations. An address
//! `base + i * size` whose evolution is an affine or quadratic recurrence
//! with constant start and step is a candidate for replacing the multiply
//! with a running sum.
//!
//! ```text
//! trace_memory_accesses   inttoptr roots -> AccessSet
//! classify_access         add in AccessSet, used as address -> recurrence
//! resolve_recurrence_origin  sext/zext chain -> loop phi
//! ArrayAccessPattern      work-list driver over the above
//! ```

pub mod classifier;
pub mod diagnostics;
pub mod pass;
pub mod resolver;
pub mod tracer;

pub use classifier::{classify_access, has_pointer_use, AccessClassification, Ineligibility};
pub use diagnostics::DiagnosticLog;
pub use pass::{
    AccessCandidate, AccessPatternReport, ArrayAccessPattern, CandidateHandler, PassState,
    RecordingHandler,
};
pub use resolver::resolve_recurrence_origin;
pub use tracer::{trace_from, trace_memory_accesses, AccessSet};
