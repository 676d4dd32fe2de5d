//! The array access pattern pass.
//!
//! Traces the address computations of a function once, then runs a
//! work-list over its access-related additions, classifying each one and
//! handing candidates to a [`CandidateHandler`].

use std::collections::VecDeque;

use hls_compiler_ir::{Function, InstructionId, Opcode, Value};
use rustc_hash::{FxHashMap, FxHashSet};

use super::classifier::{classify_access, AccessClassification};
use super::resolver::resolve_recurrence_origin;
use super::tracer::{trace_memory_accesses, AccessSet};
use super::DiagnosticLog;
use crate::passes::{AnalysisKind, AnalysisUsage, FunctionAnalyses, FunctionPass};
use crate::scev::{RecurrenceDegree, RecurrenceDescriptor, SymbolicEvolution};
use crate::{AccessPatternConfig, Result};

/// An address addition whose recurrence has constant start and step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCandidate {
    pub instruction: InstructionId,
    pub degree: RecurrenceDegree,
    pub descriptor: RecurrenceDescriptor,
    /// The loop phi the recurrence of the address is driven by
    pub origin: Option<InstructionId>,
    /// Cycles per iteration a running sum would save over the multiply
    pub estimated_gain: i64,
}

impl AccessCandidate {
    /// The loop phi feeding the multiplicative operand of the addition
    ///
    /// Only products with an operand evolving in the loop of the recurrence
    /// are followed; invariant products are skipped. `Ok(None)` if no such
    /// product leads back to a phi.
    pub fn resolve_origin(
        &self,
        function: &Function,
        oracle: &dyn SymbolicEvolution,
    ) -> Result<Option<InstructionId>> {
        let Some(addition) = function.get_instruction(self.instruction) else {
            return Ok(None);
        };
        let header = self.descriptor.loop_header;

        for operand in addition.operands() {
            let Some((_, product)) = function.defining_instruction(operand) else {
                continue;
            };
            if !matches!(product.opcode(), Opcode::Mul | Opcode::Shl) {
                continue;
            }
            let factors = product.operands();
            let varying = factors
                .iter()
                .filter_map(Value::as_instruction)
                .filter(|&id| {
                    oracle
                        .recurrence_of(id)
                        .is_some_and(|rec| rec.loop_header == header)
                });
            for variable in varying {
                if let Some(phi) = resolve_recurrence_origin(function, variable.into())? {
                    return Ok(Some(phi));
                }
            }
        }
        Ok(None)
    }
}

/// What to do with a candidate
///
/// This is where a multiply-to-add rewrite plugs in. A handler returns
/// true if it changed the function.
pub trait CandidateHandler {
    fn handle(&mut self, function: &mut Function, candidate: &AccessCandidate) -> Result<bool>;
}

/// Records each candidate and the loop phi it originates from; never acts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingHandler {
    pub seen: Vec<(InstructionId, Option<InstructionId>)>,
}

impl CandidateHandler for RecordingHandler {
    fn handle(&mut self, _function: &mut Function, candidate: &AccessCandidate) -> Result<bool> {
        self.seen.push((candidate.instruction, candidate.origin));
        Ok(false)
    }
}

/// Result of analyzing one function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPatternReport {
    pub function: String,
    pub accesses: AccessSet,
    /// Final classification of every addition taken off the work-list, in
    /// block order
    pub classifications: Vec<(InstructionId, AccessClassification)>,
    pub candidates: Vec<AccessCandidate>,
    pub worklist_steps: usize,
    pub hit_step_limit: bool,
    pub changed: bool,
}

impl AccessPatternReport {
    pub fn classification_of(&self, id: InstructionId) -> Option<&AccessClassification> {
        self.classifications
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, classification)| classification)
    }

    pub fn is_candidate(&self, id: InstructionId) -> bool {
        self.candidates.iter().any(|c| c.instruction == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    NotRun,
    Running,
    Done,
}

pub struct ArrayAccessPattern<H = RecordingHandler> {
    config: AccessPatternConfig,
    handler: H,
    state: PassState,
    reports: Vec<AccessPatternReport>,
    diagnostics: DiagnosticLog,
}

impl ArrayAccessPattern<RecordingHandler> {
    pub fn new(config: AccessPatternConfig) -> Self {
        Self::with_handler(config, RecordingHandler::default())
    }
}

impl Default for ArrayAccessPattern<RecordingHandler> {
    fn default() -> Self {
        Self::new(AccessPatternConfig::default())
    }
}

impl<H: CandidateHandler> ArrayAccessPattern<H> {
    pub fn with_handler(config: AccessPatternConfig, handler: H) -> Self {
        let diagnostics = DiagnosticLog::new(config.record_diagnostics);
        Self {
            config,
            handler,
            state: PassState::NotRun,
            reports: Vec::new(),
            diagnostics,
        }
    }

    pub const fn state(&self) -> PassState {
        self.state
    }

    pub const fn handler(&self) -> &H {
        &self.handler
    }

    /// Report for the most recently analyzed function
    pub fn report(&self) -> Option<&AccessPatternReport> {
        self.reports.last()
    }

    /// Reports of every analyzed function, in run order
    pub fn reports(&self) -> &[AccessPatternReport] {
        &self.reports
    }

    pub const fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    fn analyze(
        &mut self,
        function: &mut Function,
        analyses: &FunctionAnalyses,
    ) -> Result<AccessPatternReport> {
        // Declared prerequisites, even those classification does not read
        analyses.dominance()?;
        analyses.loop_structure()?;
        let oracle = analyses.symbolic_evolution()?;
        let estimated_gain = analyses
            .target_cost()?
            .overridden(&self.config.latency_overrides)?
            .strength_reduction_gain();

        let accesses = trace_memory_accesses(function, &self.config, &mut self.diagnostics);

        let mut queue: VecDeque<InstructionId> = function
            .instructions_in_order()
            .map(|(_, id)| id)
            .filter(|&id| accesses.contains(id) && function.instruction(id).is_add())
            .collect();
        let mut queued: FxHashSet<InstructionId> = queue.iter().copied().collect();

        let mut latest: FxHashMap<InstructionId, AccessClassification> = FxHashMap::default();
        let mut candidates = Vec::new();
        let mut steps = 0;
        let mut hit_step_limit = false;
        let mut changed = false;

        while let Some(id) = queue.pop_front() {
            if steps == self.config.max_worklist_steps {
                tracing::warn!(
                    target: "access_pattern",
                    "work-list limit of {} steps reached in '{}', {} instructions left",
                    self.config.max_worklist_steps,
                    function.name,
                    queue.len() + 1
                );
                hit_step_limit = true;
                break;
            }
            steps += 1;
            queued.remove(&id);

            let classification = classify_access(
                function,
                id,
                &accesses,
                oracle,
                self.config.pointer_use_policy,
                &mut self.diagnostics,
            )?;

            if let AccessClassification::Recurrence {
                degree,
                descriptor,
                candidate: true,
            } = &classification
            {
                let mut candidate = AccessCandidate {
                    instruction: id,
                    degree: *degree,
                    descriptor: descriptor.clone(),
                    origin: None,
                    estimated_gain,
                };
                candidate.origin = candidate.resolve_origin(function, oracle)?;
                self.diagnostics.push(format!(
                    "[{}] --> {degree} candidate, estimated gain {estimated_gain} cycles per iteration",
                    function.display_instruction(id)
                ));

                if self.handler.handle(function, &candidate)? {
                    changed = true;
                    for &user in function.users(id) {
                        let related = accesses.contains(user)
                            && function.get_instruction(user).is_some_and(|i| i.is_add());
                        if related && queued.insert(user) {
                            queue.push_back(user);
                        }
                    }
                }
                candidates.push(candidate);
            }

            latest.insert(id, classification);
        }

        let classifications = function
            .instructions_in_order()
            .filter_map(|(_, id)| latest.remove(&id).map(|c| (id, c)))
            .collect();

        Ok(AccessPatternReport {
            function: function.name.clone(),
            accesses,
            classifications,
            candidates,
            worklist_steps: steps,
            hit_step_limit,
            changed,
        })
    }
}

impl<H: CandidateHandler> FunctionPass for ArrayAccessPattern<H> {
    fn name(&self) -> &'static str {
        "array_access_pattern"
    }

    fn analysis_usage(&self) -> AnalysisUsage {
        AnalysisUsage::new()
            .add_required(AnalysisKind::Dominance)
            .add_required(AnalysisKind::SymbolicEvolution)
            .add_required(AnalysisKind::TargetCost)
            .add_required(AnalysisKind::LoopStructure)
            .set_preserves_cfg()
    }

    fn run(&mut self, function: &mut Function, analyses: &FunctionAnalyses) -> Result<bool> {
        let span = tracing::debug_span!("array_access_pattern", function = %function.name);
        let _guard = span.enter();

        self.state = PassState::Running;
        let result = self.analyze(function, analyses);
        self.state = PassState::Done;

        let report = result?;
        let changed = report.changed;
        tracing::debug!(
            target: "access_pattern",
            "'{}': {} access-related, {} candidates, {} steps",
            report.function,
            report.accesses.len(),
            report.candidates.len(),
            report.worklist_steps
        );
        self.reports.push(report);
        Ok(changed)
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
