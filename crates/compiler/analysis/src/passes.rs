//! # Function Passes
//!
//! A pass declares the analyses it needs through [`AnalysisUsage`]; the
//! [`PassManager`] computes exactly those before running it and hands them
//! over in a [`FunctionAnalyses`]. Functions of a module are processed one
//! at a time.

use hls_compiler_ir::{Function, Module};

use crate::analysis::{DominatorTree, LoopForest};
use crate::scev::ScalarEvolution;
use crate::target::TargetCostInfo;
use crate::{AnalysisError, Result};

/// Upstream analyses a pass can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Dominance,
    SymbolicEvolution,
    TargetCost,
    LoopStructure,
}

/// What a pass requires and what it leaves intact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisUsage {
    pub required: Vec<AnalysisKind>,
    /// The pass never adds, removes or retargets blocks
    pub preserves_cfg: bool,
}

impl AnalysisUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_required(mut self, kind: AnalysisKind) -> Self {
        if !self.required.contains(&kind) {
            self.required.push(kind);
        }
        self
    }

    pub const fn set_preserves_cfg(mut self) -> Self {
        self.preserves_cfg = true;
        self
    }

    pub fn requires(&self, kind: AnalysisKind) -> bool {
        self.required.contains(&kind)
    }
}

/// Analysis results for the function a pass is running on
///
/// Only analyses the running pass declared can be read; asking for any
/// other one is an [`AnalysisError::MissingAnalysis`].
#[derive(Debug, Clone, Default)]
pub struct FunctionAnalyses {
    declared: Vec<AnalysisKind>,
    dominance: Option<DominatorTree>,
    loop_structure: Option<LoopForest>,
    symbolic_evolution: Option<ScalarEvolution>,
    target_cost: Option<TargetCostInfo>,
}

impl FunctionAnalyses {
    /// Computes `required` (and whatever they are derived from) for `function`
    pub fn compute(function: &Function, required: &[AnalysisKind], target: &TargetCostInfo) -> Self {
        let mut analyses = Self::default();
        analyses.prepare(function, required, target);
        analyses
    }

    /// Makes `required` available, reusing results that are still cached
    fn prepare(&mut self, function: &Function, required: &[AnalysisKind], target: &TargetCostInfo) {
        self.declared = required.to_vec();

        let needs_scev = required.contains(&AnalysisKind::SymbolicEvolution);
        let needs_loops = needs_scev || required.contains(&AnalysisKind::LoopStructure);
        let needs_dom = needs_loops || required.contains(&AnalysisKind::Dominance);

        if needs_dom && self.dominance.is_none() {
            tracing::trace!("computing dominance for '{}'", function.name);
            self.dominance = Some(DominatorTree::compute(function));
        }
        if needs_loops && self.loop_structure.is_none() {
            if let Some(dom) = &self.dominance {
                tracing::trace!("computing loop structure for '{}'", function.name);
                self.loop_structure = Some(LoopForest::compute(function, dom));
            }
        }
        if needs_scev && self.symbolic_evolution.is_none() {
            if let Some(loops) = &self.loop_structure {
                tracing::trace!("computing symbolic evolution for '{}'", function.name);
                self.symbolic_evolution = Some(ScalarEvolution::compute(function, loops));
            }
        }
        if required.contains(&AnalysisKind::TargetCost) && self.target_cost.is_none() {
            self.target_cost = Some(target.clone());
        }
    }

    /// Drops results a change to `function` may have made stale
    fn invalidate(&mut self, preserves_cfg: bool) {
        self.symbolic_evolution = None;
        if !preserves_cfg {
            self.dominance = None;
            self.loop_structure = None;
        }
    }

    fn get<'a, T>(&self, kind: AnalysisKind, slot: &'a Option<T>) -> Result<&'a T> {
        if !self.declared.contains(&kind) {
            return Err(AnalysisError::MissingAnalysis(kind));
        }
        slot.as_ref().ok_or(AnalysisError::MissingAnalysis(kind))
    }

    pub fn dominance(&self) -> Result<&DominatorTree> {
        self.get(AnalysisKind::Dominance, &self.dominance)
    }

    pub fn loop_structure(&self) -> Result<&LoopForest> {
        self.get(AnalysisKind::LoopStructure, &self.loop_structure)
    }

    pub fn symbolic_evolution(&self) -> Result<&ScalarEvolution> {
        self.get(AnalysisKind::SymbolicEvolution, &self.symbolic_evolution)
    }

    pub fn target_cost(&self) -> Result<&TargetCostInfo> {
        self.get(AnalysisKind::TargetCost, &self.target_cost)
    }
}

/// A trait for function-level analysis and transformation passes
pub trait FunctionPass {
    /// Get the name of this pass for debugging
    fn name(&self) -> &'static str;

    /// Analyses that must be computed before `run`
    fn analysis_usage(&self) -> AnalysisUsage;

    /// Apply this pass to a function.
    /// Returns true if the function was modified
    fn run(&mut self, function: &mut Function, analyses: &FunctionAnalyses) -> Result<bool>;
}

/// A pass manager that runs function passes in sequence
pub struct PassManager {
    passes: Vec<Box<dyn FunctionPass>>,
    target: TargetCostInfo,
    /// Maximum number of rounds over the pass list (1 = single round)
    max_iterations: usize,
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PassManager {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            target: TargetCostInfo::default(),
            max_iterations: 1,
        }
    }

    /// Repeat the pass list until no pass reports a change, at most
    /// `max_iterations` times
    pub fn with_fixed_point(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            ..Self::new()
        }
    }

    pub fn with_target(mut self, target: TargetCostInfo) -> Self {
        self.target = target;
        self
    }

    pub fn add_pass<P: FunctionPass + 'static>(mut self, pass: P) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Run all passes on one function.
    /// Returns true if any pass modified it
    pub fn run(&mut self, function: &mut Function) -> Result<bool> {
        let span = tracing::debug_span!("function", name = %function.name);
        let _guard = span.enter();

        let mut analyses = FunctionAnalyses::default();
        let mut modified = false;

        for iteration in 0..self.max_iterations {
            let mut changed = false;

            for pass in &mut self.passes {
                let usage = pass.analysis_usage();
                analyses.prepare(function, &usage.required, &self.target);

                if pass.run(function, &analyses)? {
                    changed = true;
                    analyses.invalidate(usage.preserves_cfg);
                    tracing::debug!("pass '{}' modified function '{}'", pass.name(), function.name);
                }
            }

            modified |= changed;
            if !changed {
                break;
            }
            if iteration + 1 == self.max_iterations && self.max_iterations > 1 {
                tracing::warn!(
                    "pass pipeline did not converge on '{}' after {} iterations",
                    function.name,
                    self.max_iterations
                );
            }
        }

        Ok(modified)
    }

    /// Run all passes on every function of `module`, one function at a time
    pub fn run_module(&mut self, module: &mut Module) -> Result<bool> {
        let mut modified = false;
        for function in module.functions_mut() {
            modified |= self.run(function)?;
        }
        Ok(modified)
    }
}

#[cfg(test)]
#[path = "passes_tests.rs"]
mod tests;
