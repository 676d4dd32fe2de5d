//! Classification of address additions by their symbolic evolution.

use hls_compiler_ir::{Function, InstructionId};

use super::{AccessSet, DiagnosticLog};
use crate::scev::{RecurrenceDegree, RecurrenceDescriptor, SymbolicEvolution};
use crate::{AnalysisError, PointerUsePolicy, Result};

/// Why an instruction is not considered for strength reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    NotAnAddition,
    NotAccessRelated,
    /// The result is never (or, under `first_use`, not first) turned into an address
    NoPointerUse,
    /// The oracle has no add-recurrence for the value
    NotARecurrence,
    UnsupportedDegree(RecurrenceDegree),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessClassification {
    NotEligible(Ineligibility),
    Recurrence {
        /// `Affine` or `Quadratic`
        degree: RecurrenceDegree,
        descriptor: RecurrenceDescriptor,
        /// Start and step are compile-time integers
        candidate: bool,
    },
}

impl AccessClassification {
    pub const fn is_candidate(&self) -> bool {
        matches!(self, Self::Recurrence { candidate: true, .. })
    }

    pub const fn descriptor(&self) -> Option<&RecurrenceDescriptor> {
        match self {
            Self::Recurrence { descriptor, .. } => Some(descriptor),
            Self::NotEligible(_) => None,
        }
    }

    pub const fn ineligibility(&self) -> Option<Ineligibility> {
        match self {
            Self::NotEligible(reason) => Some(*reason),
            Self::Recurrence { .. } => None,
        }
    }
}

/// Decides whether `id` is an address recurrence worth strength-reducing
///
/// Checks, in order: `id` is an addition, is access-related, and its result
/// is turned into an address. Only then is the oracle consulted. Never
/// modifies `function`.
pub fn classify_access(
    function: &Function,
    id: InstructionId,
    accesses: &AccessSet,
    oracle: &dyn SymbolicEvolution,
    policy: PointerUsePolicy,
    log: &mut DiagnosticLog,
) -> Result<AccessClassification> {
    let instruction = function
        .get_instruction(id)
        .ok_or(AnalysisError::UnknownInstruction(id))?;

    if !instruction.is_add() {
        return Ok(AccessClassification::NotEligible(Ineligibility::NotAnAddition));
    }
    if !accesses.contains(id) {
        return Ok(AccessClassification::NotEligible(Ineligibility::NotAccessRelated));
    }
    if !has_pointer_use(function, id, policy) {
        return Ok(AccessClassification::NotEligible(Ineligibility::NoPointerUse));
    }

    let shown = function.display_instruction(id);
    let Some(descriptor) = oracle.recurrence_of(id) else {
        log.push(format!("[{shown}] --> not an add recurrence"));
        return Ok(AccessClassification::NotEligible(Ineligibility::NotARecurrence));
    };

    let degree = descriptor.degree();
    let operand = |i: usize| {
        descriptor
            .operands
            .get(i)
            .map_or_else(|| "?".to_string(), ToString::to_string)
    };
    match degree {
        RecurrenceDegree::Affine => log.push(format!(
            "[{shown}] --> affine add recurrence {descriptor}: start {}, step {}",
            operand(0),
            operand(1)
        )),
        RecurrenceDegree::Quadratic => log.push(format!(
            "[{shown}] --> quadratic add recurrence {descriptor}: start {}, step {}, second step {}",
            operand(0),
            operand(1),
            operand(2)
        )),
        other => {
            log.push(format!("[{shown}] --> {other} add recurrence {descriptor}, ignored"));
            return Ok(AccessClassification::NotEligible(
                Ineligibility::UnsupportedDegree(other),
            ));
        }
    }

    // A quadratic recurrence is gated on its start and linear step only
    let candidate =
        descriptor.constant_operand(0).is_some() && descriptor.constant_operand(1).is_some();
    if !candidate {
        log.push(format!("[{shown}] --> symbolic start or step, not a candidate"));
    }

    Ok(AccessClassification::Recurrence {
        degree,
        descriptor,
        candidate,
    })
}

/// Returns true if the result of `id` is reinterpreted as an address
pub fn has_pointer_use(function: &Function, id: InstructionId, policy: PointerUsePolicy) -> bool {
    let is_pointer_forming = |user: &InstructionId| {
        function
            .get_instruction(*user)
            .is_some_and(|inst| inst.is_pointer_forming())
    };
    match policy {
        PointerUsePolicy::AnyUse => function.users(id).iter().any(is_pointer_forming),
        PointerUsePolicy::FirstUse => function.users(id).first().is_some_and(is_pointer_forming),
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
