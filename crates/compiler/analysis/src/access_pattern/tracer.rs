//! Memory-access tracing.
//!
//! Every `inttoptr` is the root of a backward depth-first walk over operand
//! edges. Each instruction reached is access-related: it takes part in
//! computing an address. The walk keeps a node in its visited set only while
//! the node's frame is on the stack, so cycles through loop phis terminate
//! while a node shared by two operand chains is walked from both.

use hls_compiler_ir::{instruction::Operands, Function, InstructionId, PrettyPrint};
use rustc_hash::FxHashSet;

use super::DiagnosticLog;
use crate::AccessPatternConfig;

/// The instructions of one function that take part in address computations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSet {
    members: FxHashSet<InstructionId>,
}

impl AccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `id` was not already a member
    pub fn insert(&mut self, id: InstructionId) -> bool {
        self.members.insert(id)
    }

    pub fn contains(&self, id: InstructionId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = InstructionId> + '_ {
        self.members.iter().copied()
    }

    /// Members in ascending id order
    pub fn sorted(&self) -> Vec<InstructionId> {
        let mut ids: Vec<_> = self.iter().collect();
        ids.sort();
        ids
    }
}

/// One node of the walk and the operands still to visit
struct Frame {
    node: InstructionId,
    operands: Operands,
    next: usize,
}

/// Collects the access-related instructions of `function`
///
/// Functions whose name carries the intrinsic prefix have no body worth
/// tracing and yield an empty set.
pub fn trace_memory_accesses(
    function: &Function,
    config: &AccessPatternConfig,
    log: &mut DiagnosticLog,
) -> AccessSet {
    let mut accesses = AccessSet::new();

    if config.is_intrinsic(&function.name) {
        log.push(format!("skipping intrinsic function '{}'", function.name));
        return accesses;
    }

    log.push(format!("tracing memory accesses in function '{}'", function.name));

    for (_, id) in function.instructions_in_order() {
        if function.instruction(id).is_pointer_forming() {
            log.push(format!(
                "address root [{}], tracing its operands",
                function.display_instruction(id)
            ));
            let visits = trace_from(function, id, &mut accesses);
            tracing::trace!(
                target: "access_pattern",
                "root {} took {} visits",
                id.pretty_print(0),
                visits
            );
        }
    }

    log.push(format!(
        "{} access-related instructions in '{}'",
        accesses.len(),
        function.name
    ));
    accesses
}

/// Walks the operand graph backward from `root`, adding every instruction
/// reached to `accesses`. Returns the number of node visits.
pub fn trace_from(function: &Function, root: InstructionId, accesses: &mut AccessSet) -> usize {
    let mut walk = Walk {
        function,
        accesses,
        on_stack: FxHashSet::default(),
        stack: Vec::new(),
        visits: 0,
    };

    walk.enter(root);
    while let Some(frame) = walk.stack.last_mut() {
        if let Some(&operand) = frame.operands.get(frame.next) {
            frame.next += 1;
            // Literals and arguments end the branch
            if let Some(id) = operand.as_instruction() {
                walk.enter(id);
            }
        } else {
            let node = frame.node;
            walk.stack.pop();
            walk.on_stack.remove(&node);
        }
    }

    walk.visits
}

struct Walk<'a> {
    function: &'a Function,
    accesses: &'a mut AccessSet,
    on_stack: FxHashSet<InstructionId>,
    stack: Vec<Frame>,
    visits: usize,
}

impl Walk<'_> {
    fn enter(&mut self, node: InstructionId) {
        let function = self.function;
        let Some(instruction) = function.get_instruction(node) else {
            return;
        };
        if !self.on_stack.insert(node) {
            return;
        }
        self.accesses.insert(node);
        self.visits += 1;
        self.stack.push(Frame {
            node,
            operands: instruction.operands(),
            next: 0,
        });
    }
}

#[cfg(test)]
#[path = "tracer_tests.rs"]
mod tests;
