//! Scalar evolution: folds the integer instructions of a function into
//! [`ScevExpr`]s, turning loop-header phis into add-recurrences.
//!
//! Folding rules:
//! - literals are constants; arguments and opaque instructions are `Unknown`
//! - `add`, `sub`, `mul` and `shl` by a constant fold algebraically
//! - sign extension, bitcasts and int/pointer casts do not change the value
//! - zero extension of a negative constant masks it to the source width;
//!   of anything else it does not change the value
//! - truncation folds constants to the target width; otherwise `Unknown`
//! - a recurrence plus a term invariant in its loop moves the term into the start
//! - two recurrences of the same loop add operand-wise
//! - a recurrence times an invariant factor scales every operand
//! - affine times affine in the same loop is quadratic:
//!   `{a,+,b} * {c,+,d} = {ac,+,ad+bc+bd,+,2bd}`
//! - a two-way header phi whose back-edge value is `phi + X` is
//!   `{start,+,X}` when `X` is invariant, and `{start,+,X0,+,X1,...}`
//!   when `X = {X0,+,X1,...}` is a recurrence of the same loop

use hls_compiler_ir::{
    BasicBlockId, BinaryOp, CastOp, Function, InstructionId, InstructionKind, Literal, Value,
};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{RecurrenceDescriptor, ScevExpr, SymbolicEvolution};
use crate::analysis::{LoopForest, LoopId};

/// Symbolic values of every value-producing instruction of one function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalarEvolution {
    expressions: FxHashMap<InstructionId, ScevExpr>,
}

impl ScalarEvolution {
    /// Computes the symbolic value of every instruction of `function`
    pub fn compute(function: &Function, loops: &LoopForest) -> Self {
        let mut builder = EvolutionBuilder {
            function,
            loops,
            cache: FxHashMap::default(),
            in_progress: FxHashSet::default(),
            cycle_hits: Vec::new(),
        };

        for (_, id) in function.instructions_in_order() {
            if function.instruction(id).has_result() {
                builder.evolution_of(id);
            }
        }

        tracing::trace!(
            "scalar evolution for '{}': {} expressions",
            function.name,
            builder.cache.len()
        );

        Self {
            expressions: builder.cache,
        }
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

impl SymbolicEvolution for ScalarEvolution {
    fn evolution_of(&self, id: InstructionId) -> Option<&ScevExpr> {
        self.expressions.get(&id)
    }
}

struct EvolutionBuilder<'a> {
    function: &'a Function,
    loops: &'a LoopForest,
    cache: FxHashMap<InstructionId, ScevExpr>,
    /// Phis (and their operand chains) currently being resolved
    in_progress: FxHashSet<InstructionId>,
    /// In-progress instructions that were reached again through a cycle.
    /// A result that depends on one of them is provisional and not cached.
    cycle_hits: Vec<InstructionId>,
}

impl EvolutionBuilder<'_> {
    fn evolution_of(&mut self, id: InstructionId) -> ScevExpr {
        if let Some(expr) = self.cache.get(&id) {
            return expr.clone();
        }
        if self.in_progress.contains(&id) {
            self.cycle_hits.push(id);
            return ScevExpr::Unknown(Value::Instruction(id));
        }

        let mark = self.cycle_hits.len();
        self.in_progress.insert(id);
        let expr = self.compute(id);
        self.in_progress.remove(&id);

        // Hits on `id` itself are resolved now; the rest belong to callers
        let in_progress = &self.in_progress;
        let mut pending = self.cycle_hits.split_off(mark);
        pending.retain(|hit| in_progress.contains(hit));
        let provisional = !pending.is_empty();
        self.cycle_hits.extend(pending);

        if !provisional {
            self.cache.insert(id, expr.clone());
        }
        expr
    }

    fn evolution_of_value(&mut self, value: Value) -> ScevExpr {
        match value {
            Value::Instruction(id) if self.function.get_instruction(id).is_some() => {
                self.evolution_of(id)
            }
            Value::Literal(literal) => match literal.as_integer() {
                Some(c) => ScevExpr::Constant(c),
                None => ScevExpr::Unknown(value),
            },
            _ => ScevExpr::Unknown(value),
        }
    }

    fn compute(&mut self, id: InstructionId) -> ScevExpr {
        let unknown = ScevExpr::Unknown(Value::Instruction(id));
        let function = self.function;
        let instruction = function.instruction(id);

        match &instruction.kind {
            InstructionKind::Binary { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                match op {
                    BinaryOp::Add => {
                        let l = self.evolution_of_value(left);
                        let r = self.evolution_of_value(right);
                        self.add(vec![l, r])
                    }
                    BinaryOp::Sub => {
                        let l = self.evolution_of_value(left);
                        let r = self.evolution_of_value(right);
                        let negated = self.mul(ScevExpr::Constant(-1), r);
                        self.add(vec![l, negated])
                    }
                    BinaryOp::Mul => {
                        let l = self.evolution_of_value(left);
                        let r = self.evolution_of_value(right);
                        self.mul(l, r)
                    }
                    BinaryOp::Shl => match right.as_const_integer() {
                        Some(shift @ 0..=62) => {
                            let l = self.evolution_of_value(left);
                            self.mul(l, ScevExpr::Constant(1i64 << shift))
                        }
                        _ => unknown,
                    },
                    BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => unknown,
                }
            }
            InstructionKind::Cast { op, source } => {
                let (op, source) = (*op, *source);
                let value = self.evolution_of_value(source);
                match (op, value) {
                    (CastOp::ZExt, ScevExpr::Constant(c)) if c < 0 => {
                        match self.width_of(source) {
                            Some(bits) => ScevExpr::Constant(zero_extend(c, bits)),
                            None => unknown,
                        }
                    }
                    (CastOp::Trunc, ScevExpr::Constant(c)) => match instruction.ty.bit_width() {
                        Some(bits) => ScevExpr::Constant(truncate(c, bits)),
                        None => unknown,
                    },
                    (CastOp::Trunc, _) => unknown,
                    (_, value) => value,
                }
            }
            InstructionKind::GetElementPtr { base, offset } => {
                let (base, offset) = (*base, *offset);
                let b = self.evolution_of_value(base);
                let o = self.evolution_of_value(offset);
                self.add(vec![b, o])
            }
            InstructionKind::Phi { incoming } => self.header_phi(id, incoming).unwrap_or(unknown),
            InstructionKind::Compare { .. }
            | InstructionKind::Load { .. }
            | InstructionKind::Store { .. }
            | InstructionKind::Alloca { .. }
            | InstructionKind::Call { .. } => unknown,
        }
    }

    /// Bit width of an integer-typed value
    fn width_of(&self, value: Value) -> Option<u32> {
        match value {
            Value::Literal(Literal::Integer { bits, .. }) => Some(bits),
            Value::Literal(Literal::Null) => None,
            Value::Instruction(id) => self.function.get_instruction(id)?.ty.bit_width(),
            Value::Argument(arg) => self.function.arguments.get(arg)?.bit_width(),
        }
    }

    fn header_phi(
        &mut self,
        phi: InstructionId,
        incoming: &[(BasicBlockId, Value)],
    ) -> Option<ScevExpr> {
        let header = self.function.block_of(phi)?;
        let loop_id = self.loops.loop_of_header(header)?;

        let [first, second] = incoming else {
            return None;
        };
        let (entry, back_edge) = match (
            self.loops.contains(loop_id, first.0),
            self.loops.contains(loop_id, second.0),
        ) {
            (false, true) => (first.1, second.1),
            (true, false) => (second.1, first.1),
            _ => return None,
        };

        let start = self.evolution_of_value(entry);
        if !self.is_invariant(&start, loop_id) {
            return None;
        }

        let next = self.evolution_of_value(back_edge);
        let increment = self.split_self_term(next, phi)?;

        let mut operands = vec![start];
        match increment {
            ScevExpr::AddRec(rec) if self.loops.loop_of_header(rec.loop_header) == Some(loop_id) => {
                operands.extend(rec.operands);
            }
            other if self.is_invariant(&other, loop_id) => operands.push(other),
            _ => return None,
        }

        Some(self.normalize_rec(RecurrenceDescriptor::new(header, operands)))
    }

    /// Rewrites `phi + X` as `X`; `None` if `expr` is not of that shape
    fn split_self_term(&mut self, expr: ScevExpr, phi: InstructionId) -> Option<ScevExpr> {
        let is_phi = |e: &ScevExpr| matches!(e, ScevExpr::Unknown(Value::Instruction(id)) if *id == phi);

        match expr {
            ref e if is_phi(e) => Some(ScevExpr::zero()),
            ScevExpr::Add(mut terms) => {
                let position = terms.iter().position(is_phi)?;
                terms.remove(position);
                Some(self.add(terms))
            }
            _ => None,
        }
    }

    /// An expression is invariant in a loop if no part of it changes while
    /// the loop runs
    fn is_invariant(&self, expr: &ScevExpr, loop_id: LoopId) -> bool {
        match expr {
            ScevExpr::Constant(_) => true,
            ScevExpr::Unknown(Value::Instruction(id)) => self
                .function
                .block_of(*id)
                .map_or(true, |block| !self.loops.contains(loop_id, block)),
            ScevExpr::Unknown(_) => true,
            ScevExpr::Add(terms) | ScevExpr::Mul(terms) => {
                terms.iter().all(|t| self.is_invariant(t, loop_id))
            }
            ScevExpr::AddRec(rec) => {
                let nested = self
                    .loops
                    .loop_of_header(rec.loop_header)
                    .is_some_and(|rec_loop| self.loops.is_nested_in(rec_loop, loop_id));
                !nested && rec.operands.iter().all(|t| self.is_invariant(t, loop_id))
            }
        }
    }

    fn loop_of(&self, rec: &RecurrenceDescriptor) -> Option<LoopId> {
        self.loops.loop_of_header(rec.loop_header)
    }

    fn depth_of(&self, rec: &RecurrenceDescriptor) -> usize {
        self.loop_of(rec)
            .and_then(|id| self.loops.get(id))
            .map_or(0, |lp| lp.depth)
    }

    /// Trims trailing zero operands; a recurrence with only a start is its start
    fn normalize_rec(&self, mut rec: RecurrenceDescriptor) -> ScevExpr {
        while rec.operands.len() > 1 && rec.operands.last() == Some(&ScevExpr::zero()) {
            rec.operands.pop();
        }
        if rec.operands.len() == 1 {
            rec.operands.pop().unwrap_or_else(ScevExpr::zero)
        } else {
            ScevExpr::AddRec(rec)
        }
    }

    fn add(&mut self, terms: Vec<ScevExpr>) -> ScevExpr {
        let mut constant = 0i64;
        let mut recs: Vec<RecurrenceDescriptor> = Vec::new();
        let mut others = Vec::new();

        let mut stack = terms;
        while let Some(term) = stack.pop() {
            match term {
                ScevExpr::Constant(c) => constant = constant.wrapping_add(c),
                ScevExpr::Add(inner) => stack.extend(inner),
                ScevExpr::AddRec(rec) => {
                    match recs.iter_mut().find(|r| r.loop_header == rec.loop_header) {
                        Some(existing) => {
                            let merged = std::mem::take(&mut existing.operands);
                            existing.operands = self.add_operands(merged, rec.operands);
                        }
                        None => recs.push(rec),
                    }
                }
                other => others.push(other),
            }
        }
        // Popping reversed the order
        others.reverse();

        // The deepest recurrence absorbs everything invariant in its loop
        recs.sort_by_key(|rec| std::cmp::Reverse(self.depth_of(rec)));
        let mut result = Vec::new();
        if !recs.is_empty() {
            let mut innermost = recs.remove(0);
            let mut absorbed = Vec::new();
            if let Some(loop_id) = self.loop_of(&innermost) {
                let mut kept = Vec::new();
                for term in recs.drain(..).map(ScevExpr::AddRec).chain(others.drain(..)) {
                    if self.is_invariant(&term, loop_id) {
                        absorbed.push(term);
                    } else {
                        kept.push(term);
                    }
                }
                others = kept;
                if constant != 0 {
                    absorbed.push(ScevExpr::Constant(constant));
                    constant = 0;
                }
            } else {
                others.extend(recs.drain(..).map(ScevExpr::AddRec));
            }

            if !absorbed.is_empty() {
                let start = innermost.operands.first().cloned().unwrap_or_else(ScevExpr::zero);
                absorbed.insert(0, start);
                let new_start = self.add(absorbed);
                if let Some(first) = innermost.operands.first_mut() {
                    *first = new_start;
                }
            }
            result.push(self.normalize_rec(innermost));
        }
        result.extend(others);

        if constant != 0 || result.is_empty() {
            result.push(ScevExpr::Constant(constant));
        }
        if result.len() == 1 {
            result.pop().unwrap_or_else(ScevExpr::zero)
        } else {
            ScevExpr::Add(result)
        }
    }

    fn add_operands(&mut self, left: Vec<ScevExpr>, right: Vec<ScevExpr>) -> Vec<ScevExpr> {
        let len = left.len().max(right.len());
        let mut left = left.into_iter();
        let mut right = right.into_iter();
        (0..len)
            .map(|_| {
                let l = left.next().unwrap_or_else(ScevExpr::zero);
                let r = right.next().unwrap_or_else(ScevExpr::zero);
                self.add(vec![l, r])
            })
            .collect()
    }

    fn mul(&mut self, left: ScevExpr, right: ScevExpr) -> ScevExpr {
        match (left, right) {
            (ScevExpr::Constant(a), ScevExpr::Constant(b)) => ScevExpr::Constant(a.wrapping_mul(b)),
            (ScevExpr::Constant(0), _) | (_, ScevExpr::Constant(0)) => ScevExpr::zero(),
            (ScevExpr::Constant(1), other) | (other, ScevExpr::Constant(1)) => other,
            (ScevExpr::AddRec(a), ScevExpr::AddRec(b)) if a.loop_header == b.loop_header => {
                self.mul_same_loop(a, b)
            }
            (ScevExpr::AddRec(rec), factor) | (factor, ScevExpr::AddRec(rec))
                if self
                    .loop_of(&rec)
                    .is_some_and(|id| self.is_invariant(&factor, id)) =>
            {
                self.scale(rec, factor)
            }
            (left, right) => {
                let mut constant = 1i64;
                let mut factors = Vec::new();
                for factor in [left, right] {
                    match factor {
                        ScevExpr::Mul(inner) => {
                            for f in inner {
                                match f {
                                    ScevExpr::Constant(c) => constant = constant.wrapping_mul(c),
                                    other => factors.push(other),
                                }
                            }
                        }
                        ScevExpr::Constant(c) => constant = constant.wrapping_mul(c),
                        other => factors.push(other),
                    }
                }
                if constant == 0 {
                    return ScevExpr::zero();
                }
                if constant != 1 {
                    factors.insert(0, ScevExpr::Constant(constant));
                }
                if factors.len() == 1 {
                    factors.pop().unwrap_or_else(ScevExpr::zero)
                } else {
                    ScevExpr::Mul(factors)
                }
            }
        }
    }

    fn scale(&mut self, rec: RecurrenceDescriptor, factor: ScevExpr) -> ScevExpr {
        let operands = rec
            .operands
            .into_iter()
            .map(|op| self.mul(op, factor.clone()))
            .collect();
        self.normalize_rec(RecurrenceDescriptor::new(rec.loop_header, operands))
    }

    fn mul_same_loop(&mut self, a: RecurrenceDescriptor, b: RecurrenceDescriptor) -> ScevExpr {
        match (a.operands.as_slice(), b.operands.as_slice()) {
            ([a0, a1], [b0, b1]) => {
                let (a0, a1, b0, b1) = (a0.clone(), a1.clone(), b0.clone(), b1.clone());
                let start = self.mul(a0.clone(), b0.clone());
                let cross_a = self.mul(a0, b1.clone());
                let cross_b = self.mul(a1.clone(), b0);
                let square = self.mul(a1, b1);
                let step = self.add(vec![cross_a, cross_b, square.clone()]);
                let second_step = self.mul(ScevExpr::Constant(2), square);
                self.normalize_rec(RecurrenceDescriptor::new(
                    a.loop_header,
                    vec![start, step, second_step],
                ))
            }
            _ => ScevExpr::Mul(vec![ScevExpr::AddRec(a), ScevExpr::AddRec(b)]),
        }
    }
}

/// `c` read as an unsigned `bits`-wide integer
const fn zero_extend(c: i64, bits: u32) -> i64 {
    match bits {
        1..=63 => c & ((1i64 << bits) - 1),
        _ => c,
    }
}

/// `c` wrapped to a signed `bits`-wide integer
const fn truncate(c: i64, bits: u32) -> i64 {
    match bits {
        1..=63 => (c << (64 - bits)) >> (64 - bits),
        _ => c,
    }
}
