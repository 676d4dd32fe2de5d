use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use hls_compiler_ir::{CompareOp, FunctionBuilder, IrType, Value};

use super::*;
use crate::access_pattern::Ineligibility;
use crate::passes::PassManager;
use crate::target::TargetCostInfo;
use crate::AnalysisError;

const ALL: [AnalysisKind; 4] = [
    AnalysisKind::Dominance,
    AnalysisKind::SymbolicEvolution,
    AnalysisKind::TargetCost,
    AnalysisKind::LoopStructure,
];

/// `for (i = 0; i < 16; i++) a[i]` over 4-byte elements at address 0
fn scale() -> (Function, [InstructionId; 3]) {
    let mut b = FunctionBuilder::new("scale");
    let entry = b.entry_block();
    let header = b.new_block("loop");
    let exit = b.new_block("exit");
    b.jump(header);

    b.switch_to(header);
    let i = b.phi(IrType::i32());
    let ext = b.sext(i, IrType::i64());
    let offset = b.mul(IrType::i64(), ext, 4i64);
    let addr = b.add(IrType::i64(), 0i64, offset);
    let ptr = b.int_to_ptr(addr);
    b.load(IrType::i32(), ptr);
    let next = b.add(IrType::i32(), i, 1);
    let cond = b.icmp(CompareOp::Slt, next, 16);
    b.branch(cond, header, exit);
    b.add_incoming(i, entry, 0).add_incoming(i, header, next);

    b.switch_to(exit).ret(None);
    (b.finish(), [i, addr, next])
}

/// Two chained address additions, the user placed in an earlier block than
/// the addition it uses:
///
/// ```text
/// bb1 tail:   outer = inner + 8; inttoptr outer; next = i + 1; br bb2, bb3
/// bb2 header: i = phi; inner = sext(i) * 4 + 0; inttoptr inner; jmp bb1
/// ```
fn chained() -> (Function, [InstructionId; 3]) {
    let mut b = FunctionBuilder::new("chained");
    let entry = b.entry_block();
    let tail = b.new_block("tail");
    let header = b.new_block("header");
    let exit = b.new_block("exit");
    b.jump(header);

    b.switch_to(header);
    let i = b.phi(IrType::i64());
    let ext = b.sext(i, IrType::i64());
    let offset = b.mul(IrType::i64(), ext, 4i64);
    let inner = b.add(IrType::i64(), offset, 0i64);
    b.int_to_ptr(inner);
    b.jump(tail);

    b.switch_to(tail);
    let outer = b.add(IrType::i64(), inner, 8i64);
    b.int_to_ptr(outer);
    let next = b.add(IrType::i64(), i, 1i64);
    let cond = b.icmp(CompareOp::Slt, next, 16i64);
    b.branch(cond, header, exit);
    b.add_incoming(i, entry, 0i64).add_incoming(i, tail, next);

    b.switch_to(exit).ret(None);
    (b.finish(), [inner, outer, next])
}

/// `addr = extend(k) * 4 + sext(i) * 4`, where `k = 2 + 3` is computed
/// before the loop and `extend` builds the invariant factor in the loop body
fn invariant_product_first(
    extend: impl FnOnce(&mut FunctionBuilder, InstructionId) -> InstructionId,
) -> (Function, [InstructionId; 2]) {
    let mut b = FunctionBuilder::new("two_products");
    let entry = b.entry_block();
    let header = b.new_block("loop");
    let exit = b.new_block("exit");
    let k = b.add(IrType::i32(), 2, 3);
    b.jump(header);

    b.switch_to(header);
    let i = b.phi(IrType::i32());
    let invariant = extend(&mut b, k);
    let fixed = b.mul(IrType::i64(), invariant, 4i64);
    let ext = b.sext(i, IrType::i64());
    let varying = b.mul(IrType::i64(), ext, 4i64);
    let addr = b.add(IrType::i64(), fixed, varying);
    let ptr = b.int_to_ptr(addr);
    b.load(IrType::i32(), ptr);
    let next = b.add(IrType::i32(), i, 1);
    let cond = b.icmp(CompareOp::Slt, next, 16);
    b.branch(cond, header, exit);
    b.add_incoming(i, entry, 0).add_incoming(i, header, next);

    b.switch_to(exit).ret(None);
    (b.finish(), [i, addr])
}

/// Claims to have rewritten every candidate it sees
struct ActingHandler {
    calls: Rc<Cell<usize>>,
}

impl CandidateHandler for ActingHandler {
    fn handle(&mut self, _function: &mut Function, _candidate: &AccessCandidate) -> Result<bool> {
        self.calls.set(self.calls.get() + 1);
        Ok(true)
    }
}

fn acting() -> (ActingHandler, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    (
        ActingHandler {
            calls: Rc::clone(&calls),
        },
        calls,
    )
}

fn analyses_for(function: &Function) -> FunctionAnalyses {
    FunctionAnalyses::compute(function, &ALL, &TargetCostInfo::default())
}

#[test]
fn test_affine_candidate_resolves_to_loop_phi() {
    let (mut function, [i, addr, next]) = scale();
    let analyses = analyses_for(&function);
    let mut pass = ArrayAccessPattern::default();
    assert_eq!(pass.state(), PassState::NotRun);

    let changed = pass.run(&mut function, &analyses).unwrap();
    assert!(!changed);
    assert_eq!(pass.state(), PassState::Done);

    let report = pass.report().unwrap();
    assert_eq!(report.function, "scale");
    assert!(report.is_candidate(addr));
    assert!(!report.is_candidate(next));
    assert_eq!(
        report.classification_of(next).and_then(AccessClassification::ineligibility),
        Some(Ineligibility::NoPointerUse)
    );
    // One pop per seeded addition
    assert_eq!(report.worklist_steps, 2);
    assert!(!report.hit_step_limit);

    let candidate = &report.candidates[0];
    assert_eq!(candidate.degree, RecurrenceDegree::Affine);
    assert_eq!(candidate.descriptor.constant_operand(0), Some(0));
    assert_eq!(candidate.descriptor.constant_operand(1), Some(4));
    assert_eq!(candidate.estimated_gain, 2);

    assert_eq!(pass.handler().seen, vec![(addr, Some(i))]);
}

#[test]
fn test_diagnostics_of_one_function() {
    let (mut function, _) = scale();
    let analyses = analyses_for(&function);
    let mut pass = ArrayAccessPattern::default();
    pass.run(&mut function, &analyses).unwrap();

    insta::assert_snapshot!(pass.diagnostics().to_string(), @r"
    tracing memory accesses in function 'scale'
    address root [%4 = inttoptr %3 to ptr], tracing its operands
    6 access-related instructions in 'scale'
    [%3 = add i64 0, %2] --> affine add recurrence {0,+,4}<%bb1>: start 0, step 4
    [%3 = add i64 0, %2] --> affine candidate, estimated gain 2 cycles per iteration
    ");
}

#[test]
fn test_diagnostics_can_be_dropped() {
    let (mut function, [_, addr, _]) = scale();
    let analyses = analyses_for(&function);
    let config = AccessPatternConfig {
        record_diagnostics: false,
        ..AccessPatternConfig::default()
    };
    let mut pass = ArrayAccessPattern::new(config);
    pass.run(&mut function, &analyses).unwrap();

    assert!(pass.diagnostics().is_empty());
    assert!(pass.report().unwrap().is_candidate(addr));
}

#[test]
fn test_acting_handler_requeues_address_users() {
    let (mut function, [inner, outer, next]) = chained();
    let analyses = analyses_for(&function);
    let (handler, calls) = acting();
    let mut pass = ArrayAccessPattern::with_handler(AccessPatternConfig::default(), handler);

    assert!(pass.run(&mut function, &analyses).unwrap());
    let report = pass.report().unwrap();

    // Seeded: outer, next, inner. Acting on inner queues outer again.
    assert_eq!(report.worklist_steps, 4);
    assert_eq!(calls.get(), 3);
    assert!(report.changed);
    assert_eq!(
        report.classifications.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        vec![outer, next, inner]
    );
    assert_eq!(
        report.candidates.iter().map(|c| c.instruction).collect::<Vec<_>>(),
        vec![outer, inner, outer]
    );
}

#[test]
fn test_worklist_step_limit() {
    let (mut function, [inner, outer, next]) = chained();
    let analyses = analyses_for(&function);
    let (handler, _) = acting();
    let config = AccessPatternConfig {
        max_worklist_steps: 2,
        ..AccessPatternConfig::default()
    };
    let mut pass = ArrayAccessPattern::with_handler(config, handler);
    pass.run(&mut function, &analyses).unwrap();

    let report = pass.report().unwrap();
    assert!(report.hit_step_limit);
    assert_eq!(report.worklist_steps, 2);
    assert!(report.classification_of(outer).is_some());
    assert!(report.classification_of(next).is_some());
    assert!(report.classification_of(inner).is_none());
}

#[test]
fn test_undeclared_analyses_are_missing() {
    let (mut function, _) = scale();
    let analyses =
        FunctionAnalyses::compute(&function, &[AnalysisKind::Dominance], &TargetCostInfo::default());
    let mut pass = ArrayAccessPattern::default();

    let err = pass.run(&mut function, &analyses).unwrap_err();
    assert_eq!(err, AnalysisError::MissingAnalysis(AnalysisKind::LoopStructure));
    assert_eq!(pass.state(), PassState::Done);
    assert!(pass.report().is_none());
}

#[test]
fn test_declares_prerequisites() {
    let usage = ArrayAccessPattern::default().analysis_usage();
    for kind in ALL {
        assert!(usage.requires(kind));
    }
    assert!(usage.preserves_cfg);
}

#[test]
fn test_pass_manager_runs_until_no_change() {
    let (mut function, _) = scale();
    let mut manager = PassManager::with_fixed_point(8).add_pass(ArrayAccessPattern::default());
    assert!(!manager.run(&mut function).unwrap());

    // A handler that always acts keeps the pipeline going until the limit
    let (handler, calls) = acting();
    let mut manager = PassManager::with_fixed_point(3)
        .add_pass(ArrayAccessPattern::with_handler(AccessPatternConfig::default(), handler));
    assert!(manager.run(&mut function).unwrap());
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_origin_skips_invariant_products() {
    let (mut function, [i, addr]) =
        invariant_product_first(|b, k| b.zext(k, IrType::i64()));
    let analyses = analyses_for(&function);
    let mut pass = ArrayAccessPattern::default();
    pass.run(&mut function, &analyses).unwrap();

    let report = pass.report().unwrap();
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].descriptor.to_string(), "{20,+,4}<%bb1>");
    assert_eq!(report.candidates[0].origin, Some(i));
    assert_eq!(pass.handler().seen, vec![(addr, Some(i))]);
}

#[test]
fn test_extended_literal_product_does_not_fail_the_pass() {
    let (mut function, [i, addr]) =
        invariant_product_first(|b, _| b.sext(Value::integer_of_width(5, 32), IrType::i64()));
    let analyses = analyses_for(&function);
    let mut pass = ArrayAccessPattern::default();

    assert!(!pass.run(&mut function, &analyses).unwrap());
    assert_eq!(pass.handler().seen, vec![(addr, Some(i))]);
}

#[test]
fn test_latency_overrides_from_pass_configuration() {
    let (mut function, [_, addr, _]) = scale();
    let analyses = analyses_for(&function);
    let config = AccessPatternConfig {
        latency_overrides: BTreeMap::from([("mul".to_string(), 5)]),
        ..AccessPatternConfig::default()
    };
    let mut pass = ArrayAccessPattern::new(config);
    pass.run(&mut function, &analyses).unwrap();

    let report = pass.report().unwrap();
    assert!(report.is_candidate(addr));
    assert_eq!(report.candidates[0].estimated_gain, 4);
}
