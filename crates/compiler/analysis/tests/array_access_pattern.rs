//! End-to-end runs of the array access pattern pass over whole modules

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use hls_compiler_analysis::*;
use hls_compiler_ir::{CompareOp, Function, FunctionBuilder, InstructionId, IrType, Module, Value};

/// Every candidate seen, with the function it belongs to and its loop phi
type Seen = Rc<RefCell<Vec<(String, InstructionId, Option<InstructionId>)>>>;

struct SharedHandler(Seen);

impl CandidateHandler for SharedHandler {
    fn handle(&mut self, function: &mut Function, candidate: &AccessCandidate) -> Result<bool> {
        self.0
            .borrow_mut()
            .push((function.name.clone(), candidate.instruction, candidate.origin));
        Ok(false)
    }
}

/// `for (i = 0; i < 16; i++) load(base + sext(i) * 4)`
fn array_walk(name: &str, base: Option<Value>) -> (Function, InstructionId, InstructionId) {
    let mut b = FunctionBuilder::new(name);
    let arg = b.argument(IrType::i64());
    let base = base.unwrap_or_else(|| arg.into());
    let entry = b.entry_block();
    let header = b.new_block("loop");
    let exit = b.new_block("exit");
    b.jump(header);

    b.switch_to(header);
    let i = b.phi(IrType::i32());
    let ext = b.sext(i, IrType::i64());
    let offset = b.mul(IrType::i64(), ext, 4i64);
    let addr = b.add(IrType::i64(), base, offset);
    let ptr = b.int_to_ptr(addr);
    b.load(IrType::i32(), ptr);
    let next = b.add(IrType::i32(), i, 1);
    let cond = b.icmp(CompareOp::Slt, next, 16);
    b.branch(cond, header, exit);
    b.add_incoming(i, entry, 0).add_incoming(i, header, next);

    b.switch_to(exit).ret(None);
    (b.finish(), i, addr)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
fn test_module_pipeline() {
    init_tracing();

    let (constant, phi, addr) = array_walk("constant_base", Some(Value::integer(0)));
    let (symbolic, _, _) = array_walk("symbolic_base", None);
    let (intrinsic, _, _) = array_walk("llvm.memset.p0.i64", Some(Value::integer(0)));

    let mut module = Module::new();
    module.add_function(constant);
    module.add_function(symbolic);
    module.add_function(intrinsic);

    let seen = Seen::default();
    let pass = ArrayAccessPattern::with_handler(
        AccessPatternConfig::default(),
        SharedHandler(Rc::clone(&seen)),
    );
    let mut manager = PassManager::with_fixed_point(4).add_pass(pass);

    let changed = manager.run_module(&mut module).unwrap();
    assert!(!changed);

    // The symbolic base is affine but not constant; the intrinsic is never traced
    assert_eq!(
        *seen.borrow(),
        vec![("constant_base".to_string(), addr, Some(phi))]
    );
}

#[test]
fn test_symbolic_base_is_classified_but_rejected() {
    let (mut function, _, addr) = array_walk("symbolic_base", None);
    let kinds = ArrayAccessPattern::default().analysis_usage().required;
    let analyses = FunctionAnalyses::compute(&function, &kinds, &TargetCostInfo::default());

    let mut pass = ArrayAccessPattern::default();
    pass.run(&mut function, &analyses).unwrap();
    let report = pass.report().unwrap();

    let classification = report.classification_of(addr).unwrap();
    let descriptor = classification.descriptor().unwrap();
    assert_eq!(descriptor.degree(), RecurrenceDegree::Affine);
    assert_eq!(descriptor.to_string(), "{%arg0,+,4}<%bb1>");
    assert!(!classification.is_candidate());
    assert!(report.candidates.is_empty());
}

#[test]
fn test_intrinsic_prefix_is_configurable() {
    let config = AccessPatternConfig::from_toml_str(r#"intrinsic_prefix = "hls.""#).unwrap();
    let (mut function, _, addr) = array_walk("llvm.like_name", Some(Value::integer(0)));
    let kinds = ArrayAccessPattern::default().analysis_usage().required;
    let analyses = FunctionAnalyses::compute(&function, &kinds, &TargetCostInfo::default());

    let mut pass = ArrayAccessPattern::new(config);
    pass.run(&mut function, &analyses).unwrap();
    assert!(pass.report().unwrap().is_candidate(addr));
}

#[test]
fn test_configuration_from_toml() {
    let config = AccessPatternConfig::from_toml_str(
        r#"
        pointer_use_policy = "first_use"
        max_worklist_steps = 32
        record_diagnostics = false

        [latency_overrides]
        mul = 5
        "#,
    )
    .unwrap();
    assert_eq!(config.pointer_use_policy, PointerUsePolicy::FirstUse);
    assert_eq!(config.max_worklist_steps, 32);
    assert_eq!(config.intrinsic_prefix, "llvm.");

    // The latency override lives only in the pass configuration
    let (mut function, _, addr) = array_walk("costly", Some(Value::integer(0)));
    let kinds = ArrayAccessPattern::default().analysis_usage().required;
    let analyses = FunctionAnalyses::compute(&function, &kinds, &TargetCostInfo::default());

    let mut pass = ArrayAccessPattern::new(config);
    pass.run(&mut function, &analyses).unwrap();
    let report = pass.report().unwrap();
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].instruction, addr);
    assert_eq!(report.candidates[0].estimated_gain, 4);
    assert!(pass.diagnostics().is_empty());
}

#[test]
fn test_invalid_configuration() {
    for source in [
        "max_worklist_steps = 0",
        "pointer_use_policy = \"every_use\"",
        "unknown_field = 1",
        "[latency_overrides]\nfrobnicate = 2",
    ] {
        let err = AccessPatternConfig::from_toml_str(source).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)), "{source}: {err}");
    }

    let err = AccessPatternConfig::from_path(Path::new("/nonexistent/access_pattern.toml"))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));
}
