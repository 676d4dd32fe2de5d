use hls_compiler_ir::{BasicBlockId, CompareOp, Function, FunctionBuilder, InstructionId, IrType, Value};

use super::*;
use crate::analysis::{DominatorTree, LoopForest};

fn evolution(function: &Function) -> ScalarEvolution {
    let dom = DominatorTree::compute(function);
    let loops = LoopForest::compute(function, &dom);
    ScalarEvolution::compute(function, &loops)
}

fn rendered(scev: &ScalarEvolution, id: InstructionId) -> String {
    scev.evolution_of(id).map(ToString::to_string).unwrap_or_default()
}

/// A one-block loop counting `i` from `start` by 1 up to 16.
/// `body` adds instructions to the loop block and returns ids of interest.
fn counted_loop<const N: usize>(
    start: impl Into<Value>,
    body: impl FnOnce(&mut FunctionBuilder, InstructionId) -> [InstructionId; N],
) -> (Function, InstructionId, InstructionId, [InstructionId; N]) {
    let mut b = FunctionBuilder::new("kernel");
    b.argument(IrType::i64());
    let entry = b.entry_block();
    let header = b.new_block("loop");
    let exit = b.new_block("exit");
    b.jump(header);

    b.switch_to(header);
    let i = b.phi(IrType::i64());
    let ids = body(&mut b, i);
    let next = b.add(IrType::i64(), i, 1i64);
    let cond = b.icmp(CompareOp::Slt, next, 16i64);
    b.branch(cond, header, exit);
    b.add_incoming(i, entry, start).add_incoming(i, header, next);

    b.switch_to(exit).ret(None);
    (b.finish(), i, next, ids)
}

#[test]
fn test_induction_variable() {
    let (function, i, next, _) = counted_loop(0i64, |_, _| []);
    let scev = evolution(&function);

    assert_eq!(rendered(&scev, i), "{0,+,1}<%bb1>");
    assert_eq!(rendered(&scev, next), "{1,+,1}<%bb1>");

    let rec = scev.recurrence_of(i).unwrap();
    assert_eq!(rec.degree(), RecurrenceDegree::Affine);
    assert_eq!(rec.constant_operand(0), Some(0));
    assert_eq!(rec.constant_operand(1), Some(1));
    assert_eq!(rec.loop_header, BasicBlockId::from_usize(1));
}

#[test]
fn test_scaled_offset_through_casts() {
    let (function, _, _, [ext, scaled, shifted, addr]) = counted_loop(0i64, |b, i| {
        let ext = b.sext(i, IrType::i64());
        let scaled = b.mul(IrType::i64(), ext, 4i64);
        let shifted = b.shl(IrType::i64(), i, 3i64);
        let addr = b.add(IrType::i64(), 4096i64, scaled);
        [ext, scaled, shifted, addr]
    });
    let scev = evolution(&function);

    assert_eq!(rendered(&scev, ext), "{0,+,1}<%bb1>");
    assert_eq!(rendered(&scev, scaled), "{0,+,4}<%bb1>");
    assert_eq!(rendered(&scev, shifted), "{0,+,8}<%bb1>");
    assert_eq!(rendered(&scev, addr), "{4096,+,4}<%bb1>");
}

#[test]
fn test_symbolic_base() {
    let (function, _, _, [addr]) = counted_loop(0i64, |b, i| {
        let scaled = b.mul(IrType::i64(), i, 4i64);
        [b.add(IrType::i64(), hls_compiler_ir::ArgumentId::from_usize(0), scaled)]
    });
    let scev = evolution(&function);

    let rec = scev.recurrence_of(addr).unwrap();
    assert_eq!(rec.degree(), RecurrenceDegree::Affine);
    assert_eq!(rec.constant_operand(0), None);
    assert_eq!(rec.constant_operand(1), Some(4));
    assert_eq!(rendered(&scev, addr), "{%arg0,+,4}<%bb1>");
}

#[test]
fn test_square_is_quadratic() {
    let (function, _, _, [square]) = counted_loop(0i64, |b, i| [b.mul(IrType::i64(), i, i)]);
    let scev = evolution(&function);

    let rec = scev.recurrence_of(square).unwrap();
    assert_eq!(rec.degree(), RecurrenceDegree::Quadratic);
    assert_eq!(rendered(&scev, square), "{0,+,1,+,2}<%bb1>");
    let values: Vec<_> = (0..5).map(|k| rec.evaluate_at(k).unwrap()).collect();
    assert_eq!(values, vec![0, 1, 4, 9, 16]);
}

#[test]
fn test_triangular_accumulator_is_quadratic() {
    // j += i
    let mut b = FunctionBuilder::new("triangle");
    let entry = b.entry_block();
    let header = b.new_block("loop");
    let exit = b.new_block("exit");
    b.jump(header);

    b.switch_to(header);
    let i = b.phi(IrType::i64());
    let j = b.phi(IrType::i64());
    let j_next = b.add(IrType::i64(), j, i);
    let i_next = b.add(IrType::i64(), i, 1i64);
    let cond = b.icmp(CompareOp::Slt, i_next, 8i64);
    b.branch(cond, header, exit);
    b.add_incoming(i, entry, 0i64).add_incoming(i, header, i_next);
    b.add_incoming(j, entry, 0i64).add_incoming(j, header, j_next);
    b.switch_to(exit).ret(None);
    let function = b.finish();

    let scev = evolution(&function);
    assert_eq!(rendered(&scev, j), "{0,+,0,+,1}<%bb1>");
    assert_eq!(rendered(&scev, j_next), "{0,+,1,+,1}<%bb1>");

    let rec = scev.recurrence_of(j).unwrap();
    let values: Vec<_> = (0..5).map(|k| rec.evaluate_at(k).unwrap()).collect();
    assert_eq!(values, vec![0, 0, 1, 3, 6]);
}

#[test]
fn test_nested_loop_row_major_index() {
    // for i { for j { idx = i * 8 + j } }
    let mut b = FunctionBuilder::new("rows");
    let entry = b.entry_block();
    let outer = b.new_block("outer");
    let inner = b.new_block("inner");
    let latch = b.new_block("outer_latch");
    let exit = b.new_block("exit");
    b.jump(outer);

    b.switch_to(outer);
    let i = b.phi(IrType::i64());
    b.jump(inner);

    b.switch_to(inner);
    let j = b.phi(IrType::i64());
    let row = b.mul(IrType::i64(), i, 8i64);
    let idx = b.add(IrType::i64(), row, j);
    let j_next = b.add(IrType::i64(), j, 1i64);
    let inner_cond = b.icmp(CompareOp::Slt, j_next, 8i64);
    b.branch(inner_cond, inner, latch);
    b.add_incoming(j, outer, 0i64).add_incoming(j, inner, j_next);

    b.switch_to(latch);
    let i_next = b.add(IrType::i64(), i, 1i64);
    let outer_cond = b.icmp(CompareOp::Slt, i_next, 8i64);
    b.branch(outer_cond, outer, exit);
    b.add_incoming(i, entry, 0i64).add_incoming(i, latch, i_next);

    b.switch_to(exit).ret(None);
    let function = b.finish();

    let scev = evolution(&function);
    assert_eq!(rendered(&scev, i), "{0,+,1}<%bb1>");
    assert_eq!(rendered(&scev, row), "{0,+,8}<%bb1>");
    // The outer recurrence is fixed while the inner loop runs
    assert_eq!(rendered(&scev, idx), "{{0,+,8}<%bb1>,+,1}<%bb2>");

    let rec = scev.recurrence_of(idx).unwrap();
    assert_eq!(rec.loop_header, inner);
    assert_eq!(rec.constant_operand(0), None);
    assert_eq!(rec.constant_operand(1), Some(1));
}

#[test]
fn test_opaque_values_are_unknown() {
    let (function, _, _, [loaded, masked]) = counted_loop(0i64, |b, i| {
        let ptr = b.int_to_ptr(i);
        let loaded = b.load(IrType::i64(), ptr);
        let masked = b.binary(hls_compiler_ir::BinaryOp::And, IrType::i64(), i, 7i64);
        [loaded, masked]
    });
    let scev = evolution(&function);

    assert_eq!(rendered(&scev, loaded), format!("%{}", loaded.index()));
    assert!(scev.recurrence_of(masked).is_none());
}

#[test]
fn test_narrowing_and_zero_extension_of_constants() {
    let mut b = FunctionBuilder::new("casts");
    let x = b.argument(IrType::i64());
    let widened = b.zext(Value::integer_of_width(-1, 8), IrType::i64());
    let signed = b.sext(Value::integer_of_width(-1, 8), IrType::i64());
    let narrow = b.add(IrType::Int(8), Value::integer_of_width(-2, 8), Value::integer_of_width(1, 8));
    let narrow_widened = b.zext(narrow, IrType::i32());
    let wrapped = b.cast(hls_compiler_ir::CastOp::Trunc, 300i64, IrType::Int(8));
    let negative = b.cast(hls_compiler_ir::CastOp::Trunc, 200i64, IrType::Int(8));
    let opaque = b.cast(hls_compiler_ir::CastOp::Trunc, x, IrType::i32());
    b.ret(None);
    let function = b.finish();
    let scev = evolution(&function);

    assert_eq!(rendered(&scev, widened), "255");
    assert_eq!(rendered(&scev, signed), "-1");
    assert_eq!(rendered(&scev, narrow_widened), "255");
    assert_eq!(rendered(&scev, wrapped), "44");
    assert_eq!(rendered(&scev, negative), "-56");
    assert_eq!(
        scev.evolution_of(opaque),
        Some(&ScevExpr::Unknown(Value::Instruction(opaque)))
    );
}

#[test]
fn test_phi_outside_loop_and_stores() {
    let mut b = FunctionBuilder::new("straight");
    let x = b.argument(IrType::i64());
    let slot = b.alloca(8);
    let sum = b.add(IrType::i64(), x, 2i64);
    let store = b.store(slot, sum);
    b.ret(None);
    let function = b.finish();

    let scev = evolution(&function);
    assert_eq!(rendered(&scev, sum), "(%arg0 + 2)");
    assert!(scev.evolution_of(store).is_none());
    assert!(scev.recurrence_of(sum).is_none());
}

#[test]
fn test_symbolic_step_stays_affine() {
    // i += n where n is a function argument
    let mut b = FunctionBuilder::new("stride");
    let n = b.argument(IrType::i64());
    let entry = b.entry_block();
    let header = b.new_block("loop");
    let exit = b.new_block("exit");
    b.jump(header);
    b.switch_to(header);
    let i = b.phi(IrType::i64());
    let next = b.add(IrType::i64(), i, n);
    let cond = b.icmp(CompareOp::Slt, next, 64i64);
    b.branch(cond, header, exit);
    b.add_incoming(i, entry, 0i64).add_incoming(i, header, next);
    b.switch_to(exit).ret(None);
    let function = b.finish();

    let scev = evolution(&function);
    let rec = scev.recurrence_of(i).unwrap();
    assert_eq!(rec.degree(), RecurrenceDegree::Affine);
    assert_eq!(rec.constant_operand(1), None);
    assert_eq!(rendered(&scev, i), "{0,+,%arg0}<%bb1>");
}
