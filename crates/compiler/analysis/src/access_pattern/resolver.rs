//! Locating the loop variable a recurrence originates from.

use hls_compiler_ir::{Function, InstructionId, Value};

use crate::{AnalysisError, Result};

/// Follows `sext`/`zext` links from `start` down to the phi they extend
///
/// Returns `Ok(None)` when the chain ends at an instruction that is not a
/// phi. A chain that starts at, or reaches, a value that is not an
/// instruction is a broken assumption about the IR and is reported as a
/// contract violation.
pub fn resolve_recurrence_origin(function: &Function, start: Value) -> Result<Option<InstructionId>> {
    let mut current = start;
    loop {
        let Some((id, instruction)) = function.defining_instruction(current) else {
            return Err(AnalysisError::contract_violation(
                "an extension chain must consist of instructions",
                current,
            ));
        };

        if instruction.is_widening_cast() {
            current = instruction.operand(0).ok_or_else(|| {
                AnalysisError::contract_violation("extension without a source", current)
            })?;
            continue;
        }

        return Ok(instruction.is_phi().then_some(id));
    }
}

#[cfg(test)]
mod tests {
    use hls_compiler_ir::{FunctionBuilder, IrType};

    use super::*;

    #[test]
    fn test_chain_of_extensions_reaches_phi() {
        let mut b = FunctionBuilder::new("chain");
        let entry = b.entry_block();
        let header = b.new_block("loop");
        b.jump(header);
        b.switch_to(header);
        let i = b.phi(IrType::Int(8));
        let e1 = b.sext(i, IrType::Int(16));
        let e2 = b.zext(e1, IrType::i32());
        let e3 = b.sext(e2, IrType::i64());
        let next = b.add(IrType::Int(8), i, 1);
        b.jump(header);
        b.add_incoming(i, entry, 0).add_incoming(i, header, next);
        let function = b.finish();

        assert_eq!(resolve_recurrence_origin(&function, e3.into()).unwrap(), Some(i));
        assert_eq!(resolve_recurrence_origin(&function, e1.into()).unwrap(), Some(i));
        // Zero hops
        assert_eq!(resolve_recurrence_origin(&function, i.into()).unwrap(), Some(i));
        // Not an extension, not a phi
        assert_eq!(resolve_recurrence_origin(&function, next.into()).unwrap(), None);
    }

    #[test]
    fn test_non_instruction_is_a_contract_violation() {
        let mut b = FunctionBuilder::new("broken");
        let x = b.argument(IrType::i32());
        let ext = b.sext(x, IrType::i64());
        b.ret(None);
        let function = b.finish();

        let err = resolve_recurrence_origin(&function, Value::integer(4)).unwrap_err();
        assert!(err.is_contract_violation());

        // The chain bottoms out at an argument
        let err = resolve_recurrence_origin(&function, ext.into()).unwrap_err();
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("%arg0"));
    }
}
