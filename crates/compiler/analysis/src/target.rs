//! # Target Cost Information
//!
//! Per-opcode latencies of the synthesis target, in cycles.

use std::collections::BTreeMap;

use hls_compiler_ir::{Instruction, Opcode};
use rustc_hash::FxHashMap;

use crate::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCostInfo {
    latencies: FxHashMap<Opcode, u32>,
}

impl Default for TargetCostInfo {
    fn default() -> Self {
        let latencies = Opcode::ALL
            .into_iter()
            .map(|op| (op, Self::default_latency(op)))
            .collect();
        Self { latencies }
    }
}

impl TargetCostInfo {
    const fn default_latency(op: Opcode) -> u32 {
        match op {
            Opcode::Mul => 3,
            Opcode::Load | Opcode::Store => 2,
            Opcode::IntToPtr
            | Opcode::PtrToInt
            | Opcode::SExt
            | Opcode::ZExt
            | Opcode::Trunc
            | Opcode::Bitcast
            | Opcode::Phi
            | Opcode::Alloca => 0,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Shl
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::ICmp
            | Opcode::GetElementPtr
            | Opcode::Call => 1,
        }
    }

    /// The default table with `overrides` (opcode mnemonic -> latency) applied
    pub fn with_overrides(overrides: &BTreeMap<String, u32>) -> Result<Self> {
        Self::default().overridden(overrides)
    }

    /// This table with `overrides` applied on top
    pub fn overridden(&self, overrides: &BTreeMap<String, u32>) -> Result<Self> {
        let mut info = self.clone();
        for (name, &latency) in overrides {
            let op = Opcode::from_name(name).ok_or_else(|| {
                AnalysisError::InvalidConfig(format!("unknown opcode '{name}' in latency_overrides"))
            })?;
            info.latencies.insert(op, latency);
        }
        Ok(info)
    }

    pub fn latency(&self, op: Opcode) -> u32 {
        self.latencies
            .get(&op)
            .copied()
            .unwrap_or_else(|| Self::default_latency(op))
    }

    pub fn instruction_latency(&self, instruction: &Instruction) -> u32 {
        self.latency(instruction.opcode())
    }

    /// Cycles saved per iteration by computing a multiply as a running add
    pub fn strength_reduction_gain(&self) -> i64 {
        i64::from(self.latency(Opcode::Mul)) - i64::from(self.latency(Opcode::Add))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_latencies() {
        let info = TargetCostInfo::default();
        assert_eq!(info.latency(Opcode::Add), 1);
        assert_eq!(info.latency(Opcode::Mul), 3);
        assert_eq!(info.latency(Opcode::SExt), 0);
        assert_eq!(info.latency(Opcode::Load), 2);
        assert_eq!(info.strength_reduction_gain(), 2);
    }

    #[test]
    fn test_overrides() {
        let overrides = BTreeMap::from([("mul".to_string(), 5)]);
        let info = TargetCostInfo::with_overrides(&overrides).unwrap();
        assert_eq!(info.latency(Opcode::Mul), 5);
        assert_eq!(info.latency(Opcode::Add), 1);

        let bad = BTreeMap::from([("madd".to_string(), 2)]);
        assert!(TargetCostInfo::with_overrides(&bad).is_err());
    }

    #[test]
    fn test_overrides_layer_on_a_supplied_table() {
        let base = TargetCostInfo::with_overrides(&BTreeMap::from([("add".to_string(), 2)])).unwrap();
        let layered = base
            .overridden(&BTreeMap::from([("mul".to_string(), 7)]))
            .unwrap();
        assert_eq!(layered.latency(Opcode::Add), 2);
        assert_eq!(layered.latency(Opcode::Mul), 7);
        assert_eq!(layered.strength_reduction_gain(), 5);
        assert_eq!(base.latency(Opcode::Mul), 3);
    }
}
