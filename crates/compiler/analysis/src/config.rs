//! Configuration of the array access pattern pass.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! intrinsic_prefix = "llvm."
//! pointer_use_policy = "any_use"
//! max_worklist_steps = 65536
//! record_diagnostics = true
//!
//! [latency_overrides]
//! mul = 4
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Result};

/// Which users of an addition count when checking that its result is
/// reinterpreted as an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerUsePolicy {
    /// Eligible if any recorded user is pointer-forming
    #[default]
    AnyUse,
    /// Only the first recorded user is inspected
    FirstUse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessPatternConfig {
    /// Functions whose name starts with this prefix are intrinsics and are not traced
    pub intrinsic_prefix: String,

    pub pointer_use_policy: PointerUsePolicy,

    /// Upper bound on work-list pops per function
    pub max_worklist_steps: usize,

    /// Keep diagnostic lines in memory (they are always emitted through `tracing`)
    pub record_diagnostics: bool,

    /// Opcode mnemonic -> latency, applied on top of the default cost table
    pub latency_overrides: BTreeMap<String, u32>,
}

impl Default for AccessPatternConfig {
    fn default() -> Self {
        Self {
            intrinsic_prefix: "llvm.".to_string(),
            pointer_use_policy: PointerUsePolicy::default(),
            max_worklist_steps: 1 << 16,
            record_diagnostics: true,
            latency_overrides: BTreeMap::new(),
        }
    }
}

impl AccessPatternConfig {
    /// Load configuration from a TOML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            tracing::error!("Failed to parse access pattern configuration: {}", e);
            AnalysisError::InvalidConfig(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.max_worklist_steps == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_worklist_steps must be at least 1".to_string(),
            ));
        }
        for name in self.latency_overrides.keys() {
            if hls_compiler_ir::Opcode::from_name(name).is_none() {
                return Err(AnalysisError::InvalidConfig(format!(
                    "unknown opcode '{name}' in latency_overrides"
                )));
            }
        }
        Ok(())
    }

    /// Returns true if `function_name` names an intrinsic
    pub fn is_intrinsic(&self, function_name: &str) -> bool {
        !self.intrinsic_prefix.is_empty() && function_name.starts_with(&self.intrinsic_prefix)
    }
}
