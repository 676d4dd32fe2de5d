//! # IR Module
//!
//! The top-level container: every function of one compilation unit.

use index_vec::IndexVec;
use rustc_hash::FxHashMap;

use crate::{Function, FunctionId, PrettyPrint};

/// All functions of a compilation unit
///
/// Functions are stored in an `IndexVec` for efficient access by `FunctionId`
/// and can also be looked up by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    /// All functions in this module, indexed by `FunctionId`
    pub functions: IndexVec<FunctionId, Function>,

    /// Mapping from function names to their IDs for lookup
    pub function_names: FxHashMap<String, FunctionId>,
}

impl Module {
    /// Creates a new empty module
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function to the module and returns its ID
    pub fn add_function(&mut self, function: Function) -> FunctionId {
        let name = function.name.clone();
        let function_id = self.functions.push(function);
        self.function_names.insert(name, function_id);
        function_id
    }

    pub fn get_function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id)
    }

    pub fn get_function_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        self.functions.get_mut(id)
    }

    /// Looks up a function by name
    pub fn lookup_function(&self, name: &str) -> Option<FunctionId> {
        self.function_names.get(name).copied()
    }

    /// Returns an iterator over all functions
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions.iter_enumerated()
    }

    /// Returns a mutable iterator over all functions
    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.functions.iter_mut()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Validates every function of the module
    pub fn validate(&self) -> Result<(), String> {
        for (id, function) in self.functions() {
            function
                .validate()
                .map_err(|err| format!("Function {id:?} ('{}'): {err}", function.name))?;
        }
        Ok(())
    }
}

impl PrettyPrint for Module {
    fn pretty_print(&self, indent: usize) -> String {
        self.functions
            .iter()
            .map(|function| function.pretty_print(indent))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
