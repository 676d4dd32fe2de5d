//! # IR Function
//!
//! This module defines the function-level representation: an instruction
//! arena, the Control Flow Graph (CFG) of basic blocks, and per-instruction
//! use lists.

use index_vec::IndexVec;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    indent_str, ArgumentId, BasicBlock, BasicBlockId, Instruction, InstructionId, InstructionKind,
    IrType, PrettyPrint, Terminator, Value,
};

/// A single function, laid out as a Control Flow Graph (CFG)
///
/// # Design Notes
///
/// - Instructions are stored once in an arena and referenced by id from blocks
/// - Use lists are maintained on insertion, so `users()` is always current
/// - Each function has exactly one entry block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// The name of the function (for debugging and linking)
    pub name: String,

    /// Types of the function arguments, in signature order
    pub arguments: IndexVec<ArgumentId, IrType>,

    /// All basic blocks in this function, forming the CFG
    pub basic_blocks: IndexVec<BasicBlockId, BasicBlock>,

    /// The entry point of the function
    pub entry_block: BasicBlockId,

    /// Instruction arena; `InstructionId` is the identity of an instruction
    instructions: IndexVec<InstructionId, Instruction>,

    /// The block each instruction was placed in
    placement: IndexVec<InstructionId, BasicBlockId>,

    /// For each instruction, the instructions that use its result,
    /// in the order the uses were recorded (one entry per operand slot)
    users: FxHashMap<InstructionId, Vec<InstructionId>>,
}

impl Function {
    /// Creates a new function with an empty entry block
    pub fn new(name: impl Into<String>) -> Self {
        let mut basic_blocks = IndexVec::new();
        let entry_block = basic_blocks.push(BasicBlock::new());

        Self {
            name: name.into(),
            arguments: IndexVec::new(),
            basic_blocks,
            entry_block,
            instructions: IndexVec::new(),
            placement: IndexVec::new(),
            users: FxHashMap::default(),
        }
    }

    /// Adds a new basic block and returns its ID
    pub fn add_basic_block(&mut self) -> BasicBlockId {
        self.basic_blocks.push(BasicBlock::new())
    }

    /// Adds a new basic block with a name and returns its ID
    pub fn add_basic_block_with_name(&mut self, name: impl Into<String>) -> BasicBlockId {
        self.basic_blocks.push(BasicBlock::with_name(name.into()))
    }

    /// Adds an argument of the given type
    pub fn add_argument(&mut self, ty: IrType) -> ArgumentId {
        self.arguments.push(ty)
    }

    pub fn get_basic_block(&self, id: BasicBlockId) -> Option<&BasicBlock> {
        self.basic_blocks.get(id)
    }

    pub fn get_basic_block_mut(&mut self, id: BasicBlockId) -> Option<&mut BasicBlock> {
        self.basic_blocks.get_mut(id)
    }

    /// Appends an instruction to `block` and records its uses
    ///
    /// # Panics
    ///
    /// Panics if `block` does not exist.
    pub fn push_instruction(
        &mut self,
        block: BasicBlockId,
        instruction: Instruction,
    ) -> InstructionId {
        let operands = instruction.operands();
        let id = self.instructions.push(instruction);
        self.placement.push(block);
        self.basic_blocks
            .get_mut(block)
            .unwrap_or_else(|| panic!("Block {:?} does not exist", block))
            .instructions
            .push(id);

        for operand in operands {
            self.record_use(operand, id);
        }
        id
    }

    /// Adds an incoming edge to a phi created earlier
    ///
    /// Loop headers create their phis before the back-edge value exists;
    /// this is how the back edge is filled in afterwards.
    pub fn add_phi_incoming(
        &mut self,
        phi: InstructionId,
        block: BasicBlockId,
        value: Value,
    ) -> Result<(), String> {
        let instruction = self
            .instructions
            .get_mut(phi)
            .ok_or_else(|| format!("Instruction {phi:?} does not exist"))?;
        match &mut instruction.kind {
            InstructionKind::Phi { incoming } => incoming.push((block, value)),
            _ => return Err(format!("Instruction {phi:?} is not a phi")),
        }
        self.record_use(value, phi);
        Ok(())
    }

    fn record_use(&mut self, operand: Value, user: InstructionId) {
        if let Value::Instruction(def) = operand {
            self.users.entry(def).or_default().push(user);
        }
    }

    /// Sets the terminator of a block
    pub fn set_terminator(&mut self, block: BasicBlockId, terminator: Terminator) {
        if let Some(block) = self.basic_blocks.get_mut(block) {
            block.set_terminator(terminator);
        }
    }

    /// Gets an instruction by id
    ///
    /// # Panics
    ///
    /// Panics if the id was not produced by this function.
    pub fn instruction(&self, id: InstructionId) -> &Instruction {
        &self.instructions[id]
    }

    pub fn get_instruction(&self, id: InstructionId) -> Option<&Instruction> {
        self.instructions.get(id)
    }

    /// Returns the instruction defining `value`, if it is an instruction result
    pub fn defining_instruction(&self, value: Value) -> Option<(InstructionId, &Instruction)> {
        let id = value.as_instruction()?;
        self.instructions.get(id).map(|instruction| (id, instruction))
    }

    /// Returns the block an instruction lives in
    pub fn block_of(&self, id: InstructionId) -> Option<BasicBlockId> {
        self.placement.get(id).copied()
    }

    /// Returns the users of an instruction, in recorded use order
    pub fn users(&self, id: InstructionId) -> &[InstructionId] {
        self.users.get(&id).map_or(&[][..], Vec::as_slice)
    }

    /// Returns the first recorded user of an instruction
    pub fn first_user(&self, id: InstructionId) -> Option<InstructionId> {
        self.users(id).first().copied()
    }

    /// Returns the number of instructions in this function
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Returns an iterator over all basic blocks
    pub fn basic_blocks(&self) -> impl Iterator<Item = (BasicBlockId, &BasicBlock)> {
        self.basic_blocks.iter_enumerated()
    }

    /// Returns the number of basic blocks in this function
    pub fn block_count(&self) -> usize {
        self.basic_blocks.len()
    }

    /// Iterates instructions in block order, then instruction order
    pub fn instructions_in_order(
        &self,
    ) -> impl Iterator<Item = (BasicBlockId, InstructionId)> + '_ {
        self.basic_blocks
            .iter_enumerated()
            .flat_map(|(block_id, block)| block.instructions.iter().map(move |&id| (block_id, id)))
    }

    /// Returns the predecessors of every block, derived from terminators
    pub fn predecessor_map(&self) -> FxHashMap<BasicBlockId, Vec<BasicBlockId>> {
        let mut preds: FxHashMap<BasicBlockId, Vec<BasicBlockId>> = FxHashMap::default();
        for (block_id, block) in self.basic_blocks() {
            for succ in block.successors() {
                preds.entry(succ).or_default().push(block_id);
            }
        }
        preds
    }

    /// Returns the predecessors of a single block
    pub fn predecessors(&self, target: BasicBlockId) -> Vec<BasicBlockId> {
        self.basic_blocks()
            .filter(|(_, block)| block.successors().contains(&target))
            .map(|(id, _)| id)
            .collect()
    }

    /// Checks if a basic block is reachable from the entry block
    pub fn is_block_reachable(&self, target: BasicBlockId) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![self.entry_block];

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if visited.insert(current) {
                if let Some(block) = self.get_basic_block(current) {
                    stack.extend(block.successors());
                }
            }
        }

        false
    }

    /// Validates the function structure
    ///
    /// Checks:
    /// - Entry block exists
    /// - Terminator targets exist
    /// - Phis lead their block and only name predecessor blocks
    /// - Instruction operands refer to instructions of this function
    pub fn validate(&self) -> Result<(), String> {
        if self.basic_blocks.get(self.entry_block).is_none() {
            return Err(format!("Entry block {:?} does not exist", self.entry_block));
        }

        let preds = self.predecessor_map();

        for (block_id, block) in self.basic_blocks() {
            for target in block.terminator.target_blocks() {
                if self.basic_blocks.get(target).is_none() {
                    return Err(format!(
                        "Block {block_id:?} targets non-existent block {target:?}"
                    ));
                }
            }

            let mut seen_non_phi = false;
            for (position, &id) in block.instructions.iter().enumerate() {
                let instruction = self
                    .instructions
                    .get(id)
                    .ok_or_else(|| format!("Block {block_id:?} lists unknown {id:?}"))?;

                if let InstructionKind::Phi { incoming } = &instruction.kind {
                    if seen_non_phi {
                        return Err(format!(
                            "Block {block_id:?}: phi {id:?} at position {position} follows a non-phi instruction"
                        ));
                    }
                    let block_preds = preds.get(&block_id).map_or(&[][..], Vec::as_slice);
                    for (source, _) in incoming {
                        if !block_preds.contains(source) {
                            return Err(format!(
                                "Block {block_id:?}: phi {id:?} has an incoming value from {source:?} which is not a predecessor"
                            ));
                        }
                    }
                } else {
                    seen_non_phi = true;
                }

                for operand in instruction.operands() {
                    if let Value::Instruction(def) = operand {
                        if self.instructions.get(def).is_none() {
                            return Err(format!(
                                "Instruction {id:?} uses non-existent instruction {def:?}"
                            ));
                        }
                    }
                    if let Value::Argument(arg) = operand {
                        if self.arguments.get(arg).is_none() {
                            return Err(format!(
                                "Instruction {id:?} uses non-existent argument {arg:?}"
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Renders one instruction with its `%id = ` prefix
    pub fn display_instruction(&self, id: InstructionId) -> String {
        match self.get_instruction(id) {
            Some(instruction) if instruction.has_result() => {
                format!("{} = {}", id.pretty_print(0), instruction.pretty_print(0))
            }
            Some(instruction) => instruction.pretty_print(0),
            None => format!("<unknown {}>", id.pretty_print(0)),
        }
    }
}

impl PrettyPrint for Function {
    fn pretty_print(&self, indent: usize) -> String {
        let base_indent = indent_str(indent);
        let args = self
            .arguments
            .iter_enumerated()
            .map(|(id, ty)| format!("{} {}", ty.pretty_print(0), id.pretty_print(0)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut result = format!("{base_indent}fn {}({args}) {{\n", self.name);

        for (block_id, block) in self.basic_blocks() {
            match &block.name {
                Some(name) => {
                    result.push_str(&format!("{base_indent}bb{}: ; {name}\n", block_id.index()))
                }
                None => result.push_str(&format!("{base_indent}bb{}:\n", block_id.index())),
            }

            for &id in &block.instructions {
                result.push_str(&format!(
                    "{}{}\n",
                    indent_str(indent + 1),
                    self.display_instruction(id)
                ));
            }
            result.push_str(&format!(
                "{}{}\n",
                indent_str(indent + 1),
                block.terminator.pretty_print(0)
            ));
        }

        result.push_str(&format!("{base_indent}}}\n"));
        result
    }
}

#[cfg(test)]
#[path = "function_tests.rs"]
mod tests;
