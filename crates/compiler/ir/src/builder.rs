//! # Function Builder
//!
//! A fluent API for constructing functions. The builder tracks a current
//! block; every instruction method appends to it and returns the new
//! instruction's id. Operands accept anything convertible into a [`Value`]
//! (instruction ids, argument ids, integer literals).

use crate::{
    ArgumentId, BasicBlockId, BinaryOp, CastOp, CompareOp, Function, Instruction, InstructionId,
    IrType, Terminator, Value,
};

pub struct FunctionBuilder {
    function: Function,
    current_block: BasicBlockId,
}

impl FunctionBuilder {
    /// Starts a new function; the current block is the entry block
    pub fn new(name: impl Into<String>) -> Self {
        let function = Function::new(name);
        let current_block = function.entry_block;
        Self {
            function,
            current_block,
        }
    }

    /// Adds a function argument
    pub fn argument(&mut self, ty: IrType) -> ArgumentId {
        self.function.add_argument(ty)
    }

    pub const fn entry_block(&self) -> BasicBlockId {
        self.function.entry_block
    }

    pub const fn current_block(&self) -> BasicBlockId {
        self.current_block
    }

    /// Adds a new block without switching to it
    pub fn new_block(&mut self, name: impl Into<String>) -> BasicBlockId {
        self.function.add_basic_block_with_name(name)
    }

    /// Makes `block` the insertion point
    pub fn switch_to(&mut self, block: BasicBlockId) -> &mut Self {
        self.current_block = block;
        self
    }

    /// Appends an arbitrary instruction to the current block
    pub fn push(&mut self, instruction: Instruction) -> InstructionId {
        self.function
            .push_instruction(self.current_block, instruction)
    }

    pub fn binary(
        &mut self,
        op: BinaryOp,
        ty: IrType,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> InstructionId {
        self.push(Instruction::binary(op, ty, left.into(), right.into()))
    }

    pub fn add(
        &mut self,
        ty: IrType,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> InstructionId {
        self.binary(BinaryOp::Add, ty, left, right)
    }

    pub fn sub(
        &mut self,
        ty: IrType,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> InstructionId {
        self.binary(BinaryOp::Sub, ty, left, right)
    }

    pub fn mul(
        &mut self,
        ty: IrType,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> InstructionId {
        self.binary(BinaryOp::Mul, ty, left, right)
    }

    pub fn shl(
        &mut self,
        ty: IrType,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> InstructionId {
        self.binary(BinaryOp::Shl, ty, left, right)
    }

    pub fn icmp(
        &mut self,
        op: CompareOp,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> InstructionId {
        self.push(Instruction::compare(op, left.into(), right.into()))
    }

    pub fn cast(&mut self, op: CastOp, source: impl Into<Value>, ty: IrType) -> InstructionId {
        self.push(Instruction::cast(op, source.into(), ty))
    }

    pub fn sext(&mut self, source: impl Into<Value>, ty: IrType) -> InstructionId {
        self.cast(CastOp::SExt, source, ty)
    }

    pub fn zext(&mut self, source: impl Into<Value>, ty: IrType) -> InstructionId {
        self.cast(CastOp::ZExt, source, ty)
    }

    pub fn int_to_ptr(&mut self, source: impl Into<Value>) -> InstructionId {
        self.cast(CastOp::IntToPtr, source, IrType::Ptr)
    }

    pub fn ptr_to_int(&mut self, source: impl Into<Value>, ty: IrType) -> InstructionId {
        self.cast(CastOp::PtrToInt, source, ty)
    }

    /// Creates a phi with no incoming edges yet; see [`Self::add_incoming`]
    pub fn phi(&mut self, ty: IrType) -> InstructionId {
        self.push(Instruction::phi(ty, Vec::new()))
    }

    /// Adds an incoming edge to a phi created by [`Self::phi`]
    ///
    /// # Panics
    ///
    /// Panics if `phi` is not a phi of this function.
    pub fn add_incoming(
        &mut self,
        phi: InstructionId,
        block: BasicBlockId,
        value: impl Into<Value>,
    ) -> &mut Self {
        if let Err(err) = self.function.add_phi_incoming(phi, block, value.into()) {
            panic!("{err}");
        }
        self
    }

    pub fn load(&mut self, ty: IrType, address: impl Into<Value>) -> InstructionId {
        self.push(Instruction::load(ty, address.into()))
    }

    pub fn store(&mut self, address: impl Into<Value>, value: impl Into<Value>) -> InstructionId {
        self.push(Instruction::store(address.into(), value.into()))
    }

    pub fn get_element_ptr(
        &mut self,
        base: impl Into<Value>,
        offset: impl Into<Value>,
    ) -> InstructionId {
        self.push(Instruction::get_element_ptr(base.into(), offset.into()))
    }

    pub fn alloca(&mut self, size: usize) -> InstructionId {
        self.push(Instruction::alloca(size))
    }

    pub fn call(&mut self, callee: impl Into<String>, args: Vec<Value>, ty: IrType) -> InstructionId {
        self.push(Instruction::call(callee.into(), args, ty))
    }

    pub fn jump(&mut self, target: BasicBlockId) -> &mut Self {
        self.function
            .set_terminator(self.current_block, Terminator::jump(target));
        self
    }

    pub fn branch(
        &mut self,
        condition: impl Into<Value>,
        then_target: BasicBlockId,
        else_target: BasicBlockId,
    ) -> &mut Self {
        self.function.set_terminator(
            self.current_block,
            Terminator::branch(condition.into(), then_target, else_target),
        );
        self
    }

    pub fn ret(&mut self, value: Option<Value>) -> &mut Self {
        self.function
            .set_terminator(self.current_block, Terminator::Return { value });
        self
    }

    /// Read access to the function under construction
    pub const fn function(&self) -> &Function {
        &self.function
    }

    pub fn finish(self) -> Function {
        self.function
    }
}
