//! # IR Instructions
//!
//! This module defines the instruction types for the IR.
//! Instructions perform computations but do not transfer control flow.

use smallvec::{smallvec, SmallVec};

use crate::{BasicBlockId, IrType, PrettyPrint, Value};

/// Operand list of a single instruction
pub type Operands = SmallVec<[Value; 2]>;

/// An instruction performs an operation but does NOT transfer control
///
/// Instructions do not record their own identity: the enclosing function's
/// arena assigns an `InstructionId`, and that id is how every analysis refers
/// to the instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The kind of instruction and its operands
    pub kind: InstructionKind,

    /// Type of the value this instruction produces (`Void` for stores)
    pub ty: IrType,

    /// Optional comment for debugging
    pub comment: Option<String>,
}

/// Two-operand integer arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Shl,
    And,
    Or,
    Xor,
}

/// Integer comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
}

/// Value conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    /// Reinterprets an integer as an address
    IntToPtr,
    /// Reinterprets an address as an integer
    PtrToInt,
    /// Sign extension to a wider integer
    SExt,
    /// Zero extension to a wider integer
    ZExt,
    /// Truncation to a narrower integer
    Trunc,
    /// Same-width reinterpretation
    Bitcast,
}

impl CastOp {
    /// Sign/zero extension: the width changes, the mathematical value does not
    pub const fn is_widening(&self) -> bool {
        matches!(self, Self::SExt | Self::ZExt)
    }
}

/// The different kinds of instructions available in the IR
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    /// Binary operation: `dest = op left, right`
    Binary {
        op: BinaryOp,
        left: Value,
        right: Value,
    },

    /// Integer comparison: `dest = icmp op left, right`
    Compare {
        op: CompareOp,
        left: Value,
        right: Value,
    },

    /// Conversion: `dest = op source to ty`
    Cast { op: CastOp, source: Value },

    /// SSA merge: `dest = phi [value, block], ...`
    /// Incoming edges may be filled in after creation (loop back edges)
    Phi { incoming: Vec<(BasicBlockId, Value)> },

    /// Load from memory: `dest = load address`
    Load { address: Value },

    /// Store to memory: `store value, address`
    Store { address: Value, value: Value },

    /// Address arithmetic: `dest = getelementptr base, offset`
    GetElementPtr { base: Value, offset: Value },

    /// Allocate space on the stack: `dest = alloca size`
    Alloca { size: usize },

    /// Function call: `dest = call @callee(args)`
    Call { callee: String, args: Vec<Value> },
}

/// Field-less view of an instruction kind, used for kind tests and cost tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Shl,
    And,
    Or,
    Xor,
    ICmp,
    IntToPtr,
    PtrToInt,
    SExt,
    ZExt,
    Trunc,
    Bitcast,
    Phi,
    Load,
    Store,
    GetElementPtr,
    Alloca,
    Call,
}

impl Opcode {
    pub const ALL: [Self; 20] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Shl,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::ICmp,
        Self::IntToPtr,
        Self::PtrToInt,
        Self::SExt,
        Self::ZExt,
        Self::Trunc,
        Self::Bitcast,
        Self::Phi,
        Self::Load,
        Self::Store,
        Self::GetElementPtr,
        Self::Alloca,
        Self::Call,
    ];

    /// Lowercase mnemonic, as printed
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Shl => "shl",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::ICmp => "icmp",
            Self::IntToPtr => "inttoptr",
            Self::PtrToInt => "ptrtoint",
            Self::SExt => "sext",
            Self::ZExt => "zext",
            Self::Trunc => "trunc",
            Self::Bitcast => "bitcast",
            Self::Phi => "phi",
            Self::Load => "load",
            Self::Store => "store",
            Self::GetElementPtr => "getelementptr",
            Self::Alloca => "alloca",
            Self::Call => "call",
        }
    }

    /// Parses a mnemonic produced by [`Opcode::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<BinaryOp> for Opcode {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => Self::Add,
            BinaryOp::Sub => Self::Sub,
            BinaryOp::Mul => Self::Mul,
            BinaryOp::Shl => Self::Shl,
            BinaryOp::And => Self::And,
            BinaryOp::Or => Self::Or,
            BinaryOp::Xor => Self::Xor,
        }
    }
}

impl From<CastOp> for Opcode {
    fn from(op: CastOp) -> Self {
        match op {
            CastOp::IntToPtr => Self::IntToPtr,
            CastOp::PtrToInt => Self::PtrToInt,
            CastOp::SExt => Self::SExt,
            CastOp::ZExt => Self::ZExt,
            CastOp::Trunc => Self::Trunc,
            CastOp::Bitcast => Self::Bitcast,
        }
    }
}

impl Instruction {
    const fn with_kind(kind: InstructionKind, ty: IrType) -> Self {
        Self {
            kind,
            ty,
            comment: None,
        }
    }

    /// Creates a new binary operation instruction
    pub const fn binary(op: BinaryOp, ty: IrType, left: Value, right: Value) -> Self {
        Self::with_kind(InstructionKind::Binary { op, left, right }, ty)
    }

    /// Creates a new comparison producing an `i1`
    pub const fn compare(op: CompareOp, left: Value, right: Value) -> Self {
        Self::with_kind(InstructionKind::Compare { op, left, right }, IrType::Int(1))
    }

    /// Creates a new cast instruction to `ty`
    pub const fn cast(op: CastOp, source: Value, ty: IrType) -> Self {
        Self::with_kind(InstructionKind::Cast { op, source }, ty)
    }

    /// Creates a new phi with the given incoming edges
    pub const fn phi(ty: IrType, incoming: Vec<(BasicBlockId, Value)>) -> Self {
        Self::with_kind(InstructionKind::Phi { incoming }, ty)
    }

    /// Creates a new load instruction
    pub const fn load(ty: IrType, address: Value) -> Self {
        Self::with_kind(InstructionKind::Load { address }, ty)
    }

    /// Creates a new store instruction
    pub const fn store(address: Value, value: Value) -> Self {
        Self::with_kind(InstructionKind::Store { address, value }, IrType::Void)
    }

    /// Creates a new get element pointer instruction
    pub const fn get_element_ptr(base: Value, offset: Value) -> Self {
        Self::with_kind(InstructionKind::GetElementPtr { base, offset }, IrType::Ptr)
    }

    /// Creates a new stack allocation instruction
    pub const fn alloca(size: usize) -> Self {
        Self::with_kind(InstructionKind::Alloca { size }, IrType::Ptr)
    }

    /// Creates a new call instruction
    pub const fn call(callee: String, args: Vec<Value>, ty: IrType) -> Self {
        Self::with_kind(InstructionKind::Call { callee, args }, ty)
    }

    /// Sets a comment for this instruction
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns the opcode of this instruction
    pub const fn opcode(&self) -> Opcode {
        match &self.kind {
            InstructionKind::Binary { op, .. } => match op {
                BinaryOp::Add => Opcode::Add,
                BinaryOp::Sub => Opcode::Sub,
                BinaryOp::Mul => Opcode::Mul,
                BinaryOp::Shl => Opcode::Shl,
                BinaryOp::And => Opcode::And,
                BinaryOp::Or => Opcode::Or,
                BinaryOp::Xor => Opcode::Xor,
            },
            InstructionKind::Compare { .. } => Opcode::ICmp,
            InstructionKind::Cast { op, .. } => match op {
                CastOp::IntToPtr => Opcode::IntToPtr,
                CastOp::PtrToInt => Opcode::PtrToInt,
                CastOp::SExt => Opcode::SExt,
                CastOp::ZExt => Opcode::ZExt,
                CastOp::Trunc => Opcode::Trunc,
                CastOp::Bitcast => Opcode::Bitcast,
            },
            InstructionKind::Phi { .. } => Opcode::Phi,
            InstructionKind::Load { .. } => Opcode::Load,
            InstructionKind::Store { .. } => Opcode::Store,
            InstructionKind::GetElementPtr { .. } => Opcode::GetElementPtr,
            InstructionKind::Alloca { .. } => Opcode::Alloca,
            InstructionKind::Call { .. } => Opcode::Call,
        }
    }

    /// Returns the ordered operand list of this instruction
    ///
    /// Phi operands are listed in incoming-edge order.
    pub fn operands(&self) -> Operands {
        match &self.kind {
            InstructionKind::Binary { left, right, .. }
            | InstructionKind::Compare { left, right, .. } => smallvec![*left, *right],
            InstructionKind::Cast { source, .. } => smallvec![*source],
            InstructionKind::Phi { incoming } => incoming.iter().map(|(_, v)| *v).collect(),
            InstructionKind::Load { address } => smallvec![*address],
            // LLVM operand order: value first, then address
            InstructionKind::Store { address, value } => smallvec![*value, *address],
            InstructionKind::GetElementPtr { base, offset } => smallvec![*base, *offset],
            InstructionKind::Alloca { .. } => SmallVec::new(),
            InstructionKind::Call { args, .. } => args.iter().copied().collect(),
        }
    }

    /// Returns the operand at `index`, if any
    pub fn operand(&self, index: usize) -> Option<Value> {
        self.operands().get(index).copied()
    }

    pub fn num_operands(&self) -> usize {
        self.operands().len()
    }

    /// Returns true if this is an integer addition
    pub const fn is_add(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Binary {
                op: BinaryOp::Add,
                ..
            }
        )
    }

    pub const fn is_phi(&self) -> bool {
        matches!(self.kind, InstructionKind::Phi { .. })
    }

    /// Returns true if this instruction reinterprets an integer as an address
    pub const fn is_pointer_forming(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Cast {
                op: CastOp::IntToPtr,
                ..
            }
        )
    }

    /// Returns true if this is a sign or zero extension
    pub const fn is_widening_cast(&self) -> bool {
        match &self.kind {
            InstructionKind::Cast { op, .. } => op.is_widening(),
            _ => false,
        }
    }

    /// Returns true if this instruction produces a value
    pub const fn has_result(&self) -> bool {
        !matches!(self.ty, IrType::Void)
    }

    /// Returns true if this instruction has side effects
    pub const fn has_side_effects(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Store { .. } | InstructionKind::Call { .. }
        )
    }

    /// Replace every operand equal to `from` with `to`
    pub fn replace_operand(&mut self, from: Value, to: Value) {
        let replace = |value: &mut Value| {
            if *value == from {
                *value = to;
            }
        };
        match &mut self.kind {
            InstructionKind::Binary { left, right, .. }
            | InstructionKind::Compare { left, right, .. } => {
                replace(left);
                replace(right);
            }
            InstructionKind::Cast { source, .. } => replace(source),
            InstructionKind::Phi { incoming } => {
                for (_, value) in incoming {
                    replace(value);
                }
            }
            InstructionKind::Load { address } => replace(address),
            InstructionKind::Store { address, value } => {
                replace(value);
                replace(address);
            }
            InstructionKind::GetElementPtr { base, offset } => {
                replace(base);
                replace(offset);
            }
            InstructionKind::Alloca { .. } => {}
            InstructionKind::Call { args, .. } => {
                for arg in args {
                    replace(arg);
                }
            }
        }
    }
}

impl PrettyPrint for CompareOp {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Slt => "slt",
            Self::Sle => "sle",
            Self::Sgt => "sgt",
            Self::Sge => "sge",
            Self::Ult => "ult",
        }
        .to_string()
    }
}

/// Renders the right-hand side of an instruction (`add i64 %1, 4`).
/// The function prints the `%id = ` prefix since only it knows the id.
impl PrettyPrint for Instruction {
    fn pretty_print(&self, _indent: usize) -> String {
        let mut result = match &self.kind {
            InstructionKind::Binary { left, right, .. } => format!(
                "{} {} {}, {}",
                self.opcode(),
                self.ty.pretty_print(0),
                left.pretty_print(0),
                right.pretty_print(0)
            ),
            InstructionKind::Compare { op, left, right } => format!(
                "icmp {} {}, {}",
                op.pretty_print(0),
                left.pretty_print(0),
                right.pretty_print(0)
            ),
            InstructionKind::Cast { source, .. } => format!(
                "{} {} to {}",
                self.opcode(),
                source.pretty_print(0),
                self.ty.pretty_print(0)
            ),
            InstructionKind::Phi { incoming } => {
                let edges = incoming
                    .iter()
                    .map(|(block, value)| {
                        format!("[ {}, {} ]", value.pretty_print(0), block.pretty_print(0))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("phi {} {}", self.ty.pretty_print(0), edges)
            }
            InstructionKind::Load { address } => format!(
                "load {}, {}",
                self.ty.pretty_print(0),
                address.pretty_print(0)
            ),
            InstructionKind::Store { address, value } => format!(
                "store {}, {}",
                value.pretty_print(0),
                address.pretty_print(0)
            ),
            InstructionKind::GetElementPtr { base, offset } => format!(
                "getelementptr {}, {}",
                base.pretty_print(0),
                offset.pretty_print(0)
            ),
            InstructionKind::Alloca { size } => format!("alloca {size}"),
            InstructionKind::Call { callee, args } => {
                let args_str = args
                    .iter()
                    .map(|arg| arg.pretty_print(0))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("call {} @{callee}({args_str})", self.ty.pretty_print(0))
            }
        };

        if let Some(comment) = &self.comment {
            result.push_str(&format!(" ; {comment}"));
        }

        result
    }
}
