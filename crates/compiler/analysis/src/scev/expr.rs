//! Symbolic expressions produced by the evolution oracle.

use std::fmt;

use hls_compiler_ir::{BasicBlockId, PrettyPrint, Value};

/// A closed-form description of the value an instruction takes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScevExpr {
    Constant(i64),
    /// A value the oracle cannot see through (argument, load, call, ...)
    Unknown(Value),
    Add(Vec<ScevExpr>),
    Mul(Vec<ScevExpr>),
    /// `{start,+,step,+,...}<header>`: a recurrence over the iterations of a loop
    AddRec(RecurrenceDescriptor),
}

/// How fast a recurrence grows with the iteration count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecurrenceDegree {
    /// Only a start operand
    Invariant,
    Affine,
    Quadratic,
    Higher(usize),
}

/// Operands of an add-recurrence, outermost first
///
/// At iteration `k` of the loop headed by `loop_header` the value is
/// `op0 + op1*C(k,1) + op2*C(k,2) + ...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrenceDescriptor {
    pub loop_header: BasicBlockId,
    pub operands: Vec<ScevExpr>,
}

impl RecurrenceDescriptor {
    pub fn new(loop_header: BasicBlockId, operands: Vec<ScevExpr>) -> Self {
        Self {
            loop_header,
            operands,
        }
    }

    pub fn degree(&self) -> RecurrenceDegree {
        match self.operands.len() {
            0 | 1 => RecurrenceDegree::Invariant,
            2 => RecurrenceDegree::Affine,
            3 => RecurrenceDegree::Quadratic,
            n => RecurrenceDegree::Higher(n - 1),
        }
    }

    pub fn start(&self) -> Option<&ScevExpr> {
        self.operands.first()
    }

    pub fn step(&self) -> Option<&ScevExpr> {
        self.operands.get(1)
    }

    /// The increment of the step; present on quadratic recurrences
    pub fn second_step(&self) -> Option<&ScevExpr> {
        self.operands.get(2)
    }

    /// Returns operand `index` if it is a compile-time integer
    pub fn constant_operand(&self, index: usize) -> Option<i64> {
        self.operands.get(index).and_then(ScevExpr::as_constant)
    }

    /// Value of the recurrence at iteration `k`, if every operand is constant
    pub fn evaluate_at(&self, k: i64) -> Option<i64> {
        let mut total = 0i64;
        let mut binomial = 1i64;
        for (i, operand) in self.operands.iter().enumerate() {
            let c = operand.as_constant()?;
            total = total.wrapping_add(c.wrapping_mul(binomial));
            // C(k, i+1) = C(k, i) * (k - i) / (i + 1)
            binomial = binomial.wrapping_mul(k.wrapping_sub(i as i64)) / (i as i64 + 1);
        }
        Some(total)
    }
}

impl ScevExpr {
    pub const fn zero() -> Self {
        Self::Constant(0)
    }

    pub const fn as_constant(&self) -> Option<i64> {
        match self {
            Self::Constant(c) => Some(*c),
            _ => None,
        }
    }

    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    pub const fn as_recurrence(&self) -> Option<&RecurrenceDescriptor> {
        match self {
            Self::AddRec(rec) => Some(rec),
            _ => None,
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[ScevExpr], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{term}")?;
    }
    write!(f, ")")
}

impl fmt::Display for ScevExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => write!(f, "{c}"),
            Self::Unknown(value) => write!(f, "{value}"),
            Self::Add(terms) => write_joined(f, terms, " + "),
            Self::Mul(terms) => write_joined(f, terms, " * "),
            Self::AddRec(rec) => write!(f, "{rec}"),
        }
    }
}

impl fmt::Display for RecurrenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, ",+,")?;
            }
            write!(f, "{operand}")?;
        }
        write!(f, "}}<{}>", self.loop_header.pretty_print(0))
    }
}

impl fmt::Display for RecurrenceDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invariant => write!(f, "invariant"),
            Self::Affine => write!(f, "affine"),
            Self::Quadratic => write!(f, "quadratic"),
            Self::Higher(n) => write!(f, "degree {n}"),
        }
    }
}
