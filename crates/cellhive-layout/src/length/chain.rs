//! N-ary arithmetic over lengths and plain numbers.

use super::composite::{BinaryOp, Composite};
use super::{Length, LengthRef, LengthSignals};
use crate::CoordinateId;
use crate::cell::CellTree;
use crate::error::{LayoutError, Result};
use std::rc::Rc;

/// One term of a [`Chain`].
#[derive(Debug, Clone)]
pub enum Operand {
    Length(LengthRef),
    Value(f64),
}

impl Operand {
    fn value(&self, tree: &CellTree) -> Result<Option<f64>> {
        match self {
            Self::Length(length) => length.calculate(tree),
            Self::Value(value) => Ok(Some(*value)),
        }
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

impl From<LengthRef> for Operand {
    fn from(length: LengthRef) -> Self {
        Self::Length(length)
    }
}

impl<L: Length + 'static> From<Rc<L>> for Operand {
    fn from(length: Rc<L>) -> Self {
        Self::Length(length)
    }
}

/// Operands combined left to right without precedence.
///
/// `a - (b + c) + d` is built as
/// `Chain::new(a).minus(Rc::new(Chain::new(b).plus(c))).plus(d)`; nesting
/// is how grouping is expressed. Requires exactly one fewer operator than
/// operands; [`Chain::from_parts`] can build a mismatched chain, which then
/// fails on [`calculate`](Length::calculate).
#[derive(Debug)]
pub struct Chain {
    operands: Vec<Operand>,
    operators: Vec<BinaryOp>,
    lengths: Composite,
}

impl Chain {
    /// Start a chain with its first operand.
    #[must_use]
    pub fn new(first: impl Into<Operand>) -> Self {
        Self::from_parts(vec![first.into()], Vec::new())
    }

    /// Build from raw parts. Counts are checked when calculating.
    #[must_use]
    pub fn from_parts(operands: Vec<Operand>, operators: Vec<BinaryOp>) -> Self {
        let lengths = Composite::new(operands.iter().filter_map(|operand| match operand {
            Operand::Length(length) => Some(Rc::clone(length)),
            Operand::Value(_) => None,
        }));
        Self {
            operands,
            operators,
            lengths,
        }
    }

    /// Append `op operand`.
    #[must_use]
    pub fn then(mut self, op: BinaryOp, operand: impl Into<Operand>) -> Self {
        let operand = operand.into();
        if let Operand::Length(length) = &operand {
            self.lengths.push(Rc::clone(length));
        }
        self.operators.push(op);
        self.operands.push(operand);
        self
    }

    #[must_use]
    pub fn plus(self, operand: impl Into<Operand>) -> Self {
        self.then(BinaryOp::Add, operand)
    }

    #[must_use]
    pub fn minus(self, operand: impl Into<Operand>) -> Self {
        self.then(BinaryOp::Subtract, operand)
    }

    #[must_use]
    pub fn times(self, operand: impl Into<Operand>) -> Self {
        self.then(BinaryOp::Multiply, operand)
    }

    #[must_use]
    pub fn divided_by(self, operand: impl Into<Operand>) -> Self {
        self.then(BinaryOp::Divide, operand)
    }
}

impl Length for Chain {
    fn calculate(&self, tree: &CellTree) -> Result<Option<f64>> {
        if self.operators.len() + 1 != self.operands.len() {
            return Err(LayoutError::ArithmeticMismatch {
                operands: self.operands.len(),
                operators: self.operators.len(),
            });
        }
        let Some(mut acc) = self.operands[0].value(tree)? else {
            return Ok(None);
        };
        for (op, operand) in self.operators.iter().zip(&self.operands[1..]) {
            let Some(value) = operand.value(tree)? else {
                return Ok(None);
            };
            acc = op.apply(acc, value);
        }
        Ok(Some(acc))
    }

    fn prerequisites(&self) -> Vec<CoordinateId> {
        self.lengths.prerequisites()
    }

    fn signals(&self) -> &LengthSignals {
        self.lengths.signals()
    }

    fn bind(&self, owner: CoordinateId, tree: &CellTree) {
        self.lengths.bind(owner, tree);
    }
}
