//! Lengths built from other lengths.

use super::{Length, LengthRef, LengthSignals, PrerequisiteChange, PrerequisiteUnion};
use crate::CoordinateId;
use crate::cell::CellTree;
use crate::error::Result;
use crate::signal::Subscription;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Children plus the bookkeeping that exposes them as one length.
///
/// Child notifications are forwarded: invalidations verbatim, prerequisite
/// deltas after passing through a [`PrerequisiteUnion`] so that a
/// coordinate read by two children is only reported when it enters or
/// leaves both.
pub(crate) struct Composite {
    children: Vec<LengthRef>,
    union: Rc<RefCell<PrerequisiteUnion>>,
    signals: LengthSignals,
    subscriptions: Vec<Subscription>,
}

impl Composite {
    pub(crate) fn new(children: impl IntoIterator<Item = LengthRef>) -> Self {
        let mut composite = Self {
            children: Vec::new(),
            union: Rc::new(RefCell::new(PrerequisiteUnion::default())),
            signals: LengthSignals::new(),
            subscriptions: Vec::new(),
        };
        for child in children {
            composite.push(child);
        }
        composite
    }

    pub(crate) fn push(&mut self, child: LengthRef) {
        let delta = self
            .union
            .borrow_mut()
            .absorb(&PrerequisiteChange::added(child.prerequisites()));

        let out = self.signals.clone();
        self.subscriptions.push(
            child
                .signals()
                .invalidated
                .subscribe(move |()| out.invalidated.emit(&())),
        );

        let out = self.signals.clone();
        let union = Rc::clone(&self.union);
        self.subscriptions.push(child.signals().prerequisites_changed.subscribe(
            move |change| {
                let visible = union.borrow_mut().absorb(change);
                if !visible.is_empty() {
                    out.prerequisites_changed.emit(&visible);
                }
            },
        ));

        self.children.push(child);
        if !delta.is_empty() {
            self.signals.prerequisites_changed.emit(&delta);
        }
    }

    pub(crate) fn child(&self, index: usize) -> &LengthRef {
        &self.children[index]
    }

    pub(crate) fn prerequisites(&self) -> Vec<CoordinateId> {
        self.union.borrow().members()
    }

    pub(crate) fn signals(&self) -> &LengthSignals {
        &self.signals
    }

    pub(crate) fn bind(&self, owner: CoordinateId, tree: &CellTree) {
        for child in &self.children {
            child.bind(owner, tree);
        }
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.children).finish()
    }
}

// ============================================================================
// Binary
// ============================================================================

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide => lhs / rhs,
        }
    }
}

/// `lhs op rhs`. Absent if either side is absent.
#[derive(Debug)]
pub struct Binary {
    op: BinaryOp,
    operands: Composite,
}

impl Binary {
    #[must_use]
    pub fn new(op: BinaryOp, lhs: LengthRef, rhs: LengthRef) -> Self {
        Self {
            op,
            operands: Composite::new([lhs, rhs]),
        }
    }

    #[must_use]
    pub fn add(lhs: LengthRef, rhs: LengthRef) -> Rc<Self> {
        Rc::new(Self::new(BinaryOp::Add, lhs, rhs))
    }

    #[must_use]
    pub fn subtract(lhs: LengthRef, rhs: LengthRef) -> Rc<Self> {
        Rc::new(Self::new(BinaryOp::Subtract, lhs, rhs))
    }

    #[must_use]
    pub fn multiply(lhs: LengthRef, rhs: LengthRef) -> Rc<Self> {
        Rc::new(Self::new(BinaryOp::Multiply, lhs, rhs))
    }

    #[must_use]
    pub fn divide(lhs: LengthRef, rhs: LengthRef) -> Rc<Self> {
        Rc::new(Self::new(BinaryOp::Divide, lhs, rhs))
    }
}

impl Length for Binary {
    fn calculate(&self, tree: &CellTree) -> Result<Option<f64>> {
        let lhs = self.operands.child(0).calculate(tree)?;
        let rhs = self.operands.child(1).calculate(tree)?;
        Ok(lhs.zip(rhs).map(|(l, r)| self.op.apply(l, r)))
    }

    fn prerequisites(&self) -> Vec<CoordinateId> {
        self.operands.prerequisites()
    }

    fn signals(&self) -> &LengthSignals {
        self.operands.signals()
    }

    fn bind(&self, owner: CoordinateId, tree: &CellTree) {
        self.operands.bind(owner, tree);
    }
}

// ============================================================================
// Fallback
// ============================================================================

/// Use `preferred` when it has a value, otherwise `fallback`.
#[derive(Debug)]
pub struct Fallback {
    options: Composite,
}

impl Fallback {
    #[must_use]
    pub fn new(preferred: LengthRef, fallback: LengthRef) -> Self {
        Self {
            options: Composite::new([preferred, fallback]),
        }
    }
}

impl Length for Fallback {
    fn calculate(&self, tree: &CellTree) -> Result<Option<f64>> {
        match self.options.child(0).calculate(tree)? {
            Some(value) => Ok(Some(value)),
            None => self.options.child(1).calculate(tree),
        }
    }

    fn prerequisites(&self) -> Vec<CoordinateId> {
        self.options.prerequisites()
    }

    fn signals(&self) -> &LengthSignals {
        self.options.signals()
    }

    fn bind(&self, owner: CoordinateId, tree: &CellTree) {
        self.options.bind(owner, tree);
    }
}
