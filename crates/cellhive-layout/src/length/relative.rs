//! Lengths whose inputs depend on where the owning cell sits in the tree.
//!
//! Each of these is bound to its owning coordinate via [`Length::bind`];
//! the owner's axis decides which boundary of the related cell is read.

use super::{Length, LengthSignals};
use crate::cell::CellTree;
use crate::error::{LayoutError, Result};
use crate::{CoordinateId, Edge};
use std::cell::{Cell, RefCell};

// ============================================================================
// AncestorSpan
// ============================================================================

/// A fraction of an ancestor's extent on the owner's axis.
///
/// Reads the ancestor's Alpha and Beta relative values; the extent is
/// `beta - alpha`.
#[derive(Debug)]
pub struct AncestorSpan {
    generations: usize,
    factor: f64,
    bound: RefCell<Vec<CoordinateId>>,
    signals: LengthSignals,
}

impl AncestorSpan {
    /// The full extent of the parent.
    #[must_use]
    pub fn parent() -> Self {
        Self::new(1, 1.0)
    }

    /// `percent`% of the parent's extent.
    #[must_use]
    pub fn percent(percent: f64) -> Self {
        Self::new(1, percent / 100.0)
    }

    /// `factor` times the extent of the ancestor `generations` levels up
    /// (1 = parent). A zero generation count is treated as 1.
    #[must_use]
    pub fn new(generations: usize, factor: f64) -> Self {
        Self {
            generations: generations.max(1),
            factor,
            bound: RefCell::new(Vec::new()),
            signals: LengthSignals::new(),
        }
    }

    #[must_use]
    pub fn generations(&self) -> usize {
        self.generations
    }
}

impl Length for AncestorSpan {
    fn calculate(&self, tree: &CellTree) -> Result<Option<f64>> {
        let bound = self.bound.borrow();
        let [alpha, beta] = bound.as_slice() else {
            return Ok(None);
        };
        let span = tree
            .relative_value(*alpha)
            .zip(tree.relative_value(*beta))
            .map(|(a, b)| (b - a) * self.factor);
        Ok(span)
    }

    fn prerequisites(&self) -> Vec<CoordinateId> {
        self.bound.borrow().clone()
    }

    fn signals(&self) -> &LengthSignals {
        &self.signals
    }

    fn bind(&self, owner: CoordinateId, tree: &CellTree) {
        let next: Vec<CoordinateId> = tree
            .ancestors(owner.cell)
            .nth(self.generations - 1)
            .map(|ancestor| {
                vec![
                    ancestor.coordinate(owner.axis, Edge::Alpha),
                    ancestor.coordinate(owner.axis, Edge::Beta),
                ]
            })
            .unwrap_or_default();
        let old = self.bound.replace(next.clone());
        self.signals.rebound(&old, &next);
    }
}

// ============================================================================
// ChildrenMax
// ============================================================================

/// The largest Beta relative value among the owner's direct children on
/// the owner's axis. Children without a value are skipped; absent when no
/// child has one.
#[derive(Debug, Default)]
pub struct ChildrenMax {
    bound: RefCell<Vec<CoordinateId>>,
    signals: LengthSignals,
}

impl ChildrenMax {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Length for ChildrenMax {
    fn calculate(&self, tree: &CellTree) -> Result<Option<f64>> {
        Ok(self
            .bound
            .borrow()
            .iter()
            .filter_map(|&beta| tree.relative_value(beta))
            .reduce(f64::max))
    }

    fn prerequisites(&self) -> Vec<CoordinateId> {
        self.bound.borrow().clone()
    }

    fn signals(&self) -> &LengthSignals {
        &self.signals
    }

    fn bind(&self, owner: CoordinateId, tree: &CellTree) {
        let next: Vec<CoordinateId> = tree
            .children(owner.cell)
            .iter()
            .map(|child| child.coordinate(owner.axis, Edge::Beta))
            .collect();
        let old = self.bound.replace(next.clone());
        self.signals.rebound(&old, &next);
    }
}

// ============================================================================
// Sibling
// ============================================================================

/// An edge of the sibling immediately preceding the owner, plus an offset.
///
/// The sibling is resolved once, the first time the owner is bound while
/// it has a parent; later moves do not change it. With no such sibling the
/// strict form fails with [`LayoutError::NoPreviousPeer`] and the lenient
/// form ([`Sibling::try_after`]) yields no value.
#[derive(Debug)]
pub struct Sibling {
    edge: Edge,
    offset: f64,
    strict: bool,
    owner: Cell<Option<CoordinateId>>,
    peer: Cell<Option<CoordinateId>>,
    resolved: Cell<bool>,
    signals: LengthSignals,
}

impl Sibling {
    /// Strict form: calculating without a preceding sibling is an error.
    #[must_use]
    pub fn after(edge: Edge) -> Self {
        Self::build(edge, true)
    }

    /// Lenient form: no preceding sibling means no value.
    #[must_use]
    pub fn try_after(edge: Edge) -> Self {
        Self::build(edge, false)
    }

    fn build(edge: Edge, strict: bool) -> Self {
        Self {
            edge,
            offset: 0.0,
            strict,
            owner: Cell::new(None),
            peer: Cell::new(None),
            resolved: Cell::new(false),
            signals: LengthSignals::new(),
        }
    }

    /// Add a constant offset to the sibling's edge.
    #[must_use]
    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// The sibling coordinate this length reads, once resolved.
    #[must_use]
    pub fn peer(&self) -> Option<CoordinateId> {
        self.peer.get()
    }
}

impl Length for Sibling {
    fn calculate(&self, tree: &CellTree) -> Result<Option<f64>> {
        match self.peer.get() {
            Some(peer) => Ok(tree.relative_value(peer).map(|v| v + self.offset)),
            None if self.strict => Err(LayoutError::NoPreviousPeer {
                owner: self.owner.get(),
            }),
            None => Ok(None),
        }
    }

    fn prerequisites(&self) -> Vec<CoordinateId> {
        self.peer.get().into_iter().collect()
    }

    fn signals(&self) -> &LengthSignals {
        &self.signals
    }

    fn bind(&self, owner: CoordinateId, tree: &CellTree) {
        self.owner.set(Some(owner));
        let Some(parent) = tree.parent(owner.cell) else {
            return;
        };
        if self.resolved.replace(true) {
            return;
        }
        let siblings = tree.children(parent);
        let peer = siblings
            .iter()
            .position(|&c| c == owner.cell)
            .and_then(|at| at.checked_sub(1))
            .map(|prev| siblings[prev].coordinate(owner.axis, self.edge));
        self.peer.set(peer);
        self.signals
            .rebound(&[], &peer.into_iter().collect::<Vec<_>>());
    }
}
