//! Formula lengths: the recipes coordinates get their values from.
//!
//! # Design
//!
//! A [`Length`] is a lazily evaluated formula. It reads other coordinates
//! through the [`CellTree`] passed to [`Length::calculate`], and advertises
//! which ones via [`Length::prerequisites`]. Two notification channels in
//! [`LengthSignals`] tell the owner when to react:
//!
//! - `invalidated`: the output would change without any prerequisite
//!   changing (a constant was edited, a tree-relative reference moved).
//! - `prerequisites_changed`: the prerequisite set gained or lost members.
//!
//! Lengths are shared behind [`LengthRef`] (`Rc<dyn Length>`), so a caller
//! that keeps a handle to, say, a [`Constant`] can keep editing it after it
//! was wired into a cell. Mutation goes through interior mutability; every
//! method takes `&self`.
//!
//! # Variants
//!
//! | Type            | Value                                            |
//! |-----------------|--------------------------------------------------|
//! | [`Constant`]    | a stored scalar                                  |
//! | [`AncestorSpan`]| a fraction of an ancestor's extent on this axis  |
//! | [`ChildrenMax`] | the largest far edge among direct children       |
//! | [`Sibling`]     | an edge of the preceding sibling plus an offset  |
//! | [`Fallback`]    | the preferred length, else the fallback          |
//! | [`Binary`]      | `lhs (+ - × ÷) rhs`                              |
//! | [`Chain`]       | a left fold of operators over operands           |

mod chain;
mod composite;
mod constant;
mod relative;

pub use chain::{Chain, Operand};
pub use composite::{Binary, BinaryOp, Fallback};
pub use constant::{Constant, length};
pub use relative::{AncestorSpan, ChildrenMax, Sibling};

use crate::CoordinateId;
use crate::cell::CellTree;
use crate::error::Result;
use crate::signal::Signal;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a length.
pub type LengthRef = Rc<dyn Length>;

/// A formula producing one coordinate's value.
pub trait Length: fmt::Debug {
    /// Evaluate against the current values in `tree`.
    ///
    /// `Ok(None)` means "no value yet" (an input is itself absent).
    fn calculate(&self, tree: &CellTree) -> Result<Option<f64>>;

    /// Coordinates this length currently reads, without duplicates.
    fn prerequisites(&self) -> Vec<CoordinateId>;

    /// Notification channels for this length.
    fn signals(&self) -> &LengthSignals;

    /// Resolve tree-relative references for the coordinate that owns this
    /// length. Called when the length is wired in and again whenever the
    /// owner's position in the tree changes.
    fn bind(&self, _owner: CoordinateId, _tree: &CellTree) {}
}

/// The two notification channels every length exposes.
#[derive(Debug, Clone, Default)]
pub struct LengthSignals {
    pub invalidated: Signal<()>,
    pub prerequisites_changed: Signal<PrerequisiteChange>,
}

impl LengthSignals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a move from `old` to `new` prerequisites. Emits nothing if
    /// the sets are equal; otherwise the delta followed by an invalidation.
    pub(crate) fn rebound(&self, old: &[CoordinateId], new: &[CoordinateId]) {
        let change = PrerequisiteChange::between(old, new);
        if change.is_empty() {
            return;
        }
        self.prerequisites_changed.emit(&change);
        self.invalidated.emit(&());
    }
}

/// Delta of a prerequisite set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrerequisiteChange {
    pub added: Vec<CoordinateId>,
    pub removed: Vec<CoordinateId>,
}

impl PrerequisiteChange {
    /// Everything in `items` enters the set.
    #[must_use]
    pub fn added(items: Vec<CoordinateId>) -> Self {
        Self {
            added: items,
            removed: Vec::new(),
        }
    }

    /// Everything in `items` leaves the set.
    #[must_use]
    pub fn removed(items: Vec<CoordinateId>) -> Self {
        Self {
            added: Vec::new(),
            removed: items,
        }
    }

    /// Delta turning `old` into `new`.
    #[must_use]
    pub fn between(old: &[CoordinateId], new: &[CoordinateId]) -> Self {
        Self {
            added: new.iter().filter(|c| !old.contains(c)).copied().collect(),
            removed: old.iter().filter(|c| !new.contains(c)).copied().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Reference-counted union of several children's prerequisite sets.
///
/// A coordinate held by two children has a count of two; it only leaves the
/// union when both release it.
#[derive(Debug, Default)]
pub(crate) struct PrerequisiteUnion {
    counts: FxHashMap<CoordinateId, usize>,
    order: Vec<CoordinateId>,
}

impl PrerequisiteUnion {
    /// Apply one child's delta; return the externally visible delta.
    pub(crate) fn absorb(&mut self, change: &PrerequisiteChange) -> PrerequisiteChange {
        let mut visible = PrerequisiteChange::default();
        for id in &change.removed {
            let Some(count) = self.counts.get_mut(id) else {
                continue;
            };
            *count -= 1;
            if *count == 0 {
                self.counts.remove(id);
                self.order.retain(|c| c != id);
                visible.removed.push(*id);
            }
        }
        for id in &change.added {
            let count = self.counts.entry(*id).or_insert(0);
            *count += 1;
            if *count == 1 {
                self.order.push(*id);
                visible.added.push(*id);
            }
        }
        visible
    }

    pub(crate) fn members(&self) -> Vec<CoordinateId> {
        self.order.clone()
    }

    #[cfg(test)]
    pub(crate) fn count(&self, id: &CoordinateId) -> usize {
        self.counts.get(id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Axis, CellId, Edge};

    fn c(n: u32) -> CoordinateId {
        CellId::from_raw(n).coordinate(Axis::X, Edge::Beta)
    }

    #[test]
    fn between_reports_both_directions() {
        let change = PrerequisiteChange::between(&[c(1), c(2)], &[c(2), c(3)]);
        assert_eq!(change.added, vec![c(3)]);
        assert_eq!(change.removed, vec![c(1)]);
    }

    #[test]
    fn shared_member_survives_one_release() {
        let mut union = PrerequisiteUnion::default();
        let first = union.absorb(&PrerequisiteChange::added(vec![c(1), c(2)]));
        assert_eq!(first.added, vec![c(1), c(2)]);

        // Second child also reads c(2): nothing new is visible.
        let second = union.absorb(&PrerequisiteChange::added(vec![c(2)]));
        assert!(second.is_empty());
        assert_eq!(union.count(&c(2)), 2);

        // First child drops c(2): still held by the second child.
        let third = union.absorb(&PrerequisiteChange::removed(vec![c(2)]));
        assert!(third.is_empty());
        assert_eq!(union.members(), vec![c(1), c(2)]);

        // Second child drops it too: now it leaves.
        let fourth = union.absorb(&PrerequisiteChange::removed(vec![c(2)]));
        assert_eq!(fourth.removed, vec![c(2)]);
        assert_eq!(union.members(), vec![c(1)]);
    }

    #[test]
    fn releasing_unknown_member_is_ignored() {
        let mut union = PrerequisiteUnion::default();
        let change = union.absorb(&PrerequisiteChange::removed(vec![c(9)]));
        assert!(change.is_empty());
    }
}
