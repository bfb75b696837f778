//! One edge of one boundary.
//!
//! # Invariants
//!
//! 1. `absolute == relative + tare` when both are present, absent otherwise.
//! 2. Change notifications fire only when the optional value differs from
//!    the previous one (`Option<f64>` equality, no tolerance).
//! 3. The recipe's `invalidated` and `prerequisites_changed` notifications
//!    are re-emitted verbatim on the coordinate's own channels.

use crate::error::{LayoutError, Result, ValueKind};
use crate::length::{LengthRef, PrerequisiteChange};
use crate::signal::{Signal, Subscription};
use crate::CoordinateId;
use std::rc::Rc;

/// Old and new value of a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueChange {
    pub coordinate: CoordinateId,
    pub old: Option<f64>,
    pub new: Option<f64>,
}

/// A lazily computed scalar position.
#[derive(Debug)]
pub struct Coordinate {
    id: CoordinateId,
    recipe: LengthRef,
    relative: Option<f64>,
    tare: Option<f64>,
    absolute: Option<f64>,
    label: Option<String>,
    invalidated: Signal<()>,
    prerequisites_changed: Signal<PrerequisiteChange>,
    relative_changed: Signal<ValueChange>,
    absolute_changed: Signal<ValueChange>,
    forwarding: Vec<Subscription>,
}

impl Coordinate {
    pub(crate) fn new(id: CoordinateId, recipe: LengthRef) -> Self {
        let mut coordinate = Self {
            id,
            recipe: Rc::clone(&recipe),
            relative: None,
            tare: None,
            absolute: None,
            label: None,
            invalidated: Signal::new(),
            prerequisites_changed: Signal::new(),
            relative_changed: Signal::new(),
            absolute_changed: Signal::new(),
            forwarding: Vec::new(),
        };
        coordinate.forward(&recipe);
        coordinate
    }

    fn forward(&mut self, recipe: &LengthRef) {
        let invalidated = self.invalidated.clone();
        let prerequisites_changed = self.prerequisites_changed.clone();
        self.forwarding = vec![
            recipe
                .signals()
                .invalidated
                .subscribe(move |()| invalidated.emit(&())),
            recipe
                .signals()
                .prerequisites_changed
                .subscribe(move |change| prerequisites_changed.emit(change)),
        ];
    }

    // ── Values ──────────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> CoordinateId {
        self.id
    }

    #[must_use]
    pub fn recipe(&self) -> &LengthRef {
        &self.recipe
    }

    /// Last computed recipe output; absent before the first calculation.
    #[must_use]
    pub fn relative_value(&self) -> Option<f64> {
        self.relative
    }

    #[must_use]
    pub fn tare(&self) -> Option<f64> {
        self.tare
    }

    /// `relative + tare`, when both are present.
    #[must_use]
    pub fn absolute_value(&self) -> Option<f64> {
        self.absolute
    }

    /// Relative value, failing if it has not been computed.
    pub fn require_relative(&self) -> Result<f64> {
        self.relative.ok_or(LayoutError::MissingValue {
            coordinate: self.id,
            kind: ValueKind::Relative,
        })
    }

    /// Absolute value, failing if relative value or tare is missing.
    pub fn require_absolute(&self) -> Result<f64> {
        self.absolute.ok_or(LayoutError::MissingValue {
            coordinate: self.id,
            kind: ValueKind::Absolute,
        })
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    // ── Notifications ───────────────────────────────────────────────

    pub fn invalidated(&self) -> &Signal<()> {
        &self.invalidated
    }

    pub fn prerequisites_changed(&self) -> &Signal<PrerequisiteChange> {
        &self.prerequisites_changed
    }

    pub fn relative_changed(&self) -> &Signal<ValueChange> {
        &self.relative_changed
    }

    pub fn absolute_changed(&self) -> &Signal<ValueChange> {
        &self.absolute_changed
    }

    // ── Mutation (tree only) ────────────────────────────────────────

    /// Store a freshly calculated relative value. Returns whether the
    /// absolute value changed.
    pub(crate) fn store_relative(&mut self, value: Option<f64>) -> bool {
        let old = self.relative;
        if old != value {
            self.relative = value;
            self.relative_changed.emit(&ValueChange {
                coordinate: self.id,
                old,
                new: value,
            });
        }
        self.refresh_absolute()
    }

    /// Returns whether the absolute value changed.
    pub(crate) fn store_tare(&mut self, tare: Option<f64>) -> bool {
        self.tare = tare;
        self.refresh_absolute()
    }

    fn refresh_absolute(&mut self) -> bool {
        let old = self.absolute;
        let new = self.relative.zip(self.tare).map(|(r, t)| r + t);
        if old == new {
            return false;
        }
        self.absolute = new;
        self.absolute_changed.emit(&ValueChange {
            coordinate: self.id,
            old,
            new,
        });
        true
    }

    /// Swap the recipe and re-subscribe to it.
    pub(crate) fn replace_recipe(&mut self, recipe: LengthRef) {
        self.forward(&recipe);
        self.recipe = recipe;
    }

    pub(crate) fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub(crate) fn emit_rewired(&self, change: &PrerequisiteChange) {
        if !change.is_empty() {
            self.prerequisites_changed.emit(change);
        }
        self.invalidated.emit(&());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::length::length;
    use crate::{Axis, CellId, Edge};
    use std::cell::{Cell, RefCell};

    fn id() -> CoordinateId {
        CellId::from_raw(0).coordinate(Axis::X, Edge::Alpha)
    }

    #[test]
    fn values_absent_before_calculation() {
        let coordinate = Coordinate::new(id(), length(3.0));
        assert_eq!(coordinate.relative_value(), None);
        assert_eq!(coordinate.absolute_value(), None);
        assert_eq!(
            coordinate.require_relative(),
            Err(LayoutError::MissingValue {
                coordinate: id(),
                kind: ValueKind::Relative
            })
        );
        assert!(coordinate.require_absolute().is_err());
    }

    #[test]
    fn absolute_needs_both_parts() {
        let mut coordinate = Coordinate::new(id(), length(3.0));
        assert!(!coordinate.store_relative(Some(13.0)));
        assert_eq!(coordinate.absolute_value(), None);
        assert!(coordinate.store_tare(Some(2.5)));
        assert_eq!(coordinate.absolute_value(), Some(15.5));
        assert!(coordinate.store_tare(None));
        assert_eq!(coordinate.absolute_value(), None);
        assert_eq!(coordinate.require_relative(), Ok(13.0));
    }

    #[test]
    fn change_notifications_fire_only_on_difference() {
        let mut coordinate = Coordinate::new(id(), length(3.0));
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = Rc::clone(&log);
        let _sub = coordinate
            .relative_changed()
            .subscribe(move |change| log2.borrow_mut().push(*change));

        coordinate.store_relative(Some(1.0));
        coordinate.store_relative(Some(1.0));
        coordinate.store_relative(None);
        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!((log[0].old, log[0].new), (None, Some(1.0)));
        assert_eq!((log[1].old, log[1].new), (Some(1.0), None));
    }

    #[test]
    fn recipe_invalidation_is_reemitted() {
        let recipe = length(1.0);
        let coordinate = Coordinate::new(id(), recipe.clone());
        let hits = Rc::new(Cell::new(0));
        let hits2 = Rc::clone(&hits);
        let _sub = coordinate
            .invalidated()
            .subscribe(move |()| hits2.set(hits2.get() + 1));
        recipe.set(2.0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn replaced_recipe_stops_forwarding_old_one() {
        let old = length(1.0);
        let mut coordinate = Coordinate::new(id(), old.clone());
        let fresh = length(2.0);
        coordinate.replace_recipe(fresh.clone());

        let hits = Rc::new(Cell::new(0));
        let hits2 = Rc::clone(&hits);
        let _sub = coordinate
            .invalidated()
            .subscribe(move |()| hits2.set(hits2.get() + 1));
        old.set(10.0);
        assert_eq!(hits.get(), 0);
        fresh.set(10.0);
        assert_eq!(hits.get(), 1);
    }
}
