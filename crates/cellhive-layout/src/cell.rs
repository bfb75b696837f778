//! Region tree: cells, their boundaries, and structural edits.
//!
//! # Design
//!
//! Cells live in an arena ([`CellTree`]) and refer to each other by
//! [`CellId`]. A cell owns an X and a Y [`Boundary`], each holding two
//! [`Coordinate`]s, so every cell has exactly four coordinates, created
//! with it and never moved to another cell.
//!
//! # Tare
//!
//! A child's coordinates are expressed relative to its parent's Alpha edge
//! on the same axis. The parent's Alpha absolute value is stored on the
//! child's coordinates as *tare*. Attaching sets it, detaching clears it,
//! and whenever a cell's Alpha absolute value changes the new tare is pushed
//! down to its children (and, transitively, to theirs).
//!
//! # Re-binding
//!
//! After every structural edit the recipes of the moved subtree and of the
//! old and new parents are re-bound, so tree-relative lengths pick up their
//! new ancestors and children.

use crate::coordinate::Coordinate;
use crate::entity::EntityId;
use crate::error::{LayoutError, Result};
use crate::length::{LengthRef, PrerequisiteChange};
use crate::signal::Signal;
use crate::{Axis, CellId, CoordinateId, Edge};
use std::rc::Rc;

// ============================================================================
// Boundary
// ============================================================================

/// Near (Alpha) and far (Beta) coordinates on one axis.
#[derive(Debug)]
pub struct Boundary {
    alpha: Coordinate,
    beta: Coordinate,
}

impl Boundary {
    #[must_use]
    pub fn alpha(&self) -> &Coordinate {
        &self.alpha
    }

    #[must_use]
    pub fn beta(&self) -> &Coordinate {
        &self.beta
    }

    #[must_use]
    pub fn edge(&self, edge: Edge) -> &Coordinate {
        match edge {
            Edge::Alpha => &self.alpha,
            Edge::Beta => &self.beta,
        }
    }

    fn edge_mut(&mut self, edge: Edge) -> &mut Coordinate {
        match edge {
            Edge::Alpha => &mut self.alpha,
            Edge::Beta => &mut self.beta,
        }
    }

    /// `(alpha, beta)` relative values, when both are known.
    #[must_use]
    pub fn relative_range(&self) -> Option<(f64, f64)> {
        self.alpha.relative_value().zip(self.beta.relative_value())
    }

    /// `(alpha, beta)` absolute values, when both are known.
    #[must_use]
    pub fn absolute_range(&self) -> Option<(f64, f64)> {
        self.alpha.absolute_value().zip(self.beta.absolute_value())
    }
}

// ============================================================================
// Cell
// ============================================================================

/// Parent transition of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentChange {
    pub cell: CellId,
    pub old: Option<CellId>,
    pub new: Option<CellId>,
}

/// A node of the region tree.
#[derive(Debug)]
pub struct Cell {
    id: CellId,
    parent: Option<CellId>,
    children: Vec<CellId>,
    x: Boundary,
    y: Boundary,
    entity: Option<EntityId>,
    debug_name: Option<String>,
    pinned: bool,
    parent_changed: Signal<ParentChange>,
    children_changed: Signal<CellId>,
}

impl Cell {
    fn new(id: CellId, [x_alpha, x_beta, y_alpha, y_beta]: [LengthRef; 4]) -> Self {
        let coordinate = |axis, edge, recipe| Coordinate::new(id.coordinate(axis, edge), recipe);
        Self {
            id,
            parent: None,
            children: Vec::new(),
            x: Boundary {
                alpha: coordinate(Axis::X, Edge::Alpha, x_alpha),
                beta: coordinate(Axis::X, Edge::Beta, x_beta),
            },
            y: Boundary {
                alpha: coordinate(Axis::Y, Edge::Alpha, y_alpha),
                beta: coordinate(Axis::Y, Edge::Beta, y_beta),
            },
            entity: None,
            debug_name: None,
            pinned: false,
            parent_changed: Signal::new(),
            children_changed: Signal::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<CellId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[CellId] {
        &self.children
    }

    #[must_use]
    pub fn boundary(&self, axis: Axis) -> &Boundary {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    fn boundary_mut(&mut self, axis: Axis) -> &mut Boundary {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }

    #[must_use]
    pub fn x_boundary(&self) -> &Boundary {
        &self.x
    }

    #[must_use]
    pub fn y_boundary(&self) -> &Boundary {
        &self.y
    }

    #[must_use]
    pub fn coordinate(&self, axis: Axis, edge: Edge) -> &Coordinate {
        self.boundary(axis).edge(edge)
    }

    /// X.Alpha, X.Beta, Y.Alpha, Y.Beta.
    #[must_use]
    pub fn coordinates(&self) -> [&Coordinate; 4] {
        [&self.x.alpha, &self.x.beta, &self.y.alpha, &self.y.beta]
    }

    #[must_use]
    pub fn entity_id(&self) -> Option<EntityId> {
        self.entity
    }

    #[must_use]
    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }

    /// Created by [`CellTree::create_root`]; never attached under another cell.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Fires once per parent transition, including moves between parents.
    pub fn parent_changed(&self) -> &Signal<ParentChange> {
        &self.parent_changed
    }

    /// Fires with this cell's id whenever its child list changes.
    pub fn children_changed(&self) -> &Signal<CellId> {
        &self.children_changed
    }
}

// ============================================================================
// CellTree
// ============================================================================

/// Arena of cells.
#[derive(Debug, Default)]
pub struct CellTree {
    cells: Vec<Cell>,
}

impl CellTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached cell whose coordinates use the given recipes, in
    /// X.Alpha, X.Beta, Y.Alpha, Y.Beta order. The recipes are wired in as
    /// is, so later edits to them affect the cell.
    pub fn create_cell(&mut self, recipes: [LengthRef; 4]) -> CellId {
        let id = CellId::from_raw(self.cells.len() as u32);
        self.cells.push(Cell::new(id, recipes));
        self.rebind([id]);
        id
    }

    /// Like [`create_cell`](Self::create_cell), with every tare fixed at 0
    /// so absolute values equal relative ones. The cell can have children
    /// but cannot itself be attached anywhere.
    pub fn create_root(&mut self, recipes: [LengthRef; 4]) -> CellId {
        let id = self.create_cell(recipes);
        if let Some(cell) = self.cells.last_mut() {
            cell.pinned = true;
            for axis in Axis::ALL {
                for edge in Edge::ALL {
                    cell.boundary_mut(axis).edge_mut(edge).store_tare(Some(0.0));
                }
            }
        }
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: CellId) -> bool {
        (id.raw() as usize) < self.cells.len()
    }

    #[must_use]
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.raw() as usize)
    }

    fn cell_mut(&mut self, id: CellId) -> Result<&mut Cell> {
        self.cells
            .get_mut(id.raw() as usize)
            .ok_or(LayoutError::UnknownCell(id))
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    #[must_use]
    pub fn coordinate(&self, id: CoordinateId) -> Option<&Coordinate> {
        self.cell(id.cell).map(|cell| cell.coordinate(id.axis, id.edge))
    }

    fn coordinate_mut(&mut self, id: CoordinateId) -> Result<&mut Coordinate> {
        Ok(self
            .cell_mut(id.cell)?
            .boundary_mut(id.axis)
            .edge_mut(id.edge))
    }

    #[must_use]
    pub fn relative_value(&self, id: CoordinateId) -> Option<f64> {
        self.coordinate(id)?.relative_value()
    }

    #[must_use]
    pub fn absolute_value(&self, id: CoordinateId) -> Option<f64> {
        self.coordinate(id)?.absolute_value()
    }

    #[must_use]
    pub fn parent(&self, id: CellId) -> Option<CellId> {
        self.cell(id)?.parent
    }

    /// Children of `id`; empty for unknown cells.
    #[must_use]
    pub fn children(&self, id: CellId) -> &[CellId] {
        match self.cell(id) {
            Some(cell) => &cell.children,
            None => &[],
        }
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        std::iter::successors(self.parent(id), move |&cell| self.parent(cell))
    }

    /// `id` followed by all its descendants, depth first.
    #[must_use]
    pub fn subtree(&self, id: CellId) -> Vec<CellId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cell) = stack.pop() {
            out.push(cell);
            stack.extend(self.children(cell).iter().rev());
        }
        out
    }

    // ── Calculation ─────────────────────────────────────────────────

    /// Recompute one coordinate from its recipe and store the result.
    ///
    /// Returns the new relative value. If an Alpha edge's absolute value
    /// moves, children are re-tared.
    pub fn calculate(&mut self, id: CoordinateId) -> Result<Option<f64>> {
        let recipe = Rc::clone(
            self.coordinate(id)
                .ok_or(LayoutError::UnknownCell(id.cell))?
                .recipe(),
        );
        let value = recipe.calculate(self)?;
        if self.coordinate_mut(id)?.store_relative(value) {
            self.cascade_tare(id);
        }
        Ok(value)
    }

    /// Set a coordinate's tare directly.
    pub fn set_tare(&mut self, id: CoordinateId, tare: Option<f64>) -> Result<()> {
        if self.coordinate_mut(id)?.store_tare(tare) {
            self.cascade_tare(id);
        }
        Ok(())
    }

    /// Replace a coordinate's recipe. Fires the prerequisite delta and an
    /// invalidation on the coordinate.
    pub fn set_recipe(&mut self, id: CoordinateId, recipe: LengthRef) -> Result<()> {
        let coordinate = self.coordinate_mut(id)?;
        let old = coordinate.recipe().prerequisites();
        coordinate.replace_recipe(Rc::clone(&recipe));
        recipe.bind(id, self);
        let change = PrerequisiteChange::between(&old, &recipe.prerequisites());
        if let Some(coordinate) = self.coordinate(id) {
            coordinate.emit_rewired(&change);
        }
        Ok(())
    }

    // ── Structure ───────────────────────────────────────────────────

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: CellId, child: CellId) -> Result<()> {
        let index = self.cell(parent).ok_or(LayoutError::UnknownCell(parent))?.children.len();
        self.insert_child(parent, child, index)
    }

    /// Insert `child` at `index` among `parent`'s children.
    ///
    /// A child attached elsewhere is moved, firing a single parent-changed
    /// notification. Fails without mutating if `child` is already a child
    /// of `parent`, if it is a root, if it would become its own ancestor, or
    /// if `index` is past the end.
    pub fn insert_child(&mut self, parent: CellId, child: CellId, index: usize) -> Result<()> {
        let len = self.cell(parent).ok_or(LayoutError::UnknownCell(parent))?.children.len();
        match self.cell(child) {
            None => return Err(LayoutError::UnknownCell(child)),
            Some(cell) if cell.pinned => return Err(LayoutError::PinnedRoot { parent, child }),
            Some(_) => {}
        }
        if self.children(parent).contains(&child) {
            return Err(LayoutError::ChildAlreadyExists { parent, child });
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(LayoutError::WouldNestInsideItself { parent, child });
        }
        if index > len {
            return Err(LayoutError::IndexOutOfBounds { parent, index, len });
        }

        let old_parent = self.parent(child);
        if let Some(old) = old_parent {
            self.unlink(old, child)?;
        }
        self.cell_mut(parent)?.children.insert(index, child);
        self.cell_mut(child)?.parent = Some(parent);
        self.retare(child)?;

        self.notify_moved(child, old_parent, Some(parent));
        if let Some(old) = old_parent {
            self.notify_children(old);
        }
        self.notify_children(parent);

        let mut affected = self.subtree(child);
        affected.extend(old_parent);
        affected.push(parent);
        self.rebind(affected);
        Ok(())
    }

    /// Detach `child` from `parent`. Fails without mutating if it is not
    /// one of `parent`'s children.
    pub fn remove_child(&mut self, parent: CellId, child: CellId) -> Result<()> {
        if !self.children(parent).contains(&child) {
            return Err(LayoutError::ChildNotFound { parent, child });
        }
        self.unlink(parent, child)?;
        self.notify_moved(child, Some(parent), None);
        self.notify_children(parent);

        let mut affected = self.subtree(child);
        affected.push(parent);
        self.rebind(affected);
        Ok(())
    }

    /// Set a diagnostic name; mirrored onto the four coordinate labels.
    pub fn set_debug_name(&mut self, id: CellId, name: Option<String>) -> Result<()> {
        let cell = self.cell_mut(id)?;
        for axis in Axis::ALL {
            for edge in Edge::ALL {
                let label = name.as_ref().map(|n| label_for(n, axis, edge));
                cell.boundary_mut(axis).edge_mut(edge).set_label(label);
            }
        }
        cell.debug_name = name;
        Ok(())
    }

    pub(crate) fn set_entity(&mut self, id: CellId, entity: EntityId) -> Result<()> {
        self.cell_mut(id)?.entity = Some(entity);
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Remove from the parent's list and clear tares; no notifications.
    fn unlink(&mut self, parent: CellId, child: CellId) -> Result<()> {
        self.cell_mut(parent)?.children.retain(|&c| c != child);
        self.cell_mut(child)?.parent = None;
        for id in child.coordinates() {
            self.set_tare(id, None)?;
        }
        Ok(())
    }

    /// Tare `child`'s coordinates from its parent's Alpha edges.
    fn retare(&mut self, child: CellId) -> Result<()> {
        let Some(parent) = self.parent(child) else {
            return Ok(());
        };
        for axis in Axis::ALL {
            let tare = self.absolute_value(parent.coordinate(axis, Edge::Alpha));
            for edge in Edge::ALL {
                self.set_tare(child.coordinate(axis, edge), tare)?;
            }
        }
        Ok(())
    }

    /// Push a changed Alpha absolute value down as tare.
    fn cascade_tare(&mut self, from: CoordinateId) {
        if from.edge != Edge::Alpha {
            return;
        }
        let mut stack = vec![from];
        while let Some(alpha) = stack.pop() {
            let tare = self.absolute_value(alpha);
            let children = self.children(alpha.cell).to_vec();
            for child in children {
                for edge in Edge::ALL {
                    let id = child.coordinate(alpha.axis, edge);
                    if let Ok(coordinate) = self.coordinate_mut(id)
                        && coordinate.store_tare(tare)
                        && edge == Edge::Alpha
                    {
                        stack.push(id);
                    }
                }
            }
        }
    }

    fn rebind(&self, cells: impl IntoIterator<Item = CellId>) {
        for cell in cells {
            for id in cell.coordinates() {
                if let Some(coordinate) = self.coordinate(id) {
                    let recipe = Rc::clone(coordinate.recipe());
                    recipe.bind(id, self);
                }
            }
        }
    }

    fn notify_moved(&self, cell: CellId, old: Option<CellId>, new: Option<CellId>) {
        if let Some(c) = self.cell(cell) {
            c.parent_changed.emit(&ParentChange { cell, old, new });
        }
    }

    fn notify_children(&self, parent: CellId) {
        if let Some(c) = self.cell(parent) {
            c.children_changed.emit(&parent);
        }
    }
}

fn label_for(name: &str, axis: Axis, edge: Edge) -> String {
    let axis = match axis {
        Axis::X => "x",
        Axis::Y => "y",
    };
    let edge = match edge {
        Edge::Alpha => "alpha",
        Edge::Beta => "beta",
    };
    format!("{name}.{axis}.{edge}")
}
