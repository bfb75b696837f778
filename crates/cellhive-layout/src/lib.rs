#![forbid(unsafe_code)]

//! Incremental region layout driven by formula lengths.
//!
//! A [`Hive`] owns a tree of cells. Each cell has an X and a Y
//! [`Boundary`], each boundary a near (`Alpha`) and far (`Beta`)
//! [`Coordinate`], and every coordinate gets its value from a [`Length`]
//! recipe that may read other coordinates. [`Hive::layout`] recomputes only
//! the coordinates that are new, were invalidated, or sit downstream of a
//! coordinate whose value actually changed.
//!
//! ```
//! use cellhive_layout::{Axis, Hive};
//!
//! let mut hive = Hive::new();
//! hive.set_viewport_size(1350.0, 1280.0);
//! hive.layout().unwrap();
//!
//! let root = hive.root();
//! let x = hive.tree().cell(root).unwrap().boundary(Axis::X);
//! assert_eq!(x.absolute_range(), Some((0.0, 1350.0)));
//! ```

pub mod cell;
pub mod coordinate;
pub mod entity;
pub mod error;
pub mod hive;
pub mod length;
pub mod recipe;
pub mod signal;

pub use cell::{Boundary, Cell, CellTree, ParentChange};
pub use coordinate::{Coordinate, ValueChange};
pub use entity::{Entities, EntityId, EntityStore};
pub use error::{LayoutError, Result, ValueKind};
pub use hive::{Hive, HiveConfig, LayoutStats};
pub use length::{
    AncestorSpan, Binary, BinaryOp, Chain, ChildrenMax, Constant, Fallback, Length, LengthRef,
    LengthSignals, Operand, PrerequisiteChange, Sibling, length,
};
pub use recipe::{CellBuilder, CellRecipe};
pub use signal::{Signal, Subscription};

use std::fmt;

/// Layout axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];
}

/// Edge of a boundary: `Alpha` is the near edge, `Beta` the far edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Edge {
    Alpha,
    Beta,
}

impl Edge {
    pub const ALL: [Edge; 2] = [Edge::Alpha, Edge::Beta];
}

/// Handle to a cell in a [`CellTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u32);

impl CellId {
    /// Create a handle from a raw arena index.
    #[must_use]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Raw arena index.
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// The coordinate of this cell at (`axis`, `edge`).
    #[must_use]
    pub fn coordinate(self, axis: Axis, edge: Edge) -> CoordinateId {
        CoordinateId {
            cell: self,
            axis,
            edge,
        }
    }

    /// The four coordinates in fixed order: X.Alpha, X.Beta, Y.Alpha, Y.Beta.
    #[must_use]
    pub fn coordinates(self) -> [CoordinateId; 4] {
        [
            self.coordinate(Axis::X, Edge::Alpha),
            self.coordinate(Axis::X, Edge::Beta),
            self.coordinate(Axis::Y, Edge::Alpha),
            self.coordinate(Axis::Y, Edge::Beta),
        ]
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Identity of one coordinate: one edge of one cell on one axis.
///
/// Coordinates are never reassigned to another cell, so this triple is a
/// stable key for the prerequisite graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinateId {
    pub cell: CellId,
    pub axis: Axis,
    pub edge: Edge,
}

impl fmt::Display for CoordinateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axis = match self.axis {
            Axis::X => 'x',
            Axis::Y => 'y',
        };
        let edge = match self.edge {
            Edge::Alpha => "alpha",
            Edge::Beta => "beta",
        };
        write!(f, "{}.{axis}.{edge}", self.cell)
    }
}
