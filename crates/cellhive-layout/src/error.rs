//! Error taxonomy for the layout model.

use crate::{CellId, CoordinateId};
use cellhive_graph::CycleError;
use std::fmt;
use thiserror::Error;

/// Which of a coordinate's values was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Relative,
    Absolute,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative => f.write_str("relative"),
            Self::Absolute => f.write_str("absolute"),
        }
    }
}

/// Everything that can go wrong while building or laying out a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Cycle(#[from] CycleError<CoordinateId>),

    #[error("{child} is already a child of {parent}")]
    ChildAlreadyExists { parent: CellId, child: CellId },

    #[error("{child} is not a child of {parent}")]
    ChildNotFound { parent: CellId, child: CellId },

    #[error("{child} cannot be nested inside {parent}, which it contains")]
    WouldNestInsideItself { parent: CellId, child: CellId },

    #[error("{child} is a root and cannot be attached under {parent}")]
    PinnedRoot { parent: CellId, child: CellId },

    #[error("insertion index {index} is out of bounds for {parent} with {len} children")]
    IndexOutOfBounds {
        parent: CellId,
        index: usize,
        len: usize,
    },

    #[error("{0} does not belong to this tree")]
    UnknownCell(CellId),

    #[error("{coordinate} has no {kind} value yet")]
    MissingValue {
        coordinate: CoordinateId,
        kind: ValueKind,
    },

    #[error("arithmetic chain has {operands} operands but {operators} operators")]
    ArithmeticMismatch { operands: usize, operators: usize },

    #[error("no preceding sibling to measure from (owner: {owner:?})")]
    NoPreviousPeer { owner: Option<CoordinateId> },

    #[error("cell recipe is missing {0}")]
    IncompleteRecipe(&'static str),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
