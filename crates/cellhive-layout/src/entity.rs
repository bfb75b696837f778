//! Entity storage seam.
//!
//! Every region created through a [`Hive`](crate::Hive) is registered as
//! one entity: the region's [`CellId`](crate::CellId) first, followed by any
//! extra components from its recipe. The store hands back an [`EntityId`]
//! which is recorded on the cell.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Identifier returned by an [`EntityStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Where regions and their payloads are registered.
pub trait EntityStore {
    /// Store one entity made of `components` and return its id.
    fn add_entity(&mut self, components: Vec<Box<dyn Any>>) -> EntityId;

    /// Components of `id`, in insertion order.
    fn components(&self, id: EntityId) -> Option<&[Box<dyn Any>]>;
}

impl dyn EntityStore + '_ {
    /// First component of `id` whose type is `T`.
    #[must_use]
    pub fn component<T: 'static>(&self, id: EntityId) -> Option<&T> {
        self.components(id)?
            .iter()
            .find_map(|component| component.downcast_ref::<T>())
    }
}

/// In-memory store; ids are dense and never reused.
#[derive(Default)]
pub struct Entities {
    rows: Vec<Vec<Box<dyn Any>>>,
}

impl Entities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl EntityStore for Entities {
    fn add_entity(&mut self, components: Vec<Box<dyn Any>>) -> EntityId {
        let id = EntityId(self.rows.len() as u64);
        self.rows.push(components);
        id
    }

    fn components(&self, id: EntityId) -> Option<&[Box<dyn Any>]> {
        let row = usize::try_from(id.0).ok()?;
        self.rows.get(row).map(Vec::as_slice)
    }
}

impl fmt::Debug for Entities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entities")
            .field("len", &self.rows.len())
            .finish()
    }
}
