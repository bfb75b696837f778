//! Region recipes and the builder that produces them.

use crate::CellId;
use crate::error::{LayoutError, Result};
use crate::length::LengthRef;
use std::any::Any;
use std::fmt;

/// Everything needed to create one region.
///
/// The four lengths are wired into the new cell as is; keep a handle to
/// one to edit the cell later.
pub struct CellRecipe {
    pub x_alpha: LengthRef,
    pub x_beta: LengthRef,
    pub y_alpha: LengthRef,
    pub y_beta: LengthRef,
    /// Attach under this cell; `None` means the root.
    pub parent: Option<CellId>,
    /// Position among the parent's children; `None` appends.
    pub insertion_index: Option<usize>,
    /// Stored with the region's entity after its [`CellId`].
    pub extra_components: Vec<Box<dyn Any>>,
}

impl CellRecipe {
    #[must_use]
    pub fn new(x: (LengthRef, LengthRef), y: (LengthRef, LengthRef)) -> Self {
        Self {
            x_alpha: x.0,
            x_beta: x.1,
            y_alpha: y.0,
            y_beta: y.1,
            parent: None,
            insertion_index: None,
            extra_components: Vec::new(),
        }
    }

    /// X.Alpha, X.Beta, Y.Alpha, Y.Beta.
    #[must_use]
    pub fn lengths(&self) -> [LengthRef; 4] {
        [
            self.x_alpha.clone(),
            self.x_beta.clone(),
            self.y_alpha.clone(),
            self.y_beta.clone(),
        ]
    }
}

impl fmt::Debug for CellRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRecipe")
            .field("x_alpha", &self.x_alpha)
            .field("x_beta", &self.x_beta)
            .field("y_alpha", &self.y_alpha)
            .field("y_beta", &self.y_beta)
            .field("parent", &self.parent)
            .field("insertion_index", &self.insertion_index)
            .field("extra_components", &self.extra_components.len())
            .finish()
    }
}

/// Step-free builder for [`CellRecipe`].
///
/// Both boundaries are required; [`finish`](Self::finish) reports the first
/// one missing.
///
/// ```
/// use cellhive_layout::{CellBuilder, length};
///
/// let recipe = CellBuilder::new()
///     .x(length(0.0), length(120.0))
///     .y(length(0.0), length(24.0))
///     .with_component("sidebar")
///     .finish()
///     .unwrap();
/// assert_eq!(recipe.extra_components.len(), 1);
/// ```
#[derive(Default)]
pub struct CellBuilder {
    x: Option<(LengthRef, LengthRef)>,
    y: Option<(LengthRef, LengthRef)>,
    parent: Option<CellId>,
    index: Option<usize>,
    components: Vec<Box<dyn Any>>,
}

impl CellBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn x(mut self, alpha: LengthRef, beta: LengthRef) -> Self {
        self.x = Some((alpha, beta));
        self
    }

    #[must_use]
    pub fn y(mut self, alpha: LengthRef, beta: LengthRef) -> Self {
        self.y = Some((alpha, beta));
        self
    }

    #[must_use]
    pub fn child_of(mut self, parent: CellId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Insert at `index` instead of appending.
    #[must_use]
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Any) -> Self {
        self.components.push(Box::new(component));
        self
    }

    pub fn finish(self) -> Result<CellRecipe> {
        let (x_alpha, x_beta) = self.x.ok_or(LayoutError::IncompleteRecipe("x boundary"))?;
        let (y_alpha, y_beta) = self.y.ok_or(LayoutError::IncompleteRecipe("y boundary"))?;
        Ok(CellRecipe {
            x_alpha,
            x_beta,
            y_alpha,
            y_beta,
            parent: self.parent,
            insertion_index: self.index,
            extra_components: self.components,
        })
    }
}

impl fmt::Debug for CellBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellBuilder")
            .field("x", &self.x.is_some())
            .field("y", &self.y.is_some())
            .field("parent", &self.parent)
            .field("index", &self.index)
            .finish()
    }
}
