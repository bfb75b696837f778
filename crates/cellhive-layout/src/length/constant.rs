use super::{Length, LengthSignals};
use crate::CoordinateId;
use crate::cell::CellTree;
use crate::error::Result;
use std::cell::Cell;
use std::rc::Rc;

/// A fixed scalar that can be edited in place.
#[derive(Debug, Default)]
pub struct Constant {
    value: Cell<f64>,
    signals: LengthSignals,
}

/// Shorthand for a shared [`Constant`].
#[must_use]
pub fn length(value: f64) -> Rc<Constant> {
    Rc::new(Constant::new(value))
}

impl Constant {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            value: Cell::new(value),
            signals: LengthSignals::new(),
        }
    }

    #[must_use]
    pub fn get(&self) -> f64 {
        self.value.get()
    }

    /// Replace the value; invalidates only if it actually changed.
    pub fn set(&self, value: f64) {
        if self.value.get() == value {
            return;
        }
        self.value.set(value);
        self.signals.invalidated.emit(&());
    }
}

impl Length for Constant {
    fn calculate(&self, _tree: &CellTree) -> Result<Option<f64>> {
        Ok(Some(self.value.get()))
    }

    fn prerequisites(&self) -> Vec<CoordinateId> {
        Vec::new()
    }

    fn signals(&self) -> &LengthSignals {
        &self.signals
    }
}
