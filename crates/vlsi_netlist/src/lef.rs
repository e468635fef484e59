//! Minimal LEF-derived physical macro data.
//!
//! A [`LefMacro`] records a standard cell's physical footprint and pin
//! shapes. When present, `PlacerDB::add_cell` sources width/height from the
//! macro instead of deriving them from the Liberty area rule.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The physical footprint of a standard cell, as would be read from a LEF macro.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LefMacro {
    /// Macro name, matching a Liberty cell name.
    pub name: String,
    /// Macro width, in placement length units.
    pub width: f64,
    /// Macro height, in placement length units.
    pub height: f64,
    /// Pin shapes, keyed by pin name, relative to the macro's lower-left
    /// corner. A pin may have more than one shape (e.g. a staggered access
    /// point on multiple tracks).
    pub pins: HashMap<String, Vec<Rect>>,
}

impl LefMacro {
    /// Creates a new macro with no pin shapes.
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            pins: HashMap::new(),
        }
    }

    /// The macro's footprint rectangle, anchored at the origin.
    pub fn footprint(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// A collection of LEF macros, keyed by name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LefLibrary {
    /// Macros in this library, keyed by name.
    pub macros: HashMap<String, LefMacro>,
}

impl LefLibrary {
    /// Creates an empty LEF library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a macro by name.
    pub fn macro_for(&self, name: &str) -> Option<&LefMacro> {
        self.macros.get(name)
    }

    /// Adds (or replaces) a macro.
    pub fn add_macro(&mut self, macro_: LefMacro) {
        self.macros.insert(macro_.name.clone(), macro_);
    }
}
