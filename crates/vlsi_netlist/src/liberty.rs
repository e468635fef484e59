//! Liberty (NLDM) timing-library data model.
//!
//! Mirrors the reference Liberty model: a [`Library`] holds named
//! [`LibCell`]s, each with named [`LibPin`]s, each with a set of
//! [`LibTiming`] arcs whose delay/transition tables are 2-D
//! [`LookupTable`]s indexed by input-slew and output-load.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A 2-D non-linear delay table (NLDM), indexed by two independent
/// variables (conventionally input transition and output load).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupTable {
    /// The table's name (e.g. `"cell_rise"`).
    pub name: String,
    /// The first index axis (rows), e.g. input transition values.
    pub index_1: Vec<f64>,
    /// The second index axis (columns), e.g. output load values.
    pub index_2: Vec<f64>,
    /// `values[i][j]` is the table value at `(index_1[i], index_2[j])`.
    pub values: Vec<Vec<f64>>,
}

impl LookupTable {
    /// Creates a new lookup table, validating that `values` is rectangular
    /// and matches the index axis lengths.
    pub fn new(name: impl Into<String>, index_1: Vec<f64>, index_2: Vec<f64>, values: Vec<Vec<f64>>) -> Self {
        let table = Self {
            name: name.into(),
            index_1,
            index_2,
            values,
        };
        debug_assert!(table.is_valid(), "lookup table dimensions are inconsistent");
        table
    }

    /// Whether the table's dimensions are internally consistent.
    pub fn is_valid(&self) -> bool {
        !self.index_1.is_empty()
            && !self.index_2.is_empty()
            && self.values.len() == self.index_1.len()
            && self.values.iter().all(|row| row.len() == self.index_2.len())
    }

    /// Number of rows (`index_1` entries).
    pub fn dim1_size(&self) -> usize {
        self.index_1.len()
    }

    /// Number of columns (`index_2` entries).
    pub fn dim2_size(&self) -> usize {
        self.index_2.len()
    }

    /// Bilinearly interpolates the table at `(x, y)`.
    ///
    /// `f(x,y) = f00*(x2-x)*(y2-y) + f10*(x-x1)*(y2-y)`
    /// `        + f01*(x2-x)*(y-y1) + f11*(x-x1)*(y-y1)`
    /// all divided by `(x2-x1)*(y2-y1)`. Queries outside the table's range
    /// clamp to the nearest edge index rather than extrapolating.
    pub fn interpolate(&self, x: f64, y: f64) -> f64 {
        if self.dim1_size() == 1 && self.dim2_size() == 1 {
            return self.values[0][0];
        }

        let (i0, i1, xa, xb) = bracket(&self.index_1, x);
        let (j0, j1, ya, yb) = bracket(&self.index_2, y);

        let f00 = self.values[i0][j0];
        let f10 = self.values[i1][j0];
        let f01 = self.values[i0][j1];
        let f11 = self.values[i1][j1];

        if i0 == i1 && j0 == j1 {
            return f00;
        }
        if i0 == i1 {
            let t = (y - ya) / (yb - ya);
            return f00 + (f01 - f00) * t;
        }
        if j0 == j1 {
            let t = (x - xa) / (xb - xa);
            return f00 + (f10 - f00) * t;
        }

        let denom = (xb - xa) * (yb - ya);
        (f00 * (xb - x) * (yb - y)
            + f10 * (x - xa) * (yb - y)
            + f01 * (xb - x) * (y - ya)
            + f11 * (x - xa) * (y - ya))
            / denom
    }
}

/// Returns `(lower_index, upper_index, lower_value, upper_value)` bracketing
/// `x` within `axis`, clamped to the axis's range. If `axis` has only one
/// entry, both indices are `0`.
fn bracket(axis: &[f64], x: f64) -> (usize, usize, f64, f64) {
    if axis.len() == 1 {
        return (0, 0, axis[0], axis[0]);
    }
    if x <= axis[0] {
        return (0, 1, axis[0], axis[1]);
    }
    if x >= axis[axis.len() - 1] {
        let n = axis.len();
        return (n - 2, n - 1, axis[n - 2], axis[n - 1]);
    }
    for i in 0..axis.len() - 1 {
        if x >= axis[i] && x <= axis[i + 1] {
            return (i, i + 1, axis[i], axis[i + 1]);
        }
    }
    unreachable!("bracket: x not found within clamped axis range");
}

/// The sense (polarity) of a timing arc.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TimingSense {
    /// Output rises when input rises (or falls when input falls).
    PositiveUnate,
    /// Output falls when input rises (or rises when input falls).
    NegativeUnate,
    /// Either polarity, depending on other inputs.
    NonUnate,
}

/// The category of a timing arc.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TimingType {
    /// A combinational propagation delay arc.
    Combinational,
    /// A clock-to-output arc on a sequential cell.
    RisingEdge,
    /// A setup-time check arc.
    SetupRising,
    /// A hold-time check arc.
    HoldRising,
}

/// A single timing arc from a related pin to the pin that owns it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LibTiming {
    /// The name of the pin this arc's delay depends on.
    pub related_pin: String,
    /// The arc's timing sense.
    pub timing_sense: TimingSense,
    /// The arc's timing type.
    pub timing_type: TimingType,
    /// Cell delay table, indexed by (input transition, output load) for a
    /// `Combinational`/`RisingEdge` arc, or by (data slew, clock slew) for a
    /// setup/hold check arc.
    pub cell_delay: LookupTable,
    /// Output rise-transition table.
    pub rise_transition: LookupTable,
    /// Output fall-transition table.
    pub fall_transition: LookupTable,
}

/// A pin on a library cell.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LibPin {
    /// Pin name.
    pub name: String,
    /// Pin direction.
    pub direction: crate::cell::PinDirection,
    /// Total pin capacitance, in library capacitance units.
    pub capacitance: f64,
    /// Rise-specific input capacitance.
    pub rise_capacitance: f64,
    /// Fall-specific input capacitance.
    pub fall_capacitance: f64,
    /// Maximum allowed input transition before a slew violation.
    pub max_transition: f64,
    /// Timing arcs whose sink is this pin.
    pub timing_arcs: Vec<LibTiming>,
}

impl LibPin {
    /// Whether this pin is an input.
    pub fn is_input(&self) -> bool {
        self.direction.is_input()
    }

    /// Whether this pin is an output.
    pub fn is_output(&self) -> bool {
        self.direction.is_output()
    }

    /// Finds the arc driven by `related_pin`, if any.
    pub fn arc_from(&self, related_pin: &str) -> Option<&LibTiming> {
        self.timing_arcs.iter().find(|a| a.related_pin == related_pin)
    }
}

/// A library cell: a named, characterized standard cell.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LibCell {
    /// Cell name (e.g. `"NAND2_X1"`).
    pub name: String,
    /// Cell area, in library area units.
    pub area: f64,
    /// Optional footprint/function family name (e.g. `"nand2"`), used for
    /// library-mapping fallback heuristics.
    pub cell_footprint: String,
    /// This cell's pins, keyed by pin name.
    pub pins: HashMap<String, LibPin>,
}

impl LibCell {
    /// Looks up a pin by name.
    pub fn pin(&self, name: &str) -> Option<&LibPin> {
        self.pins.get(name)
    }

    /// Adds (or replaces) a pin.
    pub fn add_pin(&mut self, pin: LibPin) {
        self.pins.insert(pin.name.clone(), pin);
    }
}

/// A Liberty timing/power library: a named collection of characterized cells.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Library {
    /// Library name.
    pub name: String,
    /// Cells in this library, keyed by name.
    pub cells: HashMap<String, LibCell>,
}

impl Library {
    /// Creates an empty, named library.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: HashMap::new(),
        }
    }

    /// Looks up a cell by name.
    pub fn cell(&self, name: &str) -> Option<&LibCell> {
        self.cells.get(name)
    }

    /// Adds (or replaces) a cell.
    pub fn add_cell(&mut self, cell: LibCell) {
        self.cells.insert(cell.name.clone(), cell);
    }

    /// Names of all cells in this library.
    pub fn cell_names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Number of cells in this library.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether this library has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
