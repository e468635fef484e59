//! Cell and pin types.
//!
//! Mirrors the reference `Cell`/`Pin` data model: a [`Cell`] is a standard-
//! cell instance with a type, a set of pins, and a placement. A [`Pin`] is
//! owned by exactly one cell and connects to at most one net.

use crate::ids::{CellId, NetId, PinId};
use serde::{Deserialize, Serialize};

/// The function a standard cell implements, used to classify combinational
/// vs. sequential cells and to distinguish design boundary pseudo-cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum CellType {
    /// Function not classified (used for unrecognized library cells).
    Unknown,
    /// 2-input AND gate.
    And,
    /// 2-input OR gate.
    Or,
    /// Inverter.
    Not,
    /// 2-input NAND gate.
    Nand,
    /// 2-input NOR gate.
    Nor,
    /// 2-input XOR gate.
    Xor,
    /// 2-input XNOR gate.
    Xnor,
    /// Non-inverting buffer.
    Buf,
    /// Positive-edge-triggered D flip-flop.
    Dff,
    /// Multiplexer.
    Mux,
    /// Primary input pseudo-cell (design boundary).
    Input,
    /// Primary output pseudo-cell (design boundary).
    Output,
}

impl CellType {
    /// Whether this cell type is a primary input or output boundary pseudo-cell.
    pub fn is_port(self) -> bool {
        matches!(self, CellType::Input | CellType::Output)
    }

    /// Whether this cell type is sequential (has internal clocked state).
    pub fn is_sequential(self) -> bool {
        matches!(self, CellType::Dff)
    }

    /// Whether this cell type is combinational logic (neither a port nor sequential).
    pub fn is_combinational(self) -> bool {
        !self.is_port() && !self.is_sequential()
    }
}

/// The signal direction of a pin.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PinDirection {
    /// Signal flows into the cell.
    Input,
    /// Signal flows out of the cell.
    Output,
    /// Bidirectional (used only for physical-only / boundary pins).
    Inout,
}

impl PinDirection {
    /// Whether this direction is `Input`.
    pub fn is_input(self) -> bool {
        matches!(self, PinDirection::Input)
    }

    /// Whether this direction is `Output`.
    pub fn is_output(self) -> bool {
        matches!(self, PinDirection::Output)
    }
}

/// A pin on a cell, connecting the cell to at most one net.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pin {
    /// The pin's name within its owning cell (e.g. `"A"`, `"Y"`, `"CLK"`).
    pub name: String,
    /// The signal direction of this pin.
    pub direction: PinDirection,
    /// The cell that owns this pin.
    pub owner: CellId,
    /// The net this pin is connected to, if any.
    pub net: Option<NetId>,
}

impl Pin {
    /// Creates a new, unconnected pin.
    pub fn new(name: impl Into<String>, direction: PinDirection, owner: CellId) -> Self {
        Self {
            name: name.into(),
            direction,
            owner,
            net: None,
        }
    }

    /// Whether this pin is an input.
    pub fn is_input(&self) -> bool {
        self.direction.is_input()
    }

    /// Whether this pin is an output.
    pub fn is_output(&self) -> bool {
        self.direction.is_output()
    }

    /// Whether this pin is connected to a net.
    pub fn is_connected(&self) -> bool {
        self.net.is_some()
    }
}

/// A standard-cell instance (or a primary input/output pseudo-cell).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    /// The cell's instance name, unique within the netlist.
    pub name: String,
    /// The library cell type this instance implements.
    pub cell_type: CellType,
    /// The name of the Liberty library cell this instance is mapped to
    /// (e.g. `"NAND2_X1"`). Empty for primary input/output pseudo-cells.
    pub library_cell: String,
    /// This cell's pins.
    pub pins: Vec<PinId>,
    /// X coordinate of the cell's lower-left corner.
    pub x: f64,
    /// Y coordinate of the cell's lower-left corner.
    pub y: f64,
    /// Cell width.
    pub width: f64,
    /// Cell height.
    pub height: f64,
    /// Whether this cell has been assigned a placement.
    pub placed: bool,
    /// Whether this cell's position is fixed (e.g. an I/O port) and must not
    /// be moved by placement or legalisation.
    pub fixed: bool,
}

impl Cell {
    /// Creates a new, unplaced cell with the given type and dimensions.
    pub fn new(name: impl Into<String>, cell_type: CellType, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            cell_type,
            library_cell: String::new(),
            pins: Vec::new(),
            x: 0.0,
            y: 0.0,
            width,
            height,
            placed: false,
            fixed: cell_type.is_port(),
        }
    }

    /// Sets this cell's position and marks it placed.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.placed = true;
    }

    /// The center point of the cell's footprint.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether this cell is a primary input or output boundary pseudo-cell.
    pub fn is_port(&self) -> bool {
        self.cell_type.is_port()
    }

    /// Whether this cell is sequential.
    pub fn is_sequential(&self) -> bool {
        self.cell_type.is_sequential()
    }

    /// Whether this cell is combinational.
    pub fn is_combinational(&self) -> bool {
        self.cell_type.is_combinational()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_type_classification() {
        assert!(CellType::Nand.is_combinational());
        assert!(CellType::Dff.is_sequential());
        assert!(CellType::Input.is_port());
        assert!(!CellType::Nand.is_sequential());
    }

    #[test]
    fn cell_defaults_unplaced() {
        let cell = Cell::new("u1", CellType::Nand, 1.0, 2.0);
        assert!(!cell.placed);
        assert!(!cell.fixed);
    }

    #[test]
    fn port_cell_is_fixed_by_default() {
        let cell = Cell::new("in0", CellType::Input, 0.0, 0.0);
        assert!(cell.fixed);
    }

    #[test]
    fn set_position_marks_placed() {
        let mut cell = Cell::new("u1", CellType::Buf, 1.0, 2.0);
        cell.set_position(3.0, 4.0);
        assert!(cell.placed);
        assert_eq!(cell.center(), (3.5, 5.0));
    }

    #[test]
    fn pin_connection_state() {
        let owner = CellId::from_raw(0);
        let mut pin = Pin::new("Y", PinDirection::Output, owner);
        assert!(!pin.is_connected());
        pin.net = Some(NetId::from_raw(0));
        assert!(pin.is_connected());
        assert!(pin.is_output());
    }
}
