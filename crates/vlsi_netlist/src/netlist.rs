//! The [`Netlist`] arena: owns all cells, nets, and pins for a design and
//! provides name-based lookup.

use crate::cell::{Cell, CellType, Pin, PinDirection};
use crate::ids::{CellId, NetId, PinId};
use crate::net::Net;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fully elaborated structural netlist: cells, nets, and the pins that
/// connect them. This is the topology the whole physical-design pipeline
/// operates on; it carries no placement state of its own beyond what each
/// [`Cell`] records.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Netlist {
    cells: Vec<Cell>,
    nets: Vec<Net>,
    pins: Vec<Pin>,
    cell_names: HashMap<String, CellId>,
    net_names: HashMap<String, NetId>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cell, returning its ID. Returns `None` if a cell with this
    /// name already exists.
    pub fn add_cell(&mut self, cell: Cell) -> Option<CellId> {
        if self.cell_names.contains_key(&cell.name) {
            return None;
        }
        let id = CellId::from_raw(self.cells.len() as u32);
        self.cell_names.insert(cell.name.clone(), id);
        self.cells.push(cell);
        Some(id)
    }

    /// Adds a net, returning its ID. Returns `None` if a net with this name
    /// already exists.
    pub fn add_net(&mut self, net: Net) -> Option<NetId> {
        if self.net_names.contains_key(&net.name) {
            return None;
        }
        let id = NetId::from_raw(self.nets.len() as u32);
        self.net_names.insert(net.name.clone(), id);
        self.nets.push(net);
        Some(id)
    }

    /// Adds a pin to the given cell and returns its ID.
    pub fn add_pin(&mut self, owner: CellId, name: impl Into<String>, direction: PinDirection) -> PinId {
        let pin = Pin::new(name, direction, owner);
        let id = PinId::from_raw(self.pins.len() as u32);
        self.pins.push(pin);
        self.cells[owner.as_raw() as usize].pins.push(id);
        id
    }

    /// Connects a pin to a net: adds the pin as the net's driver (if it is
    /// an output) or as a load (if it is an input), and records the net on
    /// the pin.
    pub fn connect(&mut self, pin: PinId, net: NetId) {
        self.pins[pin.as_raw() as usize].net = Some(net);
        let direction = self.pins[pin.as_raw() as usize].direction;
        let net_ref = &mut self.nets[net.as_raw() as usize];
        match direction {
            PinDirection::Output => net_ref.set_driver(pin),
            PinDirection::Input | PinDirection::Inout => net_ref.add_load(pin),
        }
    }

    /// Looks up a cell by ID.
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.as_raw() as usize]
    }

    /// Looks up a cell by ID, mutably.
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.as_raw() as usize]
    }

    /// Looks up a net by ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.as_raw() as usize]
    }

    /// Looks up a net by ID, mutably.
    pub fn net_mut(&mut self, id: NetId) -> &mut Net {
        &mut self.nets[id.as_raw() as usize]
    }

    /// Looks up a pin by ID.
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.as_raw() as usize]
    }

    /// Looks up a cell ID by name.
    pub fn cell_id_by_name(&self, name: &str) -> Option<CellId> {
        self.cell_names.get(name).copied()
    }

    /// Looks up a net ID by name.
    pub fn net_id_by_name(&self, name: &str) -> Option<NetId> {
        self.net_names.get(name).copied()
    }

    /// Iterates over all cell IDs in insertion order.
    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> {
        (0..self.cells.len() as u32).map(CellId::from_raw)
    }

    /// Iterates over all net IDs in insertion order.
    pub fn net_ids(&self) -> impl Iterator<Item = NetId> {
        (0..self.nets.len() as u32).map(NetId::from_raw)
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Returns the input pins belonging to the given cell.
    pub fn input_pins(&self, cell: CellId) -> impl Iterator<Item = PinId> + '_ {
        self.cell(cell)
            .pins
            .iter()
            .copied()
            .filter(move |&p| self.pin(p).is_input())
    }

    /// Returns the output pins belonging to the given cell.
    pub fn output_pins(&self, cell: CellId) -> impl Iterator<Item = PinId> + '_ {
        self.cell(cell)
            .pins
            .iter()
            .copied()
            .filter(move |&p| self.pin(p).is_output())
    }

    /// Convenience: adds a primary input pseudo-cell with a single output
    /// pin `"Y"` and returns `(cell, pin)`.
    pub fn add_input_port(&mut self, name: impl Into<String>) -> (CellId, PinId) {
        let name = name.into();
        let cell = self
            .add_cell(Cell::new(name, CellType::Input, 0.0, 0.0))
            .expect("port name collision");
        let pin = self.add_pin(cell, "Y", PinDirection::Output);
        (cell, pin)
    }

    /// Convenience: adds a primary output pseudo-cell with a single input
    /// pin `"A"` and returns `(cell, pin)`.
    pub fn add_output_port(&mut self, name: impl Into<String>) -> (CellId, PinId) {
        let name = name.into();
        let cell = self
            .add_cell(Cell::new(name, CellType::Output, 0.0, 0.0))
            .expect("port name collision");
        let pin = self.add_pin(cell, "A", PinDirection::Input);
        (cell, pin)
    }
}
