//! [`PlacerDB`]: the central placement database shared by the global
//! placer, legaliser, and detailed placer.
//!
//! Grounded on the reference `PlacerDB` API: a flat per-cell placement
//! record (`CellInfo`) indexed by [`CellId`], plus core-area and site/row
//! geometry shared by every placement phase. `PlacerDB` owns placement
//! state independently of [`vlsi_netlist::Netlist`] so that placement
//! phases can freely overwrite coordinates without mutating the structural
//! netlist itself; [`PlacerDB::commit_placement`] writes the final
//! coordinates back onto the netlist's cells.

use vlsi_common::{CoreResult, InternalError};
use vlsi_netlist::{CellId, Netlist, Rect};
use std::collections::HashMap;

/// Per-cell placement record: position, footprint, and whether the cell may move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellInfo {
    /// X coordinate of the cell's lower-left corner.
    pub x: f64,
    /// Y coordinate of the cell's lower-left corner.
    pub y: f64,
    /// Cell width.
    pub width: f64,
    /// Cell height.
    pub height: f64,
    /// Whether this cell's position is fixed (ports, macros pinned by the user).
    pub fixed: bool,
}

impl CellInfo {
    /// The cell's footprint rectangle at its current position.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// The cell's center point.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The cell's right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// The cell's top edge.
    pub fn top(&self) -> f64 {
        self.y + self.height
    }
}

/// The placement database: core area, row/site geometry, and a per-cell
/// [`CellInfo`] table. Shared (by exclusive, sequential mutable borrow) by
/// every phase of the pipeline, per the single-threaded design.
#[derive(Clone, Debug)]
pub struct PlacerDB {
    core_area: Rect,
    row_height: f64,
    site_width: f64,
    cells: HashMap<CellId, CellInfo>,
    order: Vec<CellId>,
}

impl PlacerDB {
    /// Creates a placer database for the given core area and row/site geometry.
    pub fn new(core_area: Rect, row_height: f64, site_width: f64) -> Self {
        Self {
            core_area,
            row_height,
            site_width,
            cells: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Builds a [`PlacerDB`] from a netlist, registering every non-port cell
    /// with its current (possibly unplaced) footprint. Fixed cells (ports)
    /// are registered too, since routing and timing still need their positions.
    pub fn from_netlist(netlist: &Netlist, core_area: Rect, row_height: f64, site_width: f64) -> Self {
        let mut db = Self::new(core_area, row_height, site_width);
        for id in netlist.cell_ids() {
            let cell = netlist.cell(id);
            db.add_cell(id, cell.width, cell.height, cell.fixed);
            if cell.placed {
                db.place_cell(id, cell.x, cell.y).expect("cell just registered");
            }
        }
        db
    }

    /// The core placement area.
    pub fn core_area(&self) -> Rect {
        self.core_area
    }

    /// Sets the core placement area.
    pub fn set_core_area(&mut self, area: Rect) {
        self.core_area = area;
    }

    /// The standard-cell row height.
    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    /// Sets the standard-cell row height.
    pub fn set_row_height(&mut self, height: f64) {
        self.row_height = height;
    }

    /// The placement site width.
    pub fn site_width(&self) -> f64 {
        self.site_width
    }

    /// Sets the placement site width.
    pub fn set_site_width(&mut self, width: f64) {
        self.site_width = width;
    }

    /// Registers a new cell with the given footprint. The cell starts
    /// unplaced at the origin.
    pub fn add_cell(&mut self, id: CellId, width: f64, height: f64, fixed: bool) {
        self.cells.insert(
            id,
            CellInfo {
                x: 0.0,
                y: 0.0,
                width,
                height,
                fixed,
            },
        );
        self.order.push(id);
    }

    /// Places a cell at the given position. Returns an internal error if the
    /// cell has not been registered — this indicates a pipeline bug, not a
    /// user input problem, since every cell in scope is registered up front.
    pub fn place_cell(&mut self, id: CellId, x: f64, y: f64) -> CoreResult<()> {
        let info = self
            .cells
            .get_mut(&id)
            .ok_or_else(|| InternalError::new(format!("place_cell: unregistered cell {id}")))?;
        info.x = x;
        info.y = y;
        Ok(())
    }

    /// Returns the placement record for a cell.
    pub fn cell_info(&self, id: CellId) -> &CellInfo {
        self.cells.get(&id).expect("cell id not registered in PlacerDB")
    }

    /// Returns the center point of a cell's current placement.
    pub fn cell_center(&self, id: CellId) -> (f64, f64) {
        self.cell_info(id).center()
    }

    /// Whether a cell's position is fixed.
    pub fn is_cell_fixed(&self, id: CellId) -> bool {
        self.cell_info(id).fixed
    }

    /// All registered cell IDs, in registration order.
    pub fn all_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.order.iter().copied()
    }

    /// All registered cell IDs that are not fixed (i.e. movable by placement).
    pub fn movable_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.order.iter().copied().filter(|id| !self.is_cell_fixed(*id))
    }

    /// Total silicon area of every registered cell (fixed and movable).
    pub fn total_cell_area(&self) -> f64 {
        self.cells.values().map(|c| c.width * c.height).sum()
    }

    /// Returns the movable cells assigned to the row at the given row index,
    /// where row 0 starts at the core area's bottom edge. A cell belongs to
    /// the row whose vertical span its center falls within.
    pub fn cells_by_row(&self, row: u32) -> Vec<CellId> {
        let row_y = self.core_area.y + row as f64 * self.row_height;
        self.order
            .iter()
            .copied()
            .filter(|&id| {
                let info = self.cell_info(id);
                let (_, cy) = info.center();
                cy >= row_y && cy < row_y + self.row_height
            })
            .collect()
    }

    /// Whether a coordinate is aligned to the site grid, within `epsilon`.
    pub fn is_site_aligned(&self, value: f64, epsilon: f64) -> bool {
        let offset = value - self.core_area.x;
        let sites = (offset / self.site_width).round();
        (offset - sites * self.site_width).abs() <= epsilon
    }

    /// Whether every movable cell's placement lies within the core area and
    /// does not overlap any other cell's placement.
    pub fn is_valid_placement(&self) -> bool {
        for &id in &self.order {
            let info = self.cell_info(id);
            let rect = info.rect();
            if rect.x < self.core_area.x
                || rect.y < self.core_area.y
                || rect.right() > self.core_area.right()
                || rect.top() > self.core_area.top()
            {
                return false;
            }
        }
        for (i, &a) in self.order.iter().enumerate() {
            for &b in &self.order[i + 1..] {
                if self.cell_info(a).rect().overlap_area(&self.cell_info(b).rect()) > 0.0 {
                    return false;
                }
            }
        }
        true
    }

    /// Writes every registered cell's current position back onto the
    /// netlist's cells, marking them placed.
    pub fn commit_placement(&self, netlist: &mut Netlist) {
        for &id in &self.order {
            let info = self.cell_info(id);
            netlist.cell_mut(id).set_position(info.x, info.y);
        }
    }
}
