//! 3-D routing grid: `(x, y, layer)` cells with two metal layers, an HV
//! layer discipline, and PathFinder bookkeeping (history cost, present-use
//! count).
//!
//! Grounded on the reference `RoutingGrid`: layer 0 is M1 (horizontal
//! preferred direction, only `+-x` neighbours), layer 1 is M2 (vertical,
//! only `+-y` neighbours); a via connects the same `(x, y)` across layers.

use vlsi_netlist::{NetId, Rect};

/// The preferred routing direction of a metal layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Layer {
    /// M1: horizontal preferred direction.
    M1 = 0,
    /// M2: vertical preferred direction.
    M2 = 1,
}

impl Layer {
    /// The other layer (used for via moves).
    pub fn other(self) -> Layer {
        match self {
            Layer::M1 => Layer::M2,
            Layer::M2 => Layer::M1,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Builds a layer from its numeric index (`0` = M1, `1` = M2).
    pub fn from_index(i: usize) -> Layer {
        match i {
            0 => Layer::M1,
            1 => Layer::M2,
            _ => panic!("routing grid only has two layers"),
        }
    }
}

/// The occupancy state of one routing-grid cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GridState {
    /// Unused, routable.
    Free,
    /// Physically blocked (cell/macro obstruction); never routable.
    Obstacle,
    /// Carries a routed wire segment for `net_id`.
    Routed,
    /// A layer-change (via) point for `net_id`.
    Via,
    /// A pin access point (not itself a wire segment, but a valid endpoint).
    Pin,
}

/// A single `(x, y, layer)` grid cell.
#[derive(Clone, Copy, Debug)]
pub struct GridCell {
    /// Current occupancy state.
    pub state: GridState,
    /// The net occupying this cell, if `state` is `Routed`, `Via`, or `Pin`.
    pub net_id: Option<NetId>,
    /// PathFinder history cost, persistent across PathFinder iterations
    /// within one routing call, reset between calls.
    pub history_cost: f64,
    /// Number of distinct nets currently claiming this cell in the present
    /// routing pass (used to detect PathFinder collisions).
    pub present_use: u32,
}

impl Default for GridCell {
    fn default() -> Self {
        Self {
            state: GridState::Free,
            net_id: None,
            history_cost: 0.0,
            present_use: 0,
        }
    }
}

/// Integral grid coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GridPoint {
    /// Grid X index.
    pub x: i32,
    /// Grid Y index.
    pub y: i32,
    /// Layer.
    pub layer: Layer,
}

impl GridPoint {
    /// Creates a new grid point.
    pub fn new(x: i32, y: i32, layer: Layer) -> Self {
        Self { x, y, layer }
    }
}

/// A 3-D `(Nx, Ny, 2)` routing grid over the core area.
#[derive(Debug)]
pub struct RoutingGrid {
    core: Rect,
    origin_x: f64,
    origin_y: f64,
    pitch_x: f64,
    pitch_y: f64,
    nx: i32,
    ny: i32,
    cells: Vec<GridCell>,
}

impl RoutingGrid {
    /// Builds a routing grid covering `core` with the given X/Y pitch.
    pub fn init(core: Rect, pitch_x: f64, pitch_y: f64) -> Self {
        let nx = ((core.width / pitch_x).ceil() as i32).max(1);
        let ny = ((core.height / pitch_y).ceil() as i32).max(1);
        Self {
            core,
            origin_x: core.x,
            origin_y: core.y,
            pitch_x,
            pitch_y,
            nx,
            ny,
            cells: vec![GridCell::default(); (nx * ny * 2) as usize],
        }
    }

    /// Number of grid columns (X).
    pub fn nx(&self) -> i32 {
        self.nx
    }

    /// Number of grid rows (Y).
    pub fn ny(&self) -> i32 {
        self.ny
    }

    /// The core area this grid covers.
    pub fn core(&self) -> Rect {
        self.core
    }

    fn in_bounds(&self, p: GridPoint) -> bool {
        p.x >= 0 && p.x < self.nx && p.y >= 0 && p.y < self.ny
    }

    fn flat_index(&self, p: GridPoint) -> usize {
        ((p.layer.index() as i32 * self.ny * self.nx) + p.y * self.nx + p.x) as usize
    }

    /// Converts a physical point to the nearest grid cell on `layer`,
    /// clamped to grid bounds.
    pub fn phys_to_grid(&self, x: f64, y: f64, layer: Layer) -> GridPoint {
        let gx = ((x - self.origin_x) / self.pitch_x).round() as i32;
        let gy = ((y - self.origin_y) / self.pitch_y).round() as i32;
        GridPoint::new(gx.clamp(0, self.nx - 1), gy.clamp(0, self.ny - 1), layer)
    }

    /// Converts a grid cell to the physical coordinates of its center.
    pub fn grid_to_phys(&self, p: GridPoint) -> (f64, f64) {
        (
            self.origin_x + (p.x as f64 + 0.5) * self.pitch_x,
            self.origin_y + (p.y as f64 + 0.5) * self.pitch_y,
        )
    }

    /// Reads the cell at `p`.
    pub fn cell(&self, p: GridPoint) -> &GridCell {
        &self.cells[self.flat_index(p)]
    }

    /// Mutably accesses the cell at `p`.
    pub fn cell_mut(&mut self, p: GridPoint) -> &mut GridCell {
        let idx = self.flat_index(p);
        &mut self.cells[idx]
    }

    /// Marks every grid cell overlapping `rect` as [`GridState::Obstacle`],
    /// on `layer` if given, or on both layers otherwise.
    pub fn add_obstacle(&mut self, rect: Rect, layer: Option<Layer>) {
        let lo = self.phys_to_grid(rect.x, rect.y, Layer::M1);
        let hi = self.phys_to_grid(rect.right(), rect.top(), Layer::M1);
        let layers: Vec<Layer> = match layer {
            Some(l) => vec![l],
            None => vec![Layer::M1, Layer::M2],
        };
        for l in layers {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let p = GridPoint::new(x, y, l);
                    if self.in_bounds(p) {
                        self.cell_mut(p).state = GridState::Obstacle;
                    }
                }
            }
        }
    }

    /// Marks the grid cell nearest `(x, y)` on `layer` as a [`GridState::Pin`]
    /// for `net`, returning the snapped grid point.
    pub fn mark_pin(&mut self, x: f64, y: f64, layer: Layer, net: NetId) -> GridPoint {
        let p = self.phys_to_grid(x, y, layer);
        let cell = self.cell_mut(p);
        cell.state = GridState::Pin;
        cell.net_id = Some(net);
        p
    }

    /// The valid neighbours of `p` per the HV layer discipline: layer 0
    /// (M1, horizontal) only connects `+-x` on the same layer; layer 1 (M2,
    /// vertical) only connects `+-y`; a via move to the other layer at the
    /// same `(x, y)` is always available.
    pub fn neighbors(&self, p: GridPoint) -> Vec<GridPoint> {
        let mut out = Vec::with_capacity(3);
        match p.layer {
            Layer::M1 => {
                if p.x > 0 {
                    out.push(GridPoint::new(p.x - 1, p.y, p.layer));
                }
                if p.x < self.nx - 1 {
                    out.push(GridPoint::new(p.x + 1, p.y, p.layer));
                }
            }
            Layer::M2 => {
                if p.y > 0 {
                    out.push(GridPoint::new(p.x, p.y - 1, p.layer));
                }
                if p.y < self.ny - 1 {
                    out.push(GridPoint::new(p.x, p.y + 1, p.layer));
                }
            }
        }
        out.push(GridPoint::new(p.x, p.y, p.layer.other()));
        out.retain(|&q| self.in_bounds(q));
        out
    }

    /// Whether `p` is reachable at all (not an obstacle).
    pub fn is_obstacle(&self, p: GridPoint) -> bool {
        self.cell(p).state == GridState::Obstacle
    }

    /// Clears routed/via state from every cell while preserving history
    /// cost, per the PathFinder "clear routed state, keep history" reset
    /// between outer iterations. Obstacle and pin cells are untouched.
    pub fn clear_routed_state(&mut self) {
        for cell in &mut self.cells {
            if matches!(cell.state, GridState::Routed | GridState::Via) {
                cell.state = GridState::Free;
                cell.net_id = None;
            }
            cell.present_use = 0;
        }
    }

    /// Resets PathFinder history cost on every cell to zero. History is
    /// persistent within one routing call but must be reset between calls.
    pub fn reset_history(&mut self) {
        for cell in &mut self.cells {
            cell.history_cost = 0.0;
        }
    }

    /// Counts grid cells with `present_use > 1` (claimed by more than one
    /// net in the current pass).
    pub fn conflict_count(&self) -> usize {
        self.cells.iter().filter(|c| c.present_use > 1).count()
    }

    /// Adds `increment` to the history cost of every cell with
    /// `present_use > 1`, per the PathFinder outer loop's escalating
    /// congestion penalty.
    pub fn penalize_conflicts(&mut self, increment: f64) {
        for cell in &mut self.cells {
            if cell.present_use > 1 {
                cell.history_cost += increment;
            }
        }
    }

    /// Snapshots the full cell array (state, net ownership, history,
    /// present-use) for later restoration by [`Self::restore`].
    pub fn snapshot(&self) -> Vec<GridCell> {
        self.cells.clone()
    }

    /// Restores a previously taken [`Self::snapshot`].
    pub fn restore(&mut self, snapshot: Vec<GridCell>) {
        debug_assert_eq!(snapshot.len(), self.cells.len());
        self.cells = snapshot;
    }

    /// Iterates all grid points currently marked `Routed`, `Via`, or `Pin`
    /// for `net`.
    pub fn cells_for_net(&self, net: NetId) -> Vec<GridPoint> {
        let mut out = Vec::new();
        for layer in [Layer::M1, Layer::M2] {
            for y in 0..self.ny {
                for x in 0..self.nx {
                    let p = GridPoint::new(x, y, layer);
                    let cell = self.cell(p);
                    if cell.net_id == Some(net)
                        && matches!(cell.state, GridState::Routed | GridState::Via | GridState::Pin)
                    {
                        out.push(p);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phys_to_grid_roundtrip_near_center() {
        let grid = RoutingGrid::init(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0);
        let p = grid.phys_to_grid(3.4, 7.6, Layer::M1);
        let (x, y) = grid.grid_to_phys(p);
        assert!((x - 3.5).abs() < 1e-9);
        assert!((y - 7.5).abs() < 1e-9);
    }

    #[test]
    fn m1_neighbors_are_x_only_plus_via() {
        let grid = RoutingGrid::init(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0);
        let p = GridPoint::new(5, 5, Layer::M1);
        let neighbors = grid.neighbors(p);
        assert!(neighbors.iter().all(|n| n.layer == Layer::M1 && n.y == 5 || n.layer == Layer::M2));
        assert_eq!(neighbors.iter().filter(|n| n.layer == Layer::M2).count(), 1);
    }

    #[test]
    fn m2_neighbors_are_y_only_plus_via() {
        let grid = RoutingGrid::init(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0);
        let p = GridPoint::new(5, 5, Layer::M2);
        let neighbors = grid.neighbors(p);
        assert!(neighbors.iter().all(|n| (n.layer == Layer::M2 && n.x == 5) || n.layer == Layer::M1));
    }

    #[test]
    fn obstacle_blocks_cell() {
        let mut grid = RoutingGrid::init(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0);
        grid.add_obstacle(Rect::new(2.0, 2.0, 2.0, 2.0), None);
        let p = grid.phys_to_grid(3.0, 3.0, Layer::M1);
        assert!(grid.is_obstacle(p));
        let p2 = grid.phys_to_grid(3.0, 3.0, Layer::M2);
        assert!(grid.is_obstacle(p2));
    }

    #[test]
    fn clear_routed_state_preserves_history_and_obstacles() {
        let mut grid = RoutingGrid::init(Rect::new(0.0, 0.0, 4.0, 4.0), 1.0, 1.0);
        let net = NetId::from_raw(0);
        let p = GridPoint::new(1, 1, Layer::M1);
        grid.cell_mut(p).state = GridState::Routed;
        grid.cell_mut(p).net_id = Some(net);
        grid.cell_mut(p).history_cost = 3.5;
        grid.add_obstacle(Rect::new(0.0, 0.0, 1.0, 1.0), Some(Layer::M1));

        grid.clear_routed_state();
        assert_eq!(grid.cell(p).state, GridState::Free);
        assert_eq!(grid.cell(p).history_cost, 3.5);
        assert_eq!(grid.cell(GridPoint::new(0, 0, Layer::M1)).state, GridState::Obstacle);
    }

    #[test]
    fn conflict_count_detects_overuse() {
        let mut grid = RoutingGrid::init(Rect::new(0.0, 0.0, 4.0, 4.0), 1.0, 1.0);
        let p = GridPoint::new(0, 0, Layer::M1);
        grid.cell_mut(p).present_use = 2;
        assert_eq!(grid.conflict_count(), 1);
    }
}
