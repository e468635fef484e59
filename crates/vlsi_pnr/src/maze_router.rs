//! PathFinder-style maze router: per-net Prim MST decomposition into 2-pin
//! segments, each routed by A* over the [`RoutingGrid`], with an outer
//! rip-up-and-reroute loop that resolves collisions via escalating history
//! cost and collision penalty.
//!
//! Grounded on the reference `MazeRouter`/`PathFinderRouter`: net ordering
//! by ascending HPWL (small nets first, power/ground skipped), a min-heap
//! A* per segment with the HV layer discipline from [`crate::routing_grid`],
//! and an outer loop that tracks the best (lowest-conflict) solution across
//! iterations and restores it at the end.

use crate::placer_db::PlacerDB;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::routing_grid::{GridCell, GridPoint, GridState, Layer, RoutingGrid};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use vlsi_netlist::{net_hpwl, NetId, Netlist};

/// Cost weights and outer-loop schedule for the router.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouterConfig {
    /// Abstract cost per unit of wire length (scaled by grid pitch).
    pub wire_cost: f64,
    /// Abstract cost of a layer change (via).
    pub via_cost: f64,
    /// Starting PathFinder history increment.
    pub history_increment_start: f64,
    /// Per-iteration additive growth of the history increment.
    pub history_increment_growth: f64,
    /// Cap on the history increment.
    pub history_increment_cap: f64,
    /// Starting PathFinder collision penalty multiplier.
    pub collision_penalty_start: f64,
    /// Per-iteration multiplicative growth of the collision penalty.
    pub collision_penalty_growth: f64,
    /// Cap on the collision penalty.
    pub collision_penalty_cap: f64,
    /// Hard cap on outer PathFinder iterations.
    pub max_iterations: u32,
    /// Stop after this many consecutive iterations with no improvement.
    pub stagnation_limit: u32,
    /// Stop if the current iteration's conflict count exceeds the best seen
    /// by more than this margin.
    pub divergence_margin: usize,
    /// RNG seed for net-order reshuffles between iterations.
    pub seed: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            wire_cost: 1.0,
            via_cost: 10.0,
            history_increment_start: 1.0,
            history_increment_growth: 0.25,
            history_increment_cap: 20.0,
            collision_penalty_start: 50.0,
            collision_penalty_growth: 1.5,
            collision_penalty_cap: 100_000.0,
            max_iterations: 30,
            stagnation_limit: 7,
            divergence_margin: 10,
            seed: 1,
        }
    }
}

/// Result of routing one net: its 2-pin segments, each an ordered list of
/// grid points from one pin to another (including via transitions).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetRoute {
    /// Successfully routed segments.
    pub segments: Vec<Vec<GridPoint>>,
}

/// The outcome of a full PathFinder routing run.
#[derive(Clone, Debug, Default)]
pub struct RoutingReport {
    /// Per-net routing geometry, for nets that were fully routed in the
    /// restored best solution.
    pub routes: HashMap<NetId, NetRoute>,
    /// Nets that could not be fully routed in the restored best solution.
    pub unrouted_nets: Vec<NetId>,
    /// Conflict count (grid cells claimed by more than one net) of the
    /// restored best solution.
    pub final_conflicts: usize,
    /// Number of outer iterations run.
    pub iterations: u32,
}

fn is_power_or_ground(name: &str) -> bool {
    matches!(name.to_ascii_uppercase().as_str(), "VDD" | "VSS" | "GND")
}

fn manhattan(a: GridPoint, b: GridPoint) -> i64 {
    (a.x as i64 - b.x as i64).abs() + (a.y as i64 - b.y as i64).abs()
}

/// Prim's MST over a net's pin grid points by Manhattan distance, returned
/// as a list of `(from, to)` 2-pin segments. A net with fewer than two pins
/// yields no segments.
fn mst_segments(pins: &[GridPoint]) -> Vec<(GridPoint, GridPoint)> {
    let n = pins.len();
    if n < 2 {
        return Vec::new();
    }
    let mut in_tree = vec![false; n];
    let mut best_dist = vec![i64::MAX; n];
    let mut best_from = vec![0usize; n];
    in_tree[0] = true;
    for j in 1..n {
        best_dist[j] = manhattan(pins[0], pins[j]);
    }

    let mut edges = Vec::with_capacity(n - 1);
    for _ in 1..n {
        let mut next = usize::MAX;
        let mut nd = i64::MAX;
        for j in 0..n {
            if !in_tree[j] && best_dist[j] < nd {
                nd = best_dist[j];
                next = j;
            }
        }
        in_tree[next] = true;
        edges.push((pins[best_from[next]], pins[next]));
        for j in 0..n {
            if !in_tree[j] {
                let d = manhattan(pins[next], pins[j]);
                if d < best_dist[j] {
                    best_dist[j] = d;
                    best_from[j] = next;
                }
            }
        }
    }
    edges
}

#[derive(Clone, Copy)]
struct AStarNode {
    f: f64,
    g: f64,
    point: GridPoint,
}

impl PartialEq for AStarNode {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.g == other.g
    }
}
impl Eq for AStarNode {}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the lowest `f` first;
        // when `f` ties, prefer the lower `g` (spec's tie-break rule).
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.g.partial_cmp(&self.g).unwrap_or(Ordering::Equal))
    }
}

fn present_penalty(cell: &GridCell, net: NetId) -> f64 {
    match cell.state {
        GridState::Free => 0.0,
        GridState::Obstacle => f64::INFINITY,
        GridState::Pin => {
            if cell.net_id == Some(net) {
                0.0
            } else {
                1.0
            }
        }
        GridState::Routed | GridState::Via => {
            if cell.net_id == Some(net) {
                f64::INFINITY
            } else {
                1.0
            }
        }
    }
}

fn move_cost(
    grid: &RoutingGrid,
    from: GridPoint,
    to: GridPoint,
    net: NetId,
    collision_penalty: f64,
    cfg: &RouterConfig,
) -> f64 {
    let cell = grid.cell(to);
    let penalty = present_penalty(cell, net);
    if !penalty.is_finite() {
        return f64::INFINITY;
    }
    let base = if from.layer == to.layer {
        cfg.wire_cost
    } else {
        cfg.via_cost
    };
    base + cell.history_cost + penalty * collision_penalty
}

fn heuristic(a: GridPoint, b: GridPoint, cfg: &RouterConfig) -> f64 {
    let manhattan_cost = manhattan(a, b) as f64 * cfg.wire_cost;
    if a.layer != b.layer {
        manhattan_cost + cfg.via_cost
    } else {
        manhattan_cost
    }
}

/// Routes a single 2-pin segment with A*, using the present occupancy and
/// history state already on `grid`. Returns `None` if no path exists
/// (every frontier move costs infinity).
fn astar_route(
    grid: &RoutingGrid,
    start: GridPoint,
    goal: GridPoint,
    net: NetId,
    collision_penalty: f64,
    cfg: &RouterConfig,
) -> Option<Vec<GridPoint>> {
    if start == goal {
        return Some(vec![start]);
    }

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<GridPoint, f64> = HashMap::new();
    let mut came_from: HashMap<GridPoint, GridPoint> = HashMap::new();
    let mut closed: HashSet<GridPoint> = HashSet::new();

    g_score.insert(start, 0.0);
    open.push(AStarNode {
        f: heuristic(start, goal, cfg),
        g: 0.0,
        point: start,
    });

    while let Some(node) = open.pop() {
        if node.point == goal {
            let mut path = vec![goal];
            let mut cur = goal;
            while let Some(&prev) = came_from.get(&cur) {
                path.push(prev);
                cur = prev;
            }
            path.reverse();
            return Some(path);
        }
        if !closed.insert(node.point) {
            continue;
        }

        for neighbor in grid.neighbors(node.point) {
            let cost = move_cost(grid, node.point, neighbor, net, collision_penalty, cfg);
            if !cost.is_finite() {
                continue;
            }
            let tentative_g = node.g + cost;
            let improved = g_score.get(&neighbor).map_or(true, |&g| tentative_g < g);
            if improved {
                g_score.insert(neighbor, tentative_g);
                came_from.insert(neighbor, node.point);
                let h = heuristic(neighbor, goal, cfg);
                open.push(AStarNode {
                    f: tentative_g + h,
                    g: tentative_g,
                    point: neighbor,
                });
            }
        }
    }
    None
}

fn claim_path(grid: &mut RoutingGrid, path: &[GridPoint], net: NetId) {
    for (i, &p) in path.iter().enumerate() {
        let is_via = i > 0 && path[i - 1].layer != p.layer;
        let cell = grid.cell_mut(p);
        // present_use counts distinct nets claiming this cell; a net's own
        // MST segments routinely share a pin or corridor cell, so only the
        // first claim by this net should bump it.
        if cell.net_id != Some(net) {
            cell.present_use += 1;
        }
        if cell.state == GridState::Pin && cell.net_id == Some(net) {
            continue;
        }
        if is_via {
            cell.state = GridState::Via;
        } else if cell.state != GridState::Via {
            cell.state = GridState::Routed;
        }
        cell.net_id = Some(net);
    }
}

/// Routes every non-power/ground net in `netlist` onto `grid`, using
/// `placer_db` to resolve pin positions to physical coordinates. Pins are
/// marked on M1 before routing begins. Runs the full PathFinder outer loop
/// (rip-up-and-reroute on collision) and restores the lowest-conflict
/// solution seen before returning.
pub fn route(
    netlist: &Netlist,
    placer_db: &PlacerDB,
    grid: &mut RoutingGrid,
    cfg: &RouterConfig,
    progress: Option<&ProgressCallback>,
) -> RoutingReport {
    let mut net_pins: HashMap<NetId, Vec<GridPoint>> = HashMap::new();
    let mut routable_nets: Vec<NetId> = Vec::new();

    for net in netlist.net_ids() {
        let net_ref = netlist.net(net);
        if is_power_or_ground(&net_ref.name) {
            continue;
        }
        let pins: Vec<GridPoint> = net_ref
            .all_pins()
            .map(|p| {
                let owner = netlist.pin(p).owner;
                let (x, y) = placer_db.cell_center(owner);
                grid.mark_pin(x, y, Layer::M1, net)
            })
            .collect();
        if pins.len() >= 2 {
            routable_nets.push(net);
        }
        net_pins.insert(net, pins);
    }

    routable_nets.sort_by(|&a, &b| {
        let ha = net_hpwl(netlist, a, |c| placer_db.cell_center(c));
        let hb = net_hpwl(netlist, b, |c| placer_db.cell_center(c));
        ha.partial_cmp(&hb).unwrap_or(Ordering::Equal)
    });

    let mut order = routable_nets.clone();
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let mut collision_penalty = cfg.collision_penalty_start;
    let mut history_increment = cfg.history_increment_start;

    let mut best_conflicts = usize::MAX;
    let mut best_snapshot: Vec<GridCell> = Vec::new();
    let mut best_routes: HashMap<NetId, NetRoute> = HashMap::new();
    let mut best_unrouted: Vec<NetId> = Vec::new();
    let mut stagnation = 0u32;
    let mut iterations = 0u32;

    grid.reset_history();

    for iteration in 0..cfg.max_iterations {
        iterations = iteration + 1;
        grid.clear_routed_state();

        let mut routes: HashMap<NetId, NetRoute> = HashMap::new();
        let mut unrouted: Vec<NetId> = Vec::new();

        for &net in &order {
            let pins = &net_pins[&net];
            let segments = mst_segments(pins);
            let mut net_route = NetRoute::default();
            let mut failed = false;
            for (from, to) in segments {
                match astar_route(grid, from, to, net, collision_penalty, cfg) {
                    Some(path) => {
                        claim_path(grid, &path, net);
                        net_route.segments.push(path);
                    }
                    None => {
                        failed = true;
                    }
                }
            }
            if failed {
                unrouted.push(net);
            } else {
                routes.insert(net, net_route);
            }
        }

        let conflicts = grid.conflict_count();
        if let Some(cb) = progress {
            cb(ProgressEvent::RoutingIteration {
                iteration,
                overused_resources: conflicts,
                unrouted_nets: unrouted.len(),
            });
        }

        if conflicts < best_conflicts {
            best_conflicts = conflicts;
            best_snapshot = grid.snapshot();
            best_routes = routes;
            best_unrouted = unrouted;
            stagnation = 0;
        } else {
            stagnation += 1;
        }

        if conflicts == 0 {
            break;
        }
        if stagnation >= cfg.stagnation_limit {
            break;
        }
        if conflicts > best_conflicts + cfg.divergence_margin {
            break;
        }

        grid.penalize_conflicts(history_increment);
        history_increment = (history_increment + cfg.history_increment_growth).min(cfg.history_increment_cap);
        collision_penalty = (collision_penalty * cfg.collision_penalty_growth).min(cfg.collision_penalty_cap);
        order.shuffle(&mut rng);
    }

    if !best_snapshot.is_empty() || best_conflicts != usize::MAX {
        grid.restore(best_snapshot);
    }

    RoutingReport {
        routes: best_routes,
        unrouted_nets: best_unrouted,
        final_conflicts: best_conflicts.min(grid.conflict_count()),
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlsi_netlist::{Cell, CellType, Net, PinDirection, Rect};

    fn two_cell_net() -> (Netlist, PlacerDB) {
        let mut nl = Netlist::new();
        let u1 = nl.add_cell(Cell::new("u1", CellType::Buf, 1.0, 1.0)).unwrap();
        let u2 = nl.add_cell(Cell::new("u2", CellType::Buf, 1.0, 1.0)).unwrap();
        let y = nl.add_pin(u1, "Y", PinDirection::Output);
        let a = nl.add_pin(u2, "A", PinDirection::Input);
        let net = nl.add_net(Net::new("n1")).unwrap();
        nl.connect(y, net);
        nl.connect(a, net);

        let mut db = PlacerDB::from_netlist(&nl, Rect::new(0.0, 0.0, 10.0, 10.0), 10.0, 1.0);
        db.place_cell(u1, 0.0, 0.0).unwrap();
        db.place_cell(u2, 8.0, 8.0).unwrap();
        (nl, db)
    }

    #[test]
    fn simple_two_pin_net_routes_with_zero_conflicts() {
        let (nl, db) = two_cell_net();
        let mut grid = RoutingGrid::init(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0);
        let report = route(&nl, &db, &mut grid, &RouterConfig::default(), None);
        assert_eq!(report.final_conflicts, 0);
        assert!(report.unrouted_nets.is_empty());
        assert_eq!(report.routes.len(), 1);
    }

    #[test]
    fn three_pin_net_routes_with_zero_self_conflicts() {
        // One driver fanning out to two loads: the MST's two segments both
        // start at the driver's pin cell, so that cell is claimed twice by
        // the same net. That must not be reported as a conflict.
        let mut nl = Netlist::new();
        let u1 = nl.add_cell(Cell::new("u1", CellType::Buf, 1.0, 1.0)).unwrap();
        let u2 = nl.add_cell(Cell::new("u2", CellType::Buf, 1.0, 1.0)).unwrap();
        let u3 = nl.add_cell(Cell::new("u3", CellType::Buf, 1.0, 1.0)).unwrap();
        let y = nl.add_pin(u1, "Y", PinDirection::Output);
        let a2 = nl.add_pin(u2, "A", PinDirection::Input);
        let a3 = nl.add_pin(u3, "A", PinDirection::Input);
        let net = nl.add_net(Net::new("n1")).unwrap();
        nl.connect(y, net);
        nl.connect(a2, net);
        nl.connect(a3, net);

        let mut db = PlacerDB::from_netlist(&nl, Rect::new(0.0, 0.0, 10.0, 10.0), 10.0, 1.0);
        db.place_cell(u1, 4.0, 4.0).unwrap();
        db.place_cell(u2, 0.0, 0.0).unwrap();
        db.place_cell(u3, 8.0, 8.0).unwrap();

        let mut grid = RoutingGrid::init(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0);
        let report = route(&nl, &db, &mut grid, &RouterConfig::default(), None);
        assert_eq!(report.final_conflicts, 0);
        assert!(report.unrouted_nets.is_empty());
        assert_eq!(report.routes.len(), 1);
        assert_eq!(report.routes[&net].segments.len(), 2);
    }

    #[test]
    fn power_ground_nets_are_skipped() {
        let mut nl = Netlist::new();
        let u1 = nl.add_cell(Cell::new("u1", CellType::Buf, 1.0, 1.0)).unwrap();
        let u2 = nl.add_cell(Cell::new("u2", CellType::Buf, 1.0, 1.0)).unwrap();
        let y = nl.add_pin(u1, "Y", PinDirection::Output);
        let a = nl.add_pin(u2, "A", PinDirection::Input);
        let net = nl.add_net(Net::new("VDD")).unwrap();
        nl.connect(y, net);
        nl.connect(a, net);

        let db = PlacerDB::from_netlist(&nl, Rect::new(0.0, 0.0, 10.0, 10.0), 10.0, 1.0);
        let mut grid = RoutingGrid::init(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0);
        let report = route(&nl, &db, &mut grid, &RouterConfig::default(), None);
        assert!(report.routes.is_empty());
        assert!(report.unrouted_nets.is_empty());
    }

    #[test]
    fn mst_of_three_pins_has_two_edges() {
        let pins = vec![
            GridPoint::new(0, 0, Layer::M1),
            GridPoint::new(5, 0, Layer::M1),
            GridPoint::new(5, 5, Layer::M1),
        ];
        let edges = mst_segments(&pins);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn obstacle_forces_detour() {
        let mut grid = RoutingGrid::init(Rect::new(0.0, 0.0, 5.0, 5.0), 1.0, 1.0);
        // wall across the whole M1 layer at x=2, but leave M2 open so a via
        // detour is still possible.
        for y in 0..5 {
            grid.cell_mut(GridPoint::new(2, y, Layer::M1)).state = GridState::Obstacle;
        }
        let net = NetId::from_raw(0);
        let start = GridPoint::new(0, 2, Layer::M1);
        let goal = GridPoint::new(4, 2, Layer::M1);
        let path = astar_route(&grid, start, goal, net, 50.0, &RouterConfig::default());
        assert!(path.is_some());
        assert!(path.unwrap().iter().any(|p| p.layer == Layer::M2));
    }

    #[test]
    fn fully_blocked_segment_returns_none() {
        let mut grid = RoutingGrid::init(Rect::new(0.0, 0.0, 3.0, 3.0), 1.0, 1.0);
        for y in 0..3 {
            grid.cell_mut(GridPoint::new(1, y, Layer::M1)).state = GridState::Obstacle;
            grid.cell_mut(GridPoint::new(1, y, Layer::M2)).state = GridState::Obstacle;
        }
        let net = NetId::from_raw(0);
        let start = GridPoint::new(0, 1, Layer::M1);
        let goal = GridPoint::new(2, 1, Layer::M1);
        let path = astar_route(&grid, start, goal, net, 50.0, &RouterConfig::default());
        assert!(path.is_none());
    }
}
