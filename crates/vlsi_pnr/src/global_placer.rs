//! Nesterov-momentum electrostatic global placer.
//!
//! Grounded on the reference `GlobalPlacer` and its three strategies
//! (basic force-directed, electrostatic/Nesterov, hybrid): each outer
//! iteration evaluates a wirelength gradient (star model) plus a density
//! gradient (from the [`crate::poisson`] solve over a [`DensityGrid`]),
//! clips it, and advances every movable cell with momentum. Dispatch is a
//! single tagged [`Strategy`] enum rather than virtual calls, per the
//! design notes' recommendation.

use crate::density_grid::DensityGrid;
use crate::placer_db::PlacerDB;
use crate::poisson;
use crate::progress::{ProgressCallback, ProgressEvent};
use std::collections::HashMap;
use vlsi_diagnostics::DiagnosticSink;
use vlsi_netlist::{total_hpwl, CellId, Netlist};

/// Parameters for the electrostatic (Nesterov) loop, used directly by
/// [`Strategy::Electrostatic`] and as the refine phase of
/// [`Strategy::Hybrid`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElectrostaticParams {
    /// Target bin density the density gradient drives toward (spec default 0.7).
    pub target_density: f64,
    /// Initial density-penalty weight.
    pub initial_lambda: f64,
    /// Multiplicative growth applied to lambda after each iteration.
    pub lambda_growth_rate: f64,
    /// Upper bound lambda is clamped to.
    pub lambda_max: f64,
    /// Nesterov step size (eta).
    pub learning_rate: f64,
    /// Nesterov momentum coefficient (mu).
    pub momentum: f64,
    /// Stop when total movement falls below this fraction of the core
    /// diagonal for two consecutive iterations.
    pub convergence_threshold: f64,
    /// Hard cap on outer iterations.
    pub max_iterations: u32,
    /// Per-axis gradient magnitude is clipped to this fraction of the
    /// corresponding core dimension.
    pub gradient_clip_fraction: f64,
    /// Fraction of `max_iterations` over which the I/O-port contribution to
    /// a net's center of gravity ramps from 0 to 1.
    pub io_ramp_fraction: f64,
    /// Lambda-growth tempering factor applied while `warmup` is `true`
    /// (see [`HybridParams::warmup_lambda_factor`]); `1.0` means no
    /// tempering.
    pub warmup_lambda_factor: f64,
}

impl Default for ElectrostaticParams {
    fn default() -> Self {
        Self {
            target_density: 0.7,
            initial_lambda: 1e-4,
            lambda_growth_rate: 1.05,
            lambda_max: 1.0,
            learning_rate: 0.1,
            momentum: 0.9,
            convergence_threshold: 1e-3,
            max_iterations: 500,
            gradient_clip_fraction: 0.05,
            io_ramp_fraction: 0.5,
            warmup_lambda_factor: 1.0,
        }
    }
}

/// Parameters for [`Strategy::Hybrid`]: a bounded basic warm-up phase
/// followed by a tempered electrostatic refine phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HybridParams {
    /// Hard cap on basic warm-up iterations (spec default 30).
    pub basic_max_iterations: u32,
    /// Warm-up stops early once HPWL drops below this fraction of its
    /// starting value (spec default 0.3).
    pub basic_hpwl_ratio: f64,
    /// Lambda-growth tempering factor used during the refine phase's
    /// warm-up window; forwarded into [`ElectrostaticParams::warmup_lambda_factor`].
    pub warmup_lambda_factor: f64,
    /// Parameters for the electrostatic refine phase.
    pub refine: ElectrostaticParams,
}

impl Default for HybridParams {
    fn default() -> Self {
        Self {
            basic_max_iterations: 30,
            basic_hpwl_ratio: 0.3,
            warmup_lambda_factor: 0.3,
            refine: ElectrostaticParams::default(),
        }
    }
}

/// Which of the three global-placement strategies to run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Strategy {
    /// Force-directed fixed-point iteration with no density term; used
    /// standalone for debugging or as the hybrid warm-up phase.
    Basic {
        /// Hard cap on iterations.
        max_iterations: u32,
    },
    /// Full Nesterov wirelength-plus-density loop.
    Electrostatic(ElectrostaticParams),
    /// Basic warm-up (early-stopped on HPWL ratio) followed by a tempered
    /// electrostatic refine.
    Hybrid(HybridParams),
}

/// Summary of a completed global-placement run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalPlacementStats {
    /// Number of outer iterations actually run (basic + electrostatic phases combined).
    pub iterations: u32,
    /// Final total (unweighted) HPWL.
    pub final_hpwl: f64,
    /// Final maximum bin density, or `0.0` if the strategy never built a density grid.
    pub final_max_density: f64,
    /// Whether the loop stopped due to convergence rather than the iteration cap.
    pub converged: bool,
}

struct CellState {
    velocity: (f64, f64),
}

/// Runs global placement over every movable cell in `db`, per `strategy`.
/// Fixed cells (I/O ports) are read but never moved. Returns summary
/// statistics; diagnostics (non-power-of-two density grid) are emitted to
/// `sink`. `progress`, if given, is invoked once per outer iteration.
pub fn run(
    strategy: Strategy,
    db: &mut PlacerDB,
    netlist: &Netlist,
    sink: &DiagnosticSink,
    progress: Option<&ProgressCallback>,
) -> GlobalPlacementStats {
    match strategy {
        Strategy::Basic { max_iterations } => run_basic(db, netlist, max_iterations, progress),
        Strategy::Electrostatic(params) => {
            run_electrostatic(db, netlist, &params, 0, sink, progress)
        }
        Strategy::Hybrid(hybrid) => {
            let starting_hpwl = total_hpwl(netlist, |c| db.cell_center(c));
            let mut warmup_iters = 0;
            if starting_hpwl > 0.0 {
                for i in 0..hybrid.basic_max_iterations {
                    basic_step(db, netlist);
                    warmup_iters = i + 1;
                    let hpwl = total_hpwl(netlist, |c| db.cell_center(c));
                    if let Some(cb) = progress {
                        cb(ProgressEvent::GlobalPlacementIteration {
                            iteration: i,
                            hpwl,
                            overflow: 0.0,
                            lambda: 0.0,
                        });
                    }
                    if hpwl <= hybrid.basic_hpwl_ratio * starting_hpwl {
                        break;
                    }
                }
            }
            // commit positions: PlacerDB already holds the live positions the
            // basic phase wrote, so nothing further is needed before refine.
            let mut refine = hybrid.refine;
            refine.warmup_lambda_factor = hybrid.warmup_lambda_factor;
            let stats = run_electrostatic(db, netlist, &refine, warmup_iters, sink, progress);
            GlobalPlacementStats {
                iterations: stats.iterations + warmup_iters,
                ..stats
            }
        }
    }
}

fn run_basic(
    db: &mut PlacerDB,
    netlist: &Netlist,
    max_iterations: u32,
    progress: Option<&ProgressCallback>,
) -> GlobalPlacementStats {
    let mut iterations = 0;
    for i in 0..max_iterations {
        basic_step(db, netlist);
        iterations = i + 1;
        let hpwl = total_hpwl(netlist, |c| db.cell_center(c));
        if let Some(cb) = progress {
            cb(ProgressEvent::GlobalPlacementIteration {
                iteration: i,
                hpwl,
                overflow: 0.0,
                lambda: 0.0,
            });
        }
    }
    GlobalPlacementStats {
        iterations,
        final_hpwl: total_hpwl(netlist, |c| db.cell_center(c)),
        final_max_density: 0.0,
        converged: false,
    }
}

/// One basic force-directed fixed-point pass: every movable cell moves to
/// the weighted average position of the cells sharing a net with it, then
/// clamped into the core.
fn basic_step(db: &mut PlacerDB, netlist: &Netlist) {
    let mut sums: HashMap<CellId, (f64, f64, f64)> = HashMap::new();
    for net in netlist.net_ids() {
        let pins: Vec<_> = netlist.net(net).all_pins().collect();
        if pins.len() < 2 {
            continue;
        }
        let owners: Vec<CellId> = pins.iter().map(|&p| netlist.pin(p).owner).collect();
        for (idx, &owner) in owners.iter().enumerate() {
            if db.is_cell_fixed(owner) {
                continue;
            }
            let mut sx = 0.0;
            let mut sy = 0.0;
            let mut w = 0.0;
            for (other_idx, &other) in owners.iter().enumerate() {
                if other_idx == idx {
                    continue;
                }
                let (cx, cy) = db.cell_center(other);
                sx += cx;
                sy += cy;
                w += 1.0;
            }
            if w > 0.0 {
                let entry = sums.entry(owner).or_insert((0.0, 0.0, 0.0));
                entry.0 += sx;
                entry.1 += sy;
                entry.2 += w;
            }
        }
    }

    let core = db.core_area();
    for (cell, (sx, sy, w)) in sums {
        if w <= 0.0 {
            continue;
        }
        let info = *db.cell_info(cell);
        let cx = sx / w;
        let cy = sy / w;
        let x = (cx - info.width / 2.0).clamp(core.x, core.right() - info.width);
        let y = (cy - info.height / 2.0).clamp(core.y, core.top() - info.height);
        db.place_cell(cell, x, y).expect("cell registered in PlacerDB");
    }
}

fn bin_count_for(movable: usize) -> usize {
    let target = (movable as f64).sqrt().ceil() as usize;
    poisson::next_power_of_two(target.max(8)).min(128)
}

#[allow(clippy::too_many_arguments)]
fn run_electrostatic(
    db: &mut PlacerDB,
    netlist: &Netlist,
    params: &ElectrostaticParams,
    iteration_offset: u32,
    sink: &DiagnosticSink,
    progress: Option<&ProgressCallback>,
) -> GlobalPlacementStats {
    let movable: Vec<CellId> = db.movable_cells().collect();
    if movable.is_empty() {
        return GlobalPlacementStats {
            iterations: 0,
            final_hpwl: total_hpwl(netlist, |c| db.cell_center(c)),
            final_max_density: 0.0,
            converged: true,
        };
    }

    let bins = bin_count_for(movable.len());
    let core = db.core_area();
    let diagonal = (core.width * core.width + core.height * core.height).sqrt();
    let clip_x = params.gradient_clip_fraction * core.width;
    let clip_y = params.gradient_clip_fraction * core.height;

    let mut state: HashMap<CellId, CellState> = movable
        .iter()
        .map(|&c| (c, CellState { velocity: (0.0, 0.0) }))
        .collect();

    let mut lambda = params.initial_lambda;
    let mut below_threshold_streak = 0u32;
    let mut iterations = 0;
    let mut grid = DensityGrid::init(core, bins, bins);
    let mut max_density = 0.0;

    for i in 0..params.max_iterations {
        iterations = i + 1;
        let global_iter = iteration_offset + i;

        // Look-ahead position: x_k + mu * v_k.
        let lookahead: HashMap<CellId, (f64, f64)> = movable
            .iter()
            .map(|&c| {
                let info = *db.cell_info(c);
                let v = state[&c].velocity;
                let (cx, cy) = info.center();
                (c, (cx + params.momentum * v.0, cy + params.momentum * v.1))
            })
            .collect();

        let wire_grad = wirelength_gradient(netlist, db, &lookahead, &movable, global_iter, params);

        grid.update_density(db.all_cells().map(|c| db.cell_info(c).rect()));
        let stats = poisson::solve(&mut grid, sink);
        max_density = grid.max_density();

        let mut total_move = 0.0;
        for &cell in &movable {
            let info = *db.cell_info(cell);
            let (lx, ly) = lookahead[&cell];
            let (bin_fx, bin_fy) = {
                let bin = grid.bin_at(lx, ly);
                (bin.force_x, bin.force_y)
            };
            let (wgx, wgy) = wire_grad.get(&cell).copied().unwrap_or((0.0, 0.0));
            let mut gx = wgx + lambda * bin_fx;
            let mut gy = wgy + lambda * bin_fy;
            gx = gx.clamp(-clip_x, clip_x);
            gy = gy.clamp(-clip_y, clip_y);

            let cell_state = state.get_mut(&cell).unwrap();
            let vx = params.momentum * cell_state.velocity.0 - params.learning_rate * gx;
            let vy = params.momentum * cell_state.velocity.1 - params.learning_rate * gy;
            cell_state.velocity = (vx, vy);

            let new_x = (info.x + vx).clamp(core.x, core.right() - info.width);
            let new_y = (info.y + vy).clamp(core.y, core.top() - info.height);
            total_move += (new_x - info.x).abs() + (new_y - info.y).abs();
            db.place_cell(cell, new_x, new_y).expect("cell registered in PlacerDB");
        }

        let growth = if params.warmup_lambda_factor < 1.0 {
            1.0 + (params.lambda_growth_rate - 1.0) * params.warmup_lambda_factor
        } else {
            params.lambda_growth_rate
        };
        lambda = (lambda * growth).min(params.lambda_max);

        if let Some(cb) = progress {
            cb(ProgressEvent::GlobalPlacementIteration {
                iteration: global_iter,
                hpwl: total_hpwl(netlist, |c| db.cell_center(c)),
                overflow: grid.overflow(params.target_density),
                lambda,
            });
        }
        let _ = stats;

        if total_move < params.convergence_threshold * diagonal {
            below_threshold_streak += 1;
            if below_threshold_streak >= 2 {
                return GlobalPlacementStats {
                    iterations,
                    final_hpwl: total_hpwl(netlist, |c| db.cell_center(c)),
                    final_max_density: max_density,
                    converged: true,
                };
            }
        } else {
            below_threshold_streak = 0;
        }
    }

    GlobalPlacementStats {
        iterations,
        final_hpwl: total_hpwl(netlist, |c| db.cell_center(c)),
        final_max_density: max_density,
        converged: false,
    }
}

/// Star-model wirelength gradient: for each net with >= 2 pins, `w_net =
/// 1/(N-1)` and each movable pin's contribution is `w_net * (pin_pos -
/// cog)`. The center of gravity weights fixed (I/O port) pins by a ramp
/// factor that grows from 0 to 1 over the first `io_ramp_fraction` of
/// `max_iterations`, so early iterations are not dominated by fixed ports.
fn wirelength_gradient(
    netlist: &Netlist,
    db: &PlacerDB,
    lookahead: &HashMap<CellId, (f64, f64)>,
    movable: &[CellId],
    iteration: u32,
    params: &ElectrostaticParams,
) -> HashMap<CellId, (f64, f64)> {
    let ramp_iters = (params.max_iterations as f64 * params.io_ramp_fraction).max(1.0);
    let io_weight = (iteration as f64 / ramp_iters).min(1.0);

    let position_of = |c: CellId| -> (f64, f64) {
        lookahead.get(&c).copied().unwrap_or_else(|| db.cell_center(c))
    };

    let mut grad: HashMap<CellId, (f64, f64)> = movable.iter().map(|&c| (c, (0.0, 0.0))).collect();
    for net in netlist.net_ids() {
        let pins: Vec<_> = netlist.net(net).all_pins().collect();
        if pins.len() < 2 {
            continue;
        }
        let owners: Vec<CellId> = pins.iter().map(|&p| netlist.pin(p).owner).collect();

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut weight_total = 0.0;
        for &owner in &owners {
            let (x, y) = position_of(owner);
            let w = if db.is_cell_fixed(owner) { io_weight } else { 1.0 };
            sum_x += w * x;
            sum_y += w * y;
            weight_total += w;
        }
        if weight_total <= 0.0 {
            continue;
        }
        let cog = (sum_x / weight_total, sum_y / weight_total);
        let w_net = 1.0 / (pins.len() as f64 - 1.0);

        for &owner in &owners {
            if let Some(entry) = grad.get_mut(&owner) {
                let (x, y) = position_of(owner);
                entry.0 += w_net * (x - cog.0);
                entry.1 += w_net * (y - cog.1);
            }
        }
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlsi_netlist::{Cell, CellType, PinDirection, Rect};

    fn two_cell_netlist() -> (Netlist, PlacerDB) {
        let mut nl = Netlist::new();
        let u1 = nl.add_cell(Cell::new("u1", CellType::Buf, 1.0, 1.0)).unwrap();
        let u2 = nl.add_cell(Cell::new("u2", CellType::Buf, 1.0, 1.0)).unwrap();
        let y = nl.add_pin(u1, "Y", PinDirection::Output);
        let a = nl.add_pin(u2, "A", PinDirection::Input);
        let net = nl.add_net(vlsi_netlist::Net::new("n1")).unwrap();
        nl.connect(y, net);
        nl.connect(a, net);

        let mut db = PlacerDB::from_netlist(&nl, Rect::new(0.0, 0.0, 20.0, 20.0), 20.0, 1.0);
        db.place_cell(u1, 0.0, 0.0).unwrap();
        db.place_cell(u2, 15.0, 15.0).unwrap();
        (nl, db)
    }

    #[test]
    fn basic_strategy_pulls_connected_cells_together() {
        let (nl, mut db) = two_cell_netlist();
        let hpwl_before = total_hpwl(&nl, |c| db.cell_center(c));
        run(Strategy::Basic { max_iterations: 5 }, &mut db, &nl, &DiagnosticSink::new(), None);
        let hpwl_after = total_hpwl(&nl, |c| db.cell_center(c));
        assert!(hpwl_after < hpwl_before);
    }

    #[test]
    fn electrostatic_strategy_reduces_hpwl_without_blowing_up() {
        let (nl, mut db) = two_cell_netlist();
        let hpwl_before = total_hpwl(&nl, |c| db.cell_center(c));
        let params = ElectrostaticParams {
            max_iterations: 40,
            ..ElectrostaticParams::default()
        };
        let stats = run(
            Strategy::Electrostatic(params),
            &mut db,
            &nl,
            &DiagnosticSink::new(),
            None,
        );
        assert!(stats.final_hpwl <= hpwl_before);
    }

    #[test]
    fn hybrid_strategy_runs_both_phases() {
        let (nl, mut db) = two_cell_netlist();
        let stats = run(
            Strategy::Hybrid(HybridParams::default()),
            &mut db,
            &nl,
            &DiagnosticSink::new(),
            None,
        );
        assert!(stats.iterations > 0);
    }

    #[test]
    fn fixed_cells_never_move() {
        let mut nl = Netlist::new();
        let (in_cell, in_pin) = nl.add_input_port("in0");
        let u1 = nl.add_cell(Cell::new("u1", CellType::Buf, 1.0, 1.0)).unwrap();
        let a = nl.add_pin(u1, "A", PinDirection::Input);
        let net = nl.add_net(vlsi_netlist::Net::new("n1")).unwrap();
        nl.connect(in_pin, net);
        nl.connect(a, net);

        let mut db = PlacerDB::from_netlist(&nl, Rect::new(0.0, 0.0, 20.0, 20.0), 20.0, 1.0);
        db.place_cell(in_cell, 0.0, 0.0).unwrap();
        db.place_cell(u1, 10.0, 10.0).unwrap();

        run(Strategy::Basic { max_iterations: 10 }, &mut db, &nl, &DiagnosticSink::new(), None);
        assert_eq!(db.cell_info(in_cell).x, 0.0);
        assert_eq!(db.cell_info(in_cell).y, 0.0);
    }

    #[test]
    fn empty_design_converges_immediately() {
        let nl = Netlist::new();
        let mut db = PlacerDB::new(Rect::new(0.0, 0.0, 10.0, 10.0), 10.0, 1.0);
        let stats = run(
            Strategy::Electrostatic(ElectrostaticParams::default()),
            &mut db,
            &nl,
            &DiagnosticSink::new(),
            None,
        );
        assert!(stats.converged);
        assert_eq!(stats.final_hpwl, 0.0);
    }
}
