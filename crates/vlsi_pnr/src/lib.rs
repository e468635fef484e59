//! Placement and routing core.
//!
//! Owns the pipeline from a structural [`Netlist`] to a legal, routed
//! design: [`PlacerDB`] construction, [`global_placer`] (Nesterov/
//! electrostatic), [`legalizer`] (Abacus), [`detailed_placer`] (windowed
//! reordering), and [`maze_router`] (PathFinder A*) over a [`RoutingGrid`].
//! [`run_physical_design`] wires the whole sequence together per
//! `vlsi_config::PhysicalDesignConfig`.

#![warn(missing_docs)]

pub mod density_grid;
pub mod detailed_placer;
pub mod global_placer;
pub mod legalizer;
pub mod maze_router;
pub mod placer_db;
pub mod poisson;
pub mod progress;
pub mod routing_grid;

pub use density_grid::{Bin, DensityGrid};
pub use detailed_placer::DetailedPlacementStats;
pub use global_placer::{ElectrostaticParams, GlobalPlacementStats, HybridParams, Strategy};
pub use legalizer::LegalizationStats;
pub use maze_router::{NetRoute, RouterConfig, RoutingReport};
pub use placer_db::{CellInfo, PlacerDB};
pub use progress::{ProgressCallback, ProgressEvent};
pub use routing_grid::{GridCell, GridPoint, GridState, Layer, RoutingGrid};

use vlsi_common::CoreResult;
use vlsi_config::PhysicalDesignConfig;
use vlsi_diagnostics::DiagnosticSink;
use vlsi_netlist::{Library, Netlist, Rect};

/// Everything produced by one end-to-end [`run_physical_design`] call.
#[derive(Debug)]
pub struct PhysicalDesignResult {
    /// The placement database after detailed placement, with final
    /// positions already committed back onto `netlist`.
    pub placer_db: PlacerDB,
    /// Statistics from the global-placement phase.
    pub global_placement: GlobalPlacementStats,
    /// Statistics from the legalisation phase.
    pub legalization: LegalizationStats,
    /// Statistics from the detailed-placement phase.
    pub detailed_placement: DetailedPlacementStats,
    /// The routing grid after routing, carrying the final routed geometry.
    pub routing_grid: RoutingGrid,
    /// Statistics and per-net geometry from the routing phase.
    pub routing: RoutingReport,
}

/// Estimates the required core area from total cell silicon area and the
/// target utilization, as a square core anchored at the origin. `library`
/// is accepted for forward compatibility with a future cell-area fallback
/// (spec.md §3/§7's Liberty-area rule) but is not consulted today since
/// every cell in scope already carries explicit width/height.
fn estimate_core_area(netlist: &Netlist, utilization: f64, _library: &Library) -> Rect {
    let total_area: f64 = netlist
        .cell_ids()
        .filter(|&c| !netlist.cell(c).is_port())
        .map(|c| {
            let cell = netlist.cell(c);
            cell.width * cell.height
        })
        .sum();
    let side = (total_area / utilization.max(1e-9)).sqrt().max(1.0);
    Rect::new(0.0, 0.0, side, side)
}

/// Places I/O ports in a ring around the core perimeter, per the "trivial
/// boundary placement" Open Question decision (no routing-congestion-aware
/// heuristic).
fn place_ports_on_ring(db: &mut PlacerDB, netlist: &Netlist) {
    let ports: Vec<_> = netlist
        .cell_ids()
        .filter(|&c| netlist.cell(c).is_port())
        .collect();
    if ports.is_empty() {
        return;
    }
    let core = db.core_area();
    let perimeter = 2.0 * (core.width + core.height);
    let step = perimeter / ports.len() as f64;
    for (i, &port) in ports.iter().enumerate() {
        let mut d = i as f64 * step;
        let (x, y) = if d < core.width {
            (core.x + d, core.y)
        } else if d < core.width + core.height {
            d -= core.width;
            (core.right(), core.y + d)
        } else if d < 2.0 * core.width + core.height {
            d -= core.width + core.height;
            (core.right() - d, core.top())
        } else {
            d -= 2.0 * core.width + core.height;
            (core.x, core.top() - d)
        };
        db.place_cell(port, x, y).expect("port registered in PlacerDB");
    }
}

/// Runs the full physical-design pipeline: `PlacerDB` construction, global
/// placement, legalisation, detailed placement, then routing, per the
/// system overview's component order. I/O ports are placed on the core
/// ring before global placement runs and are never moved afterward.
pub fn run_physical_design(
    netlist: &mut Netlist,
    library: &Library,
    config: &PhysicalDesignConfig,
    sink: &DiagnosticSink,
) -> CoreResult<PhysicalDesignResult> {
    let core = estimate_core_area(netlist, config.utilization, library);
    let mut db = PlacerDB::from_netlist(netlist, core, config.row_height, config.site_width);
    place_ports_on_ring(&mut db, netlist);

    let progress: Option<&ProgressCallback> = None;

    let strategy = Strategy::Hybrid(HybridParams {
        warmup_lambda_factor: config.hybrid_warmup_lambda_factor,
        refine: ElectrostaticParams {
            target_density: config.target_density,
            initial_lambda: config.initial_lambda,
            lambda_growth_rate: config.lambda_growth_rate,
            learning_rate: config.learning_rate,
            momentum: config.momentum,
            convergence_threshold: config.convergence_threshold,
            max_iterations: config.max_placement_iterations,
            warmup_lambda_factor: config.hybrid_warmup_lambda_factor,
            ..ElectrostaticParams::default()
        },
        ..HybridParams::default()
    });
    let global_placement = global_placer::run(strategy, &mut db, netlist, sink, progress);

    let legalization = legalizer::legalize_abacus(&mut db, sink);

    if config.detailed_placer_global_swap {
        detailed_placer::global_swap(&mut db, netlist);
    }
    let detailed_placement = detailed_placer::run(&mut db, netlist, 3);

    db.commit_placement(netlist);

    let mut grid = RoutingGrid::init(db.core_area(), config.routing_pitch, config.routing_pitch);
    for cell in db.all_cells() {
        if netlist.cell(cell).is_port() {
            continue;
        }
        grid.add_obstacle(db.cell_info(cell).rect(), None);
    }
    let router_cfg = RouterConfig {
        wire_cost: config.wire_cost,
        via_cost: config.via_cost,
        seed: config.seed,
        ..RouterConfig::default()
    };
    let routing = maze_router::route(netlist, &db, &mut grid, &router_cfg, progress);

    Ok(PhysicalDesignResult {
        placer_db: db,
        global_placement,
        legalization,
        detailed_placement,
        routing_grid: grid,
        routing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlsi_netlist::{Cell, CellType, Net, PinDirection};

    fn small_design() -> (Netlist, Library) {
        let mut nl = Netlist::new();
        let (_, in_pin) = nl.add_input_port("in0");
        let (_, out_pin) = nl.add_output_port("out0");
        let u1 = nl.add_cell(Cell::new("u1", CellType::Buf, 1.0, 2.0)).unwrap();
        let a = nl.add_pin(u1, "A", PinDirection::Input);
        let y = nl.add_pin(u1, "Y", PinDirection::Output);
        let n1 = nl.add_net(Net::new("n1")).unwrap();
        nl.connect(in_pin, n1);
        nl.connect(a, n1);
        let n2 = nl.add_net(Net::new("n2")).unwrap();
        nl.connect(y, n2);
        nl.connect(out_pin, n2);
        (nl, Library::new("test"))
    }

    fn test_config() -> PhysicalDesignConfig {
        PhysicalDesignConfig {
            project: Default::default(),
            verilog_file: "design.v".into(),
            liberty_file: "std.lib".into(),
            lef_file: None,
            utilization: 0.5,
            row_height: 2.0,
            site_width: 0.2,
            routing_pitch: 1.0,
            clock_period: 10.0,
            clock_uncertainty: 0.0,
            default_input_delay: 0.0,
            default_output_delay: 0.0,
            via_cost: 10.0,
            wire_cost: 1.0,
            target_density: 0.7,
            initial_lambda: 1e-4,
            lambda_growth_rate: 1.05,
            learning_rate: 0.1,
            momentum: 0.9,
            convergence_threshold: 1e-3,
            max_placement_iterations: 20,
            hybrid_warmup_lambda_factor: 0.3,
            detailed_placer_global_swap: false,
            seed: 1,
            logging: Default::default(),
        }
    }

    #[test]
    fn end_to_end_run_produces_valid_legal_placement() {
        let (mut nl, lib) = small_design();
        let sink = DiagnosticSink::new();
        let result = run_physical_design(&mut nl, &lib, &test_config(), &sink).unwrap();
        assert!(result.placer_db.is_valid_placement());
        assert!(nl.cell(nl.cell_id_by_name("u1").unwrap()).placed);
    }

    #[test]
    fn ports_stay_on_core_boundary() {
        let (mut nl, lib) = small_design();
        let sink = DiagnosticSink::new();
        let result = run_physical_design(&mut nl, &lib, &test_config(), &sink).unwrap();
        let core = result.placer_db.core_area();
        let in_cell = nl.cell_id_by_name("in0").unwrap();
        let info = result.placer_db.cell_info(in_cell);
        let on_boundary = (info.x - core.x).abs() < 1e-6
            || (info.y - core.y).abs() < 1e-6
            || (info.x - core.right()).abs() < 1e-6
            || (info.y - core.top()).abs() < 1e-6;
        assert!(on_boundary);
    }
}
