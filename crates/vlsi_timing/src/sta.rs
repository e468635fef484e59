//! Static timing analysis driver.
//!
//! Grounded on `original_source/apps/mini_sta/sta_engine.h`'s `STAEngine::run`
//! sequence (`updateArcDelays` -> `updateArrivalTimes` -> `updateRequiredTimes`
//! -> `updateSlacks`), reshaped into a single topological forward pass (arc
//! delays are computed on the fly using the already-settled upstream slew,
//! since topological order already guarantees the predecessor is final) plus
//! one reverse pass for required times, per spec.md §4.9/§9.

use crate::constraints::TimingConstraints;
use crate::graph::{TimingArcKind, TimingGraph, TimingNode, TimingNodeId};
use crate::report::{CriticalPath, PathElement, TimingEndpoint, TimingReport};
use vlsi_common::CoreResult;
use vlsi_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use vlsi_netlist::{CellType, Library, Netlist, NetId, PinId};
use vlsi_source::Span;

/// Number of critical paths included in the report.
const TOP_K_PATHS: usize = 5;
/// Fallback load capacitance used when a pin's Liberty data can't be found.
const DEFAULT_PIN_CAPACITANCE: f64 = 1.0;

fn pin_label(netlist: &Netlist, pin: PinId) -> String {
    let owner = netlist.pin(pin).owner;
    let cell = netlist.cell(owner);
    if cell.is_port() {
        cell.name.clone()
    } else {
        format!("{}/{}", cell.name, netlist.pin(pin).name)
    }
}

/// Whether `pin` is the clock pin of a sequential cell (connected to a net
/// flagged `is_clock`), used to exclude it from data-path end-point scanning.
fn is_clock_pin(netlist: &Netlist, pin: PinId) -> bool {
    netlist
        .net_ids()
        .any(|n| netlist.net(n).is_clock && netlist.net(n).is_connected_to(pin))
}

fn net_load_capacitance(netlist: &Netlist, library: &Library, net: NetId, wire_cap_per_unit: f64) -> f64 {
    let net_ref = netlist.net(net);
    let pin_cap: f64 = net_ref
        .loads
        .iter()
        .map(|&pin| {
            let owner = netlist.pin(pin).owner;
            let cell = netlist.cell(owner);
            library
                .cell(&cell.library_cell)
                .and_then(|lc| lc.pin(&netlist.pin(pin).name))
                .map(|lp| lp.capacitance)
                .unwrap_or(DEFAULT_PIN_CAPACITANCE)
        })
        .sum();
    let hpwl = vlsi_netlist::net_hpwl(netlist, net, |cell| {
        let c = netlist.cell(cell);
        (c.x + c.width / 2.0, c.y + c.height / 2.0)
    });
    pin_cap + wire_cap_per_unit * hpwl
}

/// Computes a net arc's delay and output slew. Prefers the actual routed
/// wire delay (per [`vlsi_netlist::Net::wire_delay`]) when `routed` is true
/// and the net has been routed; otherwise falls back to a lumped Elmore
/// estimate `0.69 * R * C` with `R` scaled by HPWL length over fanout.
fn net_arc_delay(
    netlist: &Netlist,
    library: &Library,
    net: NetId,
    routed: bool,
    constraints: &TimingConstraints,
    src_slew: f64,
) -> (f64, f64) {
    let net_ref = netlist.net(net);
    if routed && net_ref.wire_delay > 0.0 {
        return (net_ref.wire_delay, src_slew);
    }
    let hpwl = vlsi_netlist::net_hpwl(netlist, net, |cell| {
        let c = netlist.cell(cell);
        (c.x + c.width / 2.0, c.y + c.height / 2.0)
    });
    let fanout = net_ref.fanout().max(1) as f64;
    let r_wire = constraints.wire_resistance_per_unit * hpwl / fanout;
    let c_load = net_load_capacitance(netlist, library, net, constraints.wire_cap_per_unit);
    (0.69 * r_wire * c_load, src_slew)
}

/// Computes a cell arc's delay and output slew via bilinear NLDM lookup.
/// Falls back to a zero delay with a warning diagnostic when the Liberty
/// timing arc can't be resolved for the pin pair.
fn cell_arc_delay(
    netlist: &Netlist,
    library: &Library,
    arc: &crate::graph::TimingArc,
    wire_cap_per_unit: f64,
    src_slew: f64,
    sink: &DiagnosticSink,
) -> (f64, f64) {
    let TimingArcKind::Cell { cell, input_pin, output_pin } = arc.kind else {
        unreachable!("cell_arc_delay called on a non-cell arc")
    };
    let cell_ref = netlist.cell(cell);
    let timing = library
        .cell(&cell_ref.library_cell)
        .and_then(|lc| lc.pin(&netlist.pin(output_pin).name))
        .and_then(|lp| lp.arc_from(&netlist.pin(input_pin).name));

    let Some(timing) = timing else {
        sink.emit(Diagnostic::warning(
            DiagnosticCode::new(Category::Timing, 2),
            format!(
                "no Liberty timing arc for {}/{} <- {}; treating delay as zero",
                cell_ref.name,
                netlist.pin(output_pin).name,
                netlist.pin(input_pin).name
            ),
            Span::DUMMY,
        ));
        return (0.0, src_slew);
    };

    let c_load = if let Some(net) = output_net_of(netlist, output_pin) {
        net_load_capacitance(netlist, library, net, wire_cap_per_unit)
    } else {
        DEFAULT_PIN_CAPACITANCE
    };
    let delay = timing.cell_delay.interpolate(src_slew, c_load);
    let slew = timing.rise_transition.interpolate(src_slew, c_load);
    (delay, slew)
}

fn output_net_of(netlist: &Netlist, pin: PinId) -> Option<NetId> {
    netlist.net_ids().find(|&n| netlist.net(n).driver == Some(pin))
}

/// Whether a node's pin is a primary-input port.
fn is_primary_input(netlist: &Netlist, node: &TimingNode) -> bool {
    let owner = netlist.pin(node.pin).owner;
    netlist.cell(owner).cell_type == CellType::Input
}

/// Whether a node's pin is a primary-output port.
fn is_primary_output(netlist: &Netlist, node: &TimingNode) -> bool {
    let owner = netlist.pin(node.pin).owner;
    netlist.cell(owner).cell_type == CellType::Output
}

/// Whether a node's pin is a DFF `D` data input (a sequential endpoint),
/// excluding the clock pin via [`is_clock_pin`].
fn is_sequential_input(netlist: &Netlist, node: &TimingNode) -> bool {
    let pin = netlist.pin(node.pin);
    netlist.cell(pin.owner).is_sequential() && pin.is_input() && !is_clock_pin(netlist, node.pin)
}

/// Looks up a sequential cell's setup/hold check tables for its data pin,
/// per spec.md §4.9's Liberty-setup/hold feature (grounded on
/// `sta_engine.h`'s `checkSetupHoldConstraints`). Returns `(setup, hold)`.
fn sequential_setup_hold(library: &Library, netlist: &Netlist, node: &TimingNode) -> Option<(f64, f64)> {
    let pin = netlist.pin(node.pin);
    let cell = netlist.cell(pin.owner);
    let libcell = library.cell(&cell.library_cell)?;
    let libpin = libcell.pin(&pin.name)?;
    let setup = libpin
        .timing_arcs
        .iter()
        .find(|t| t.timing_type == vlsi_netlist::TimingType::SetupRising)
        .map(|t| t.cell_delay.interpolate(node.slew_max, 0.0));
    let hold = libpin
        .timing_arcs
        .iter()
        .find(|t| t.timing_type == vlsi_netlist::TimingType::HoldRising)
        .map(|t| t.cell_delay.interpolate(node.slew_max, 0.0));
    match (setup, hold) {
        (Some(s), Some(h)) => Some((s, h)),
        _ => None,
    }
}

/// Runs static timing analysis over a placed (and optionally routed)
/// netlist. When `routed` is true, net arc delays prefer each net's actual
/// [`vlsi_netlist::Net::wire_delay`] over the HPWL/Elmore estimate.
///
/// A combinational cycle makes topological propagation impossible; in that
/// case a [`Category::Timing`] error is emitted to `sink` and an empty
/// report is returned rather than failing the call, per the propagation
/// policy shared with the rest of the physical-design pipeline.
pub fn run_sta(
    netlist: &Netlist,
    library: &Library,
    routed: bool,
    constraints: &TimingConstraints,
    sink: &DiagnosticSink,
) -> CoreResult<TimingReport> {
    let mut graph = TimingGraph::build_from_netlist(netlist, library, sink);

    let order = match graph.topological_sort() {
        Ok(order) => order,
        Err(node_id) => {
            let pin = graph.node(node_id).pin;
            sink.emit(Diagnostic::error(
                DiagnosticCode::new(Category::Timing, 3),
                format!(
                    "combinational cycle detected through '{}'; timing analysis aborted",
                    pin_label(netlist, pin)
                ),
                Span::DUMMY,
            ));
            return Ok(TimingReport::empty());
        }
    };

    forward_propagate(&mut graph, netlist, library, routed, constraints, sink, &order);
    backward_propagate(&mut graph, netlist, library, constraints, &order);

    Ok(build_report(&graph, netlist))
}

fn forward_propagate(
    graph: &mut TimingGraph,
    netlist: &Netlist,
    library: &Library,
    routed: bool,
    constraints: &TimingConstraints,
    sink: &DiagnosticSink,
    order: &[TimingNodeId],
) {
    for &node_id in order {
        let node = graph.node(node_id).clone();

        if node.incoming.is_empty() {
            // Primary inputs get the configured input delay/slew; DFF `Q`
            // outputs (and any other true source) are referenced to the
            // clock edge at t=0.
            let at = if is_primary_input(netlist, &node) {
                constraints.default_input_delay
            } else {
                0.0
            };
            let n = graph.node_mut(node_id);
            n.at_max = at;
            n.at_min = at;
            n.slew_max = constraints.default_input_slew;
            n.slew_min = constraints.default_input_slew;
            continue;
        }

        let mut best_max = f64::NEG_INFINITY;
        let mut best_max_slew = 0.0;
        let mut best_min = f64::INFINITY;
        let mut best_min_slew = 0.0;

        let incoming = node.incoming.clone();
        for arc_id in incoming {
            let arc = graph.arc(arc_id).clone();
            let src = graph.node(arc.from).clone();

            let (delay, slew) = match arc.kind {
                TimingArcKind::Net { net } => {
                    net_arc_delay(netlist, library, net, routed, constraints, src.slew_max)
                }
                TimingArcKind::Cell { .. } => {
                    cell_arc_delay(netlist, library, &arc, constraints.wire_cap_per_unit, src.slew_max, sink)
                }
            };

            let candidate_max = src.at_max + delay;
            if candidate_max > best_max {
                best_max = candidate_max;
                best_max_slew = slew;
            }
            let candidate_min = src.at_min + delay;
            if candidate_min < best_min {
                best_min = candidate_min;
                best_min_slew = slew;
            }

            let arc_mut = graph.arc_mut(arc_id);
            arc_mut.delay_max = delay;
            arc_mut.delay_min = delay;
            arc_mut.slew_max = slew;
            arc_mut.slew_min = slew;
        }

        let n = graph.node_mut(node_id);
        n.at_max = best_max;
        n.at_min = best_min;
        n.slew_max = best_max_slew;
        n.slew_min = best_min_slew;
    }
}

fn backward_propagate(
    graph: &mut TimingGraph,
    netlist: &Netlist,
    library: &Library,
    constraints: &TimingConstraints,
    order: &[TimingNodeId],
) {
    for &node_id in order.iter().rev() {
        let node = graph.node(node_id).clone();

        if node.outgoing.is_empty() {
            let (rat_max, rat_min) = if is_sequential_input(netlist, &node) {
                match sequential_setup_hold(library, netlist, &node) {
                    Some((setup, hold)) => (
                        constraints.clock_period - constraints.clock_uncertainty - setup - constraints.setup_margin,
                        hold,
                    ),
                    // No Liberty setup/hold table: fall back to the static
                    // clock-period rule. Hold RAT defaults to 0.0 for
                    // endpoints per `timing_checks.h`'s v1.0 note.
                    None => (
                        constraints.clock_period - constraints.clock_uncertainty - constraints.setup_margin,
                        0.0,
                    ),
                }
            } else if is_primary_output(netlist, &node) {
                (
                    constraints.clock_period - constraints.clock_uncertainty - constraints.default_output_delay
                        - constraints.setup_margin,
                    0.0,
                )
            } else {
                // A dangling node with no fanout that isn't a recognised
                // endpoint: leave it unconstrained.
                (f64::INFINITY, f64::NEG_INFINITY)
            };
            let n = graph.node_mut(node_id);
            n.rat_max = rat_max;
            n.rat_min = rat_min;
            continue;
        }

        let mut worst_max = f64::INFINITY;
        let mut worst_min = f64::NEG_INFINITY;
        for &arc_id in &node.outgoing {
            let arc = graph.arc(arc_id).clone();
            let dst = graph.node(arc.to).clone();
            worst_max = worst_max.min(dst.rat_max - arc.delay_max);
            worst_min = worst_min.max(dst.rat_min - arc.delay_min);
        }
        let n = graph.node_mut(node_id);
        n.rat_max = worst_max;
        n.rat_min = worst_min;
    }
}

fn build_report(graph: &TimingGraph, netlist: &Netlist) -> TimingReport {
    let mut report = TimingReport::empty();

    let end_points = graph.end_points(netlist);
    for &node_id in &end_points {
        let node = graph.node(node_id);
        let label = pin_label(netlist, node.pin);
        report.endpoints.insert(
            label,
            TimingEndpoint {
                setup_slack: node.setup_slack(),
                hold_slack: node.hold_slack(),
            },
        );
    }

    let negative_slacks: Vec<f64> = report
        .endpoints
        .values()
        .map(|e| e.setup_slack)
        .filter(|&s| s < 0.0)
        .collect();
    report.worst_negative_slack = negative_slacks.iter().cloned().fold(0.0, f64::min);
    report.total_negative_slack = negative_slacks.iter().sum();

    let mut sorted_ends = end_points.clone();
    sorted_ends.sort_by(|&a, &b| {
        graph
            .node(a)
            .setup_slack()
            .partial_cmp(&graph.node(b).setup_slack())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for &end in sorted_ends.iter().take(TOP_K_PATHS) {
        report.critical_paths.push(trace_critical_path(graph, netlist, end));
    }

    report
}

/// Backtraces the worst-arrival path ending at `end`, choosing at each step
/// the incoming arc whose `src.at_max + delay_max` equals the node's
/// `at_max`, per `timing_report.h`'s back-tracing `generatePath`.
fn trace_critical_path(graph: &TimingGraph, netlist: &Netlist, end: TimingNodeId) -> CriticalPath {
    let mut points = Vec::new();
    let mut current = end;

    loop {
        let node = graph.node(current);
        points.push(PathElement {
            pin: pin_label(netlist, node.pin),
            incr_delay: 0.0,
            arrival_time: node.at_max,
        });

        if node.incoming.is_empty() {
            break;
        }

        let mut chosen = None;
        for &arc_id in &node.incoming {
            let arc = graph.arc(arc_id);
            let src = graph.node(arc.from);
            if (src.at_max + arc.delay_max - node.at_max).abs() < 1e-9 {
                chosen = Some((arc.from, arc.delay_max));
                break;
            }
        }
        let Some((from, incr_delay)) = chosen else { break };
        points.last_mut().unwrap().incr_delay = incr_delay;
        current = from;
    }

    points.reverse();
    let end_node = graph.node(end);
    CriticalPath {
        points,
        data_arrival_time: end_node.at_max,
        data_required_time: end_node.rat_max,
        slack: end_node.setup_slack(),
    }
}
