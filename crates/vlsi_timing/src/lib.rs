//! Static timing analysis for the physical-design core.
//!
//! Builds a pin-based timing graph from a placed [`vlsi_netlist::Netlist`]
//! and its Liberty [`vlsi_netlist::Library`], propagates arrival and
//! required times through it, and reports slack and critical paths.
//!
//! # Usage
//!
//! ```ignore
//! use vlsi_timing::{run_sta, TimingConstraints};
//!
//! let constraints = TimingConstraints::from_config(&config);
//! let report = run_sta(&netlist, &library, routed, &constraints, &sink)?;
//! println!("WNS: {:.3} ns, TNS: {:.3} ns", report.worst_negative_slack, report.total_negative_slack);
//! ```
//!
//! # Architecture
//!
//! - [`constraints`] — flat clock-period/I-O-delay/NLDM parameters
//! - [`graph`] — pin-based timing graph (nodes + CELL_ARC/NET_ARC arcs)
//! - [`sta`] — forward/backward propagation, slack, critical-path extraction
//! - [`report`] — timing report types (per-endpoint slack, critical paths)

#![warn(missing_docs)]

pub mod constraints;
pub mod graph;
pub mod ids;
pub mod report;
pub mod sta;

pub use constraints::TimingConstraints;
pub use graph::{TimingArc, TimingArcKind, TimingGraph, TimingGraphStats, TimingNode};
pub use ids::{TimingArcId, TimingNodeId};
pub use report::{CriticalPath, PathElement, TimingEndpoint, TimingReport};
pub use sta::run_sta;
