//! Progress reporting for the long-running iterative phases (global
//! placement, PathFinder routing). Each phase invokes an optional callback
//! synchronously once per outer-loop iteration; there is no background
//! thread or channel, matching the workspace's single-threaded execution
//! model.

/// One reported event from an iterative physical-design phase.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// One global-placement iteration completed.
    GlobalPlacementIteration {
        /// Iteration number, starting at 0.
        iteration: u32,
        /// Total (unweighted) HPWL at this iteration.
        hpwl: f64,
        /// Total overflow area above the target density.
        overflow: f64,
        /// Current density penalty weight.
        lambda: f64,
    },
    /// Legalization completed for one row.
    LegalizationRow {
        /// Row index.
        row: u32,
        /// Number of cells legalized in this row.
        cell_count: usize,
    },
    /// One detailed-placement sweep completed.
    DetailedPlacementSweep {
        /// Sweep number, starting at 0.
        sweep: u32,
        /// Total HPWL after this sweep.
        hpwl: f64,
    },
    /// One PathFinder routing iteration completed.
    RoutingIteration {
        /// Iteration number, starting at 0.
        iteration: u32,
        /// Number of overused routing resources remaining.
        overused_resources: usize,
        /// Number of nets that failed to route entirely this iteration.
        unrouted_nets: usize,
    },
}

/// A progress callback: invoked synchronously, in order, once per
/// outer-loop iteration of a long-running phase.
pub type ProgressCallback<'a> = dyn Fn(ProgressEvent) + 'a;
