//! Timing report types returned by [`crate::sta::run_sta`].
//!
//! Grounded on `original_source/apps/mini_sta/timing_report.h`'s
//! `PathPoint`/`TimingPath`/`TimingReporter`, with pointers to graph nodes
//! replaced by owned, serializable strings so a [`TimingReport`] survives
//! independently of the [`crate::graph::TimingGraph`] it was computed from.

use serde::{Deserialize, Serialize};

/// One hop of a reported timing path, naming the pin it arrives at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathElement {
    /// `"<cell>/<pin>"`, or just `<pin>` for a top-level port.
    pub pin: String,
    /// Incremental delay of the arc used to reach this point, ns. `0.0`
    /// for the path's first point (the startpoint itself).
    pub incr_delay: f64,
    /// Accumulated arrival time at this point, ns.
    pub arrival_time: f64,
}

/// A single startpoint-to-endpoint timing path, worst (max-delay) mode
/// unless noted otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Path points in order, startpoint first.
    pub points: Vec<PathElement>,
    /// Data arrival time at the endpoint, ns.
    pub data_arrival_time: f64,
    /// Data required time at the endpoint, ns.
    pub data_required_time: f64,
    /// `data_required_time - data_arrival_time`. Negative is a violation.
    pub slack: f64,
}

impl CriticalPath {
    /// The path's first point's pin name, or `""` if empty.
    pub fn start_point(&self) -> &str {
        self.points.first().map(|p| p.pin.as_str()).unwrap_or("")
    }

    /// The path's last point's pin name, or `""` if empty.
    pub fn end_point(&self) -> &str {
        self.points.last().map(|p| p.pin.as_str()).unwrap_or("")
    }

    /// Whether this path violates its setup (or hold) check.
    pub fn is_violation(&self) -> bool {
        self.slack < 0.0
    }
}

/// One timing endpoint's setup/hold summary, independent of any reported
/// critical path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingEndpoint {
    /// This endpoint's setup slack, ns.
    pub setup_slack: f64,
    /// This endpoint's hold slack, ns.
    pub hold_slack: f64,
}

/// The full result of one [`crate::sta::run_sta`] call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingReport {
    /// Worst negative slack over all setup endpoints, ns. `0.0` if no
    /// endpoint violates (or there are no endpoints).
    pub worst_negative_slack: f64,
    /// Sum of all negative setup slacks over all endpoints, ns.
    pub total_negative_slack: f64,
    /// Worst-case critical paths, longest setup violation first, truncated
    /// to the top-K requested by the caller.
    pub critical_paths: Vec<CriticalPath>,
    /// Per-endpoint slack summary, keyed by `"<cell>/<pin>"`.
    pub endpoints: std::collections::HashMap<String, TimingEndpoint>,
}

impl TimingReport {
    /// An empty report: zero slack, no paths, no endpoints. Returned by
    /// `run_sta` when the timing graph has a combinational cycle and
    /// analysis cannot proceed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Count of endpoints whose setup slack is negative.
    pub fn violation_count(&self) -> usize {
        self.endpoints.values().filter(|e| e.setup_slack < 0.0).count()
    }

    /// Whether any endpoint violates setup or hold.
    pub fn has_violations(&self) -> bool {
        self.endpoints.values().any(|e| e.setup_slack < 0.0 || e.hold_slack < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_no_violations() {
        let report = TimingReport::empty();
        assert_eq!(report.violation_count(), 0);
        assert!(!report.has_violations());
        assert!(report.critical_paths.is_empty());
    }

    #[test]
    fn violation_count_counts_only_negative_setup_slack() {
        let mut report = TimingReport::default();
        report.endpoints.insert(
            "u1/D".into(),
            TimingEndpoint { setup_slack: -0.5, hold_slack: 0.1 },
        );
        report.endpoints.insert(
            "u2/D".into(),
            TimingEndpoint { setup_slack: 0.2, hold_slack: -0.1 },
        );
        assert_eq!(report.violation_count(), 1);
        assert!(report.has_violations());
    }

    #[test]
    fn critical_path_start_and_end_points() {
        let path = CriticalPath {
            points: vec![
                PathElement { pin: "in0".into(), incr_delay: 0.0, arrival_time: 0.0 },
                PathElement { pin: "u1/Y".into(), incr_delay: 0.1, arrival_time: 0.1 },
            ],
            data_arrival_time: 0.1,
            data_required_time: 1.0,
            slack: 0.9,
        };
        assert_eq!(path.start_point(), "in0");
        assert_eq!(path.end_point(), "u1/Y");
        assert!(!path.is_violation());
    }

    #[test]
    fn negative_slack_path_is_a_violation() {
        let path = CriticalPath {
            points: vec![],
            data_arrival_time: 5.0,
            data_required_time: 4.0,
            slack: -1.0,
        };
        assert!(path.is_violation());
    }
}
