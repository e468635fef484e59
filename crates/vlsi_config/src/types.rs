//! Configuration types for a physical-design run.
//!
//! A [`PhysicalDesignConfig`] is the single flat set of options that drives
//! placement, legalisation, routing, and timing analysis. There is no
//! target/device resolution step — this workspace targets a single
//! technology described entirely by the `liberty_file`/`lef_file` inputs
//! and this option table.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a physical-design run, as read from a
/// `vlsi.toml` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalDesignConfig {
    /// Optional project metadata. Carries no placement/routing/timing semantics.
    #[serde(default)]
    pub project: ProjectMeta,

    /// Path to the structural netlist input (already parsed upstream; this
    /// field records provenance only).
    pub verilog_file: String,
    /// Path to the Liberty (`.lib`) timing/power library.
    pub liberty_file: String,
    /// Path to the LEF physical library, if physical macro data is available.
    #[serde(default)]
    pub lef_file: Option<String>,

    /// Target core utilization, in `(0.0, 1.0]`.
    pub utilization: f64,
    /// Standard-cell row height, in library length units.
    pub row_height: f64,
    /// Placement site width, in library length units.
    pub site_width: f64,
    /// Routing track pitch, in library length units. No hard-coded default:
    /// this is always required, since pitch is a technology property with
    /// no generically "reasonable" value.
    pub routing_pitch: f64,

    /// Target clock period, in nanoseconds.
    pub clock_period: f64,
    /// Clock uncertainty (jitter + skew margin), in nanoseconds.
    #[serde(default)]
    pub clock_uncertainty: f64,
    /// Default input delay applied to primary inputs without an explicit value, in nanoseconds.
    #[serde(default)]
    pub default_input_delay: f64,
    /// Default output delay applied to primary outputs without an explicit value, in nanoseconds.
    #[serde(default)]
    pub default_output_delay: f64,

    /// Routing cost of a via (layer change), in the router's abstract cost units.
    #[serde(default = "default_via_cost")]
    pub via_cost: f64,
    /// Routing cost per unit length of wire, in the router's abstract cost units.
    #[serde(default = "default_wire_cost")]
    pub wire_cost: f64,

    /// Target density for the electrostatic global placer, in `(0.0, 1.0]`.
    #[serde(default = "default_target_density")]
    pub target_density: f64,
    /// Initial density-penalty weight (lambda) for the Nesterov optimizer.
    #[serde(default = "default_initial_lambda")]
    pub initial_lambda: f64,
    /// Multiplicative growth rate applied to lambda after each outer iteration.
    #[serde(default = "default_lambda_growth_rate")]
    pub lambda_growth_rate: f64,
    /// Nesterov learning rate (step size).
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Nesterov momentum coefficient.
    #[serde(default = "default_momentum")]
    pub momentum: f64,
    /// Convergence threshold on relative HPWL change between outer iterations.
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,
    /// Maximum number of global-placement outer iterations.
    #[serde(default = "default_max_placement_iterations")]
    pub max_placement_iterations: u32,
    /// Lambda tempering factor applied during the hybrid strategy's warm-up
    /// phase (see the design notes on warm-up tempering).
    #[serde(default = "default_hybrid_warmup_lambda_factor")]
    pub hybrid_warmup_lambda_factor: f64,

    /// Whether the detailed placer runs an equal-width cross-row global-swap
    /// pre-pass before the sliding-window reordering pass.
    #[serde(default)]
    pub detailed_placer_global_swap: bool,

    /// Random seed. All randomised phases (initial placement, PathFinder net
    /// ordering) are seeded from this value so a run is fully reproducible.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Ambient logging configuration; unrelated to design semantics.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_via_cost() -> f64 {
    10.0
}

fn default_wire_cost() -> f64 {
    1.0
}

fn default_target_density() -> f64 {
    0.7
}

fn default_initial_lambda() -> f64 {
    0.0001
}

fn default_lambda_growth_rate() -> f64 {
    1.05
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_momentum() -> f64 {
    0.9
}

fn default_convergence_threshold() -> f64 {
    0.001
}

fn default_max_placement_iterations() -> u32 {
    500
}

fn default_hybrid_warmup_lambda_factor() -> f64 {
    0.3
}

fn default_seed() -> u64 {
    1
}

/// Descriptive metadata about the project. No design semantics attach to this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Human-readable project name.
    #[serde(default)]
    pub name: String,
    /// Short project description.
    #[serde(default)]
    pub description: String,
}

/// Controls whether phase progress is collected anywhere observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// When `true`, each outer-loop iteration of global placement and
    /// routing is recorded (by whatever progress sink the caller wires up);
    /// when `false`, progress callbacks are not invoked at all.
    #[serde(default = "default_progress_enabled")]
    pub progress: bool,
}

fn default_progress_enabled() -> bool {
    false
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            progress: default_progress_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
verilog_file = "design.v"
liberty_file = "std.lib"
utilization = 0.7
row_height = 2.0
site_width = 0.2
routing_pitch = 0.2
clock_period = 10.0
"#
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let cfg: PhysicalDesignConfig = toml::from_str(minimal_toml()).unwrap();
        assert_eq!(cfg.verilog_file, "design.v");
        assert_eq!(cfg.liberty_file, "std.lib");
        assert!(cfg.lef_file.is_none());
        assert_eq!(cfg.target_density, 0.7);
        assert_eq!(cfg.initial_lambda, 0.0001);
        assert_eq!(cfg.lambda_growth_rate, 1.05);
        assert_eq!(cfg.learning_rate, 0.1);
        assert_eq!(cfg.momentum, 0.9);
        assert_eq!(cfg.convergence_threshold, 0.001);
        assert_eq!(cfg.max_placement_iterations, 500);
        assert_eq!(cfg.seed, 1);
        assert!(!cfg.detailed_placer_global_swap);
        assert!(!cfg.logging.progress);
    }

    #[test]
    fn parses_full_config() {
        let toml = r#"
[project]
name = "adder4"
description = "4-bit ripple-carry adder"

verilog_file = "adder4.v"
liberty_file = "nangate45.lib"
lef_file = "nangate45.lef"
utilization = 0.6
row_height = 2.72
site_width = 0.19
routing_pitch = 0.19
clock_period = 2.0
clock_uncertainty = 0.1
default_input_delay = 0.3
default_output_delay = 0.3
via_cost = 15.0
wire_cost = 1.5
target_density = 0.8
initial_lambda = 0.0002
lambda_growth_rate = 1.1
learning_rate = 0.2
momentum = 0.85
convergence_threshold = 0.0005
max_placement_iterations = 300
hybrid_warmup_lambda_factor = 0.2
detailed_placer_global_swap = true
seed = 42

[logging]
progress = true
"#;
        let cfg: PhysicalDesignConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.project.name, "adder4");
        assert_eq!(cfg.lef_file.as_deref(), Some("nangate45.lef"));
        assert_eq!(cfg.seed, 42);
        assert!(cfg.detailed_placer_global_swap);
        assert!(cfg.logging.progress);
    }
}
