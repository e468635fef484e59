//! Flat timing constraints consumed by [`crate::sta::run_sta`].
//!
//! SDC/XDC parsing is out of scope (spec.md's Non-goals): there is a single
//! clock, a single set of I/O delay defaults, and no path exceptions.
//! Grounded on `original_source/apps/mini_sta/timing_constraints.h`'s
//! `TimingConstraints` class, flattened to the fields spec.md §6's
//! `PhysicalDesignConfig` table actually carries plus the handful of
//! NLDM/Elmore parameters the original took from `setPhysicalParameters`
//! that never made it into the shared config struct.

use serde::{Deserialize, Serialize};
use vlsi_config::PhysicalDesignConfig;

/// Parameters that drive one [`crate::sta::run_sta`] run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingConstraints {
    /// Target clock period, ns. Used as the default required time for
    /// sequential/primary-output endpoints.
    pub clock_period: f64,
    /// Clock uncertainty (jitter + skew margin), ns, subtracted from the
    /// clock period when computing an endpoint's required time.
    pub clock_uncertainty: f64,
    /// Assumed arrival time at every primary input, ns.
    pub default_input_delay: f64,
    /// Assumed external delay budget for every primary output, ns,
    /// subtracted from the clock period when computing its required time.
    pub default_output_delay: f64,
    /// Assumed transition time at every primary input, ns. Not part of
    /// `PhysicalDesignConfig` (no caller has needed to tune it yet); kept
    /// as a documented constant default here instead of growing the
    /// shared config struct for a value only this crate consumes.
    pub default_input_slew: f64,
    /// Extra setup margin added on top of any Liberty setup check, ns.
    pub setup_margin: f64,
    /// Wire resistance per unit HPWL length, used by the Elmore net-delay
    /// estimate when a net hasn't been routed yet (or `routed` is false).
    pub wire_resistance_per_unit: f64,
    /// Wire capacitance per unit HPWL length, added to a net's load
    /// capacitance alongside its sink pins' Liberty input capacitances.
    pub wire_cap_per_unit: f64,
}

impl TimingConstraints {
    /// Builds constraints from the shared physical-design config, filling
    /// in the NLDM/Elmore parameters `PhysicalDesignConfig` doesn't carry
    /// with documented defaults (see field docs above).
    pub fn from_config(config: &PhysicalDesignConfig) -> Self {
        Self {
            clock_period: config.clock_period,
            clock_uncertainty: config.clock_uncertainty,
            default_input_delay: config.default_input_delay,
            default_output_delay: config.default_output_delay,
            ..Self::default()
        }
    }
}

impl Default for TimingConstraints {
    fn default() -> Self {
        Self {
            clock_period: 10.0,
            clock_uncertainty: 0.0,
            default_input_delay: 0.0,
            default_output_delay: 0.0,
            default_input_slew: 0.05,
            setup_margin: 0.0,
            wire_resistance_per_unit: 0.1,
            wire_cap_per_unit: 0.05,
        }
    }
}
