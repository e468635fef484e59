//! Net type: a driver pin and its fanout of load pins.

use crate::ids::PinId;
use serde::{Deserialize, Serialize};

/// A net connects one driver pin to zero or more load pins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Net {
    /// The net's name, unique within the netlist.
    pub name: String,
    /// The output pin driving this net, if connected.
    pub driver: Option<PinId>,
    /// The input pins loading this net.
    pub loads: Vec<PinId>,
    /// Routed wire capacitance, in library capacitance units. Populated
    /// after routing; `0.0` before.
    pub wire_capacitance: f64,
    /// Routed wire delay, in nanoseconds. Populated after routing; `0.0` before.
    pub wire_delay: f64,
    /// Whether this net carries a clock signal.
    pub is_clock: bool,
}

impl Net {
    /// Creates a new, undriven net with no loads.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: None,
            loads: Vec::new(),
            wire_capacitance: 0.0,
            wire_delay: 0.0,
            is_clock: false,
        }
    }

    /// Sets this net's driver pin.
    pub fn set_driver(&mut self, pin: PinId) {
        self.driver = Some(pin);
    }

    /// Adds a load pin to this net.
    pub fn add_load(&mut self, pin: PinId) {
        self.loads.push(pin);
    }

    /// Removes a load pin from this net, if present.
    pub fn remove_load(&mut self, pin: PinId) {
        self.loads.retain(|&p| p != pin);
    }

    /// Number of load pins (fanout).
    pub fn fanout(&self) -> usize {
        self.loads.len()
    }

    /// Whether this net has a driver pin.
    pub fn has_driver(&self) -> bool {
        self.driver.is_some()
    }

    /// Whether the given pin is the driver or one of the loads of this net.
    pub fn is_connected_to(&self, pin: PinId) -> bool {
        self.driver == Some(pin) || self.loads.contains(&pin)
    }

    /// All pins on this net (driver, then loads), for iterating every
    /// endpoint without distinguishing direction.
    pub fn all_pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.driver.into_iter().chain(self.loads.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_net_has_no_driver() {
        let net = Net::new("n1");
        assert!(!net.has_driver());
        assert_eq!(net.fanout(), 0);
    }

    #[test]
    fn add_and_remove_load() {
        let mut net = Net::new("n1");
        let p1 = PinId::from_raw(0);
        let p2 = PinId::from_raw(1);
        net.add_load(p1);
        net.add_load(p2);
        assert_eq!(net.fanout(), 2);
        net.remove_load(p1);
        assert_eq!(net.fanout(), 1);
        assert!(net.is_connected_to(p2));
        assert!(!net.is_connected_to(p1));
    }

    #[test]
    fn all_pins_includes_driver_and_loads() {
        let mut net = Net::new("n1");
        let driver = PinId::from_raw(0);
        let load = PinId::from_raw(1);
        net.set_driver(driver);
        net.add_load(load);
        let pins: Vec<_> = net.all_pins().collect();
        assert_eq!(pins, vec![driver, load]);
    }
}
