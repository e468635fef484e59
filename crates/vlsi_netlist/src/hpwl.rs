//! Half-perimeter wirelength (HPWL) utilities.
//!
//! HPWL approximates a net's wirelength as the perimeter of the bounding box
//! around its pins, divided by two. It is the standard cheap proxy for
//! wirelength used by both the global placer's objective and the detailed
//! placer's swap/reorder acceptance test.

use crate::ids::{CellId, NetId};
use crate::netlist::Netlist;

/// Computes the HPWL of a single net, using `position_of` to resolve each
/// pin's owning cell to a placement position (typically the cell's center).
/// A net with fewer than two pins contributes `0.0`.
pub fn net_hpwl(netlist: &Netlist, net: NetId, position_of: impl Fn(CellId) -> (f64, f64)) -> f64 {
    let net_ref = netlist.net(net);
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut count = 0;

    for pin in net_ref.all_pins() {
        let owner = netlist.pin(pin).owner;
        let (x, y) = position_of(owner);
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
        count += 1;
    }

    if count < 2 {
        return 0.0;
    }
    (max_x - min_x) + (max_y - min_y)
}

/// Computes the total HPWL across every net in the netlist.
pub fn total_hpwl(netlist: &Netlist, position_of: impl Fn(CellId) -> (f64, f64)) -> f64 {
    netlist
        .net_ids()
        .map(|n| net_hpwl(netlist, n, &position_of))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellType, PinDirection};
    use crate::net::Net;
    use std::collections::HashMap;

    #[test]
    fn hpwl_of_two_pin_net() {
        let mut nl = Netlist::new();
        let u1 = nl.add_cell(Cell::new("u1", CellType::Buf, 1.0, 1.0)).unwrap();
        let u2 = nl.add_cell(Cell::new("u2", CellType::Buf, 1.0, 1.0)).unwrap();
        let y = nl.add_pin(u1, "Y", PinDirection::Output);
        let a = nl.add_pin(u2, "A", PinDirection::Input);
        let net = nl.add_net(Net::new("n1")).unwrap();
        nl.connect(y, net);
        nl.connect(a, net);

        let mut positions = HashMap::new();
        positions.insert(u1, (0.0, 0.0));
        positions.insert(u2, (3.0, 4.0));

        let hpwl = net_hpwl(&nl, net, |c| positions[&c]);
        assert_eq!(hpwl, 7.0);
    }

    #[test]
    fn hpwl_of_unconnected_net_is_zero() {
        let mut nl = Netlist::new();
        let net = nl.add_net(Net::new("n1")).unwrap();
        let hpwl = net_hpwl(&nl, net, |_| (0.0, 0.0));
        assert_eq!(hpwl, 0.0);
    }

    #[test]
    fn total_hpwl_sums_all_nets() {
        let mut nl = Netlist::new();
        let u1 = nl.add_cell(Cell::new("u1", CellType::Buf, 1.0, 1.0)).unwrap();
        let u2 = nl.add_cell(Cell::new("u2", CellType::Buf, 1.0, 1.0)).unwrap();
        let u3 = nl.add_cell(Cell::new("u3", CellType::Buf, 1.0, 1.0)).unwrap();
        let y1 = nl.add_pin(u1, "Y", PinDirection::Output);
        let a2 = nl.add_pin(u2, "A", PinDirection::Input);
        let y2 = nl.add_pin(u2, "Y", PinDirection::Output);
        let a3 = nl.add_pin(u3, "A", PinDirection::Input);
        let n1 = nl.add_net(Net::new("n1")).unwrap();
        let n2 = nl.add_net(Net::new("n2")).unwrap();
        nl.connect(y1, n1);
        nl.connect(a2, n1);
        nl.connect(y2, n2);
        nl.connect(a3, n2);

        let mut positions = HashMap::new();
        positions.insert(u1, (0.0, 0.0));
        positions.insert(u2, (2.0, 0.0));
        positions.insert(u3, (5.0, 0.0));

        let total = total_hpwl(&nl, |c| positions[&c]);
        assert_eq!(total, 2.0 + 3.0);
    }
}
