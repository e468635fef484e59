//! Netlist and technology-library data model for the physical-design core.
//!
//! This crate provides the structural data every other crate in the
//! workspace operates on: an arena-indexed [`Netlist`] of [`Cell`]s,
//! [`Net`]s, and [`Pin`]s; a Liberty-derived [`Library`] of characterized
//! cells for NLDM timing lookups; minimal LEF-derived physical macro data;
//! and the shared half-perimeter-wirelength (HPWL) utility used by both
//! placement and timing.

#![warn(missing_docs)]

pub mod cell;
pub mod geometry;
pub mod hpwl;
pub mod ids;
pub mod lef;
pub mod liberty;
pub mod net;
pub mod netlist;

pub use cell::{Cell, CellType, Pin, PinDirection};
pub use geometry::{Point, Rect};
pub use hpwl::{net_hpwl, total_hpwl};
pub use ids::{CellId, NetId, PinId};
pub use lef::{LefLibrary, LefMacro};
pub use liberty::{Library, LibCell, LibPin, LibTiming, LookupTable, TimingSense, TimingType};
pub use net::Net;
pub use netlist::Netlist;
