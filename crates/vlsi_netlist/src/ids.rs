//! Opaque ID newtypes for netlist entities.
//!
//! [`CellId`], [`NetId`], and [`PinId`] are thin `u32` wrappers used as arena
//! indices into a [`crate::Netlist`]. They are `Copy`, `Hash`, and
//! `Serialize`/`Deserialize`, matching the arena-ID idiom used throughout
//! this workspace's other crates.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a cell in a [`crate::Netlist`].
    CellId
);

define_id!(
    /// Opaque, copyable ID for a net in a [`crate::Netlist`].
    NetId
);

define_id!(
    /// Opaque, copyable ID for a pin in a [`crate::Netlist`].
    PinId
);
