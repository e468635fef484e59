//! Shared foundational types used across the VLSI physical-design toolchain.
//!
//! This crate provides core types including interned identifiers, content hashing,
//! frequency values, and the common internal-error result type.

#![warn(missing_docs)]

pub mod frequency;
pub mod hash;
pub mod ident;
pub mod result;

pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use result::{CoreResult, InternalError};
