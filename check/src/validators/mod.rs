//! Model folder validators.
//!
//! Each validator returns its own [`crate::CheckReport`]. Problems in the
//! checked files are reported as results; only I/O trouble outside the
//! checked files is returned as an error.

pub mod grids;
pub mod modifiers;
pub mod redist;
pub mod states;
