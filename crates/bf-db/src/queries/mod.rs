//! Query modules, one per table.

pub mod artifacts;
pub mod events;
