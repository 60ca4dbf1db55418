//! Config structs grouped by subsystem.

pub mod stream;
pub mod world;
