//! STEP physical file (ISO 10303-21) reading and writing.
//!
//! The default collaborator behind the filter pipeline: `load` turns a file
//! into a `GraphModel`, `write` serializes one back atomically. The filter
//! core never depends on this module; anything that can produce a
//! `GraphModel` can feed it.

pub mod read;
pub mod write;

pub use read::{load, parse};
pub use write::{to_step_string, write};
