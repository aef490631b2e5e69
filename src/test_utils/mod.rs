//! Shared fixtures for unit tests: entity builders, actors, a fixed clock and ready-made
//! engines.
mod common;
mod engine_fixture;

pub use common::*;
pub use engine_fixture::*;
