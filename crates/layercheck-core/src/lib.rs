pub mod candidate;
pub mod config;
pub mod errors;
pub mod fixtures;
pub mod gate;
pub mod metrics_api;
pub mod model;
pub mod reference;
pub mod report;
pub mod subprocess;
pub mod trace;

pub use errors::{ConfigError, GateViolation, ParityError, Result};
pub use model::{Candidate, Direction, Fixture, InputGraph, Layering, NodeId, PlacedNode};
