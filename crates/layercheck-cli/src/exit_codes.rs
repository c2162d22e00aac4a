//! Process exit codes. Part of the public contract of `layercheck`.

pub const SUCCESS: i32 = 0;
/// A gate threshold was violated.
pub const GATE_VIOLATION: i32 = 1;
/// Bad flags, unreadable or invalid config.
pub const CONFIG_ERROR: i32 = 2;
/// A fixture could not be evaluated: parse, shape, engine or IO failure.
pub const FIXTURE_ERROR: i32 = 3;
