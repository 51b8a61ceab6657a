//! Exit status values produced by the engine.

pub const SUCCESS: i32 = 0;
/// Builtin or internal failure, including redirection and fork errors.
pub const FAILURE: i32 = 1;
/// Input line could not be parsed.
pub const SYNTAX_ERROR: i32 = 2;
/// Program found but could not be executed.
pub const CANNOT_EXECUTE: i32 = 126;
pub const NOT_FOUND: i32 = 127;
/// Added to the signal number for children killed by a signal.
pub const SIGNAL_BASE: i32 = 128;
