//! Stable exit codes for devagent CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid config, model output, I/O or other errors.
pub const INVALID: i32 = 1;
/// `devagent run` exceeded the recursion limit.
pub const LIMIT: i32 = 2;
/// `devagent files` or `devagent archive` found no generated files.
pub const NO_FILES: i32 = 3;
