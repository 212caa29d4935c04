//! Stable exit codes for worldops CLI commands.

/// Command succeeded and the result is clean.
pub const OK: i32 = 0;
/// Invalid input, layout or config, or an I/O failure.
pub const INVALID: i32 = 1;
/// The batch ran but its result has errors, or the run went to `failed`.
pub const NEEDS_ATTENTION: i32 = 2;
