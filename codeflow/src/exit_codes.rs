//! Stable exit codes for codeflow CLI commands.

/// Run finished with a passing solution, or the command succeeded.
pub const OK: i32 = 0;
/// Invalid config, gateway or node failure, or any other error.
pub const INVALID: i32 = 1;
/// `codeflow run` hit the iteration ceiling with validation still failing.
pub const EXHAUSTED: i32 = 2;
