//! Stable exit codes for `perl-migrate-modules`.

/// Migration finished and both child processes exited cleanly.
pub const OK: i32 = 0;
/// Fatal error without a more specific child exit code.
pub const FAILURE: i32 = 1;
/// Invalid command line (reported by clap before any work).
pub const USAGE: i32 = 2;
/// Offset added to a signal number when a child was killed by a signal.
pub const SIGNAL_BASE: i32 = 128;
