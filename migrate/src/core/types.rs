//! Shared deterministic types for the migration pipeline.
//!
//! Everything here lives for one process run and is never persisted.

use std::fmt;
use std::path::PathBuf;

use crate::exit_codes;

/// A perl installation taking part in the migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeTarget {
    /// What the user typed on the command line.
    pub identifier: String,
    /// Absolute path to the `perl` executable.
    pub executable: PathBuf,
}

/// Module search paths handed to the source perl.
///
/// `only` replaces the standard `@INC` search, `extra` is layered on top of it.
/// Both are passed verbatim; override paths always come first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    pub only: Vec<PathBuf>,
    pub extra: Vec<PathBuf>,
}

/// Flags passed through to `cpanm`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallerOptions {
    /// Skip module test suites (`--notest`).
    pub notest: bool,
    /// Suppress non-essential installer output (`--quiet`).
    pub quiet: bool,
}

impl InstallerOptions {
    pub fn flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.notest {
            flags.push("--notest");
        }
        if self.quiet {
            flags.push("--quiet");
        }
        flags
    }
}

/// How a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Exited(i32),
    Signaled(i32),
}

impl ChildStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Exit code to propagate from this status (`128 + signal` for signals).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled(signal) => exit_codes::SIGNAL_BASE + signal,
        }
    }
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit status {code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
        }
    }
}

/// Pipeline stage owning a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Listing,
    Installing,
}

/// Exit statuses of both children once they have been reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub lister: ChildStatus,
    pub installer: ChildStatus,
}

impl ExitOutcome {
    /// First failing stage, checking the lister before the installer.
    pub fn first_failure(&self) -> Option<(Stage, ChildStatus)> {
        if !self.lister.success() {
            return Some((Stage::Listing, self.lister));
        }
        if !self.installer.success() {
            return Some((Stage::Installing, self.installer));
        }
        None
    }
}
