//! Fatal error taxonomy for a migration run.
//!
//! Every variant aborts the run. The errors travel inside `anyhow::Error` and
//! are recovered with `downcast_ref` where the exit code or the failing stage
//! matters (the binary's `main`, tests).

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::ChildStatus;
use crate::exit_codes;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrateError {
    /// Path is missing, is a directory, or is not executable.
    #[error("perl executable not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Fetch failed below HTTP (DNS, refused connection, TLS).
    #[error("failed to download {url}: {message}")]
    Transport { url: String, message: String },

    /// Fetch completed with a non-success HTTP status.
    #[error("failed to download {url}: {status} {reason}")]
    Http {
        url: String,
        status: u16,
        reason: String,
    },

    /// Core modules requested but the registry does not know the version.
    #[error(
        "unknown perl version {version}: no core module data available (try upgrading Module::CoreList)"
    )]
    UnknownVersion { version: String },

    /// Core modules requested but the lister printed no version line.
    #[error("no perl version reported by {}", perl.display())]
    MissingVersion { perl: PathBuf },

    /// First lister line is not a perl version.
    #[error("unexpected version line from {}: {line:?}", perl.display())]
    BadVersion { perl: PathBuf, line: String },

    #[error("failed to retrieve module list from {} ({status})", perl.display())]
    ListingFailed { perl: PathBuf, status: ChildStatus },

    #[error("failed to install modules to {} ({status})", perl.display())]
    InstallFailed { perl: PathBuf, status: ChildStatus },
}

impl MigrateError {
    /// Process exit code for this error.
    ///
    /// Child failures propagate the child's own code; everything else is
    /// [`exit_codes::FAILURE`].
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ListingFailed { status, .. } | Self::InstallFailed { status, .. } => {
                match status.exit_code() {
                    exit_codes::OK => exit_codes::FAILURE,
                    code => code,
                }
            }
            _ => exit_codes::FAILURE,
        }
    }
}

/// Exit code for any error produced by a run.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<MigrateError>()
        .map(MigrateError::exit_code)
        .unwrap_or(exit_codes::FAILURE)
}
