//! Version → core module registry.
//!
//! The default backend asks a perl's `Module::CoreList` which modules shipped
//! with a given perl release and are also released to CPAN.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::core::listing::{UNKNOWN_VERSION_EXIT, corelist_args};
use crate::core::packages::sort_core_modules;
use crate::core::types::ChildStatus;
use crate::error::MigrateError;
use crate::io::process::child_status;

/// Source of built-in module sets indexed by perl version.
pub trait CoreRegistry {
    /// Dual-life core modules of `version`, or `None` if the version is unknown.
    fn core_modules(&self, version: &str) -> Result<Option<Vec<String>>>;
}

/// Registry backed by `Module::CoreList` inside a perl installation.
#[derive(Debug, Clone)]
pub struct CoreListRegistry {
    perl: PathBuf,
}

impl CoreListRegistry {
    pub fn new(perl: impl Into<PathBuf>) -> Self {
        Self { perl: perl.into() }
    }
}

impl CoreRegistry for CoreListRegistry {
    #[instrument(skip_all, fields(perl = %self.perl.display(), version = %version))]
    fn core_modules(&self, version: &str) -> Result<Option<Vec<String>>> {
        let output = Command::new(&self.perl)
            .args(corelist_args(version))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("run Module::CoreList with {}", self.perl.display()))?;

        match child_status(output.status) {
            ChildStatus::Exited(0) => {
                let modules: Vec<String> = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                debug!(count = modules.len(), "core modules found");
                Ok(Some(modules))
            }
            ChildStatus::Exited(UNKNOWN_VERSION_EXIT) => Ok(None),
            status => Err(anyhow!(
                "Module::CoreList lookup with {} failed ({status})",
                self.perl.display()
            )),
        }
    }
}

/// Look up `version` and return its core modules sorted.
///
/// An unknown version is fatal: silently installing no core modules would
/// drop modules the user asked for.
pub fn resolve_core_modules<R: CoreRegistry>(registry: &R, version: &str) -> Result<Vec<String>> {
    let modules = registry
        .core_modules(version)?
        .ok_or_else(|| MigrateError::UnknownVersion {
            version: version.to_string(),
        })?;
    Ok(sort_core_modules(modules))
}
