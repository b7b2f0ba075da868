//! Orchestration for one migration run.
//!
//! Sequence: resolve both perls, announce, download `cpanm`, start the
//! lister, read the version line, resolve core modules, start the installer,
//! relay the module list, then reap both children and report the first
//! failure (lister before installer).

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::packages::{parse_version_line, relay_line};
use crate::core::types::{ExitOutcome, InstallerOptions, RuntimeTarget, SearchPaths, Stage};
use crate::error::MigrateError;
use crate::io::config::MigrateConfig;
use crate::io::fetch::{Fetcher, fetch_installer};
use crate::io::installer::InstallerRun;
use crate::io::lister::ModuleListing;
use crate::io::registry::{CoreRegistry, resolve_core_modules};
use crate::io::resolve::resolve_targets;

/// What the user asked for, before any path has been checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrateRequest {
    /// Source installation; `None` means "same as destination".
    pub source: Option<String>,
    pub destination: String,
    pub paths: SearchPaths,
    pub include_core: bool,
    pub installer: InstallerOptions,
}

/// A request whose perls have been resolved to executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub from: RuntimeTarget,
    pub to: RuntimeTarget,
    pub paths: SearchPaths,
    pub include_core: bool,
    pub installer: InstallerOptions,
}

impl MigrationPlan {
    /// Resolve source and destination against the current directory.
    pub fn resolve(request: MigrateRequest) -> Result<Self> {
        let (from, to) = resolve_targets(request.source.as_deref(), &request.destination)?;
        Ok(Self {
            from,
            to,
            paths: request.paths,
            include_core: request.include_core,
            installer: request.installer,
        })
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateOutcome {
    /// Version line reported by the source perl.
    pub version: Option<String>,
    /// Core modules written ahead of the listed modules.
    pub core_modules: Vec<String>,
    /// Listed module lines relayed to the installer.
    pub relayed: usize,
    pub exit: ExitOutcome,
}

/// Run the migration described by `plan`.
///
/// Announcements go to `out`; installer progress goes straight to the
/// inherited stdout/stderr. The downloaded installer is removed on return,
/// whatever the outcome.
pub fn run_migration<F, R, W>(
    plan: &MigrationPlan,
    config: &MigrateConfig,
    fetcher: &F,
    registry: &R,
    out: &mut W,
) -> Result<MigrateOutcome>
where
    F: Fetcher,
    R: CoreRegistry,
    W: Write,
{
    announce(plan, out).context("write announcement")?;

    let script = fetch_installer(fetcher, &config.installer_url)?;

    let mut listing = ModuleListing::spawn(
        &plan.from.executable,
        &plan.paths,
        &config.neutralized_env,
    )?;
    let version = listing.read_version()?;

    let core_modules = if plan.include_core {
        match lookup_core_modules(listing.perl(), version.as_deref(), registry) {
            Ok(modules) => modules,
            Err(err) => return Err(fail_listing(listing, err)),
        }
    } else {
        Vec::new()
    };
    debug!(count = core_modules.len(), "core modules resolved");

    let mut installer = InstallerRun::spawn(
        &plan.to.executable,
        script.path(),
        plan.installer,
        &config.installer_args,
    )?;
    for name in &core_modules {
        installer.write_line(format!("{name}\n").as_bytes())?;
    }

    let mut relayed = 0usize;
    while let Some(line) = listing.next_line()? {
        let Some(line) = relay_line(line) else {
            debug!("skipping perl itself");
            continue;
        };
        // Keep draining after the installer stops reading so the lister can exit.
        if installer.accepting() {
            installer.write_line(&line)?;
            relayed += 1;
        }
    }
    installer.close_input()?;

    let exit = ExitOutcome {
        lister: listing.wait()?,
        installer: installer.wait()?,
    };
    drop(script);
    info!(relayed, core = core_modules.len(), ?exit, "children finished");

    match exit.first_failure() {
        Some((Stage::Listing, status)) => Err(MigrateError::ListingFailed {
            perl: plan.from.executable.clone(),
            status,
        }
        .into()),
        Some((Stage::Installing, status)) => Err(MigrateError::InstallFailed {
            perl: plan.to.executable.clone(),
            status,
        }
        .into()),
        None => {
            writeln!(out, "Done migrating modules to {}", plan.to.executable.display())
                .context("write announcement")?;
            Ok(MigrateOutcome {
                version,
                core_modules,
                relayed,
                exit,
            })
        }
    }
}

fn announce<W: Write>(plan: &MigrationPlan, out: &mut W) -> std::io::Result<()> {
    writeln!(
        out,
        "Migrating modules from {} to {}",
        plan.from.executable.display(),
        plan.to.executable.display()
    )?;
    if !plan.paths.only.is_empty() {
        writeln!(out, "Searching only: {}", join_paths(&plan.paths.only))?;
    }
    if !plan.paths.extra.is_empty() {
        writeln!(out, "Also searching: {}", join_paths(&plan.paths.extra))?;
    }
    Ok(())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn lookup_core_modules<R: CoreRegistry>(
    perl: &Path,
    version: Option<&str>,
    registry: &R,
) -> Result<Vec<String>> {
    let Some(line) = version else {
        return Err(MigrateError::MissingVersion {
            perl: perl.to_path_buf(),
        }
        .into());
    };
    let version = parse_version_line(line).ok_or_else(|| MigrateError::BadVersion {
        perl: perl.to_path_buf(),
        line: line.to_string(),
    })?;
    resolve_core_modules(registry, &version)
}

/// Stop the lister after a failure that happens before the installer starts.
///
/// A lister that already failed on its own is reported as a listing failure.
fn fail_listing(listing: ModuleListing, err: anyhow::Error) -> anyhow::Error {
    let perl = listing.perl().to_path_buf();
    let missing_version = matches!(
        err.downcast_ref::<MigrateError>(),
        Some(MigrateError::MissingVersion { .. })
    );
    let status = if missing_version {
        listing.wait()
    } else {
        listing.abort()
    };
    match status {
        Ok(status) if missing_version && !status.success() => {
            MigrateError::ListingFailed { perl, status }.into()
        }
        Ok(status) => {
            debug!(%status, "lister stopped before installing");
            err
        }
        Err(reap_err) => {
            warn!(err = %reap_err, "failed to reap module lister");
            err
        }
    }
}
