//! Resolve user-supplied perl locations to executables.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::RuntimeTarget;
use crate::error::MigrateError;

/// Location of the interpreter inside a perl installation directory.
pub const PERL_IN_INSTALL: &str = "bin/perl";

/// Resolve source and destination against the current working directory.
///
/// A missing `source` reuses `destination`.
pub fn resolve_targets(
    source: Option<&str>,
    destination: &str,
) -> Result<(RuntimeTarget, RuntimeTarget)> {
    let cwd = std::env::current_dir().context("read current directory")?;
    resolve_targets_in(&cwd, source, destination)
}

/// Resolve source and destination relative to `cwd`.
pub fn resolve_targets_in(
    cwd: &Path,
    source: Option<&str>,
    destination: &str,
) -> Result<(RuntimeTarget, RuntimeTarget)> {
    let from = source
        .map(|identifier| resolve_target(cwd, identifier))
        .transpose()?;
    let to = resolve_target(cwd, destination)?;
    let from = from.unwrap_or_else(|| to.clone());
    Ok((from, to))
}

pub fn resolve_target(cwd: &Path, identifier: &str) -> Result<RuntimeTarget> {
    let executable = resolve_executable(cwd, Path::new(identifier))?;
    debug!(identifier, executable = %executable.display(), "resolved perl");
    Ok(RuntimeTarget {
        identifier: identifier.to_string(),
        executable,
    })
}

/// Turn an installation directory or a perl binary path into an absolute executable path.
pub fn resolve_executable(cwd: &Path, path: &Path) -> Result<PathBuf> {
    let mut resolved = cwd.join(path);
    if resolved.is_dir() {
        resolved.push(PERL_IN_INSTALL);
    }
    let executable = fs::metadata(&resolved)
        .map(|meta| meta.is_file() && is_executable(&meta))
        .unwrap_or(false);
    if !executable {
        return Err(MigrateError::NotFound { path: resolved }.into());
    }
    Ok(resolved)
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    true
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_file(path: &Path, mode: u32) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, "#!/bin/sh\n").expect("write");
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("chmod");
    }

    fn not_found_path(err: &anyhow::Error) -> PathBuf {
        match err.downcast_ref::<MigrateError>() {
            Some(MigrateError::NotFound { path }) => path.clone(),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn directory_resolves_to_bin_perl() {
        let temp = tempfile::tempdir().expect("tempdir");
        let perl = temp.path().join("perl-5.36/bin/perl");
        write_file(&perl, 0o755);

        let resolved = resolve_executable(temp.path(), Path::new("perl-5.36")).expect("resolve");
        assert_eq!(resolved, perl);
        assert!(resolved.is_absolute());
    }

    #[test]
    fn executable_path_is_accepted_directly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let perl = temp.path().join("perl");
        write_file(&perl, 0o755);

        let resolved = resolve_executable(Path::new("/nonexistent"), &perl).expect("resolve");
        assert_eq!(resolved, perl);
    }

    #[test]
    fn missing_path_reports_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = resolve_executable(temp.path(), Path::new("nope")).unwrap_err();
        assert_eq!(not_found_path(&err), temp.path().join("nope"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn directory_without_perl_reports_appended_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("empty")).expect("mkdir");
        let err = resolve_executable(temp.path(), Path::new("empty")).unwrap_err();
        assert_eq!(not_found_path(&err), temp.path().join("empty/bin/perl"));
    }

    #[test]
    fn bin_perl_directory_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("odd/bin/perl")).expect("mkdir");
        let err = resolve_executable(temp.path(), Path::new("odd")).unwrap_err();
        assert_eq!(not_found_path(&err), temp.path().join("odd/bin/perl"));
    }

    #[test]
    fn non_executable_file_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let perl = temp.path().join("perl");
        write_file(&perl, 0o644);
        let err = resolve_executable(temp.path(), Path::new("perl")).unwrap_err();
        assert_eq!(not_found_path(&err), perl);
    }

    #[test]
    fn single_path_serves_both_roles() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_file(&temp.path().join("inst/bin/perl"), 0o755);

        let (from, to) = resolve_targets_in(temp.path(), None, "inst").expect("resolve");
        assert_eq!(from, to);
        assert_eq!(from.identifier, "inst");
    }

    #[test]
    fn source_checked_before_destination() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = resolve_targets_in(temp.path(), Some("src"), "dst").unwrap_err();
        assert_eq!(not_found_path(&err), temp.path().join("src"));

        write_file(&temp.path().join("src/bin/perl"), 0o755);
        let err = resolve_targets_in(temp.path(), Some("src"), "dst").unwrap_err();
        assert_eq!(not_found_path(&err), temp.path().join("dst"));
    }
}
