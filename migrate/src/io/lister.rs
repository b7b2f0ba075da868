//! Module lister child: the source perl enumerating its installed modules.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use anyhow::Result;
use tracing::{debug, instrument, warn};

use crate::core::listing::lister_args;
use crate::core::types::{ChildStatus, SearchPaths};
use crate::io::process::{read_raw_line, spawn_logged, take_stdout, wait_child};

const LABEL: &str = "module lister";

/// Build the lister command without spawning it.
///
/// Search-path variables are removed for this child only; the parent's
/// environment is untouched.
pub fn lister_command(perl: &Path, paths: &SearchPaths, neutralized_env: &[String]) -> Command {
    let mut cmd = Command::new(perl);
    cmd.args(lister_args(paths));
    for name in neutralized_env {
        cmd.env_remove(name);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    cmd
}

/// A running lister whose stdout is read line by line.
///
/// Dropping a listing that was never waited kills and reaps the child.
pub struct ModuleListing {
    perl: PathBuf,
    child: Option<Child>,
    reader: BufReader<ChildStdout>,
}

impl ModuleListing {
    #[instrument(skip_all, fields(perl = %perl.display(), only = paths.only.len(), extra = paths.extra.len()))]
    pub fn spawn(perl: &Path, paths: &SearchPaths, neutralized_env: &[String]) -> Result<Self> {
        let mut child = spawn_logged(&mut lister_command(perl, paths, neutralized_env), LABEL)?;
        let stdout = take_stdout(&mut child)?;
        Ok(Self {
            perl: perl.to_path_buf(),
            child: Some(child),
            reader: BufReader::new(stdout),
        })
    }

    pub fn perl(&self) -> &Path {
        &self.perl
    }

    /// Consume the first line, which carries the perl version.
    ///
    /// Returns `None` if the lister closed its output without printing anything.
    pub fn read_version(&mut self) -> Result<Option<String>> {
        let Some(line) = read_raw_line(&mut self.reader)? else {
            warn!(perl = %self.perl.display(), "lister produced no output");
            return Ok(None);
        };
        let version = String::from_utf8_lossy(&line).trim_end().to_string();
        debug!(version = %version, "source perl version");
        Ok(Some(version))
    }

    /// Next raw module line, or `None` once the lister closed its output.
    pub fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        read_raw_line(&mut self.reader)
    }

    /// Wait for the lister to exit.
    pub fn wait(mut self) -> Result<ChildStatus> {
        match self.child.take() {
            Some(mut child) => wait_child(&mut child, LABEL),
            None => Ok(ChildStatus::Exited(0)),
        }
    }

    /// Kill the lister and reap it.
    pub fn abort(mut self) -> Result<ChildStatus> {
        match self.child.take() {
            Some(mut child) => {
                kill_quietly(&mut child);
                wait_child(&mut child, LABEL)
            }
            None => Ok(ChildStatus::Exited(0)),
        }
    }
}

impl Drop for ModuleListing {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!(pid = child.id(), "module lister dropped while running, killing");
            kill_quietly(&mut child);
            if let Err(e) = child.wait() {
                warn!(err = %e, "failed to reap module lister");
            }
        }
    }
}

fn kill_quietly(child: &mut Child) {
    // The child may already have exited; that is not an error here.
    if let Err(e) = child.kill() {
        debug!(err = %e, "kill module lister");
    }
}
