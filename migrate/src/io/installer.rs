//! Installer child: the destination perl running the downloaded `cpanm`.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::core::types::{ChildStatus, InstallerOptions};
use crate::io::process::{spawn_logged, take_stdin, wait_child};

const LABEL: &str = "installer";

/// Build the installer command without spawning it.
///
/// The environment is inherited as-is so `PERL5LIB`, `local::lib` setups and
/// friends still steer where modules get installed.
pub fn installer_command(
    perl: &Path,
    script: &Path,
    options: InstallerOptions,
    extra_args: &[String],
) -> Command {
    let mut cmd = Command::new(perl);
    cmd.arg(script)
        .args(options.flags())
        .args(extra_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

/// A running installer reading module names from its stdin.
///
/// Dropping a run that was never waited kills and reaps the child, so an
/// aborted pipeline never installs a partial list.
pub struct InstallerRun {
    perl: PathBuf,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    lines_written: usize,
}

impl InstallerRun {
    #[instrument(skip_all, fields(perl = %perl.display(), script = %script.display()))]
    pub fn spawn(
        perl: &Path,
        script: &Path,
        options: InstallerOptions,
        extra_args: &[String],
    ) -> Result<Self> {
        let mut child = spawn_logged(
            &mut installer_command(perl, script, options, extra_args),
            LABEL,
        )?;
        let stdin = take_stdin(&mut child)?;
        Ok(Self {
            perl: perl.to_path_buf(),
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
            lines_written: 0,
        })
    }

    /// Whether the installer still accepts input.
    pub fn accepting(&self) -> bool {
        self.stdin.is_some()
    }

    /// Write one newline-terminated line.
    ///
    /// If the installer closed its stdin the line is discarded and later
    /// writes become no-ops; its exit status reports what went wrong.
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(());
        };
        match stdin.write_all(line) {
            Ok(()) => {
                self.lines_written += 1;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                self.mark_closed();
                Ok(())
            }
            Err(e) => Err(e).context("write to installer stdin"),
        }
    }

    /// Flush and close stdin, signalling end of input.
    pub fn close_input(&mut self) -> Result<()> {
        let Some(mut stdin) = self.stdin.take() else {
            return Ok(());
        };
        match stdin.flush() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                warn!(perl = %self.perl.display(), "installer closed its input early");
            }
            Err(e) => return Err(e).context("flush installer stdin"),
        }
        debug!(lines = self.lines_written, "installer input closed");
        Ok(())
    }

    /// Close stdin if still open and wait for the installer to exit.
    pub fn wait(mut self) -> Result<ChildStatus> {
        self.close_input()?;
        match self.child.take() {
            Some(mut child) => wait_child(&mut child, LABEL),
            None => Ok(ChildStatus::Exited(0)),
        }
    }

    fn mark_closed(&mut self) {
        warn!(perl = %self.perl.display(), "installer closed its input early");
        if let Some(stdin) = self.stdin.take() {
            // Already broken; whatever is left in the buffer is lost anyway.
            let (_raw, _unflushed) = stdin.into_parts();
        }
    }
}

impl Drop for InstallerRun {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!(pid = child.id(), "installer dropped while running, killing");
            if let Err(e) = child.kill() {
                debug!(err = %e, "kill installer");
            }
            self.stdin.take();
            if let Err(e) = child.wait() {
                warn!(err = %e, "failed to reap installer");
            }
        }
    }
}
