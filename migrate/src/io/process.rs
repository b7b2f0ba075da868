//! Helpers for spawning and reaping the pipeline's child processes.

use std::io::BufRead;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error};

use crate::core::types::ChildStatus;

/// Spawn `cmd`, logging the program and failure cause under `label`.
pub fn spawn_logged(cmd: &mut Command, label: &str) -> Result<Child> {
    debug!(label, program = ?cmd.get_program(), "spawning child process");
    match cmd.spawn() {
        Ok(child) => {
            debug!(label, pid = child.id(), "child process started");
            Ok(child)
        }
        Err(e) => {
            error!(label, err = %e, "failed to spawn child process");
            Err(e).with_context(|| format!("spawn {label}"))
        }
    }
}

pub fn take_stdout(child: &mut Child) -> Result<ChildStdout> {
    child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))
}

pub fn take_stdin(child: &mut Child) -> Result<ChildStdin> {
    child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))
}

/// Block until `child` exits.
pub fn wait_child(child: &mut Child, label: &str) -> Result<ChildStatus> {
    let status = child.wait().with_context(|| format!("wait for {label}"))?;
    let status = child_status(status);
    debug!(label, %status, "child process finished");
    Ok(status)
}

pub fn child_status(status: ExitStatus) -> ChildStatus {
    if let Some(code) = status.code() {
        return ChildStatus::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ChildStatus::Signaled(signal);
        }
    }
    ChildStatus::Exited(-1)
}

/// Read one raw line (including its `\n`), or `None` at end of stream.
pub fn read_raw_line<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line).context("read line")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
