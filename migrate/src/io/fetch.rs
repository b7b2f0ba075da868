//! Download the `cpanm` bootstrap script into a scoped temporary directory.
//!
//! The [`Fetcher`] trait decouples the pipeline from the HTTP client. Tests
//! use scripted fetchers that write canned content or fail without touching
//! the network.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::error::MigrateError;
use crate::io::config::MigrateConfig;

/// File name of the downloaded installer inside the temporary directory.
pub const INSTALLER_FILE: &str = "cpanm";

/// Abstraction over URL download backends.
pub trait Fetcher {
    /// Download `url` into the file `dest`.
    ///
    /// Transport and HTTP failures are reported as [`MigrateError::Transport`]
    /// and [`MigrateError::Http`].
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Fetcher backed by a blocking `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: &MigrateConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("perl-migrate-modules/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                warn!(status, "installer download rejected");
                return Err(MigrateError::Http {
                    url: url.to_string(),
                    status,
                    reason: response.status_text().to_string(),
                }
                .into());
            }
            Err(ureq::Error::Transport(transport)) => {
                warn!(err = %transport, "installer download failed");
                return Err(MigrateError::Transport {
                    url: url.to_string(),
                    message: transport.to_string(),
                }
                .into());
            }
        };

        let mut file =
            File::create(dest).with_context(|| format!("create {}", dest.display()))?;
        let mut body = response.into_reader();
        let bytes = io::copy(&mut body, &mut file).map_err(|e| MigrateError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        debug!(bytes, dest = %dest.display(), "installer downloaded");
        Ok(())
    }
}

/// Downloaded installer, alive as long as its temporary directory.
///
/// Dropping the value removes the directory and the script inside it.
#[derive(Debug)]
pub struct InstallerScript {
    dir: TempDir,
    path: PathBuf,
}

impl InstallerScript {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Create a temporary directory and download the installer into it.
///
/// On failure the directory is removed before the error is returned.
pub fn fetch_installer<F: Fetcher>(fetcher: &F, url: &str) -> Result<InstallerScript> {
    let dir = tempfile::Builder::new()
        .prefix("perl-migrate-modules-")
        .tempdir()
        .context("create temporary directory")?;
    let path = dir.path().join(INSTALLER_FILE);
    fetcher.fetch(url, &path)?;
    info!(path = %path.display(), "installer ready");
    Ok(InstallerScript { dir, path })
}
