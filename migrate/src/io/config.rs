//! Optional TOML configuration passed with `--config`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::listing::DEFAULT_NEUTRALIZED_ENV;

pub const DEFAULT_INSTALLER_URL: &str = "https://cpanmin.us";

/// Migration configuration (TOML).
///
/// Missing fields default to the values the tool uses without a config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MigrateConfig {
    /// Where the `cpanm` bootstrap script is downloaded from.
    pub installer_url: String,

    /// Environment variables removed from the module lister's environment.
    pub neutralized_env: Vec<String>,

    /// HTTP connect timeout in seconds for the installer download.
    pub connect_timeout_secs: u64,

    /// Extra flags appended to the `cpanm` command line.
    pub installer_args: Vec<String>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            installer_url: DEFAULT_INSTALLER_URL.to_string(),
            neutralized_env: DEFAULT_NEUTRALIZED_ENV
                .iter()
                .map(|name| name.to_string())
                .collect(),
            connect_timeout_secs: 30,
            installer_args: Vec::new(),
        }
    }
}

impl MigrateConfig {
    pub fn validate(&self) -> Result<()> {
        let url = self.installer_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(anyhow!(
                "installer_url must be an http(s) URL, got {:?}",
                self.installer_url
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(anyhow!("connect_timeout_secs must be > 0"));
        }
        if self
            .neutralized_env
            .iter()
            .any(|name| name.trim().is_empty() || name.contains('='))
        {
            return Err(anyhow!("neutralized_env entries must be variable names"));
        }
        Ok(())
    }
}

/// Load config from a TOML file, or defaults when no file was given.
pub fn load_config(path: Option<&Path>) -> Result<MigrateConfig> {
    let Some(path) = path else {
        let cfg = MigrateConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    };
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MigrateConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_returns_default() {
        let cfg = load_config(None).expect("load");
        assert_eq!(cfg, MigrateConfig::default());
        assert_eq!(cfg.neutralized_env, vec!["PERL5LIB", "PERLLIB", "PERL5OPT"]);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "installer_url = \"https://mirror.example/cpanm\"\ninstaller_args = [\"--verbose\"]\n",
        )
        .expect("write");

        let cfg = load_config(Some(&path)).expect("load");
        assert_eq!(cfg.installer_url, "https://mirror.example/cpanm");
        assert_eq!(cfg.installer_args, vec!["--verbose"]);
        assert_eq!(cfg.connect_timeout_secs, 30);
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_config(Some(&temp.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = MigrateConfig {
            installer_url: "ftp://example".to_string(),
            ..MigrateConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = MigrateConfig {
            connect_timeout_secs: 0,
            ..MigrateConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = MigrateConfig {
            neutralized_env: vec![" ".to_string()],
            ..MigrateConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
