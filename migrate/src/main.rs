//! Reinstall the CPAN modules of one perl into another.
//!
//! Lists the modules installed in the source perl (optionally adding its
//! dual-life core modules) and feeds them to `cpanm` running under the
//! destination perl.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use migrate::core::types::{InstallerOptions, SearchPaths};
use migrate::error::exit_code_for;
use migrate::exit_codes;
use migrate::io::config::load_config;
use migrate::io::fetch::HttpFetcher;
use migrate::io::registry::CoreListRegistry;
use migrate::logging;
use migrate::migrate::{MigrateRequest, MigrationPlan, run_migration};

#[derive(Parser, Debug)]
#[command(
    name = "perl-migrate-modules",
    version,
    about = "Reinstall the modules of one perl installation into another",
    disable_version_flag = true
)]
struct Cli {
    /// `[SOURCE] DESTINATION`: perl installation directories or perl executables.
    /// With a single path it is used as both source and destination.
    #[arg(value_name = "PERL", required = true, num_args = 1..=2)]
    perls: Vec<String>,

    /// Also install dual-life modules that ship with the source perl.
    #[arg(short = 'c', long)]
    include_core: bool,

    /// Search only this path for installed modules (repeatable).
    #[arg(short = 'f', long = "from", value_name = "PATH")]
    from: Vec<PathBuf>,

    /// Search this path in addition to the standard ones (repeatable).
    #[arg(short = 'I', long = "lib", value_name = "PATH")]
    lib: Vec<PathBuf>,

    /// Skip module tests when installing.
    #[arg(short = 'n', long)]
    notest: bool,

    /// Only print essential installer output.
    #[arg(short = 'q', long)]
    quiet: bool,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print version.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    fn into_request(self) -> MigrateRequest {
        let mut perls = self.perls;
        let destination = perls.pop().unwrap_or_default();
        let source = perls.pop();
        MigrateRequest {
            source,
            destination,
            paths: SearchPaths {
                only: self.from,
                extra: self.lib,
            },
            include_core: self.include_core,
            installer: InstallerOptions {
                notest: self.notest,
                quiet: self.quiet,
            },
        }
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => std::process::exit(exit_codes::OK),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let plan = MigrationPlan::resolve(cli.into_request())?;
    let fetcher = HttpFetcher::new(&config);
    let registry = CoreListRegistry::new(&plan.to.executable);
    let mut stdout = std::io::stdout().lock();
    run_migration(&plan, &config, &fetcher, &registry, &mut stdout)?;
    Ok(())
}
