use crate::config::{AppConfig, ConfigOverrides, expand_home_in_path};
use crate::script::{self, Report, Script};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ezelect_core::{ElectionStatus, Identity, Ledger, LedgerConfig, SystemClock};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "ezelect")]
#[command(about = "Run and verify ezelect election ledgers")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "$HOME/.ezelect/config.toml")]
    config_path: PathBuf,

    /// Overrides for values from the environment and the config file
    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON call script to a fresh ledger and print the outcome
    Run {
        /// Script file
        script: PathBuf,

        /// Write the resulting event log here
        #[arg(long)]
        log_out: Option<PathBuf>,
    },
    /// Replay a saved event log and check it was not tampered with
    Verify {
        /// Event log file written by `run --log-out`
        log: PathBuf,

        /// Owner the ledger was created with
        #[arg(long)]
        owner: String,
    },
}

/// Outcome of `verify`.
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub entries: usize,
    pub owner: Identity,
    pub status: ElectionStatus,
    pub log_head: String,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = self.resolve_config()?;

        let level = if self.verbose {
            "debug"
        } else {
            config.log.level.as_str()
        };
        tracing_subscriber::fmt()
            .with_env_filter(log_filter(level))
            .with_writer(std::io::stderr)
            .init();

        match self.command {
            Commands::Run { script, log_out } => {
                let report = run_script_file(&script, log_out.as_deref(), config.ledger_config())?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Commands::Verify { log, owner } => {
                let report = verify_log_file(&log, &owner, config.ledger_config())?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Ok(())
    }

    /// Layer CLI flags over env over the config file over defaults
    fn resolve_config(&self) -> Result<AppConfig> {
        let config_path = expand_home_in_path(&self.config_path)?;
        AppConfig::resolve(&config_path, self.overrides.clone())
    }
}

/// Run the script at `path` against a new ledger owned by the script's owner.
pub fn run_script_file(
    path: &std::path::Path,
    log_out: Option<&std::path::Path>,
    config: LedgerConfig,
) -> Result<Report> {
    let script = Script::load(path)?;
    let mut ledger = Ledger::with_clock(script.owner.clone(), Arc::new(SystemClock), config);
    info!(owner = %script.owner, calls = script.calls.len(), "running script");

    let report = script::run(&mut ledger, &script)?;
    if let Some(log_out) = log_out {
        script::write_log(ledger.events(), log_out)?;
        info!(path = %log_out.display(), entries = report.log_len, "event log written");
    }
    Ok(report)
}

/// Replay the log at `path` from `owner` and report the rebuilt state.
pub fn verify_log_file(
    path: &std::path::Path,
    owner: &str,
    config: LedgerConfig,
) -> Result<VerifyReport> {
    let owner = Identity::new(owner).context("invalid --owner")?;
    let entries = script::read_log(path)?;
    let ledger = Ledger::replay(owner.clone(), &entries, Arc::new(SystemClock), config)
        .with_context(|| format!("verifying {}", path.display()))?;

    info!(entries = entries.len(), head = %ledger.log_head(), "event log verified");
    Ok(VerifyReport {
        entries: entries.len(),
        owner: ledger.owner().clone(),
        status: ledger.status(),
        log_head: ledger.log_head().to_hex(),
    })
}

/// Filter directives for the crates that emit ezelect logs.
fn log_filter(level: &str) -> String {
    format!("ezelect_core={level},ezelect_cli={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_logging_crates() {
        let filter = log_filter("debug");
        assert_eq!(filter, "ezelect_core=debug,ezelect_cli=debug");
        assert!(filter.parse::<tracing_subscriber::EnvFilter>().is_ok());
    }
}
