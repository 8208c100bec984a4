//! ezelect-cli: drives an ezelect ledger from call scripts and checks saved
//! event logs.

pub mod cli;
pub mod config;
pub mod script;

pub use cli::{Cli, VerifyReport, run_script_file, verify_log_file};
pub use config::{AppConfig, ConfigOverrides};
