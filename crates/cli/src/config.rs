use anyhow::Result;
use clap::Args;
use confique::Config;
use ezelect_core::LedgerConfig;
use std::path::{Path, PathBuf};

/// Expand a `$HOME` placeholder in a path
pub fn expand_home_in_path(path: &Path) -> Result<PathBuf> {
    let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in path"))?;

    if path_str.contains("$HOME") {
        let expanded = path_str.replace("$HOME", home_dir.to_str().unwrap_or("."));
        Ok(PathBuf::from(expanded))
    } else {
        Ok(path.to_path_buf())
    }
}

#[derive(Config, Clone, Debug)]
pub struct AppConfig {
    #[config(nested)]
    pub ledger: LedgerSection,

    #[config(nested)]
    pub log: LogSection,
}

#[derive(Config, Clone, Debug)]
pub struct LedgerSection {
    /// Maximum characters in a candidate name, party or description
    #[config(default = 256, env = "EZELECT_MAX_FIELD_LEN")]
    pub max_field_len: usize,

    /// Log entries buffered per subscriber
    #[config(default = 1024, env = "EZELECT_EVENT_BUFFER")]
    pub event_buffer: usize,
}

#[derive(Config, Clone, Debug)]
pub struct LogSection {
    /// Log level for ezelect crates (trace, debug, info, warn, error)
    #[config(default = "info", env = "EZELECT_LOG")]
    pub level: String,
}

/// Command-line values that take precedence over env, file and defaults.
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Maximum characters in a candidate name, party or description
    #[arg(long)]
    pub max_field_len: Option<usize>,

    /// Log entries buffered per subscriber
    #[arg(long)]
    pub event_buffer: Option<usize>,

    /// Log level for ezelect crates
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut AppConfig) {
        if let Some(max_field_len) = self.max_field_len {
            config.ledger.max_field_len = max_field_len;
        }
        if let Some(event_buffer) = self.event_buffer {
            config.ledger.event_buffer = event_buffer;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
    }
}

impl From<&LedgerSection> for LedgerConfig {
    fn from(section: &LedgerSection) -> Self {
        LedgerConfig {
            max_field_len: section.max_field_len,
            event_buffer: section.event_buffer,
        }
    }
}

impl AppConfig {
    /// Layer `overrides` over env over the TOML file at `path` (skipped when
    /// missing) over defaults.
    pub fn resolve(path: &Path, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = AppConfig::builder().env().file(path).load()?;
        overrides.apply(&mut config);
        Ok(config)
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig::from(&self.ledger)
    }
}
