//! CLI argument definitions for the plogger server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use plogger_core::config::PloggerConfig;

/// Plogger - plogging place and route recommendation server.
#[derive(Parser, Debug)]
#[command(name = "plogger", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Restore the default conversation from this file at startup and save
    /// it back on shutdown.
    #[arg(long = "history-file")]
    pub history_file: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PLOGGER_CONFIG env var > ~/.plogger/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PLOGGER_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut PloggerConfig) {
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ref path) = self.history_file {
            config.persistence.history_file = Some(path.to_string_lossy().to_string());
        }
    }
}

fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".plogger").join("config.toml");
    }
    PathBuf::from("config.toml")
}
