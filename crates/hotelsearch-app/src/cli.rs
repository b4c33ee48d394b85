//! CLI argument definitions for the hotel search application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hotel search - semantic search over a hotel catalog.
#[derive(Parser, Debug)]
#[command(name = "hotelsearch", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API (default).
    Serve {
        /// API server port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Import the raw catalog, embed stale records, and write the snapshot.
    Ingest {
        /// Raw catalog JSON file. Defaults to `catalog.path` from the config.
        #[arg(long = "catalog")]
        catalog: Option<PathBuf>,
        /// Recompute every embedding, current or not.
        #[arg(long = "force")]
        force: bool,
    },
    /// Run one query against the snapshot and print the ranked hits.
    Search {
        query: String,
        /// Number of hits to return.
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },
    /// Print catalog and embedding coverage.
    Stats,
}

impl CliArgs {
    /// The subcommand to run; `serve` when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Serve { port: None })
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > HOTELSEARCH_CONFIG env var > platform default
    /// (~/.hotelsearch/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("HOTELSEARCH_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log filter used when RUST_LOG is unset.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Resolve the API server port.
///
/// Priority: --port flag > HOTELSEARCH_PORT env var > config file value.
pub fn resolve_port(flag: Option<u16>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Ok(val) = std::env::var("HOTELSEARCH_PORT") {
        if let Ok(p) = val.parse::<u16>() {
            return p;
        }
    }
    config_port
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".hotelsearch").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".hotelsearch").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let args = CliArgs::parse_from(["hotelsearch"]);
        assert_eq!(args.command(), Command::Serve { port: None });
    }

    #[test]
    fn test_parse_subcommands() {
        let args = CliArgs::parse_from(["hotelsearch", "ingest", "--catalog", "h.json", "--force"]);
        assert_eq!(
            args.command(),
            Command::Ingest {
                catalog: Some(PathBuf::from("h.json")),
                force: true
            }
        );

        let args = CliArgs::parse_from(["hotelsearch", "search", "spa in bali", "-k", "3"]);
        assert_eq!(
            args.command(),
            Command::Search {
                query: "spa in bali".to_string(),
                top_k: Some(3)
            }
        );

        let args = CliArgs::parse_from(["hotelsearch", "serve", "-p", "9000"]);
        assert_eq!(args.command(), Command::Serve { port: Some(9000) });
    }

    #[test]
    fn test_config_flag_wins() {
        let args = CliArgs::parse_from(["hotelsearch", "stats", "--config", "/etc/hs.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/hs.toml"));
        assert_eq!(args.command(), Command::Stats);
    }

    #[test]
    fn test_port_flag_wins() {
        assert_eq!(resolve_port(Some(7000), 5005), 7000);
    }

    #[test]
    fn test_log_level_resolution() {
        let args = CliArgs::parse_from(["hotelsearch", "-l", "debug"]);
        assert_eq!(args.resolve_log_level("info"), "debug");
        let args = CliArgs::parse_from(["hotelsearch"]);
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }
}
