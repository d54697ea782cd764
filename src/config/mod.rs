//! Command-line arguments and miner configuration

use crate::error::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "randomx-solo-miner",
    about = "Standalone RandomX solo miner for Zcash-derivative nodes",
    version
)]
pub struct Args {
    /// Node JSON-RPC endpoint
    #[arg(long = "rpc-url", value_name = "URL")]
    pub rpc_url: Option<String>,

    /// RPC username
    #[arg(long = "rpc-user", value_name = "USER")]
    pub rpc_user: Option<String>,

    /// RPC password
    #[arg(long = "rpc-password", value_name = "PASS")]
    pub rpc_password: Option<String>,

    /// Number of mining threads (default: chosen from CPU count and RAM)
    #[arg(long = "threads", short = 't', value_name = "N")]
    pub threads: Option<usize>,

    /// Seconds between status updates
    #[arg(long = "update-interval", value_name = "N")]
    pub update_interval: Option<u64>,

    /// Seconds between checks for new blocks on the network
    #[arg(long = "block-check", value_name = "N")]
    pub block_check: Option<u64>,

    /// ZMQ block-notification endpoint (accepted for compatibility;
    /// work updates are polled)
    #[arg(long = "zmq-url", value_name = "URL")]
    pub zmq_url: Option<String>,

    /// Use the full ~2GB RandomX dataset for roughly double the hashrate
    #[arg(long = "fast-mode")]
    pub fast_mode: bool,

    /// Skip wallet balance queries
    #[arg(long = "no-balance")]
    pub no_balance: bool,

    /// Enable debug logging
    #[arg(long = "debug")]
    pub debug: bool,

    /// Write the log to a file
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Also log to the console when a log file is set
    #[arg(long = "log-console")]
    pub log_console: bool,
}

/// Validated miner configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: String,
    /// `None` means auto-select from system resources
    pub threads: Option<usize>,
    pub update_interval_secs: u64,
    pub block_check_secs: u64,
    pub zmq_url: Option<String>,
    pub fast_mode: bool,
    pub no_balance: bool,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
    pub log_console: bool,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8232".to_string()
}

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 5;
const DEFAULT_BLOCK_CHECK_SECS: u64 = 2;

impl Config {
    /// Build a configuration from parsed arguments.
    pub fn from_args(args: Args) -> Result<Self> {
        let config = Self {
            rpc_url: args.rpc_url.unwrap_or_else(default_rpc_url),
            rpc_user: args.rpc_user.unwrap_or_default(),
            rpc_password: args.rpc_password.unwrap_or_default(),
            threads: args.threads,
            update_interval_secs: args
                .update_interval
                .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS),
            block_check_secs: args.block_check.unwrap_or(DEFAULT_BLOCK_CHECK_SECS),
            zmq_url: args.zmq_url,
            fast_mode: args.fast_mode,
            no_balance: args.no_balance,
            debug: args.debug,
            log_file: args.log_file,
            log_console: args.log_console,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the miner cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(Error::config("RPC URL must not be empty"));
        }
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(Error::config(format!(
                "RPC URL must start with http:// or https://: {}",
                self.rpc_url
            )));
        }
        if self.threads == Some(0) {
            return Err(Error::config("thread count must be at least 1"));
        }
        if self.update_interval_secs == 0 {
            return Err(Error::config("update interval must be at least 1 second"));
        }
        if self.block_check_secs == 0 {
            return Err(Error::config("block check interval must be at least 1 second"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_from(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("randomx-solo-miner").chain(argv.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(args_from(&[])).unwrap();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8232");
        assert_eq!(config.threads, None);
        assert_eq!(config.update_interval_secs, 5);
        assert_eq!(config.block_check_secs, 2);
        assert!(!config.fast_mode);
        assert!(!config.no_balance);
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::from_args(args_from(&[
            "--rpc-url",
            "http://10.0.0.5:8232",
            "--rpc-user",
            "miner",
            "--rpc-password",
            "hunter2",
            "--threads",
            "8",
            "--fast-mode",
            "--no-balance",
            "--block-check",
            "10",
        ]))
        .unwrap();
        assert_eq!(config.rpc_url, "http://10.0.0.5:8232");
        assert_eq!(config.rpc_user, "miner");
        assert_eq!(config.threads, Some(8));
        assert!(config.fast_mode);
        assert!(config.no_balance);
        assert_eq!(config.block_check_secs, 10);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Config::from_args(args_from(&["--threads", "0"])).is_err());
        assert!(Config::from_args(args_from(&["--update-interval", "0"])).is_err());
        assert!(Config::from_args(args_from(&["--rpc-url", "not-a-url"])).is_err());
    }

    #[test]
    fn test_zmq_url_is_accepted() {
        let config =
            Config::from_args(args_from(&["--zmq-url", "tcp://127.0.0.1:28332"])).unwrap();
        assert_eq!(config.zmq_url.as_deref(), Some("tcp://127.0.0.1:28332"));
    }
}
