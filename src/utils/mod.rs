//! Logging setup, formatting helpers and system-resource detection

pub mod system;

use crate::config::Config;
use crate::error::Result;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Initialize tracing from the configuration: `--debug` lowers the filter,
/// `--log-file` redirects output to a file (plain text, no ANSI), and
/// `--log-console` keeps stderr output alongside a file.
pub fn init_logging(config: &Config) -> Result<()> {
    let level = if config.debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match &config.log_file {
        Some(path) if !config.log_console => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
    }
    Ok(())
}

/// Format a hashrate for display: `742.00 H/s`, `12.34 KH/s`, `1.05 MH/s`.
pub fn format_hashrate(hashrate: f64) -> String {
    if hashrate >= 1_000_000.0 {
        format!("{:.2} MH/s", hashrate / 1_000_000.0)
    } else if hashrate >= 1_000.0 {
        format!("{:.2} KH/s", hashrate / 1_000.0)
    } else {
        format!("{:.2} H/s", hashrate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hashrate() {
        assert_eq!(format_hashrate(0.0), "0.00 H/s");
        assert_eq!(format_hashrate(742.0), "742.00 H/s");
        assert_eq!(format_hashrate(12_340.0), "12.34 KH/s");
        assert_eq!(format_hashrate(1_050_000.0), "1.05 MH/s");
    }
}
