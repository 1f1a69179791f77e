//! Command-line interface

use cfddns_core::RunMode;
use clap::Parser;
use std::path::PathBuf;

/// Cloudflare dynamic DNS updater
///
/// Keeps the A/AAAA records listed in the configuration file pointed at this
/// machine's public address. Without `--interval` it runs once and exits.
#[derive(Debug, Parser)]
#[command(name = "cfddns")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to your config.yaml file
    pub config: PathBuf,

    /// Interval between loop iterations in seconds (30 to 3600, otherwise 60)
    #[arg(short, long, allow_negative_numbers = true)]
    pub interval: Option<i64>,
}

impl Cli {
    /// Parse from an iterator, for tests
    #[cfg(test)]
    pub fn parse_from_iter<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(iter)
    }

    /// Single-shot without an interval, continuous otherwise
    pub fn run_mode(&self) -> RunMode {
        // Negative intervals are out of range like any other
        RunMode::from_interval(self.interval.map(|secs| u64::try_from(secs).unwrap_or(0)))
    }
}
