//! Command-line Arguments

use clap::{ArgAction, Args, Parser, Subcommand};
use s3sync_config::{Config, IntervalUnit};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "s3sync", version, about = "Back up a directory to an S3 bucket, and restore it again")]
pub struct Cli {
    /// Config file (TOML, YAML or JSON); defaults to config.toml in the
    /// platform config directory
    #[arg(short, long, global = true, env = "S3SYNC_CONFIG")]
    pub config: Option<PathBuf>,
    /// More logging (-v for debug, -vv for trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Compare and log, but transfer nothing and leave local files alone
    #[arg(long, global = true)]
    pub dry_run: bool,
    #[command(flatten)]
    pub overrides: Overrides,
    #[command(subcommand)]
    pub command: Command,
}

/// Settings that take precedence over the config file and environment.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    #[arg(long, global = true)]
    pub bucket: Option<String>,
    /// Usually one per machine
    #[arg(long, global = true)]
    pub namespace: Option<String>,
    #[arg(long, global = true)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}
impl Overrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(bucket) = self.bucket {
            config.bucket = bucket;
        }
        if let Some(namespace) = self.namespace {
            config.namespace = namespace;
        }
        if let Some(region) = self.region {
            config.region = region;
        }
        if self.endpoint.is_some() {
            config.endpoint = self.endpoint;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload new and changed files
    Backup {
        /// Directory to back up [default: backup_dir]
        dir: Option<PathBuf>,
    },
    /// Download the namespace, or just some of it
    Restore {
        /// Directory to restore into [default: restore_dir]
        dir: Option<PathBuf>,
        /// Only restore this path (relative to the namespace); repeatable
        #[arg(long = "key", value_name = "KEY")]
        keys: Vec<String>,
    },
    /// Show what is in the namespace
    List,
    /// Back up now, and then again every interval until interrupted
    Schedule {
        /// Directory to back up [default: backup_dir]
        dir: Option<PathBuf>,
        /// Interval length [default: interval]
        #[arg(long, value_name = "N")]
        every: Option<u64>,
        /// seconds, minutes, hours or days [default: interval_unit]
        #[arg(long)]
        unit: Option<IntervalUnit>,
    },
}
