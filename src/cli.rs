use clap::{Parser, Subcommand};
use mirror_sync::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mirror-sync")]
#[command(about = "Periodically mirror a source folder onto a replica folder", long_about = None)]
pub struct Cli {
    /// Source folder (never modified)
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Replica folder, created if it does not exist
    #[arg(long, global = true)]
    pub replica: Option<PathBuf>,

    /// Action log file, created if it does not exist
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,

    /// Synchronization interval in seconds
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Commands {
    /// Synchronize periodically until Enter is pressed (default)
    Run,
    /// Run a single synchronization pass
    Once,
    /// Show what the next pass would do without changing anything
    Plan,
    /// Print configuration values
    PrintConfig,
}

impl Cli {
    pub fn overrides(&self) -> AppConfig {
        AppConfig {
            source_path: self.source.clone(),
            replica_path: self.replica.clone(),
            log_file_path: self.log_file.clone(),
            interval_secs: self.interval,
        }
    }
}
