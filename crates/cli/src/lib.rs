//! fsaudit CLI: argument definitions and command implementations

pub mod cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use cmd::watch::{MissingRoot, WatchArgs};

/// fsaudit - who changed which file, one line per burst
#[derive(Debug, Parser)]
#[command(name = "fsaudit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Monitor a directory and write the audit log until Ctrl-C
    Watch(WatchArgs),
    /// Inspect configuration files
    Config {
        /// Print a commented example configuration
        #[arg(long, conflicts_with = "check")]
        example: bool,

        /// Load and validate a configuration file
        #[arg(long, value_name = "FILE")]
        check: Option<PathBuf>,
    },
}
