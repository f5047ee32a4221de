//! CLI argument definitions using clap
//!
//! Commands:
//! - localdb get <key>
//! - localdb set <key> <json> [--schema <path>] [--initial <json>]
//! - localdb rm <key>
//! - localdb list

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// localdb - per-key persistence with validation and self-repair
#[derive(Parser, Debug)]
#[command(name = "localdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding stored values (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Database name (overrides config)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Store name (overrides config)
    #[arg(long, global = true)]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the stored value of a key, or null
    Get {
        key: String,
    },

    /// Store a JSON value under a key
    Set {
        key: String,

        /// JSON text of the value
        value: String,

        /// Object schema file the value must satisfy
        #[arg(long)]
        schema: Option<PathBuf>,

        /// JSON value used in place of anything the schema rejects
        #[arg(long)]
        initial: Option<String>,
    },

    /// Remove the stored value of a key
    Rm {
        key: String,
    },

    /// List stored keys
    List,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
