use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Parking gate controller")]
pub struct Arguments {
    /// Configuration file [default: ./parkgate.toml if present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial device, overrides the configuration file
    #[arg(short, long)]
    pub port: Option<String>,

    /// Log filter, overrides the configuration file (RUST_LOG overrides both)
    #[arg(long)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Action {
    /// Run the gate controller (default)
    Run,
    /// Manage registered plates
    Plate {
        #[command(subcommand)]
        action: PlateAction,
    },
    /// Show recent entries and exits
    Movements {
        /// Number of records to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum PlateAction {
    /// Register a plate
    Add { plate: String },
    /// Remove a registered plate
    Remove { plate: String },
    /// List registered plates
    List,
}
