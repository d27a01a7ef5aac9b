use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Trip distance and fuel consumption tracker.
#[derive(Debug, Parser)]
#[command(name = "fuel-trips")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply migrations and consume trip/fuel events from Kafka
    Consume,

    /// Print a user's consumption statistics as JSON
    Stats {
        #[arg(short, long)]
        user: i64,
    },

    /// Print a user's open trip and its most recent points as JSON
    Active {
        #[arg(short, long)]
        user: i64,

        /// Number of recent points to include
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
    },

    /// Export a user's trips as CSV
    Export {
        #[arg(short, long)]
        user: i64,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Log filter implied by `-v` flags, if any were given.
    pub fn verbosity_filter(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
