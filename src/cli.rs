//! CLI argument parsing for the loadrush-worker binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "loadrush-worker", about = "LoadRush route estimation worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Estimate a single route and print it as JSON
    Estimate {
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        from_lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lng: f64,
    },
}
