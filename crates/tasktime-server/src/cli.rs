//! Command-line argument definitions.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Personal task and time tracking service.
///
/// Serves the REST API used by the web client, and offers maintenance
/// commands that work directly on the database.
#[derive(Debug, Parser)]
#[command(name = "tasktime", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on, overriding the configured one.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Recompute task totals from their stopped timelogs.
    Reconcile {
        /// Only check tasks owned by this user id.
        #[arg(long)]
        user: Option<String>,

        /// Report drift without rewriting totals.
        #[arg(long)]
        dry_run: bool,
    },
}
