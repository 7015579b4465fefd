/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
/// Analytics Cleanup CLI
///
/// Serves the cleanup API, or runs a single cleanup pass and exits.
pub struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(long, global = true, env = "CLEANUP_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the cleanup API server
    Serve,

    /// Run one cleanup pass (pipeline and serving recreation) and exit
    RunOnce,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
