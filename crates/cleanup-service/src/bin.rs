/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Analytics cleanup CLI application
//!
//! Loads configuration, initializes logging and either serves the cleanup
//! API or runs one cleanup pass, depending on the subcommand or, without
//! one, on the configured `mode`.

use cleanup_service::cli::{commands, parse_cli, Commands};
use cleanup_utils::config::{Mode, Settings};
use cleanup_utils::logging::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_cli();

    // Load configuration
    let config = Settings::new(cli.config.clone())?;

    // Initialize logger
    cleanup_utils::logging::init_with_format(&config.log.level, &config.log.format)?;

    let command = cli.command.unwrap_or(match config.mode {
        Mode::Web => Commands::Serve,
        Mode::Once => Commands::RunOnce,
    });

    let result = match command {
        Commands::Serve => commands::serve(&config).await,
        Commands::RunOnce => commands::run_once(&config).await,
    };
    if let Err(e) = &result {
        error!("Analytics cleanup failed: {}", e);
    }
    result
}
