// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolgate — queue-driven print dispatcher
//
// Entry point. Initialises logging, loads configuration, and runs the
// selected command.

mod cli;
mod commands;

use anyhow::Context;

use cli::{CommandLine, Commands};
use spoolgate_core::DispatcherConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = CommandLine::parse_args();
    let config =
        DispatcherConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    tracing::info!(printer = %config.printer.name, "Spoolgate starting");

    match cli.command {
        Commands::Run => commands::run(&config).await,
        Commands::Print {
            source,
            quantity,
            double_sided,
            color,
            position,
        } => {
            commands::print_once(&config, &source, quantity, double_sided, color, position.into())
                .await
        }
        Commands::Printers => commands::list_printers(&config).await,
    }
}
