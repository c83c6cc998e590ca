// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! ampliflow - checkpointed amplicon pipeline runner
//!
//! Runs QIIME 2 analysis steps once and resumes where a previous run stopped.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ampliflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ampliflow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let working_dir = match cli.directory {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?,
    };

    if !working_dir.is_dir() {
        return Err(miette::miette!(
            "Working directory '{}' does not exist",
            working_dir.display()
        ));
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            pipeline,
            param,
            yes,
            dry_run,
            force,
            no_view,
        } => {
            ampliflow::cli::run::run(
                &working_dir,
                pipeline,
                param,
                yes,
                dry_run,
                force,
                no_view,
                cli.verbose,
            )
            .await
        }
        Commands::Status { pipeline, format } => {
            ampliflow::cli::status::run(&working_dir, pipeline, format, cli.verbose).await
        }
        Commands::Validate { pipeline } => {
            ampliflow::cli::validate::run(&working_dir, pipeline, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            ampliflow::cli::graph::run(&working_dir, pipeline, format, cli.verbose).await
        }
        Commands::Clean {
            step,
            pipeline,
            yes,
        } => ampliflow::cli::clean::run(&working_dir, step, pipeline, yes, cli.verbose).await,
        Commands::Init { force } => {
            ampliflow::cli::init::run(&working_dir, force, cli.verbose).await
        }
    }
}
