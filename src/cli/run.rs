// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::executors::{Interrupt, ShellRunner};
use crate::interaction::{parse_overrides, AutoPrompter, BrowserPresenter, Prompter, TerminalPrompter};
use crate::pipeline::{Orchestrator, RunOptions};

/// Run the pipeline
#[allow(clippy::too_many_arguments)]
pub async fn run(
    working_dir: &Path,
    pipeline: Option<PathBuf>,
    params: Vec<String>,
    yes: bool,
    dry_run: bool,
    force: Vec<String>,
    no_view: bool,
    verbose: bool,
) -> Result<()> {
    let registry = super::load_registry(working_dir, pipeline)?;

    if verbose && !registry.warnings().is_empty() {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in registry.warnings() {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let overrides = parse_overrides(registry.pipeline(), &params)?;

    let prompter: Arc<dyn Prompter> = if yes {
        Arc::new(AutoPrompter)
    } else {
        Arc::new(TerminalPrompter::new())
    };

    if !force.is_empty() && !dry_run {
        let removed =
            super::clean::reset_steps(&registry, working_dir, &force, prompter.as_ref(), yes)
                .await?;
        match removed {
            Some(removed) => tracing::info!(count = removed.len(), "outputs removed for re-run"),
            None => {
                println!("{}", "Aborted.".yellow());
                return Ok(());
            }
        }
    }

    let interrupt = Interrupt::new();
    install_interrupt_handler(interrupt.clone());

    let orchestrator = Orchestrator::new(
        Arc::new(ShellRunner::new(interrupt)),
        prompter,
        Arc::new(BrowserPresenter::new(registry.pipeline().viewer.clone())),
    );

    let options = RunOptions {
        dry_run,
        overrides,
        offer_visualizations: !no_view,
        verbose,
    };

    let report = orchestrator.run(&registry, working_dir, &options).await?;

    match report.into_error() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Forward Ctrl-C to the running step, or exit when none is running
fn install_interrupt_handler(interrupt: Interrupt) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !interrupt.trigger() {
                eprintln!();
                eprintln!("{}", "Interrupted.".yellow());
                std::process::exit(130);
            }
            tracing::warn!("interrupt received; stopping the running step");
        }
    });
}
