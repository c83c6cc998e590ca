// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Init command - write the built-in pipeline for editing

use colored::Colorize;
use miette::Result;
use std::path::Path;

use crate::errors::AmpliflowError;
use crate::pipeline::{Pipeline, PIPELINE_FILE};

/// Run the init command
pub async fn run(working_dir: &Path, force: bool, verbose: bool) -> Result<()> {
    let target = working_dir.join(PIPELINE_FILE);

    println!("{}", "Initializing ampliflow pipeline...".bold());
    println!();

    if target.exists() && !force {
        return Err(miette::miette!(
            help = "Use --force to overwrite it",
            "{} already exists",
            PIPELINE_FILE
        ));
    }

    let content = Pipeline::builtin_source();
    std::fs::write(&target, content).map_err(|e| AmpliflowError::FileWriteError {
        path: target.clone(),
        error: e.to_string(),
    })?;

    println!("  {} Created {}", "✓".green(), PIPELINE_FILE);

    println!();
    println!("{}", "Pipeline initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to adjust commands and defaults", PIPELINE_FILE.cyan());
    println!(
        "  2. Put {}, {} and {} next to it",
        "paired-end-demultiplexed/".cyan(),
        "metadata.tsv".cyan(),
        "classifier.qza".cyan()
    );
    println!("  3. Run {} to execute the pipeline", "ampliflow run".cyan());
    println!();

    if verbose {
        println!("{}", "Generated pipeline:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}
