// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use crate::artifacts::ArtifactChecker;
use crate::errors::{AmpliflowError, RecoverySuggestion};
use crate::pipeline::{DagBuilder, PipelineValidator};

/// Run the validate command
pub async fn run(working_dir: &Path, pipeline_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let pipeline = match super::load_pipeline(working_dir, pipeline_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Failed to load pipeline", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Pipeline file is valid YAML", "✓".green());

    let validation = PipelineValidator::validate(&pipeline);
    let missing_files = ArtifactChecker::new(working_dir).missing(&pipeline.prerequisites)?;

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }

        if let Err(AmpliflowError::CircularDependency { steps }) = DagBuilder::build(&pipeline) {
            println!();
            print!("{}", RecoverySuggestion::fix_circular_dependency(&steps));
        }
    }

    if !missing_files.is_empty() {
        println!();
        println!("{}:", "Missing inputs".yellow().bold());
        for missing in &missing_files {
            println!("  {} Required input not found: {}", "⚠".yellow(), missing.display());
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", pipeline.name);
        println!("  Parameters: {}", pipeline.parameters.len());
        println!("  Steps: {}", pipeline.steps.len());
        for step in &pipeline.steps {
            let outputs = step
                .output_paths()
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            println!("    - {} {}", step.name, format!("→ {}", outputs).dimmed());
        }
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Pipeline validation failed"));
    }

    if missing_files.is_empty() && !validation.has_warnings() {
        println!("{}", "Pipeline is valid!".green().bold());
    } else {
        // Missing inputs only matter at run time
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    }

    Ok(())
}
