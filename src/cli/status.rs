// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Status command - show which steps are complete

use colored::Colorize;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::artifacts::ArtifactChecker;
use crate::pipeline::{plan, Decision, ParameterValues, StepPlan};
use crate::utils::{print_header, print_pending, print_section, print_success, print_warning};

#[derive(Serialize)]
struct StatusReport {
    pipeline: String,
    working_dir: PathBuf,
    missing_prerequisites: Vec<PathBuf>,
    complete: usize,
    steps: Vec<StepPlan>,
}

/// Run the status command
pub async fn run(
    working_dir: &Path,
    pipeline: Option<PathBuf>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let registry = super::load_registry(working_dir, pipeline)?;
    let checker = ArtifactChecker::new(working_dir);

    let steps = plan(&registry, working_dir, &ParameterValues::new())?;
    let report = StatusReport {
        pipeline: registry.pipeline().name.clone(),
        working_dir: working_dir.to_path_buf(),
        missing_prerequisites: checker.missing(&registry.pipeline().prerequisites)?,
        complete: steps.iter().filter(|s| s.decision == Decision::Skip).count(),
        steps,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| miette::miette!("Failed to serialize status: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => print_text(&report, verbose),
    }

    Ok(())
}

fn print_text(report: &StatusReport, verbose: bool) {
    print_header(&format!("Pipeline: {}", report.pipeline));

    if !report.missing_prerequisites.is_empty() {
        print_section("Missing required inputs");
        for path in &report.missing_prerequisites {
            print_warning(&path.display().to_string());
        }
    }

    print_section("Steps");
    for step in &report.steps {
        match step.decision {
            Decision::Skip => print_success(&step.step),
            Decision::Run => {
                print_pending(&step.step);
                if verbose {
                    for path in &step.missing {
                        println!("      {} {}", "missing".dimmed(), path.display());
                    }
                }
            }
        }
    }

    println!();
    let summary = format!("{} of {} steps complete", report.complete, report.steps.len());
    if report.complete == report.steps.len() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.bold());
    }
}
