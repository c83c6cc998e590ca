// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Clean command - delete outputs so steps run again

use colored::Colorize;
use miette::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::artifacts::{remove_artifacts, ArtifactChecker};
use crate::errors::AmpliflowError;
use crate::interaction::{Prompter, TerminalPrompter};
use crate::pipeline::StepRegistry;
use crate::utils::{print_info, print_success};

/// Run the clean command
pub async fn run(
    working_dir: &Path,
    step: String,
    pipeline: Option<PathBuf>,
    yes: bool,
    _verbose: bool,
) -> Result<()> {
    let registry = super::load_registry(working_dir, pipeline)?;

    match reset_steps(&registry, working_dir, &[step], &TerminalPrompter::new(), yes).await? {
        Some(removed) if removed.is_empty() => println!("Nothing to clean."),
        Some(removed) => {
            for path in &removed {
                print_success(&format!("Removed {}", path.display()));
            }
        }
        None => println!("{}", "Aborted.".yellow()),
    }

    Ok(())
}

/// Delete the outputs of `steps` and of every step depending on them
///
/// Returns the removed paths, or `None` when the operator declined.
pub async fn reset_steps(
    registry: &StepRegistry,
    working_dir: &Path,
    steps: &[String],
    prompter: &dyn Prompter,
    assume_yes: bool,
) -> Result<Option<Vec<PathBuf>>, AmpliflowError> {
    let mut affected = BTreeSet::new();
    for name in steps {
        for step in registry.downstream_of(name)? {
            affected.insert(step.name.as_str());
        }
    }

    let targets: Vec<PathBuf> = registry
        .steps_in_order()
        .iter()
        .filter(|step| affected.contains(step.name.as_str()))
        .flat_map(|step| step.output_paths())
        .map(Path::to_path_buf)
        .collect();

    let checker = ArtifactChecker::new(working_dir);
    let missing = checker.missing(&targets)?;
    let present: Vec<PathBuf> = targets
        .into_iter()
        .filter(|path| !missing.contains(path))
        .collect();

    if present.is_empty() {
        return Ok(Some(Vec::new()));
    }

    if !assume_yes {
        println!("{}:", "The following outputs will be deleted".bold());
        for path in &present {
            print_info(&path.display().to_string());
        }
        let question = format!("Delete {} file(s)?", present.len());
        if !prompter.prompt_yes_no(&question).await? {
            return Ok(None);
        }
    }

    tracing::info!(count = present.len(), "removing outputs");
    remove_artifacts(working_dir, &present).map(Some)
}
