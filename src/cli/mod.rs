// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for ampliflow.

pub mod clean;
pub mod graph;
pub mod init;
pub mod run;
pub mod status;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::errors::AmpliflowError;
use crate::pipeline::{Pipeline, StepRegistry, PIPELINE_FILE};

/// Checkpointed amplicon pipeline runner
///
/// Runs each step of an analysis pipeline once; steps whose outputs exist
/// are skipped on later runs.
#[derive(Parser, Debug)]
#[clap(
    name = "ampliflow",
    version,
    about = "Checkpointed runner for QIIME 2 amplicon analysis pipelines",
    long_about = None,
    after_help = "Examples:\n\
        ampliflow run                       Run (or resume) the pipeline\n\
        ampliflow run --dry-run             Show which steps would run\n\
        ampliflow status                    Show which steps are complete\n\
        ampliflow clean denoise             Delete outputs so a step runs again\n\
        ampliflow init                      Write the built-in pipeline for editing\n\n\
        See 'ampliflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Working directory holding inputs and outputs
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline, skipping steps whose outputs exist
    Run {
        /// Pipeline file (default: .ampliflow.yaml, else the built-in pipeline)
        #[clap(short, long)]
        pipeline: Option<PathBuf>,

        /// Set a parameter, e.g. --param sampling_depth=10000
        #[clap(long = "param", value_name = "NAME=VALUE")]
        param: Vec<String>,

        /// Run without prompts: take defaults, skip viewers and pauses
        #[clap(short, long)]
        yes: bool,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,

        /// Delete the outputs of a step and everything after it, then run
        #[clap(long, value_name = "STEP")]
        force: Vec<String>,

        /// Never offer to open visualizations
        #[clap(long)]
        no_view: bool,
    },

    /// Show which steps are complete
    Status {
        /// Pipeline file
        #[clap(short, long)]
        pipeline: Option<PathBuf>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        pipeline: Option<PathBuf>,
    },

    /// Show pipeline as a graph
    Graph {
        /// Pipeline file
        pipeline: Option<PathBuf>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Delete the outputs of a step and of every step after it
    Clean {
        /// Step to reset
        step: String,

        /// Pipeline file
        #[clap(short, long)]
        pipeline: Option<PathBuf>,

        /// Skip confirmation
        #[clap(short, long)]
        yes: bool,
    },

    /// Write the built-in pipeline to .ampliflow.yaml
    Init {
        /// Overwrite an existing file
        #[clap(short, long)]
        force: bool,
    },
}

/// Output format for the status command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Load the pipeline a command operates on
///
/// An explicit path must exist. Otherwise `.ampliflow.yaml` in the working
/// directory is used when present, and the built-in pipeline when not.
pub fn load_pipeline(
    working_dir: &Path,
    explicit: Option<PathBuf>,
) -> Result<Pipeline, AmpliflowError> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path
        } else {
            working_dir.join(path)
        };
        tracing::debug!(path = %path.display(), "loading pipeline");
        return Pipeline::from_file(&path);
    }

    let default_path = working_dir.join(PIPELINE_FILE);
    let present = default_path
        .try_exists()
        .map_err(|e| AmpliflowError::artifact_check(&default_path, e))?;

    if present {
        tracing::debug!(path = %default_path.display(), "loading pipeline");
        Pipeline::from_file(&default_path)
    } else {
        tracing::debug!("using built-in pipeline");
        Pipeline::builtin()
    }
}

/// Load and validate the pipeline a command operates on
pub fn load_registry(
    working_dir: &Path,
    explicit: Option<PathBuf>,
) -> Result<StepRegistry, AmpliflowError> {
    StepRegistry::build(load_pipeline(working_dir, explicit)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "ampliflow",
            "-C",
            "/data/run1",
            "run",
            "--yes",
            "--param",
            "sampling_depth=10000",
            "--force",
            "denoise",
        ]);

        assert_eq!(cli.directory, Some(PathBuf::from("/data/run1")));
        match cli.command {
            Commands::Run {
                param, yes, force, ..
            } => {
                assert!(yes);
                assert_eq!(param, vec!["sampling_depth=10000"]);
                assert_eq!(force, vec!["denoise"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_load_pipeline_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();

        let pipeline = load_pipeline(dir.path(), None).unwrap();
        assert_eq!(pipeline.name, "qiime2-16s");

        std::fs::write(
            dir.path().join(PIPELINE_FILE),
            "name: local\nsteps:\n  - name: a\n    command: touch a\n    outputs: [a]\n",
        )
        .unwrap();
        assert_eq!(load_pipeline(dir.path(), None).unwrap().name, "local");

        assert!(matches!(
            load_pipeline(dir.path(), Some(PathBuf::from("missing.yaml"))),
            Err(AmpliflowError::PipelineNotFound { .. })
        ));
    }
}
