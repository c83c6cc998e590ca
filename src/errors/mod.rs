// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Error types
//!
//! Configuration problems are detected before any step runs. Execution-time
//! failures (launch, exit status, missing outputs, interrupts) halt the run
//! but never leave the working directory in a state a re-run cannot resume
//! from.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for ampliflow operations
pub type AmpliflowResult<T> = Result<T, AmpliflowError>;

/// Main error type for ampliflow
#[derive(Error, Debug, Diagnostic)]
pub enum AmpliflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(ampliflow::pipeline_not_found),
        help("Write the built-in pipeline with 'ampliflow init' or omit --pipeline to use it directly")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Invalid pipeline configuration: {reason}")]
    #[diagnostic(code(ampliflow::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Step '{step}' is invalid: {reason}")]
    #[diagnostic(code(ampliflow::invalid_step))]
    InvalidStep { step: String, reason: String },

    #[error("Circular dependency detected: {}", .steps.join(" → "))]
    #[diagnostic(
        code(ampliflow::circular_dependency),
        help("Review your step dependencies to remove the cycle")
    )]
    CircularDependency { steps: Vec<String> },

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    #[diagnostic(
        code(ampliflow::unknown_dependency),
        help("Check that '{dependency}' is defined in your pipeline")
    )]
    UnknownDependency { step: String, dependency: String },

    #[error("Step '{step}' depends on '{dependency}', which comes later in the pipeline")]
    #[diagnostic(
        code(ampliflow::out_of_order_dependency),
        help("Steps run strictly in the order they are listed; move '{dependency}' above '{step}'")
    )]
    OutOfOrderDependency { step: String, dependency: String },

    #[error("Step '{step}' consumes '{input}', which no earlier step produces")]
    #[diagnostic(
        code(ampliflow::unproduced_input),
        help("Declare it as an output of an earlier step or list it under 'prerequisites'")
    )]
    UnproducedInput { step: String, input: PathBuf },

    #[error("Step '{step}' not found in pipeline")]
    #[diagnostic(code(ampliflow::step_not_found))]
    StepNotFound { step: String },

    #[error("Parameter '{parameter}' of step '{step}' has no value")]
    #[diagnostic(
        code(ampliflow::missing_parameter),
        help("Pass it with --param {parameter}=<value> or run interactively")
    )]
    MissingParameter { step: String, parameter: String },

    #[error("Invalid value '{value}' for parameter '{parameter}': {reason}")]
    #[diagnostic(code(ampliflow::invalid_parameter))]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Filesystem Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Missing required inputs: {}", display_paths(.paths))]
    #[diagnostic(
        code(ampliflow::missing_prerequisites),
        help("Add the missing files to the working directory and run the pipeline again")
    )]
    MissingPrerequisites { paths: Vec<PathBuf> },

    #[error("Could not check whether '{path}' exists: {error}")]
    #[diagnostic(
        code(ampliflow::artifact_check),
        help("Fix the permissions of the working directory; the run was halted so no step is re-run by mistake")
    )]
    ArtifactCheck { path: PathBuf, error: String },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(ampliflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(ampliflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' could not start its command: {error}")]
    #[diagnostic(code(ampliflow::launch_failed))]
    LaunchFailed {
        step: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Step '{step}' failed with exit code {exit_code}")]
    #[diagnostic(
        code(ampliflow::execution_failed),
        help("Fix the problem reported above and run the pipeline again; completed steps will be skipped")
    )]
    ExecutionFailed {
        step: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Step '{step}' finished but did not produce: {}", display_paths(.missing))]
    #[diagnostic(
        code(ampliflow::output_mismatch),
        help("The command exited successfully without writing its declared outputs; check the step's command")
    )]
    OutputMismatch { step: String, missing: Vec<PathBuf> },

    #[error("Step '{step}' was interrupted")]
    #[diagnostic(
        code(ampliflow::interrupted),
        help("Run the pipeline again to resume; the interrupted step will be re-run")
    )]
    Interrupted { step: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Prompt failed: {message}")]
    #[diagnostic(
        code(ampliflow::prompt),
        help("Use --yes and --param to run without a terminal")
    )]
    Prompt { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(ampliflow::yaml_error))]
    Yaml { message: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_yaml::Error> for AmpliflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl AmpliflowError {
    /// Whether this error was raised while building the step registry
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::PipelineNotFound { .. }
                | Self::InvalidPipeline { .. }
                | Self::InvalidStep { .. }
                | Self::CircularDependency { .. }
                | Self::UnknownDependency { .. }
                | Self::OutOfOrderDependency { .. }
                | Self::UnproducedInput { .. }
                | Self::MissingParameter { .. }
        )
    }

    /// Create an artifact check error for a path
    pub fn artifact_check(path: &Path, error: std::io::Error) -> Self {
        Self::ArtifactCheck {
            path: path.to_path_buf(),
            error: error.to_string(),
        }
    }

    /// Create a launch error with an installation hint for the program
    pub fn launch_failed(step: &str, program: &str, error: String) -> Self {
        Self::LaunchFailed {
            step: step.to_string(),
            error,
            help: Some(RecoverySuggestion::install_tool(program).action),
        }
    }
}
