// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! # ampliflow - Checkpointed Amplicon Pipeline Runner
//!
//! `ampliflow` drives a fixed sequence of external commands (a QIIME 2
//! amplicon analysis) and uses the working directory as its checkpoint
//! store: a step whose declared outputs all exist is skipped.
//!
//! ## Features
//!
//! - **Resumable** - Re-running after a failure picks up at the failed step
//! - **Declarative** - Steps, outputs and parameters live in a YAML table
//! - **Interactive** - Parameters are asked for right before they are needed
//! - **Visualizations** - Offers to open `.qzv` files in QIIME 2 View
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the built-in pipeline in the current directory
//! ampliflow run
//!
//! # See what is already done
//! ampliflow status
//!
//! # Re-run denoising and everything after it
//! ampliflow run --force denoise
//! ```

pub mod artifacts;
pub mod cli;
pub mod errors;
pub mod executors;
pub mod interaction;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use artifacts::ArtifactChecker;
pub use errors::{AmpliflowError, AmpliflowResult};
pub use pipeline::{Orchestrator, Pipeline, Step, StepRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
