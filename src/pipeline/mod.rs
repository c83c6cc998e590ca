// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Pipeline definitions and execution
//!
//! This module defines the step table, validates it into a registry, and
//! drives it through the orchestrator.

mod dag;
mod definition;
mod orchestrator;
mod registry;
mod validation;

pub use dag::DagBuilder;
pub use definition::*;
pub use orchestrator::{
    plan, Decision, FailureReason, Orchestrator, RunContext, RunOptions, RunReport, StepOutcome,
    StepPlan, StepStatus,
};
pub use registry::StepRegistry;
pub use validation::{PipelineValidator, ValidationResult};
