// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Command runners
//!
//! A runner executes one step command and reports how it ended. It never
//! looks at the step's artifacts; the orchestrator does that afterwards.

mod interrupt;
mod shell;

pub use interrupt::Interrupt;
pub use shell::ShellRunner;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to launch one step command
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Step the command belongs to
    pub step: String,
    /// Label shown next to the spinner
    pub label: String,
    /// Rendered command line
    pub command: String,
    /// Shell that interprets the command line
    pub shell: String,
    /// Directory the command runs in
    pub working_dir: PathBuf,
    /// Extra environment variables
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    /// First word of the command line, used in launch diagnostics
    pub fn program(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or(&self.shell)
    }
}

/// How a command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// Exit code 0
    Succeeded,
    /// Non-zero exit code
    Exited(i32),
    /// The process, or the program it names, could not be started
    LaunchFailed(String),
    /// The operator interrupted the run and the process was killed
    Interrupted,
}

/// Result of running a step command
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// How the command ended
    pub status: CommandStatus,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl ExecutionResult {
    /// Create a successful result
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            status: CommandStatus::Succeeded,
            stdout,
            stderr,
            duration,
        }
    }

    /// Create a result for a non-zero exit
    pub fn failure(exit_code: i32, stderr: String, duration: Duration) -> Self {
        Self {
            status: CommandStatus::Exited(exit_code),
            stdout: String::new(),
            stderr,
            duration,
        }
    }

    /// Create a result for a command that never started
    pub fn launch_failed(error: String) -> Self {
        Self {
            status: CommandStatus::LaunchFailed(error),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// Create a result for an interrupted command
    pub fn interrupted(duration: Duration) -> Self {
        Self {
            status: CommandStatus::Interrupted,
            stdout: String::new(),
            stderr: String::new(),
            duration,
        }
    }

    /// Whether the command exited with status 0
    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Succeeded
    }
}

/// Trait for command runners
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, blocking the pipeline until it ends
    async fn run(&self, spec: &CommandSpec) -> ExecutionResult;
}
