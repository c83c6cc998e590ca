// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Shell runner
//!
//! Runs step commands through a shell with a spinner on screen.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use super::{CommandRunner, CommandSpec, ExecutionResult, Interrupt};
use crate::utils::SpinnerGuard;

/// Shell exit code for "command not found"
const EXIT_NOT_FOUND: i32 = 127;
/// Shell exit code for "found but not executable"
const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Shell exit code for a child killed by SIGINT
const EXIT_INTERRUPTED: i32 = 130;
#[cfg(unix)]
const SIGINT: i32 = 2;

/// Shell runner
pub struct ShellRunner {
    interrupt: Interrupt,
    show_progress: bool,
}

impl ShellRunner {
    /// Create a new shell runner
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            interrupt,
            show_progress: true,
        }
    }

    /// Hide the spinner
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, spec: &CommandSpec) -> ExecutionResult {
        tracing::debug!(step = %spec.step, command = %spec.command, "launching");

        let mut cmd = Command::new(&spec.shell);
        cmd.arg("-c").arg(&spec.command);
        cmd.current_dir(&spec.working_dir);
        cmd.envs(&spec.env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let _scope = self.interrupt.enter_step();
        let _spinner = if self.show_progress {
            SpinnerGuard::start(&spec.label)
        } else {
            SpinnerGuard::hidden()
        };

        let start = Instant::now();

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::launch_failed(format!(
                    "could not start shell '{}': {}",
                    spec.shell, e
                ));
            }
        };

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            output = child.wait_with_output() => output,
            _ = self.interrupt.raised() => {
                tracing::warn!(step = %spec.step, "interrupted; child process killed");
                return ExecutionResult::interrupted(start.elapsed());
            }
        };

        let duration = start.elapsed();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return ExecutionResult::launch_failed(format!(
                    "lost track of '{}': {}",
                    spec.program(),
                    e
                ));
            }
        };

        // A terminal Ctrl-C reaches the child too, often before the handler runs
        if ended_by_interrupt(&output.status) || self.interrupt.is_triggered() {
            self.interrupt.trigger();
            tracing::warn!(step = %spec.step, "interrupted");
            return ExecutionResult::interrupted(duration);
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            return ExecutionResult::success(stdout, stderr, duration);
        }

        match output.status.code() {
            Some(EXIT_NOT_FOUND) => ExecutionResult::launch_failed(format!(
                "'{}' not found: {}",
                spec.program(),
                stderr.trim()
            )),
            Some(EXIT_NOT_EXECUTABLE) => ExecutionResult::launch_failed(format!(
                "'{}' is not executable: {}",
                spec.program(),
                stderr.trim()
            )),
            code => {
                let mut result = ExecutionResult::failure(code.unwrap_or(-1), stderr, duration);
                result.stdout = stdout;
                result
            }
        }
    }
}

/// Whether the child died from SIGINT, directly or through the shell
fn ended_by_interrupt(status: &std::process::ExitStatus) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if status.signal() == Some(SIGINT) {
            return true;
        }
    }
    status.code() == Some(EXIT_INTERRUPTED)
}
