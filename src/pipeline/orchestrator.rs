// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Pipeline orchestrator
//!
//! Drives every step through `Pending → {Skipped | Running → {Completed |
//! Failed}}` in registry order. The working directory is the only state
//! carried between runs: a step whose outputs all exist is skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use serde::Serialize;

use crate::artifacts::ArtifactChecker;
use crate::errors::{AmpliflowError, RecoverySuggestion};
use crate::executors::{CommandRunner, CommandSpec, CommandStatus};
use crate::interaction::{ParameterPrompt, Presenter, Prompter};
use crate::pipeline::{ParameterValues, Step, StepRegistry};

/// Pipeline run options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Only show what would be done
    pub dry_run: bool,
    /// Parameter values given on the command line
    pub overrides: ParameterValues,
    /// Offer to open visualizations
    pub offer_visualizations: bool,
    /// Print captured stderr of failed steps
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            overrides: ParameterValues::new(),
            offer_visualizations: true,
            verbose: false,
        }
    }
}

/// Why a step failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The command could not be started
    Launch(String),
    /// The command exited with a non-zero code
    Exit(i32),
    /// The command succeeded but some outputs are missing
    OutputsNotProduced(Vec<PathBuf>),
    /// The operator interrupted the command
    Interrupted,
}

/// Terminal state of a step in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Skipped,
    Completed,
    Failed(FailureReason),
}

/// Outcome of one step in one run
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Step name
    pub step: String,
    /// How the step ended
    pub status: StepStatus,
    /// Time spent running the command
    pub duration: Duration,
    /// Standard error of the command, kept for diagnostics
    pub stderr: String,
    /// Program named by the command, for launch diagnostics
    pub program: String,
}

impl StepOutcome {
    fn skipped(step: &Step) -> Self {
        Self {
            step: step.name.clone(),
            status: StepStatus::Skipped,
            duration: Duration::ZERO,
            stderr: String::new(),
            program: String::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }

    /// Convert a failed outcome into the matching error
    pub fn to_error(&self) -> Option<AmpliflowError> {
        let StepStatus::Failed(ref reason) = self.status else {
            return None;
        };

        Some(match reason {
            FailureReason::Launch(error) => {
                AmpliflowError::launch_failed(&self.step, &self.program, error.clone())
            }
            FailureReason::Exit(code) => AmpliflowError::ExecutionFailed {
                step: self.step.clone(),
                exit_code: *code,
                stderr: self.stderr.clone(),
            },
            FailureReason::OutputsNotProduced(missing) => AmpliflowError::OutputMismatch {
                step: self.step.clone(),
                missing: missing.clone(),
            },
            FailureReason::Interrupted => AmpliflowError::Interrupted {
                step: self.step.clone(),
            },
        })
    }
}

/// State owned by the orchestrator for one invocation
#[derive(Debug)]
pub struct RunContext {
    /// Directory every path is relative to
    pub working_dir: PathBuf,
    /// Parameter values bound so far
    pub parameters: ParameterValues,
    /// Outcomes in execution order
    pub outcomes: Vec<StepOutcome>,
}

impl RunContext {
    pub fn new(working_dir: &Path, parameters: ParameterValues) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            parameters,
            outcomes: Vec::new(),
        }
    }
}

/// Result of a pipeline run
#[derive(Debug)]
pub struct RunReport {
    /// Outcomes in execution order
    pub outcomes: Vec<StepOutcome>,
    /// Parameter values bound during the run
    pub parameters: ParameterValues,
    /// Total run time
    pub duration: Duration,
    /// Whether the run stopped at a failed step
    pub halted: bool,
}

impl RunReport {
    /// Whether the run reached the end of the pipeline
    pub fn success(&self) -> bool {
        !self.halted
    }

    /// The failure that halted the run
    pub fn first_failure(&self) -> Option<&StepOutcome> {
        if !self.halted {
            return None;
        }
        self.outcomes.iter().rev().find(|o| o.is_failed())
    }

    /// Outcome of a step, if it was reached
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }

    /// Count of outcomes with a given status kind
    pub fn count(&self, matches: impl Fn(&StepStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| matches(&o.status)).count()
    }

    /// The error for a halted run
    pub fn into_error(self) -> Option<AmpliflowError> {
        self.first_failure().and_then(StepOutcome::to_error)
    }
}

/// What a run would do with a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Skip,
    Run,
}

/// Plan entry for one step
#[derive(Debug, Clone, Serialize)]
pub struct StepPlan {
    pub step: String,
    pub label: String,
    pub decision: Decision,
    /// Outputs not yet present
    pub missing: Vec<PathBuf>,
    /// Rendered command when every parameter has a value
    pub command: Option<String>,
}

/// Work out what a run would do, without running or prompting
pub fn plan(
    registry: &StepRegistry,
    working_dir: &Path,
    overrides: &ParameterValues,
) -> Result<Vec<StepPlan>, AmpliflowError> {
    let checker = ArtifactChecker::new(working_dir);

    let mut known = overrides.clone();
    for spec in &registry.pipeline().parameters {
        if let Some(ref default) = spec.default {
            known.entry(spec.name.clone()).or_insert_with(|| default.clone());
        }
    }

    registry
        .steps_in_order()
        .iter()
        .map(|step| {
            let missing = checker.missing(&step.output_paths())?;
            let decision = if missing.is_empty() {
                Decision::Skip
            } else {
                Decision::Run
            };
            Ok(StepPlan {
                step: step.name.clone(),
                label: step.label().to_string(),
                decision,
                missing,
                command: step.render_command(&known).ok(),
            })
        })
        .collect()
}

/// Pipeline orchestrator
pub struct Orchestrator {
    runner: Arc<dyn CommandRunner>,
    prompter: Arc<dyn Prompter>,
    presenter: Arc<dyn Presenter>,
    parameters: ParameterPrompt,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        prompter: Arc<dyn Prompter>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            runner,
            parameters: ParameterPrompt::new(Arc::clone(&prompter)),
            prompter,
            presenter,
        }
    }

    /// Run the pipeline
    ///
    /// Configuration, artifact-check and prompt errors are returned as
    /// `Err`. A failed step halts the run and is reported in the returned
    /// [`RunReport`].
    pub async fn run(
        &self,
        registry: &StepRegistry,
        working_dir: &Path,
        options: &RunOptions,
    ) -> Result<RunReport, AmpliflowError> {
        let start = Instant::now();
        let pipeline = registry.pipeline();
        let checker = ArtifactChecker::new(working_dir);

        let missing_prereqs = checker.missing(&pipeline.prerequisites)?;

        if options.dry_run {
            self.print_plan(registry, working_dir, options, &missing_prereqs)?;
            return Ok(RunReport {
                outcomes: Vec::new(),
                parameters: options.overrides.clone(),
                duration: start.elapsed(),
                halted: false,
            });
        }

        if !missing_prereqs.is_empty() {
            eprintln!("{}", "Missing required inputs:".red().bold());
            eprint!("{}", RecoverySuggestion::add_prerequisites(&missing_prereqs));
            return Err(AmpliflowError::MissingPrerequisites {
                paths: missing_prereqs,
            });
        }

        println!();
        println!("{}: {}", "Pipeline".bold(), pipeline.name);
        println!("{}", "═".repeat(50));

        let mut ctx = RunContext::new(working_dir, options.overrides.clone());
        let mut halted = false;

        for step in registry.steps_in_order() {
            let outcome = self
                .run_step(registry, step, &checker, &mut ctx, options)
                .await?;

            let failed = outcome.is_failed();
            let interrupted = outcome.status == StepStatus::Failed(FailureReason::Interrupted);
            ctx.outcomes.push(outcome);

            if failed {
                if step.allow_failure && !interrupted {
                    tracing::warn!(step = %step.name, "step failed; continuing anyway");
                    continue;
                }
                halted = true;
                break;
            }

            if let Some(ref review) = step.review {
                self.prompter
                    .pause(&format!("{}. Press Enter to continue...", review))
                    .await?;
            }
        }

        let duration = start.elapsed();
        let report = RunReport {
            outcomes: ctx.outcomes,
            parameters: ctx.parameters,
            duration,
            halted,
        };

        println!();
        if report.success() {
            println!(
                "{}",
                format!(
                    "Pipeline completed in {:.2}s ({} run, {} skipped)",
                    duration.as_secs_f64(),
                    report.count(|s| *s == StepStatus::Completed),
                    report.count(|s| *s == StepStatus::Skipped),
                )
                .green()
            );
        } else {
            println!(
                "{}",
                format!("Pipeline halted after {:.2}s", duration.as_secs_f64()).red()
            );
        }

        Ok(report)
    }

    /// Take one step from Pending to its terminal state
    async fn run_step(
        &self,
        registry: &StepRegistry,
        step: &Step,
        checker: &ArtifactChecker,
        ctx: &mut RunContext,
        options: &RunOptions,
    ) -> Result<StepOutcome, AmpliflowError> {
        let outputs = step.output_paths();
        let missing = checker.missing(&outputs)?;

        if missing.is_empty() {
            tracing::debug!(step = %step.name, "all outputs present");
            println!(
                "  {} {} {}",
                "✓".green(),
                step.label().bold(),
                "(skipped, outputs present)".dimmed()
            );
            self.offer_visualizations(step, ctx, options).await?;
            return Ok(StepOutcome::skipped(step));
        }

        tracing::debug!(step = %step.name, missing = missing.len(), "outputs missing");

        self.parameters
            .resolve(step, &registry.parameters_for(step), &mut ctx.parameters)
            .await?;
        let command = step.render_command(&ctx.parameters)?;

        let spec = CommandSpec {
            step: step.name.clone(),
            label: step.label().to_string(),
            command,
            shell: registry.pipeline().shell.clone(),
            working_dir: ctx.working_dir.clone(),
            env: registry.pipeline().env.clone(),
        };

        tracing::info!(step = %step.name, "running");
        let result = self.runner.run(&spec).await;

        let status = match result.status {
            CommandStatus::Succeeded => {
                let missing = checker.missing(&outputs)?;
                if missing.is_empty() {
                    StepStatus::Completed
                } else {
                    StepStatus::Failed(FailureReason::OutputsNotProduced(missing))
                }
            }
            CommandStatus::Exited(code) => StepStatus::Failed(FailureReason::Exit(code)),
            CommandStatus::LaunchFailed(error) => StepStatus::Failed(FailureReason::Launch(error)),
            CommandStatus::Interrupted => StepStatus::Failed(FailureReason::Interrupted),
        };

        let outcome = StepOutcome {
            step: step.name.clone(),
            status,
            duration: result.duration,
            stderr: result.stderr,
            program: spec.program().to_string(),
        };

        match outcome.status {
            StepStatus::Completed => {
                tracing::info!(step = %step.name, elapsed = ?outcome.duration, "completed");
                println!(
                    "  {} {} ({:.2}s)",
                    "✓".green(),
                    step.label().bold(),
                    outcome.duration.as_secs_f64()
                );
                self.offer_visualizations(step, ctx, options).await?;
            }
            StepStatus::Failed(ref reason) => {
                tracing::info!(step = %step.name, ?reason, "failed");
                self.print_failure(step, &outcome, reason, options);
            }
            StepStatus::Skipped => {}
        }

        Ok(outcome)
    }

    async fn offer_visualizations(
        &self,
        step: &Step,
        ctx: &RunContext,
        options: &RunOptions,
    ) -> Result<(), AmpliflowError> {
        if !options.offer_visualizations {
            return Ok(());
        }

        for artifact in step.visualizations() {
            let question = format!("Would you like to view {}?", artifact.path().display());
            if self.prompter.prompt_yes_no(&question).await? {
                if let Err(e) = self.presenter.open(&ctx.working_dir.join(artifact.path())) {
                    tracing::warn!("Could not open {}: {}", artifact.path().display(), e);
                }
            }
        }

        Ok(())
    }

    fn print_failure(
        &self,
        step: &Step,
        outcome: &StepOutcome,
        reason: &FailureReason,
        options: &RunOptions,
    ) {
        let detail = match reason {
            FailureReason::Launch(error) => format!("could not start: {}", error),
            FailureReason::Exit(code) => format!("exit code {}", code),
            FailureReason::OutputsNotProduced(missing) => format!(
                "outputs not produced: {}",
                missing
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            FailureReason::Interrupted => "interrupted".to_string(),
        };

        println!(
            "  {} {} failed ({})",
            "✗".red(),
            step.label().bold(),
            detail
        );

        if step.allow_failure && *reason != FailureReason::Interrupted {
            println!("    {}", "continuing anyway".yellow());
            return;
        }

        if !outcome.stderr.is_empty() {
            let stderr = outcome.stderr.trim_end();
            let shown = if options.verbose {
                stderr.to_string()
            } else {
                tail(stderr, 20)
            };
            eprintln!();
            eprintln!("{}", shown.dimmed());
        }

        eprintln!();
        match reason {
            FailureReason::Launch(_) => {
                eprint!("{}", RecoverySuggestion::install_tool(&outcome.program))
            }
            _ => eprint!("{}", RecoverySuggestion::resume_after_failure(&step.name)),
        }
    }

    fn print_plan(
        &self,
        registry: &StepRegistry,
        working_dir: &Path,
        options: &RunOptions,
        missing_prereqs: &[PathBuf],
    ) -> Result<(), AmpliflowError> {
        let entries = plan(registry, working_dir, &options.overrides)?;
        let to_run = entries.iter().filter(|p| p.decision == Decision::Run).count();

        println!();
        println!("{}: {}", "Pipeline".bold(), registry.pipeline().name);
        println!("{}", "═".repeat(50));
        println!(
            "Execution plan ({} of {} step{} to run):",
            to_run,
            entries.len(),
            if entries.len() == 1 { "" } else { "s" }
        );
        println!();

        for (i, entry) in entries.iter().enumerate() {
            match entry.decision {
                Decision::Skip => println!(
                    "  {}. {} {}",
                    i + 1,
                    entry.step.bold(),
                    "(skip)".dimmed()
                ),
                Decision::Run => {
                    println!("  {}. {} {}", i + 1, entry.step.bold(), "(run)".blue());
                    match entry.command {
                        Some(ref command) => println!("     {}", command.cyan()),
                        None => println!("     {}", "(parameters asked at run time)".dimmed()),
                    }
                }
            }
        }

        if !missing_prereqs.is_empty() {
            println!();
            println!("{}:", "Missing required inputs".yellow().bold());
            for path in missing_prereqs {
                println!("  {} {}", "⚠".yellow(), path.display());
            }
        }

        println!();
        Ok(())
    }
}

/// Last `lines` lines of `text`
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let skip = all.len().saturating_sub(lines);
    all[skip..].join("\n")
}
