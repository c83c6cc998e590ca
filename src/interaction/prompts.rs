// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Operator prompts

use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, BufRead, Write};

use crate::errors::AmpliflowError;

/// Trait for asking the operator questions
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question; an empty answer means no
    async fn prompt_yes_no(&self, message: &str) -> Result<bool, AmpliflowError>;

    /// Ask for text; an empty answer selects the default when there is one
    async fn prompt_text(
        &self,
        message: &str,
        default: Option<&str>,
    ) -> Result<String, AmpliflowError>;

    /// Wait until the operator presses Enter
    async fn pause(&self, message: &str) -> Result<(), AmpliflowError>;

    /// Whether a person is answering
    fn is_interactive(&self) -> bool;
}

/// Prompts on the controlling terminal
pub struct TerminalPrompter;

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }

    fn read_line() -> Result<String, AmpliflowError> {
        let mut input = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(|e| AmpliflowError::Prompt {
                message: e.to_string(),
            })?;

        if read == 0 {
            return Err(AmpliflowError::Prompt {
                message: "standard input was closed".into(),
            });
        }

        Ok(input.trim().to_string())
    }

    fn flush() -> Result<(), AmpliflowError> {
        io::stdout().flush().map_err(|e| AmpliflowError::Prompt {
            message: e.to_string(),
        })
    }
}

/// Interpret a yes/no answer
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn prompt_yes_no(&self, message: &str) -> Result<bool, AmpliflowError> {
        print!("{} {} [y/N]: ", "?".cyan().bold(), message);
        Self::flush()?;

        Ok(is_yes(&Self::read_line()?))
    }

    async fn prompt_text(
        &self,
        message: &str,
        default: Option<&str>,
    ) -> Result<String, AmpliflowError> {
        match default {
            Some(default_value) => print!("{} {} [{}]: ", "?".cyan().bold(), message, default_value),
            None => print!("{} {}: ", "?".cyan().bold(), message),
        }
        Self::flush()?;

        let input = Self::read_line()?;
        match default {
            Some(def) if input.is_empty() => Ok(def.to_string()),
            _ => Ok(input),
        }
    }

    async fn pause(&self, message: &str) -> Result<(), AmpliflowError> {
        print!("{} {} ", "⏸".yellow(), message);
        Self::flush()?;
        Self::read_line().map(|_| ())
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

/// Answers every question without a terminal
///
/// Declines optional actions, takes defaults, and never waits.
pub struct AutoPrompter;

#[async_trait]
impl Prompter for AutoPrompter {
    async fn prompt_yes_no(&self, message: &str) -> Result<bool, AmpliflowError> {
        tracing::debug!(question = message, "answered no");
        Ok(false)
    }

    async fn prompt_text(
        &self,
        message: &str,
        default: Option<&str>,
    ) -> Result<String, AmpliflowError> {
        default
            .map(str::to_string)
            .ok_or_else(|| AmpliflowError::Prompt {
                message: format!("'{}' needs an answer and no terminal is attached", message),
            })
    }

    async fn pause(&self, _message: &str) -> Result<(), AmpliflowError> {
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        false
    }
}
