// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from a halted run.

use std::path::PathBuf;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest installing a missing tool
    pub fn install_tool(tool: &str) -> Self {
        match tool {
            "qiime" => Self {
                action: "Activate the QIIME 2 environment".into(),
                steps: vec![
                    "The 'qiime' command was not found on PATH".into(),
                    "QIIME 2 is usually installed into its own conda environment".into(),
                ],
                commands: vec![
                    "# List environments:".into(),
                    "conda env list".into(),
                    "".into(),
                    "# Activate the QIIME 2 environment:".into(),
                    "conda activate qiime2-amplicon-2025.4".into(),
                ],
            },
            "biom" => Self {
                action: "Install biom-format".into(),
                steps: vec!["The 'biom' command converts exported tables to TSV".into()],
                commands: vec!["pip install biom-format".into()],
            },
            _ => Self {
                action: format!("Install {} and ensure it's in your PATH", tool),
                steps: vec![],
                commands: vec![],
            },
        }
    }

    /// Suggest resuming after a failed step
    pub fn resume_after_failure(step: &str) -> Self {
        Self {
            action: format!("Fix step '{}' and run the pipeline again", step),
            steps: vec![
                "Steps whose outputs already exist are skipped on the next run".into(),
                format!("Only '{}' and the steps after it will execute", step),
            ],
            commands: vec![
                "# See which steps are complete:".into(),
                "ampliflow status".into(),
                "".into(),
                "# Resume:".into(),
                "ampliflow run".into(),
            ],
        }
    }

    /// Suggest supplying missing prerequisite inputs
    pub fn add_prerequisites(paths: &[PathBuf]) -> Self {
        Self {
            action: "Add the missing input files".into(),
            steps: paths
                .iter()
                .map(|p| format!("Expected in the working directory: {}", p.display()))
                .collect(),
            commands: vec![],
        }
    }

    /// Suggest fixing a circular dependency
    pub fn fix_circular_dependency(steps: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", steps.join(" → ")),
                "Review your step dependencies".into(),
            ],
            commands: vec![
                "# Visualize your pipeline:".into(),
                "ampliflow graph --format mermaid".into(),
            ],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_resume_suggestion() {
        let text = RecoverySuggestion::resume_after_failure("denoise").to_string();
        assert!(text.starts_with("→ Fix step 'denoise'"));
        assert!(text.contains("ampliflow run"));
    }

    #[test]
    fn test_unknown_tool_suggestion() {
        let suggestion = RecoverySuggestion::install_tool("mafft");
        assert_eq!(suggestion.action, "Install mafft and ensure it's in your PATH");
        assert!(suggestion.commands.is_empty());
    }
}
