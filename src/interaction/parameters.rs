// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Parameter collection
//!
//! Binds values for a step's parameters right before the step runs. Values
//! already bound (from `--param` or an earlier step in the same run) are
//! never asked for again.

use colored::Colorize;
use std::sync::Arc;

use super::Prompter;
use crate::errors::AmpliflowError;
use crate::pipeline::{ParameterSpec, ParameterValues, Pipeline, Step};

/// Collects and validates parameter values
pub struct ParameterPrompt {
    prompter: Arc<dyn Prompter>,
}

impl ParameterPrompt {
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self { prompter }
    }

    /// Bind every parameter of `step` into `values`
    pub async fn resolve(
        &self,
        step: &Step,
        specs: &[&ParameterSpec],
        values: &mut ParameterValues,
    ) -> Result<(), AmpliflowError> {
        let unbound: Vec<&ParameterSpec> = specs
            .iter()
            .copied()
            .filter(|spec| !values.contains_key(&spec.name))
            .collect();

        if unbound.is_empty() {
            return Ok(());
        }

        let interactive = self.prompter.is_interactive();
        let defaulted: Vec<&ParameterSpec> = unbound
            .iter()
            .copied()
            .filter(|spec| spec.default.is_some())
            .collect();

        let customize = if interactive && !defaulted.is_empty() {
            println!();
            println!("{} for {}:", "Default parameters".bold(), step.label());
            for spec in &defaulted {
                println!(
                    "  {} = {}",
                    spec.name,
                    spec.default.as_deref().unwrap_or_default().cyan()
                );
            }
            self.prompter
                .prompt_yes_no("Would you like to customize these parameters?")
                .await?
        } else {
            false
        };

        for spec in unbound {
            let value = match (&spec.default, interactive) {
                (Some(default), _) if !customize => default.clone(),
                (_, true) => self.ask(spec).await?,
                (None, false) => {
                    return Err(AmpliflowError::MissingParameter {
                        step: step.name.clone(),
                        parameter: spec.name.clone(),
                    })
                }
                (Some(default), false) => default.clone(),
            };

            tracing::debug!(step = %step.name, parameter = %spec.name, %value, "bound parameter");
            values.insert(spec.name.clone(), value);
        }

        Ok(())
    }

    /// Ask until the answer passes the parameter's check
    async fn ask(&self, spec: &ParameterSpec) -> Result<String, AmpliflowError> {
        let question = spec.question();
        loop {
            let answer = self
                .prompter
                .prompt_text(&question, spec.default.as_deref())
                .await?;
            let answer = answer.trim().to_string();

            match spec.check(&answer) {
                Ok(()) => return Ok(answer),
                Err(e) => println!("  {} {}", "✗".red(), e),
            }
        }
    }
}

/// Parse `name=value` overrides and check them against the pipeline
pub fn parse_overrides(
    pipeline: &Pipeline,
    raw: &[String],
) -> Result<ParameterValues, AmpliflowError> {
    let mut values = ParameterValues::new();

    for item in raw {
        let Some((name, value)) = item.split_once('=') else {
            return Err(AmpliflowError::InvalidParameter {
                parameter: item.clone(),
                value: String::new(),
                reason: "expected NAME=VALUE".into(),
            });
        };
        let (name, value) = (name.trim(), value.trim());

        let spec = pipeline
            .parameter(name)
            .ok_or_else(|| AmpliflowError::InvalidParameter {
                parameter: name.to_string(),
                value: value.to_string(),
                reason: "the pipeline declares no such parameter".into(),
            })?;
        spec.check(value)?;

        values.insert(name.to_string(), value.to_string());
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::prompts::tests::MockPrompter;
    use crate::interaction::AutoPrompter;
    use crate::pipeline::ParameterKind;

    fn spec(name: &str, kind: ParameterKind, default: Option<&str>) -> ParameterSpec {
        ParameterSpec {
            name: name.into(),
            prompt: None,
            kind,
            default: default.map(String::from),
        }
    }

    fn step(params: &[&str]) -> Step {
        Step {
            name: "denoise".into(),
            description: Some("DADA2 denoising".into()),
            command: "qiime dada2 denoise-paired".into(),
            outputs: vec![],
            inputs: vec![],
            depends_on: vec![],
            params: params.iter().map(|s| s.to_string()).collect(),
            allow_failure: false,
            review: None,
        }
    }

    #[tokio::test]
    async fn test_declining_customization_binds_defaults() {
        let prompter = Arc::new(MockPrompter::new(vec!["n"]));
        let prompt = ParameterPrompt::new(prompter.clone());
        let trim = spec("trim_left_f", ParameterKind::Integer, Some("0"));
        let trunc = spec("trunc_len_f", ParameterKind::Integer, Some("250"));

        let mut values = ParameterValues::new();
        prompt
            .resolve(&step(&["trim_left_f", "trunc_len_f"]), &[&trim, &trunc], &mut values)
            .await
            .unwrap();

        assert_eq!(values["trim_left_f"], "0");
        assert_eq!(values["trunc_len_f"], "250");
        assert_eq!(prompter.asked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_customizing_asks_each_and_keeps_blank_as_default() {
        let prompter = Arc::new(MockPrompter::new(vec!["yes", "", "240"]));
        let prompt = ParameterPrompt::new(prompter.clone());
        let trim = spec("trim_left_f", ParameterKind::Integer, Some("0"));
        let trunc = spec("trunc_len_f", ParameterKind::Integer, Some("250"));

        let mut values = ParameterValues::new();
        prompt
            .resolve(&step(&["trim_left_f", "trunc_len_f"]), &[&trim, &trunc], &mut values)
            .await
            .unwrap();

        assert_eq!(values["trim_left_f"], "0");
        assert_eq!(values["trunc_len_f"], "240");
    }

    #[tokio::test]
    async fn test_invalid_answer_is_asked_again() {
        let prompter = Arc::new(MockPrompter::new(vec!["deep", "-", "10000"]));
        let prompt = ParameterPrompt::new(prompter.clone());
        let depth = spec("sampling_depth", ParameterKind::Integer, None);

        let mut values = ParameterValues::new();
        prompt
            .resolve(&step(&["sampling_depth"]), &[&depth], &mut values)
            .await
            .unwrap();

        assert_eq!(values["sampling_depth"], "10000");
        assert_eq!(prompter.asked.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_bound_values_are_not_asked_again() {
        let prompter = Arc::new(MockPrompter::new(vec![]));
        let prompt = ParameterPrompt::new(prompter.clone());
        let depth = spec("sampling_depth", ParameterKind::Integer, None);

        let mut values = ParameterValues::new();
        values.insert("sampling_depth".into(), "8000".into());
        prompt
            .resolve(&step(&["sampling_depth"]), &[&depth], &mut values)
            .await
            .unwrap();

        assert_eq!(values["sampling_depth"], "8000");
        assert!(prompter.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_interactive_missing_value_is_configuration_error() {
        let prompt = ParameterPrompt::new(Arc::new(AutoPrompter));
        let primer = spec("forward_primer", ParameterKind::Sequence, None);
        let trim = spec("trim_left_f", ParameterKind::Integer, Some("0"));

        let mut values = ParameterValues::new();
        let err = prompt
            .resolve(&step(&["trim_left_f", "forward_primer"]), &[&trim, &primer], &mut values)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AmpliflowError::MissingParameter { ref parameter, .. } if parameter == "forward_primer"
        ));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_parse_overrides() {
        let pipeline = Pipeline::builtin().unwrap();

        let values = parse_overrides(
            &pipeline,
            &["sampling_depth=10000".into(), "forward_primer = GTGYCAGCMGCCGCGGTAA".into()],
        )
        .unwrap();
        assert_eq!(values["sampling_depth"], "10000");
        assert_eq!(values["forward_primer"], "GTGYCAGCMGCCGCGGTAA");

        assert!(parse_overrides(&pipeline, &["no_such=1".into()]).is_err());
        assert!(parse_overrides(&pipeline, &["sampling_depth".into()]).is_err());
        assert!(parse_overrides(&pipeline, &["forward_primer=GTXX".into()]).is_err());
    }
}
