// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Pipeline validation
//!
//! Validates the step table before any step runs.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::errors::AmpliflowError;
use crate::pipeline::{DagBuilder, Pipeline, Step};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline configuration
    pub fn validate(pipeline: &Pipeline) -> ValidationResult {
        let mut result = ValidationResult::new();

        if pipeline.steps.is_empty() {
            result.add_error("Pipeline has no steps defined");
        }

        if pipeline.shell.trim().is_empty() {
            result.add_error("Pipeline shell is empty");
        }

        let mut seen_names = HashSet::new();
        for step in &pipeline.steps {
            if !seen_names.insert(&step.name) {
                result.add_error(&format!("Duplicate step name: '{}'", step.name));
            }
        }

        let mut seen_params = HashSet::new();
        for param in &pipeline.parameters {
            if !seen_params.insert(&param.name) {
                result.add_error(&format!("Duplicate parameter name: '{}'", param.name));
            }
            if let Some(ref default) = param.default {
                if let Err(e) = param.check(default) {
                    result.add_error(&format!("Parameter '{}': default is invalid: {}", param.name, e));
                }
            }
        }

        // Validate DAG structure (unknown, out-of-order and cyclic dependencies)
        match DagBuilder::build(pipeline) {
            Ok(_) => {}
            Err(AmpliflowError::CircularDependency { steps }) => {
                result.add_error(&format!("Circular dependency: {}", steps.join(" → ")));
            }
            Err(e) => result.add_error(&e.to_string()),
        }

        let mut producers: HashMap<&Path, &str> = HashMap::new();
        for step in &pipeline.steps {
            for path in step.output_paths() {
                if let Some(other) = producers.insert(path, &step.name) {
                    result.add_error(&format!(
                        "Output '{}' is declared by both '{}' and '{}'",
                        path.display(),
                        other,
                        step.name
                    ));
                }
            }
        }

        for step in &pipeline.steps {
            Self::validate_step(step, pipeline, &mut result);
        }

        let used: HashSet<&str> = pipeline
            .steps
            .iter()
            .flat_map(|s| s.params.iter().map(String::as_str))
            .collect();
        for param in &pipeline.parameters {
            if !used.contains(param.name.as_str()) {
                result.add_warning(&format!("Parameter '{}' is not used by any step", param.name));
            }
        }

        result
    }

    /// Validate a single step
    fn validate_step(step: &Step, pipeline: &Pipeline, result: &mut ValidationResult) {
        if step.name.trim().is_empty() {
            result.add_error("A step has an empty name");
        }

        if step.command.trim().is_empty() {
            result.add_error(&format!("Step '{}': command is empty", step.name));
        }

        if step.outputs.is_empty() {
            result.add_error(&format!(
                "Step '{}': declares no outputs, so it could never be skipped",
                step.name
            ));
        }

        for output in &step.outputs {
            if output.path().is_absolute() {
                result.add_error(&format!(
                    "Step '{}': output '{}' must be relative to the working directory",
                    step.name,
                    output.path().display()
                ));
            }
        }

        for param in &step.params {
            if pipeline.parameter(param).is_none() {
                result.add_error(&format!(
                    "Step '{}': uses undeclared parameter '{}'",
                    step.name, param
                ));
            }
        }

        for placeholder in step.placeholders() {
            if !step.params.contains(&placeholder) {
                result.add_error(&format!(
                    "Step '{}': command references '{{{}}}' but the step does not list it under 'params'",
                    step.name, placeholder
                ));
            }
        }

        if step.allow_failure {
            for later in pipeline.steps.iter().skip_while(|s| s.name != step.name).skip(1) {
                let consumes = later.inputs.iter().any(|i| step.produces(i))
                    || later.depends_on.contains(&step.name);
                if consumes {
                    result.add_error(&format!(
                        "Step '{}': may fail without halting the pipeline, but '{}' consumes its outputs",
                        step.name, later.name
                    ));
                }
            }
        }

        if !step.depends_on.is_empty() && step.inputs.is_empty() {
            result.add_warning(&format!(
                "Step '{}': has dependencies but lists no inputs",
                step.name
            ));
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Pipeline {
        Pipeline::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_validate_empty_pipeline() {
        let pipeline = parse("name: empty\nsteps: []\n");

        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no steps"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let pipeline = parse(
            r#"
name: test
steps:
  - name: dup
    command: "touch a"
    outputs: [a]
  - name: dup
    command: "touch b"
    outputs: [b]
"#,
        );

        let result = PipelineValidator::validate(&pipeline);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_validate_step_without_outputs() {
        let pipeline = parse(
            r#"
name: test
steps:
  - name: noop
    command: "true"
    outputs: []
"#,
        );

        let result = PipelineValidator::validate(&pipeline);
        assert!(result.errors.iter().any(|e| e.contains("declares no outputs")));
    }

    #[test]
    fn test_validate_placeholder_without_param() {
        let pipeline = parse(
            r#"
name: test
parameters:
  - name: depth
    kind: integer
steps:
  - name: rarefy
    command: "rarefy --depth {depth}"
    outputs: [curve.qzv]
"#,
        );

        let result = PipelineValidator::validate(&pipeline);
        assert!(result.errors.iter().any(|e| e.contains("'{depth}'")));
        assert!(result.warnings.iter().any(|w| w.contains("not used")));
    }

    #[test]
    fn test_validate_undeclared_param_and_bad_default() {
        let pipeline = parse(
            r#"
name: test
parameters:
  - name: trunc
    kind: integer
    default: "two-fifty"
steps:
  - name: denoise
    command: "denoise {trunc} {depth}"
    params: [trunc, depth]
    outputs: [table.qza]
"#,
        );

        let result = PipelineValidator::validate(&pipeline);
        assert!(result.errors.iter().any(|e| e.contains("undeclared parameter 'depth'")));
        assert!(result.errors.iter().any(|e| e.contains("default is invalid")));
    }

    #[test]
    fn test_validate_allow_failure_consumed_later() {
        let pipeline = parse(
            r#"
name: test
steps:
  - name: summary
    command: "touch summ.qzv"
    outputs: [summ.qzv]
    allow_failure: true
  - name: report
    command: "cat summ.qzv > report.txt"
    inputs: [summ.qzv]
    outputs: [report.txt]
"#,
        );

        let result = PipelineValidator::validate(&pipeline);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("'report' consumes its outputs")));
    }

    #[test]
    fn test_validate_duplicate_output() {
        let pipeline = parse(
            r#"
name: test
steps:
  - name: a
    command: "touch x"
    outputs: [x]
  - name: b
    command: "touch x"
    outputs: [x]
"#,
        );

        let result = PipelineValidator::validate(&pipeline);
        assert!(result.errors.iter().any(|e| e.contains("declared by both")));
    }

    #[test]
    fn test_builtin_pipeline_is_valid() {
        let pipeline = Pipeline::builtin().unwrap();
        let result = PipelineValidator::validate(&pipeline);

        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_warnings(), "{:?}", result.warnings);
    }
}
