// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Step registry
//!
//! A validated, immutable view of a pipeline's steps in execution order.

use std::path::Path;

use crate::errors::AmpliflowError;
use crate::pipeline::{DagBuilder, ParameterSpec, Pipeline, PipelineValidator, Step, ValidationResult};

/// Validated step table
#[derive(Debug, Clone)]
pub struct StepRegistry {
    pipeline: Pipeline,
    dag: DagBuilder,
    warnings: Vec<String>,
}

impl StepRegistry {
    /// Validate a pipeline and build its registry
    ///
    /// Fails with a configuration error when the table is inconsistent, so
    /// nothing runs against a broken pipeline.
    pub fn build(pipeline: Pipeline) -> Result<Self, AmpliflowError> {
        let dag = DagBuilder::build(&pipeline)?;

        let ValidationResult { errors, warnings } = PipelineValidator::validate(&pipeline);
        if !errors.is_empty() {
            let help = (errors.len() > 1).then(|| {
                format!(
                    "{} more problem(s): {}",
                    errors.len() - 1,
                    errors[1..].join("; ")
                )
            });
            return Err(AmpliflowError::InvalidPipeline {
                reason: errors[0].clone(),
                help,
            });
        }

        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        Ok(Self {
            pipeline,
            dag,
            warnings,
        })
    }

    /// The underlying pipeline definition
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Dependency graph
    pub fn dag(&self) -> &DagBuilder {
        &self.dag
    }

    /// Non-fatal findings from validation
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Steps in the order they run
    pub fn steps_in_order(&self) -> &[Step] {
        &self.pipeline.steps
    }

    /// Look up a step by name
    pub fn get(&self, name: &str) -> Result<&Step, AmpliflowError> {
        self.pipeline
            .get_step(name)
            .ok_or_else(|| AmpliflowError::StepNotFound {
                step: name.to_string(),
            })
    }

    /// The step that declares `path` as an output
    pub fn producer_of(&self, path: &Path) -> Option<&Step> {
        self.pipeline.steps.iter().find(|s| s.produces(path))
    }

    /// The step itself followed by every step that depends on it
    pub fn downstream_of(&self, name: &str) -> Result<Vec<&Step>, AmpliflowError> {
        let step = self.get(name)?;
        let mut steps = vec![step];

        if let Some(indices) = self.dag.downstream(name) {
            steps.extend(indices.into_iter().map(|idx| &self.pipeline.steps[idx]));
        }

        Ok(steps)
    }

    /// Parameter specifications used by a step
    pub fn parameters_for(&self, step: &Step) -> Vec<&ParameterSpec> {
        step.params
            .iter()
            .filter_map(|name| self.pipeline.parameter(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = r#"
name: chain
prerequisites: [reads]
steps:
  - name: import
    command: "touch table.dat"
    inputs: [reads]
    outputs: [table.dat]
  - name: denoise
    command: "touch result.dat"
    inputs: [table.dat]
    outputs: [result.dat]
  - name: export
    command: "touch export.tsv"
    inputs: [result.dat]
    outputs: [export.tsv]
"#;

    #[test]
    fn test_build_keeps_declared_order() {
        let registry = StepRegistry::build(Pipeline::from_yaml(CHAIN).unwrap()).unwrap();
        let names: Vec<_> = registry.steps_in_order().iter().map(|s| s.name.as_str()).collect();

        assert_eq!(names, vec!["import", "denoise", "export"]);
    }

    #[test]
    fn test_producer_and_downstream() {
        let registry = StepRegistry::build(Pipeline::from_yaml(CHAIN).unwrap()).unwrap();

        assert_eq!(registry.producer_of(Path::new("result.dat")).unwrap().name, "denoise");
        assert!(registry.producer_of(Path::new("reads")).is_none());

        let downstream: Vec<_> = registry
            .downstream_of("denoise")
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(downstream, vec!["denoise", "export"]);

        assert!(matches!(
            registry.downstream_of("nope"),
            Err(AmpliflowError::StepNotFound { .. })
        ));
    }

    #[test]
    fn test_build_rejects_inconsistent_table() {
        let yaml = r#"
name: broken
steps:
  - name: denoise
    command: "touch result.dat"
    inputs: [table.dat]
    outputs: [result.dat]
"#;

        let err = StepRegistry::build(Pipeline::from_yaml(yaml).unwrap()).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, AmpliflowError::UnproducedInput { .. }));
    }

    #[test]
    fn test_build_reports_all_validation_errors() {
        let yaml = r#"
name: broken
steps:
  - name: a
    command: ""
    outputs: []
"#;

        let err = StepRegistry::build(Pipeline::from_yaml(yaml).unwrap()).unwrap_err();
        match err {
            AmpliflowError::InvalidPipeline { reason, help } => {
                assert!(reason.contains("command is empty"));
                assert!(help.unwrap().contains("declares no outputs"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
