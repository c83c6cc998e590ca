// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for .ampliflow.yaml files. A pipeline is a declarative
//! table of steps; each step names the command it runs and the artifacts
//! whose presence marks it complete.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::errors::AmpliflowError;

/// Default pipeline file name, looked up in the working directory
pub const PIPELINE_FILE: &str = ".ampliflow.yaml";

/// The built-in 16S amplicon pipeline
const BUILTIN_PIPELINE: &str = include_str!("qiime2.yaml");

/// Parameter values bound for one run, keyed by parameter name
pub type ParameterValues = BTreeMap<String, String>;

/// Pipeline definition from .ampliflow.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Inputs that must exist before any step runs
    #[serde(default)]
    pub prerequisites: Vec<PathBuf>,

    /// Operator-tunable parameters
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,

    /// Environment variables for every command
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Shell used to run step commands
    #[serde(default = "default_shell")]
    pub shell: String,

    /// URL opened when the operator asks to view a visualization
    #[serde(default)]
    pub viewer: Option<String>,

    /// Steps in execution order
    pub steps: Vec<Step>,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_shell() -> String {
    "bash".to_string()
}

impl Pipeline {
    /// Load pipeline from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, AmpliflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AmpliflowError::PipelineNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                AmpliflowError::FileReadError {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                }
            }
        })?;

        Self::from_yaml(&content)
    }

    /// Parse pipeline from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, AmpliflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// The built-in amplicon analysis pipeline
    pub fn builtin() -> Result<Self, AmpliflowError> {
        Self::from_yaml(BUILTIN_PIPELINE)
    }

    /// Source text of the built-in pipeline, comments included
    pub fn builtin_source() -> &'static str {
        BUILTIN_PIPELINE
    }

    /// Get a step by name
    pub fn get_step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Get a parameter specification by name
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// A single pipeline step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step name (must be unique within pipeline)
    pub name: String,

    /// Human-readable label used in progress output
    #[serde(default)]
    pub description: Option<String>,

    /// Command template; `{param}` placeholders are replaced by bound values
    pub command: String,

    /// Artifacts whose presence marks this step complete
    pub outputs: Vec<Artifact>,

    /// Paths consumed by the command
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    /// Step dependencies (other step names)
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Names of pipeline parameters the command uses
    #[serde(default)]
    pub params: Vec<String>,

    /// Keep going when this step fails
    #[serde(default)]
    pub allow_failure: bool,

    /// Ask the operator to review results before the pipeline continues
    #[serde(default)]
    pub review: Option<String>,
}

impl Step {
    /// Label shown while the step runs
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    /// Paths of all declared outputs
    pub fn output_paths(&self) -> Vec<&Path> {
        self.outputs.iter().map(|o| o.path().as_path()).collect()
    }

    /// Declared visualization outputs
    pub fn visualizations(&self) -> impl Iterator<Item = &Artifact> {
        self.outputs
            .iter()
            .filter(|o| o.kind() == ArtifactKind::Visualization)
    }

    /// Whether the step declares `path` as one of its outputs
    pub fn produces(&self, path: &Path) -> bool {
        self.outputs.iter().any(|o| o.path() == path)
    }

    /// Placeholder names referenced by the command template
    pub fn placeholders(&self) -> Vec<String> {
        placeholder_regex()
            .captures_iter(&self.command)
            .filter(|caps| caps.get(1).map_or(true, |m| m.as_str().is_empty()))
            .map(|caps| caps[2].to_string())
            .collect()
    }

    /// Render the command with bound parameter values
    pub fn render_command(&self, values: &ParameterValues) -> Result<String, AmpliflowError> {
        let mut missing = None;

        let rendered = placeholder_regex().replace_all(&self.command, |caps: &regex::Captures| {
            // `${VAR}` belongs to the shell
            if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
                return caps[0].to_string();
            }

            match values.get(&caps[2]) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| caps[2].to_string());
                    caps[0].to_string()
                }
            }
        });

        match missing {
            Some(parameter) => Err(AmpliflowError::MissingParameter {
                step: self.name.clone(),
                parameter,
            }),
            None => Ok(rendered.into_owned()),
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"(\$?)\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder pattern")
    })
}

/// Output artifact of a step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Artifact {
    /// Plain path; a data artifact
    File(PathBuf),

    /// Path with an explicit kind
    Typed {
        /// Artifact path, relative to the working directory
        path: PathBuf,
        /// Artifact kind
        kind: ArtifactKind,
    },
}

impl Artifact {
    /// Get the artifact path
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::File(p) => p,
            Self::Typed { path, .. } => path,
        }
    }

    /// Get the artifact kind
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::File(_) => ArtifactKind::Data,
            Self::Typed { kind, .. } => *kind,
        }
    }
}

/// Artifact kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Primary data consumed by later steps
    #[default]
    Data,
    /// Something the operator may want to look at
    Visualization,
}

/// Operator-tunable parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name, used as `{name}` in commands
    pub name: String,

    /// Question shown to the operator
    #[serde(default)]
    pub prompt: Option<String>,

    /// Expected value shape
    #[serde(default)]
    pub kind: ParameterKind,

    /// Default value; parameters without one are always asked for
    #[serde(default)]
    pub default: Option<String>,
}

impl ParameterSpec {
    /// Question shown to the operator
    pub fn question(&self) -> String {
        self.prompt
            .clone()
            .unwrap_or_else(|| format!("Enter {}", self.name))
    }

    /// Check a value against the parameter's kind
    pub fn check(&self, value: &str) -> Result<(), AmpliflowError> {
        self.kind
            .check(value)
            .map_err(|reason| AmpliflowError::InvalidParameter {
                parameter: self.name.clone(),
                value: value.to_string(),
                reason,
            })
    }
}

/// Parameter value shapes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Whole number, possibly negative
    Integer,
    /// Nucleotide sequence in IUPAC notation
    Sequence,
    /// Anything non-empty
    #[default]
    Text,
}

impl ParameterKind {
    /// Syntactic check only; range checks are left to the external tool
    pub fn check(&self, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err("value is empty".into());
        }

        match self {
            Self::Integer => value
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| "expected a whole number".into()),
            Self::Sequence => {
                match value
                    .chars()
                    .find(|c| !"ACGTURYSWKMBDHVN".contains(c.to_ascii_uppercase()))
                {
                    Some(c) => Err(format!("'{}' is not an IUPAC nucleotide code", c)),
                    None => Ok(()),
                }
            }
            Self::Text => Ok(()),
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Sequence => write!(f, "sequence"),
            Self::Text => write!(f, "text"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_step(command: &str) -> Step {
        Step {
            name: "trim".into(),
            description: None,
            command: command.into(),
            outputs: vec![Artifact::File("trim-seqs.qza".into())],
            inputs: vec![],
            depends_on: vec![],
            params: vec![],
            allow_failure: false,
            review: None,
        }
    }

    #[test]
    fn test_parse_simple_pipeline() {
        let yaml = r#"
version: "1"
name: "test-pipeline"
prerequisites:
  - metadata.tsv
steps:
  - name: "import"
    command: "qiime tools import --output-path demux.qza"
    outputs:
      - demux.qza
  - name: "summarize"
    command: "qiime demux summarize --i-data demux.qza --o-visualization demux.qzv"
    inputs:
      - demux.qza
    outputs:
      - path: demux.qzv
        kind: visualization
    review: "Examine the quality plots"
"#;

        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        assert_eq!(pipeline.name, "test-pipeline");
        assert_eq!(pipeline.shell, "bash");
        assert_eq!(pipeline.steps.len(), 2);
        assert_eq!(pipeline.steps[0].outputs[0].kind(), ArtifactKind::Data);

        let summarize = pipeline.get_step("summarize").unwrap();
        assert_eq!(summarize.visualizations().count(), 1);
        assert!(summarize.produces(Path::new("demux.qzv")));
        assert_eq!(summarize.review.as_deref(), Some("Examine the quality plots"));
    }

    #[test]
    fn test_builtin_pipeline_parses() {
        let pipeline = Pipeline::builtin().unwrap();
        assert_eq!(pipeline.steps[0].name, "import");
        assert!(pipeline.get_step("core-metrics").is_some());
        assert!(pipeline.parameter("sampling_depth").unwrap().default.is_none());
        assert_eq!(
            pipeline.parameter("forward_primer").unwrap().default.as_deref(),
            Some("CCTACGGGNGGCWGCAG")
        );
    }

    #[test]
    fn test_builtin_leaf_exports_do_not_halt() {
        let pipeline = Pipeline::builtin().unwrap();

        for name in ["export-taxonomy", "export-tree", "export-shannon", "collapsed-table-tsv"] {
            assert!(pipeline.get_step(name).unwrap().allow_failure, "{}", name);
        }
        // consumed by the TSV conversion that follows
        assert!(!pipeline.get_step("export-feature-table").unwrap().allow_failure);
    }

    #[test]
    fn test_render_command_substitutes_parameters() {
        let step = make_step("qiime cutadapt trim-paired --p-front-f {forward} --p-front-r {reverse}");
        let mut values = ParameterValues::new();
        values.insert("forward".into(), "CCTACGGGNGGCWGCAG".into());
        values.insert("reverse".into(), "GACTACHVGGGTATCTAATCC".into());

        let rendered = step.render_command(&values).unwrap();
        assert_eq!(
            rendered,
            "qiime cutadapt trim-paired --p-front-f CCTACGGGNGGCWGCAG --p-front-r GACTACHVGGGTATCTAATCC"
        );
    }

    #[test]
    fn test_render_command_leaves_shell_variables() {
        let step = make_step("echo ${HOME} {depth}");
        let mut values = ParameterValues::new();
        values.insert("depth".into(), "1000".into());

        assert_eq!(step.render_command(&values).unwrap(), "echo ${HOME} 1000");
        assert_eq!(step.placeholders(), vec!["depth".to_string()]);
    }

    #[test]
    fn test_render_command_reports_unbound_parameter() {
        let step = make_step("qiime diversity alpha-rarefaction --p-max-depth {max_depth}");
        let result = step.render_command(&ParameterValues::new());

        assert!(matches!(
            result,
            Err(AmpliflowError::MissingParameter { ref parameter, .. }) if parameter == "max_depth"
        ));
    }

    #[test]
    fn test_parameter_kinds() {
        assert!(ParameterKind::Integer.check("250").is_ok());
        assert!(ParameterKind::Integer.check("-3").is_ok());
        assert!(ParameterKind::Integer.check("25O").is_err());
        assert!(ParameterKind::Integer.check("  ").is_err());

        assert!(ParameterKind::Sequence.check("CCTACGGGNGGCWGCAG").is_ok());
        assert!(ParameterKind::Sequence.check("acgt").is_ok());
        assert!(ParameterKind::Sequence.check("ACGTX").is_err());

        assert!(ParameterKind::Text.check("anything").is_ok());
        assert!(ParameterKind::Text.check("").is_err());
    }
}
