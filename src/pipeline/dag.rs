// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! DAG (Directed Acyclic Graph) builder for step dependencies
//!
//! Edges come from explicit `depends_on` entries and from inputs produced by
//! another step. Steps run in the order they are listed, so every edge must
//! point from an earlier step to a later one.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;

use crate::errors::AmpliflowError;
use crate::pipeline::Pipeline;

/// Builder for step dependency DAGs
#[derive(Debug, Clone)]
pub struct DagBuilder {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl DagBuilder {
    /// Create a new DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        }
    }

    /// Build a DAG from a pipeline
    pub fn build(pipeline: &Pipeline) -> Result<Self, AmpliflowError> {
        let mut builder = Self::new();

        // Add all steps as nodes
        for (idx, step) in pipeline.steps.iter().enumerate() {
            if builder.name_to_index.contains_key(&step.name) {
                return Err(AmpliflowError::InvalidStep {
                    step: step.name.clone(),
                    reason: "duplicate step name".into(),
                });
            }
            let node = builder.graph.add_node(idx);
            builder.name_to_index.insert(step.name.clone(), node);
            builder.index_to_name.insert(node, step.name.clone());
        }

        for (idx, step) in pipeline.steps.iter().enumerate() {
            let step_node = builder.name_to_index[&step.name];

            // Explicit dependencies from depends_on
            for dep_name in &step.depends_on {
                let dep_node = *builder.name_to_index.get(dep_name).ok_or_else(|| {
                    AmpliflowError::UnknownDependency {
                        step: step.name.clone(),
                        dependency: dep_name.clone(),
                    }
                })?;

                builder.add_dependency(dep_node, step_node);
            }

            // Implicit dependencies from consumed inputs
            for input in &step.inputs {
                let producer = pipeline
                    .steps
                    .iter()
                    .position(|s| s.name != step.name && s.produces(input));

                match producer {
                    Some(producer_idx) => {
                        if producer_idx > idx {
                            return Err(AmpliflowError::OutOfOrderDependency {
                                step: step.name.clone(),
                                dependency: pipeline.steps[producer_idx].name.clone(),
                            });
                        }
                        let dep_node = builder.name_to_index[&pipeline.steps[producer_idx].name];
                        builder.add_dependency(dep_node, step_node);
                    }
                    None if pipeline.prerequisites.contains(input) => {}
                    None => {
                        return Err(AmpliflowError::UnproducedInput {
                            step: step.name.clone(),
                            input: input.clone(),
                        });
                    }
                }
            }
        }

        // Validate no cycles
        builder.validate_acyclic()?;
        builder.validate_order(pipeline)?;

        Ok(builder)
    }

    fn add_dependency(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Validate that the graph is acyclic
    fn validate_acyclic(&self) -> Result<(), AmpliflowError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(AmpliflowError::CircularDependency {
                steps: self.find_cycle_members(cycle.node_id()),
            }),
        }
    }

    /// Every dependency must be listed before its dependent
    fn validate_order(&self, pipeline: &Pipeline) -> Result<(), AmpliflowError> {
        for edge in self.graph.raw_edges() {
            let (from, to) = (edge.source(), edge.target());
            if self.graph[from] > self.graph[to] {
                return Err(AmpliflowError::OutOfOrderDependency {
                    step: pipeline.steps[self.graph[to]].name.clone(),
                    dependency: pipeline.steps[self.graph[from]].name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Find the steps on a cycle through `start`
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        let mut members = vec![self.index_to_name[&start].clone()];
        let mut current = start;

        // Follow outgoing edges that can lead back to the start
        while let Some(next) = self
            .graph
            .neighbors_directed(current, petgraph::Direction::Outgoing)
            .find(|&n| n == start || petgraph::algo::has_path_connecting(&self.graph, n, start, None))
        {
            members.push(self.index_to_name[&next].clone());
            if next == start || members.len() > self.graph.node_count() {
                break;
            }
            current = next;
        }

        members
    }

    /// Get dependencies for a step (steps that must run before it)
    pub fn dependencies(&self, step_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(step_name)?;
        let mut deps: Vec<(usize, String)> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|n| (self.graph[n], self.index_to_name[&n].clone()))
            .collect();
        deps.sort();
        Some(deps.into_iter().map(|(_, name)| name).collect())
    }

    /// Steps that depend on `step_name`, directly or transitively, in pipeline order
    pub fn downstream(&self, step_name: &str) -> Option<Vec<usize>> {
        let node = *self.name_to_index.get(step_name)?;
        let mut dfs = Dfs::new(&self.graph, node);
        let mut reached = Vec::new();

        while let Some(n) = dfs.next(&self.graph) {
            if n != node {
                reached.push(self.graph[n]);
            }
        }

        reached.sort_unstable();
        Some(reached)
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self, pipeline: &Pipeline) -> String {
        let mut out = String::from("graph TD\n");

        for step in &pipeline.steps {
            out.push_str(&format!("    {}[\"{}\"]\n", mermaid_id(&step.name), step.label()));
        }

        for (from, to) in self.edges() {
            out.push_str(&format!("    {} --> {}\n", mermaid_id(from), mermaid_id(to)));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self, pipeline: &Pipeline) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for step in &pipeline.steps {
            out.push_str(&format!("    \"{}\" [label=\"{}\"];\n", step.name, step.label()));
        }

        for (from, to) in self.edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self, pipeline: &Pipeline) -> String {
        let mut out = String::new();

        for (i, step) in pipeline.steps.iter().enumerate() {
            let deps = self.dependencies(&step.name).unwrap_or_default();

            out.push_str(&format!("{}. {}", i + 1, step.name));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        out
    }

    /// Edges as (from, to) names, in pipeline order
    fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<_> = self
            .graph
            .raw_edges()
            .iter()
            .map(|e| (self.graph[e.source()], self.graph[e.target()], e))
            .collect();
        edges.sort_by_key(|(from, to, _)| (*to, *from));

        edges
            .into_iter()
            .map(|(_, _, e)| {
                (
                    self.index_to_name[&e.source()].as_str(),
                    self.index_to_name[&e.target()].as_str(),
                )
            })
            .collect()
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn mermaid_id(name: &str) -> String {
    name.replace(|c: char| !c.is_ascii_alphanumeric(), "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Artifact, Step};

    fn make_step(name: &str, deps: Vec<&str>, inputs: Vec<&str>, outputs: Vec<&str>) -> Step {
        Step {
            name: name.into(),
            description: None,
            command: format!("run-{}", name),
            outputs: outputs
                .into_iter()
                .map(|o| Artifact::File(o.into()))
                .collect(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            depends_on: deps.into_iter().map(String::from).collect(),
            params: vec![],
            allow_failure: false,
            review: None,
        }
    }

    fn make_test_pipeline(steps: Vec<Step>) -> Pipeline {
        Pipeline {
            version: "1".into(),
            name: "test".into(),
            description: None,
            prerequisites: vec!["reads".into()],
            parameters: vec![],
            env: std::collections::HashMap::new(),
            shell: "bash".into(),
            viewer: None,
            steps,
        }
    }

    #[test]
    fn test_linear_dag_from_inputs() {
        let pipeline = make_test_pipeline(vec![
            make_step("import", vec![], vec!["reads"], vec!["table.dat"]),
            make_step("denoise", vec![], vec!["table.dat"], vec!["result.dat"]),
            make_step("export", vec![], vec!["result.dat"], vec!["export.tsv"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        assert_eq!(dag.dependencies("denoise").unwrap(), vec!["import"]);
        assert_eq!(dag.downstream("import").unwrap(), vec![1, 2]);
        assert!(dag.downstream("export").unwrap().is_empty());
    }

    #[test]
    fn test_downstream_is_transitive() {
        let pipeline = make_test_pipeline(vec![
            make_step("a", vec![], vec![], vec!["a.dat"]),
            make_step("b", vec![], vec!["a.dat"], vec!["b.dat"]),
            make_step("c", vec![], vec![], vec!["c.dat"]),
            make_step("d", vec![], vec!["b.dat"], vec!["d.dat"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();
        assert_eq!(dag.downstream("a").unwrap(), vec![1, 3]);
        assert_eq!(dag.downstream("c").unwrap(), Vec::<usize>::new());
        assert!(dag.downstream("missing").is_none());
    }

    #[test]
    fn test_unknown_dependency() {
        let pipeline = make_test_pipeline(vec![make_step("a", vec!["nonexistent"], vec![], vec!["a.dat"])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(result, Err(AmpliflowError::UnknownDependency { .. })));
    }

    #[test]
    fn test_unproduced_input() {
        let pipeline = make_test_pipeline(vec![make_step("a", vec![], vec!["nowhere.dat"], vec!["a.dat"])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(result, Err(AmpliflowError::UnproducedInput { .. })));
    }

    #[test]
    fn test_input_produced_by_later_step() {
        let pipeline = make_test_pipeline(vec![
            make_step("a", vec![], vec!["b.dat"], vec!["a.dat"]),
            make_step("b", vec![], vec![], vec!["b.dat"]),
        ]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(
            result,
            Err(AmpliflowError::OutOfOrderDependency { ref step, ref dependency })
                if step == "a" && dependency == "b"
        ));
    }

    #[test]
    fn test_explicit_dependency_on_later_step() {
        let pipeline = make_test_pipeline(vec![
            make_step("a", vec!["b"], vec![], vec!["a.dat"]),
            make_step("b", vec![], vec![], vec!["b.dat"]),
        ]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(result, Err(AmpliflowError::OutOfOrderDependency { .. })));
    }

    #[test]
    fn test_circular_dependency_detection() {
        let pipeline = make_test_pipeline(vec![
            make_step("a", vec!["b"], vec![], vec!["a.dat"]),
            make_step("b", vec!["a"], vec![], vec!["b.dat"]),
        ]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(result, Err(AmpliflowError::CircularDependency { .. })));
    }

    #[test]
    fn test_mermaid_and_dot_output() {
        let pipeline = make_test_pipeline(vec![
            make_step("import", vec![], vec![], vec!["a.dat"]),
            make_step("denoise-paired", vec!["import"], vec![], vec!["b.dat"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        let mermaid = dag.to_mermaid(&pipeline);
        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("import --> denoise_paired"));

        let dot = dag.to_dot(&pipeline);
        assert!(dot.contains("\"import\" -> \"denoise-paired\";"));

        let text = dag.to_text(&pipeline);
        assert_eq!(text, "1. import\n2. denoise-paired [depends: import]\n");
    }
}
