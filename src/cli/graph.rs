// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Graph command - visualize pipeline as a graph

use miette::Result;
use std::path::{Path, PathBuf};

use super::GraphFormat;

/// Run the graph command
pub async fn run(
    working_dir: &Path,
    pipeline_path: Option<PathBuf>,
    format: GraphFormat,
    _verbose: bool,
) -> Result<()> {
    let registry = super::load_registry(working_dir, pipeline_path)?;
    let (dag, pipeline) = (registry.dag(), registry.pipeline());

    let output = match format {
        GraphFormat::Text => dag.to_text(pipeline),
        GraphFormat::Dot => dag.to_dot(pipeline),
        GraphFormat::Mermaid => dag.to_mermaid(pipeline),
    };

    println!("{}", output.trim_end());

    Ok(())
}
