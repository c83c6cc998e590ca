// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Visualization presenter

use colored::Colorize;
use std::path::Path;
use std::process::Stdio;

use crate::errors::AmpliflowError;

/// Shows a visualization artifact to the operator
pub trait Presenter: Send + Sync {
    /// Present the artifact at `path`
    fn open(&self, path: &Path) -> Result<(), AmpliflowError>;
}

/// Opens a viewer in the desktop browser
///
/// With a viewer URL configured, the URL is opened and the operator is told
/// to drop the file onto it. Without one, the file itself is handed to the
/// platform opener.
pub struct BrowserPresenter {
    viewer: Option<String>,
}

impl BrowserPresenter {
    pub fn new(viewer: Option<String>) -> Self {
        Self { viewer }
    }

    fn opener() -> Option<std::path::PathBuf> {
        ["xdg-open", "open"]
            .iter()
            .find_map(|name| which::which(name).ok())
    }
}

impl Presenter for BrowserPresenter {
    fn open(&self, path: &Path) -> Result<(), AmpliflowError> {
        let absolute = std::fs::canonicalize(path).map_err(|e| AmpliflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let target = match &self.viewer {
            Some(url) => url.clone(),
            None => absolute.display().to_string(),
        };

        match Self::opener() {
            Some(opener) => {
                tracing::debug!(opener = %opener.display(), %target, "opening viewer");
                let spawned = std::process::Command::new(&opener)
                    .arg(&target)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn();
                if let Err(e) = spawned {
                    tracing::warn!("Could not launch {}: {}", opener.display(), e);
                }
            }
            None => tracing::warn!("No browser opener found on PATH; open {} manually", target),
        }

        if self.viewer.is_some() {
            println!("  {} To view {}:", "→".blue(), path.display());
            println!("    1. Drag and drop {} onto the page that just opened", absolute.display().to_string().cyan());
            println!("    2. Or use the page's 'Choose File' button");
        } else {
            println!("  {} Opened {}", "→".blue(), absolute.display().to_string().cyan());
        }

        Ok(())
    }
}
