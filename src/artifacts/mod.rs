// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ampliflow contributors

//! Artifact presence checks
//!
//! The working directory is the checkpoint store: a step is done exactly
//! when every artifact it declares exists. Only existence is checked, so an
//! empty file counts as present.

use std::path::{Path, PathBuf};

use crate::errors::AmpliflowError;

/// Answers presence questions relative to one working directory
#[derive(Debug, Clone)]
pub struct ArtifactChecker {
    working_dir: PathBuf,
}

impl ArtifactChecker {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Whether a single artifact exists
    ///
    /// An I/O error while checking is returned as an error instead of being
    /// read as "missing"; treating it as missing would re-run finished work.
    pub fn exists(&self, artifact: &Path) -> Result<bool, AmpliflowError> {
        let path = self.working_dir.join(artifact);
        path.try_exists()
            .map_err(|e| AmpliflowError::artifact_check(&path, e))
    }

    /// Whether every artifact exists
    pub fn all_present<P: AsRef<Path>>(&self, artifacts: &[P]) -> Result<bool, AmpliflowError> {
        for artifact in artifacts {
            if !self.exists(artifact.as_ref())? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Artifacts that do not exist, in declaration order
    pub fn missing<P: AsRef<Path>>(&self, artifacts: &[P]) -> Result<Vec<PathBuf>, AmpliflowError> {
        let mut missing = Vec::new();
        for artifact in artifacts {
            let artifact = artifact.as_ref();
            if !self.exists(artifact)? {
                missing.push(artifact.to_path_buf());
            }
        }
        Ok(missing)
    }
}

/// Delete artifacts so their steps run again
///
/// Returns the paths that were actually removed. Directories are left alone;
/// only declared files are deleted.
pub fn remove_artifacts<P: AsRef<Path>>(
    working_dir: &Path,
    artifacts: &[P],
) -> Result<Vec<PathBuf>, AmpliflowError> {
    let mut removed = Vec::new();

    for artifact in artifacts {
        let artifact = artifact.as_ref();
        let path = working_dir.join(artifact);

        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed artifact");
                removed.push(artifact.to_path_buf());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AmpliflowError::FileWriteError {
                    path,
                    error: e.to_string(),
                })
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_present_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("table.dat"), "data").unwrap();
        let checker = ArtifactChecker::new(dir.path());

        assert!(checker.all_present(&["table.dat"]).unwrap());
        assert!(!checker.all_present(&["table.dat", "result.dat"]).unwrap());
        assert_eq!(
            checker.missing(&["table.dat", "result.dat"]).unwrap(),
            vec![PathBuf::from("result.dat")]
        );
    }

    #[test]
    fn test_empty_file_counts_as_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.qza"), "").unwrap();
        let checker = ArtifactChecker::new(dir.path());

        assert!(checker.all_present(&["empty.qza"]).unwrap());
    }

    #[test]
    fn test_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("metrics")).unwrap();
        std::fs::write(dir.path().join("metrics/shannon_vector.qza"), "").unwrap();
        let checker = ArtifactChecker::new(dir.path());

        let missing = checker
            .missing(&["metrics/shannon_vector.qza", "metrics/evenness_vector.qza"])
            .unwrap();
        assert_eq!(missing, vec![PathBuf::from("metrics/evenness_vector.qza")]);
    }

    #[test]
    fn test_empty_artifact_set_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let checker = ArtifactChecker::new(dir.path());
        let none: [&str; 0] = [];

        assert!(checker.all_present(&none).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_error_is_not_missing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("table.dat"), "").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let checker = ArtifactChecker::new(dir.path());
        let result = checker.exists(Path::new("locked/table.dat"));

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        // root can read anything, in which case the file is simply present
        match result {
            Ok(present) => assert!(present),
            Err(e) => assert!(matches!(e, AmpliflowError::ArtifactCheck { .. })),
        }
    }

    #[test]
    fn test_remove_artifacts_skips_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.qza"), "").unwrap();

        let removed = remove_artifacts(dir.path(), &["a.qza", "b.qza"]).unwrap();

        assert_eq!(removed, vec![PathBuf::from("a.qza")]);
        assert!(!dir.path().join("a.qza").exists());
    }
}
