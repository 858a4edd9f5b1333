//! Build environment resolution (project root and options identifier).

use crate::error::{PruneError, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming the project root
pub const PROJECT_DIR_VAR: &str = "WM_PROJECT_DIR";
/// Environment variable naming the platform/options identifier
pub const OPTIONS_VAR: &str = "WM_OPTIONS";

/// Resolved build configuration, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    pub project_root: PathBuf,
    pub options: String,
}

impl BuildEnv {
    /// Build an environment from already-gathered values.
    ///
    /// The values normally come from command-line flags falling back to
    /// `WM_PROJECT_DIR` / `WM_OPTIONS`; either being absent or empty is an
    /// [`PruneError::Environment`].
    pub fn resolve(project_root: Option<&Path>, options: Option<&str>) -> Result<Self> {
        let project_root = match project_root {
            Some(root) if !root.as_os_str().is_empty() => root,
            _ => {
                return Err(PruneError::Environment(format!(
                    "project root is not set (use --project-dir or {})",
                    PROJECT_DIR_VAR
                )))
            }
        };

        let options = match options.map(str::trim) {
            Some(options) if !options.is_empty() => options,
            _ => {
                return Err(PruneError::Environment(format!(
                    "platform/options identifier is not set (use --options or {})",
                    OPTIONS_VAR
                )))
            }
        };

        if options.contains('/') {
            return Err(PruneError::Environment(format!(
                "options identifier must not contain '/': {}",
                options
            )));
        }

        // Object roots are composed from canonical paths, so the root must be too
        let project_root = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());

        tracing::debug!(
            project_root = %project_root.display(),
            options,
            "resolved build environment"
        );

        Ok(BuildEnv {
            project_root,
            options: options.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_complete() {
        let dir = tempdir().unwrap();
        let env = BuildEnv::resolve(Some(dir.path()), Some("linux64GccDPInt32Opt")).unwrap();
        assert_eq!(env.project_root, dir.path().canonicalize().unwrap());
        assert_eq!(env.options, "linux64GccDPInt32Opt");
    }

    #[test]
    fn test_resolve_missing_root() {
        let err = BuildEnv::resolve(None, Some("opts")).unwrap_err();
        assert!(matches!(err, PruneError::Environment(_)));
        assert!(err.to_string().contains(PROJECT_DIR_VAR));
    }

    #[test]
    fn test_resolve_missing_options() {
        let dir = tempdir().unwrap();
        let err = BuildEnv::resolve(Some(dir.path()), None).unwrap_err();
        assert!(matches!(err, PruneError::Environment(_)));

        let err = BuildEnv::resolve(Some(dir.path()), Some("  ")).unwrap_err();
        assert!(err.to_string().contains(OPTIONS_VAR));
    }

    #[test]
    fn test_resolve_rejects_nested_options() {
        let dir = tempdir().unwrap();
        let err = BuildEnv::resolve(Some(dir.path()), Some("a/b")).unwrap_err();
        assert!(matches!(err, PruneError::Environment(_)));
    }
}
