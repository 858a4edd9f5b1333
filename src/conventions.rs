//! Object-directory naming conventions loaded from conventions.toml.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

// Embed the TOML file directly in the binary at compile time
const CONVENTIONS_TOML: &str = include_str!("../conventions.toml");

/// Naming scheme the build system uses for dependency files and object directories
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Conventions {
    /// Suffix appended to a source file name to form its dependency file name
    pub artifact_suffix: String,
    /// Directory under the project root holding one tree per options identifier
    pub platforms_dir: String,
    /// Directory holding per-options object trees for code outside the project root
    pub local_objects_dir: String,
    /// Top-level project trees searched for dangling source links
    pub tracked_trees: Vec<String>,
    /// Extensions (without the dot) of files treated as build inputs
    pub tracked_extensions: Vec<String>,
}

/// Partial conventions read from a user file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConventionsOverride {
    artifact_suffix: Option<String>,
    platforms_dir: Option<String>,
    local_objects_dir: Option<String>,
    tracked_trees: Option<Vec<String>>,
    tracked_extensions: Option<Vec<String>>,
}

impl Conventions {
    /// Parse the conventions embedded in the binary
    pub fn builtin() -> Result<Self> {
        let conventions: Conventions = toml::from_str(CONVENTIONS_TOML)
            .context("Failed to parse built-in conventions TOML")?;
        conventions.validate()?;
        Ok(conventions)
    }

    /// Built-in conventions with any keys from `override_path` layered on top
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut conventions = Self::builtin()?;

        if let Some(path) = override_path {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read conventions file {}", path.display()))?;
            let overrides: ConventionsOverride = toml::from_str(&text)
                .with_context(|| format!("Failed to parse conventions file {}", path.display()))?;
            conventions.apply(overrides);
            conventions
                .validate()
                .with_context(|| format!("Invalid conventions in {}", path.display()))?;
        }

        Ok(conventions)
    }

    fn apply(&mut self, overrides: ConventionsOverride) {
        if let Some(suffix) = overrides.artifact_suffix {
            self.artifact_suffix = suffix;
        }
        if let Some(dir) = overrides.platforms_dir {
            self.platforms_dir = dir;
        }
        if let Some(dir) = overrides.local_objects_dir {
            self.local_objects_dir = dir;
        }
        if let Some(trees) = overrides.tracked_trees {
            self.tracked_trees = trees;
        }
        if let Some(extensions) = overrides.tracked_extensions {
            self.tracked_extensions = extensions;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.artifact_suffix.is_empty() {
            anyhow::bail!("artifact_suffix must not be empty");
        }
        if self.artifact_suffix.contains('/') {
            anyhow::bail!("artifact_suffix must not contain '/'");
        }
        for (key, value) in [
            ("platforms_dir", &self.platforms_dir),
            ("local_objects_dir", &self.local_objects_dir),
        ] {
            if !is_single_component(value) {
                anyhow::bail!("{} must be a single directory name, got: '{}'", key, value);
            }
        }
        for tree in &self.tracked_trees {
            if !is_single_component(tree) {
                anyhow::bail!("tracked_trees entries must be directory names, got: '{}'", tree);
            }
        }
        Ok(())
    }

    /// Check whether a path carries one of the tracked source extensions
    pub fn is_tracked_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.tracked_extensions.iter().any(|tracked| tracked == ext))
    }
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_conventions() {
        let conventions = Conventions::builtin().unwrap();
        assert_eq!(conventions.artifact_suffix, ".dep");
        assert_eq!(conventions.platforms_dir, "platforms");
        assert_eq!(conventions.local_objects_dir, "Make");
        assert_eq!(conventions.tracked_trees, vec!["src", "applications"]);
    }

    #[test]
    fn test_tracked_source_extensions() {
        let conventions = Conventions::builtin().unwrap();
        assert!(conventions.is_tracked_source(Path::new("src/foo/bar.C")));
        assert!(conventions.is_tracked_source(Path::new("src/foo/bar.H")));
        assert!(conventions.is_tracked_source(Path::new("parser.L")));
        assert!(!conventions.is_tracked_source(Path::new("bar.cpp")));
        assert!(!conventions.is_tracked_source(Path::new("Makefile")));
        // Lowercase variants are not tracked unless configured
        assert!(!conventions.is_tracked_source(Path::new("src/foo/bar.h")));
        assert!(!conventions.is_tracked_source(Path::new("parser.l")));
    }

    #[test]
    fn test_override_tracked_extensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conventions.toml");
        fs::write(&path, "tracked_extensions = [\"C\", \"H\", \"h\"]\n").unwrap();

        let conventions = Conventions::load(Some(&path)).unwrap();
        assert!(conventions.is_tracked_source(Path::new("src/foo/bar.h")));
        assert!(!conventions.is_tracked_source(Path::new("parser.L")));
    }

    #[test]
    fn test_partial_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conventions.toml");
        fs::write(&path, "artifact_suffix = \".d\"\ntracked_trees = [\"lib\"]\n").unwrap();

        let conventions = Conventions::load(Some(&path)).unwrap();
        assert_eq!(conventions.artifact_suffix, ".d");
        assert_eq!(conventions.tracked_trees, vec!["lib"]);
        // Untouched keys keep their built-in values
        assert_eq!(conventions.platforms_dir, "platforms");
    }

    #[test]
    fn test_override_rejects_unknown_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conventions.toml");
        fs::write(&path, "suffix = \".d\"\n").unwrap();

        assert!(Conventions::load(Some(&path)).is_err());
    }

    #[test]
    fn test_override_rejects_empty_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conventions.toml");
        fs::write(&path, "artifact_suffix = \"\"\n").unwrap();

        let err = Conventions::load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("must not be empty"));
    }

    #[test]
    fn test_override_rejects_nested_platforms_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conventions.toml");
        fs::write(&path, "platforms_dir = \"build/platforms\"\n").unwrap();

        assert!(Conventions::load(Some(&path)).is_err());
    }
}
