//! Mapping between source locations and dependency-file locations.
//!
//! The build system places the dependency file for `<dir>/<file>` at
//! `<object root of dir>/<file><suffix>`. Object roots follow one of two
//! layouts:
//!
//! - inside the project: `<project>/<platforms>/<options>/<dir relative to project>`
//! - elsewhere: `<app>/<Make>/<options>/<dir relative to app>`, where `<app>` is
//!   the nearest ancestor holding a `Make` directory
//!
//! [`implied_source_for`](ObjectLayout::implied_source_for) must stay the exact
//! inverse of the build tool's transform. If the build tool changes its naming
//! scheme the mapping silently mismatches; adjust `conventions.toml` (or provide
//! another [`ObjectLayout`]) rather than patching call sites.

use crate::conventions::Conventions;
use crate::env::BuildEnv;
use crate::error::{PruneError, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Strategy translating between source paths and object-directory paths
pub trait ObjectLayout {
    /// Object root holding the dependency files of sources in `base_dir`
    fn object_root_for(&self, base_dir: &Path) -> Result<PathBuf>;

    /// Dependency file the build tool writes for `source`
    fn artifact_path_for(&self, source: &Path) -> Result<PathBuf>;

    /// Source file a dependency file was derived from, or `None` when the
    /// artifact does not sit where the convention would put one
    fn implied_source_for(&self, artifact: &Path) -> Option<PathBuf>;

    /// Existing object roots sharing `object_root`'s subpath under any options
    /// identifier (including `object_root` itself when it exists)
    fn sibling_roots_of(&self, object_root: &Path) -> Vec<PathBuf>;
}

/// The `platforms/<options>` + `Make/<options>` layout
#[derive(Debug, Clone)]
pub struct PlatformLayout {
    project_root: PathBuf,
    options: String,
    platforms_dir: String,
    local_objects_dir: String,
    suffix: String,
    working_dir: PathBuf,
}

/// An object directory split around its options segment
struct ObjectSplit {
    /// Directory holding one subdirectory per options identifier
    options_parent: PathBuf,
    /// Directory the relative source path hangs off
    source_base: PathBuf,
    /// Path below the options segment
    relative: PathBuf,
}

impl PlatformLayout {
    /// Layout for `env`; relative paths are resolved against `working_dir`
    pub fn new(env: &BuildEnv, conventions: &Conventions, working_dir: &Path) -> Self {
        PlatformLayout {
            project_root: env.project_root.clone(),
            options: env.options.clone(),
            platforms_dir: conventions.platforms_dir.clone(),
            local_objects_dir: conventions.local_objects_dir.clone(),
            suffix: conventions.artifact_suffix.clone(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    fn platforms_root(&self) -> PathBuf {
        self.project_root.join(&self.platforms_dir)
    }

    /// Split `dir` at its options segment, if it has one
    fn split_object_dir(&self, dir: &Path) -> Option<ObjectSplit> {
        let platforms_root = self.platforms_root();
        if let Ok(rest) = dir.strip_prefix(&platforms_root) {
            let mut components = rest.components();
            return match components.next() {
                Some(Component::Normal(_)) => Some(ObjectSplit {
                    options_parent: platforms_root,
                    source_base: self.project_root.clone(),
                    relative: components.as_path().to_path_buf(),
                }),
                _ => None,
            };
        }

        let components: Vec<Component> = dir.components().collect();
        let local = OsStr::new(&self.local_objects_dir);
        let options = OsStr::new(&self.options);
        let is_objects_pair = |pair: &[Component]| {
            matches!(pair, [Component::Normal(name), Component::Normal(_)] if *name == local)
        };
        // Ancestors of the app may themselves be called Make: prefer the pair
        // naming the current options, then the one closest to the artifact
        let index = components
            .windows(2)
            .rposition(|pair| {
                is_objects_pair(pair)
                    && matches!(pair[1], Component::Normal(segment) if segment == options)
            })
            .or_else(|| components.windows(2).rposition(is_objects_pair))?;

        let source_base: PathBuf = components[..index].iter().collect();
        let relative: PathBuf = components[index + 2..].iter().collect();
        Some(ObjectSplit {
            options_parent: source_base.join(&self.local_objects_dir),
            source_base,
            relative,
        })
    }
}

impl ObjectLayout for PlatformLayout {
    fn object_root_for(&self, base_dir: &Path) -> Result<PathBuf> {
        let dir = resolve_path(&self.working_dir, base_dir);

        if let Ok(relative) = dir.strip_prefix(&self.project_root) {
            return Ok(join_relative(
                self.platforms_root().join(&self.options),
                relative,
            ));
        }

        // Outside the project the objects live beside the nearest Make directory
        let app_dir = dir
            .ancestors()
            .find(|ancestor| ancestor.join(&self.local_objects_dir).is_dir())
            .ok_or_else(|| {
                PruneError::Environment(format!(
                    "{} is outside {} and has no '{}' directory above it",
                    dir.display(),
                    self.project_root.display(),
                    self.local_objects_dir
                ))
            })?;

        let relative = dir.strip_prefix(app_dir).unwrap_or(Path::new(""));
        Ok(join_relative(
            app_dir.join(&self.local_objects_dir).join(&self.options),
            relative,
        ))
    }

    fn artifact_path_for(&self, source: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            PruneError::Usage(format!("{} does not name a file", source.display()))
        })?;
        let parent = match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut artifact_name = file_name.to_os_string();
        artifact_name.push(&self.suffix);
        Ok(self.object_root_for(parent)?.join(artifact_name))
    }

    fn implied_source_for(&self, artifact: &Path) -> Option<PathBuf> {
        let name = artifact.file_name()?.to_str()?;
        let source_name = name.strip_suffix(self.suffix.as_str())?;
        if source_name.is_empty() {
            return None;
        }

        let split = self.split_object_dir(artifact.parent()?)?;
        Some(join_relative(split.source_base, &split.relative).join(source_name))
    }

    fn sibling_roots_of(&self, object_root: &Path) -> Vec<PathBuf> {
        let Some(split) = self.split_object_dir(object_root) else {
            tracing::debug!(
                root = %object_root.display(),
                "not an object directory, no siblings"
            );
            return if object_root.is_dir() {
                vec![object_root.to_path_buf()]
            } else {
                Vec::new()
            };
        };

        let entries = match fs::read_dir(&split.options_parent) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(
                    dir = %split.options_parent.display(),
                    error = %err,
                    "cannot list options directories"
                );
                return Vec::new();
            }
        };

        let mut siblings: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| join_relative(entry.path(), &split.relative))
            .filter(|candidate| candidate.is_dir())
            .collect();
        siblings.sort();
        siblings
    }
}

/// Make `path` absolute against `working_dir` and resolve symlinks in the
/// longest existing prefix; the missing tail is normalized lexically
pub fn resolve_path(working_dir: &Path, path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    };
    let absolute = normalize_lexically(&absolute);

    for ancestor in absolute.ancestors() {
        if let Ok(canonical) = ancestor.canonicalize() {
            let tail = absolute.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return join_relative(canonical, tail);
        }
    }

    absolute
}

/// Drop `.` components and fold `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// `base.join(relative)` without the trailing separator an empty `relative` adds
fn join_relative(base: PathBuf, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        base
    } else {
        base.join(relative)
    }
}
