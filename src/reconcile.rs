//! Keep/remove decisions for dependency files.

use crate::layout::ObjectLayout;
use crate::scanner::{find_artifacts, find_artifacts_referencing};
use colored::Colorize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A dependency file that was deleted, with the source it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedArtifact {
    pub artifact: PathBuf,
    pub implied_source: PathBuf,
}

/// A deletion that failed and was skipped
#[derive(Debug, Clone)]
pub struct FailedRemoval {
    pub path: PathBuf,
    pub error: String,
}

/// Everything a run did, in the order it happened
#[derive(Debug, Default)]
pub struct PruneReport {
    pub removed: Vec<RemovedArtifact>,
    pub failed: Vec<FailedRemoval>,
    /// Requested roots that did not exist
    pub skipped_roots: Vec<PathBuf>,
    /// Files carrying the suffix that do not map back to a source
    pub unconventional: Vec<PathBuf>,
    /// Dependency files whose source still exists
    pub kept: usize,
    pub bytes_freed: u64,
    /// Dangling source links removed by the link sweep
    pub unlinked: Vec<PathBuf>,
}

impl PruneReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub(crate) fn push_failure(&mut self, path: &Path, err: &std::io::Error) {
        self.failed.push(FailedRemoval {
            path: path.to_path_buf(),
            error: err.to_string(),
        });
    }
}

/// Applies a removal policy to the dependency files under a root.
///
/// Deletion is best-effort: a file that cannot be removed is reported and the
/// batch carries on. Removing a file that has already gone is a no-op, so every
/// operation can simply be re-run after an interruption.
pub struct Reconciler<'a> {
    layout: &'a dyn ObjectLayout,
    suffix: &'a str,
    report: PruneReport,
}

impl<'a> Reconciler<'a> {
    pub fn new(layout: &'a dyn ObjectLayout, suffix: &'a str) -> Self {
        Reconciler {
            layout,
            suffix,
            report: PruneReport::default(),
        }
    }

    pub fn report(&self) -> &PruneReport {
        &self.report
    }

    pub(crate) fn report_mut(&mut self) -> &mut PruneReport {
        &mut self.report
    }

    pub fn into_report(self) -> PruneReport {
        self.report
    }

    /// Remove every dependency file under `root`
    pub fn prune_all(&mut self, root: &Path) {
        if !self.enter_root(root) {
            return;
        }
        println!("Removing all {} files in {}", self.suffix, root.display());

        for artifact in find_artifacts(root, self.suffix) {
            if let Some(source) = self.implied_source(&artifact) {
                self.remove(&artifact, source, false);
            }
        }
    }

    /// Remove the dependency files under `root` whose contents mention `token`
    pub fn prune_referencing(&mut self, root: &Path, token: &str) {
        if !self.enter_root(root) {
            return;
        }
        println!(
            "Removing {} files referring to {} in {}",
            self.suffix,
            token.bold(),
            root.display()
        );

        for artifact in find_artifacts_referencing(root, self.suffix, token) {
            if let Some(source) = self.implied_source(&artifact) {
                self.remove(&artifact, source, false);
            }
        }
    }

    /// Remove the dependency files under `root` whose source is no longer readable
    pub fn prune_orphans(&mut self, root: &Path) {
        if !self.enter_root(root) {
            return;
        }
        println!(
            "Searching {} for deprecated {} files",
            root.display(),
            self.suffix
        );

        for artifact in find_artifacts(root, self.suffix) {
            let Some(source) = self.implied_source(&artifact) else {
                continue;
            };

            if is_readable(&source) {
                tracing::trace!(
                    artifact = %artifact.display(),
                    source = %source.display(),
                    "source present, keeping"
                );
                self.report.kept += 1;
            } else {
                tracing::debug!(source = %source.display(), "source missing");
                self.remove(&artifact, source, true);
            }
        }
    }

    /// Report a missing root as skipped; true when the root can be scanned
    fn enter_root(&mut self, root: &Path) -> bool {
        if root.is_dir() {
            return true;
        }
        println!(
            "{}",
            format!("Directory does not exist: {}", root.display()).yellow()
        );
        self.report.skipped_roots.push(root.to_path_buf());
        false
    }

    fn implied_source(&mut self, artifact: &Path) -> Option<PathBuf> {
        let source = self.layout.implied_source_for(artifact);
        if source.is_none() {
            println!(
                "Skipping {}: not inside an object directory",
                artifact.display()
            );
            self.report.unconventional.push(artifact.to_path_buf());
        }
        source
    }

    /// Delete one artifact; `orphaned` names the missing source in the audit line
    fn remove(&mut self, artifact: &Path, implied_source: PathBuf, orphaned: bool) {
        let size = fs::symlink_metadata(artifact)
            .map(|meta| meta.len())
            .unwrap_or(0);

        match fs::remove_file(artifact) {
            Ok(()) => {
                if orphaned {
                    println!(
                        "{} {} (source {} missing)",
                        "Removed:".red(),
                        artifact.display(),
                        implied_source.display()
                    );
                } else {
                    println!("{} {}", "Removed:".red(), artifact.display());
                }
                self.report.bytes_freed += size;
                self.report.removed.push(RemovedArtifact {
                    artifact: artifact.to_path_buf(),
                    implied_source,
                });
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(artifact = %artifact.display(), "already removed");
            }
            Err(err) => {
                eprintln!("Error removing {}: {}. Skipping.", artifact.display(), err);
                self.report.push_failure(artifact, &err);
            }
        }
    }
}

fn is_readable(path: &Path) -> bool {
    fs::File::open(path).is_ok()
}
