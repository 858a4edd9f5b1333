//! Project-wide sweep of dangling source links.
//!
//! Sources are often symlinked into the tree (e.g. generated or shared files).
//! When a link's target disappears, every dependency file that mentions the
//! link's name is stale. The sweep runs in two phases:
//!
//! 1. discover all dangling links under the tracked trees, collecting the full
//!    list before anything is touched, since phase 2 mutates those trees
//! 2. for each link, prune the dependency files referring to its name in every
//!    tracked tree (across all options), then unlink it; the link goes last so
//!    an interrupted run still shows what needs cleaning

use crate::conventions::Conventions;
use crate::env::BuildEnv;
use crate::error::{PruneError, Result};
use crate::layout::ObjectLayout;
use crate::reconcile::{PruneReport, Reconciler};
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Find symlinks with tracked source extensions whose target does not exist.
///
/// Symlinks are not followed during the walk. The result is sorted.
pub fn discover_dangling_links(project_root: &Path, conventions: &Conventions) -> Vec<PathBuf> {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(100));

    let mut links = Vec::new();
    let mut entries_scanned = 0u64;

    for tree in &conventions.tracked_trees {
        let tree_root = project_root.join(tree);
        if !tree_root.is_dir() {
            tracing::debug!(tree = %tree_root.display(), "tracked tree missing, skipping");
            continue;
        }

        let walker = WalkBuilder::new(&tree_root)
            .hidden(false)
            // Every link counts, whether or not it is ignored by VCS
            .git_ignore(false)
            .ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .follow_links(false)
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    eprintln!("Warning: Failed to access entry during discovery: {}", err);
                    continue;
                }
            };

            entries_scanned += 1;
            if entries_scanned % 1000 == 0 {
                progress.set_message(format!(
                    "Searching for dangling links: {} entries scanned",
                    entries_scanned
                ));
            }

            let path = entry.path();
            if entry.path_is_symlink()
                && conventions.is_tracked_source(path)
                && fs::metadata(path).is_err()
            {
                tracing::debug!(link = %path.display(), "dangling link");
                links.push(path.to_path_buf());
            }
        }
    }

    progress.finish_and_clear();
    links.sort();
    links
}

/// Drives the dangling-link sweep for one project
pub struct LinkSweep<'a> {
    env: &'a BuildEnv,
    conventions: &'a Conventions,
    layout: &'a dyn ObjectLayout,
}

impl<'a> LinkSweep<'a> {
    pub fn new(env: &'a BuildEnv, conventions: &'a Conventions, layout: &'a dyn ObjectLayout) -> Self {
        LinkSweep {
            env,
            conventions,
            layout,
        }
    }

    /// The tracked tree paths are relative to the project root, so the sweep
    /// only runs from there
    pub fn check_working_dir(&self, working_dir: &Path) -> Result<()> {
        let working_dir = working_dir
            .canonicalize()
            .map_err(|err| PruneError::io(working_dir, err))?;

        if working_dir != self.env.project_root {
            return Err(PruneError::Precondition(format!(
                "Cannot run the link sweep from {}: change to the project root {} first",
                working_dir.display(),
                self.env.project_root.display()
            )));
        }
        Ok(())
    }

    pub fn run(&self, working_dir: &Path) -> Result<PruneReport> {
        self.check_working_dir(working_dir)?;

        println!(
            "Searching {} for dangling links to {} files",
            self.conventions.tracked_trees.join(", "),
            self.conventions
                .tracked_extensions
                .iter()
                .map(|ext| format!("*.{}", ext))
                .collect::<Vec<_>>()
                .join(" ")
        );
        let links = discover_dangling_links(&self.env.project_root, self.conventions);

        let mut reconciler = Reconciler::new(self.layout, &self.conventions.artifact_suffix);
        if links.is_empty() {
            println!("No dangling links found.");
            return Ok(reconciler.into_report());
        }

        for link in &links {
            let Some(file_name) = link.file_name().and_then(|name| name.to_str()) else {
                eprintln!("Warning: Skipping link with non-UTF-8 name: {}", link.display());
                continue;
            };

            for tree in &self.conventions.tracked_trees {
                println!("    '{}': {}", tree, file_name);
                let object_root = self
                    .layout
                    .object_root_for(&self.env.project_root.join(tree))?;
                for root in self.layout.sibling_roots_of(&object_root) {
                    reconciler.prune_referencing(&root, file_name);
                }
            }

            println!("    Remove file: {}", link.display());
            match fs::remove_file(link) {
                Ok(()) => reconciler.report_mut().unlinked.push(link.clone()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    tracing::debug!(link = %link.display(), "link already removed");
                }
                Err(err) => {
                    eprintln!("Error removing {}: {}. Skipping.", link.display(), err);
                    reconciler.report_mut().push_failure(link, &err);
                }
            }
        }

        Ok(reconciler.into_report())
    }
}
