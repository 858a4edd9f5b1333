//! Operating modes and their dispatch.

use crate::conventions::Conventions;
use crate::env::BuildEnv;
use crate::error::Result;
use crate::layout::{ObjectLayout, PlatformLayout};
use crate::reconcile::{PruneReport, Reconciler};
use crate::sweep::LinkSweep;
use std::path::{Path, PathBuf};

/// What a single invocation should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Remove the dependency files of the working directory, optionally only
    /// those mentioning `filter`, for the current or every options identifier
    Bulk {
        all_platforms: bool,
        filter: Option<String>,
    },
    /// Remove dependency files whose source has gone, for each source directory
    Orphans { dirs: Vec<PathBuf> },
    /// Clean up after dangling source links across the whole project
    LinkSweep,
}

/// Immutable configuration for one run
#[derive(Debug, Clone)]
pub struct Session {
    pub env: BuildEnv,
    pub conventions: Conventions,
    pub working_dir: PathBuf,
}

impl Session {
    pub fn new(env: BuildEnv, conventions: Conventions, working_dir: &Path) -> Self {
        Session {
            env,
            conventions,
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn layout(&self) -> PlatformLayout {
        PlatformLayout::new(&self.env, &self.conventions, &self.working_dir)
    }

    pub fn run(&self, mode: &Mode) -> Result<PruneReport> {
        let layout = self.layout();
        tracing::debug!(?mode, working_dir = %self.working_dir.display(), "running");

        match mode {
            Mode::Bulk {
                all_platforms,
                filter,
            } => self.run_bulk(&layout, *all_platforms, filter.as_deref()),
            Mode::Orphans { dirs } => self.run_orphans(&layout, dirs),
            Mode::LinkSweep => {
                LinkSweep::new(&self.env, &self.conventions, &layout).run(&self.working_dir)
            }
        }
    }

    fn run_bulk(
        &self,
        layout: &PlatformLayout,
        all_platforms: bool,
        filter: Option<&str>,
    ) -> Result<PruneReport> {
        let object_root = layout.object_root_for(&self.working_dir)?;
        let roots = if all_platforms {
            let siblings = layout.sibling_roots_of(&object_root);
            if siblings.is_empty() {
                println!(
                    "No object directories found for any options matching {}",
                    object_root.display()
                );
            }
            siblings
        } else {
            vec![object_root]
        };

        let mut reconciler = Reconciler::new(layout, &self.conventions.artifact_suffix);
        for root in &roots {
            match filter {
                Some(token) => reconciler.prune_referencing(root, token),
                None => reconciler.prune_all(root),
            }
        }
        Ok(reconciler.into_report())
    }

    fn run_orphans(&self, layout: &PlatformLayout, dirs: &[PathBuf]) -> Result<PruneReport> {
        // Resolve every directory first so a bad argument fails before any removal
        let default_dirs = [PathBuf::from(".")];
        let dirs = if dirs.is_empty() { &default_dirs[..] } else { dirs };
        let roots = dirs
            .iter()
            .map(|dir| layout.object_root_for(dir))
            .collect::<Result<Vec<_>>>()?;

        let mut reconciler = Reconciler::new(layout, &self.conventions.artifact_suffix);
        for root in &roots {
            reconciler.prune_orphans(root);
        }
        Ok(reconciler.into_report())
    }
}
