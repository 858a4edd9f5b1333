//! Error types shared by the pruning components.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run before or during a scan.
///
/// Per-artifact deletion failures are not represented here: they are recorded
/// in the [`PruneReport`](crate::reconcile::PruneReport) and the batch continues.
#[derive(Error, Debug)]
pub enum PruneError {
    /// Malformed invocation (too many positional arguments, etc.)
    #[error("{0}")]
    Usage(String),

    /// Required build environment (project root, options identifier) is missing
    /// or the object-directory convention cannot be located
    #[error("Environment not configured: {0}")]
    Environment(String),

    /// The operation was invoked from the wrong place
    #[error("{0}")]
    Precondition(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PruneError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PruneError>;
