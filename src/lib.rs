//! depprune - Dependency File Pruner
//!
//! Build systems that record include dependencies in a sidecar file per
//! compiled source (`foo.C` → `platforms/<options>/.../foo.C.dep`) leave those
//! sidecars behind when sources are renamed, moved or deleted. Stale sidecars
//! make the build skip or break recompilation. depprune maps each dependency
//! file back to the source it was derived from and removes the ones that no
//! longer belong.
//!
//! ## Modes
//!
//! - bulk removal of all (or name-filtered) dependency files of a directory,
//!   for the current options identifier or all of them
//! - orphan removal: dependency files whose source no longer exists
//! - link sweep: dangling source symlinks across the project, the dependency
//!   files that mention them, then the links themselves
//!
//! Files are only ever removed from inside object directories, and only when
//! they map back to a source path.

pub mod conventions;
pub mod env;
pub mod error;
pub mod layout;
pub mod modes;
pub mod reconcile;
pub mod scanner;
pub mod sweep;

// Re-export commonly used items
pub use conventions::Conventions;
pub use env::BuildEnv;
pub use error::PruneError;
pub use layout::{ObjectLayout, PlatformLayout};
pub use modes::{Mode, Session};
pub use reconcile::{PruneReport, Reconciler, RemovedArtifact};
pub use scanner::{find_artifacts, find_artifacts_referencing};
pub use sweep::{discover_dangling_links, LinkSweep};
