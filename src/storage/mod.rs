//! Storage abstractions for snapshot persistence.
//!
//! One plain-text record per capture, grouped by day:
//!
//! ```text
//! {output_dir}/
//! └── 2026-10-17/
//!     └── snapshots/
//!         ├── 08-00.txt
//!         └── 09-30.txt
//! ```

pub mod format;
pub mod local;

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::Snapshot;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for snapshot storage backends.
pub trait SnapshotStore {
    /// Persist one capture, replacing any record with the same time label.
    fn write(&self, snapshot: &Snapshot) -> Result<PathBuf>;

    /// Read every record of the day in chronological order.
    ///
    /// When `platforms` is given, other sources are dropped from each snapshot.
    fn read_all(&self, platforms: Option<&HashSet<String>>) -> Result<Vec<Snapshot>>;
}
