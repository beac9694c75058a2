//! client::traits
//!
//! Per-operation client contracts. Both backend families implement these;
//! callers hold a trait object and never know which family served them.

use std::path::Path;
use std::sync::Arc;

use crate::command::Target;
use crate::progress::ProgressTracker;
use crate::protocol::{Depth, NodeKind, Revision};

use super::ClientError;

/// Structured description of one versioned node, as reported by `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Repository URL of the node.
    pub url: Option<String>,
    /// Root URL of the repository containing it.
    pub repository_root: Option<String>,
    /// Revision the node is at.
    pub revision: Option<i64>,
    /// What kind of node it is.
    pub kind: NodeKind,
    /// Revision of the last change touching the node.
    pub last_changed_revision: Option<i64>,
}

impl Default for EntryInfo {
    fn default() -> Self {
        Self {
            url: None,
            repository_root: None,
            revision: None,
            kind: NodeKind::Unknown,
            last_changed_revision: None,
        }
    }
}

/// Schedules unversioned paths for addition.
pub trait AddClient: Send + Sync {
    /// # Errors
    ///
    /// `Command` or `Backend` on failure; `Cancelled` is surfaced through
    /// the `Command` variant.
    fn add(
        &self,
        path: &Path,
        depth: Depth,
        force: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError>;
}

/// Checks out a fresh working copy.
pub trait CheckoutClient: Send + Sync {
    /// Returns the revision that was checked out.
    fn checkout(
        &self,
        url: &str,
        destination: &Path,
        revision: Revision,
        depth: Depth,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<i64, ClientError>;
}

/// Commits local modifications.
pub trait CommitClient: Send + Sync {
    /// Returns the new revision, or `None` when there was nothing to
    /// commit.
    fn commit(
        &self,
        paths: &[&Path],
        message: &str,
        depth: Depth,
        keep_locks: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Option<i64>, ClientError>;
}

/// Produces unified diffs.
pub trait DiffClient: Send + Sync {
    /// Returns the raw diff bytes exactly as the backend produced them.
    fn diff(
        &self,
        path: &Path,
        from: Revision,
        to: Revision,
        depth: Depth,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Vec<u8>, ClientError>;
}

/// Describes a versioned node.
pub trait InfoClient: Send + Sync {
    /// # Errors
    ///
    /// `MalformedOutput` when the backend reports nothing interpretable
    /// for the target.
    fn info(
        &self,
        target: &Target,
        revision: Option<Revision>,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<EntryInfo, ClientError>;
}

/// Takes and releases path locks.
pub trait LockClient: Send + Sync {
    fn lock(
        &self,
        path: &Path,
        message: Option<&str>,
        steal: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError>;

    fn unlock(
        &self,
        path: &Path,
        break_lock: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError>;
}

/// Brings working-copy paths up to a revision.
pub trait UpdateClient: Send + Sync {
    /// Returns one resulting revision per input path, in input order.
    fn update(
        &self,
        paths: &[&Path],
        revision: Revision,
        depth: Depth,
        allow_unversioned_obstructions: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Vec<i64>, ClientError>;
}
