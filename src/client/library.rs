//! client::library
//!
//! Embedded-library backend. The crate does not bind the library itself;
//! it talks to an opaque [`LibraryAdapter`] supplied by the embedder. The
//! client wrappers here add what every adapter call needs regardless of
//! the binding: a cancellation check before delegation and uniform error
//! mapping into [`ClientError`].

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::command::CommandError;
use crate::progress::ProgressTracker;
use crate::protocol::{Depth, Revision};

use super::ClientError;
use super::traits::{AddClient, CheckoutClient, CommitClient, LockClient, UpdateClient};

/// Failure reported by an adapter. Opaque by design; the binding knows
/// more than this crate can represent.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LibraryError(pub String);

/// The embedder's in-process binding.
///
/// Implementations must be safe to call from any thread. Progress
/// callbacks flow through the tracker handed to each call; adapters
/// should also poll `is_cancelled` between units of work, but the
/// wrappers never rely on that for the pre-call check.
pub trait LibraryAdapter: Send + Sync {
    fn add(
        &self,
        path: &Path,
        depth: Depth,
        force: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), LibraryError>;

    /// Returns the checked-out revision.
    fn checkout(
        &self,
        url: &str,
        destination: &Path,
        revision: Revision,
        depth: Depth,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<i64, LibraryError>;

    /// Returns the committed revision, or `None` for an empty commit.
    fn commit(
        &self,
        paths: &[&Path],
        message: &str,
        depth: Depth,
        keep_locks: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Option<i64>, LibraryError>;

    fn lock(
        &self,
        path: &Path,
        message: Option<&str>,
        steal: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), LibraryError>;

    fn unlock(
        &self,
        path: &Path,
        break_lock: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), LibraryError>;

    /// Returns one resulting revision per input path.
    fn update(
        &self,
        paths: &[&Path],
        revision: Revision,
        depth: Depth,
        allow_unversioned_obstructions: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Vec<i64>, LibraryError>;
}

fn check_cancelled(tracker: &Arc<dyn ProgressTracker>) -> Result<(), ClientError> {
    if tracker.is_cancelled() {
        return Err(ClientError::Command(CommandError::Cancelled));
    }
    Ok(())
}

fn map(err: LibraryError) -> ClientError {
    ClientError::Backend(err.0)
}

pub struct LibraryAddClient {
    adapter: Arc<dyn LibraryAdapter>,
}

impl LibraryAddClient {
    pub fn new(adapter: Arc<dyn LibraryAdapter>) -> Self {
        Self { adapter }
    }
}

impl AddClient for LibraryAddClient {
    fn add(
        &self,
        path: &Path,
        depth: Depth,
        force: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError> {
        check_cancelled(&tracker)?;
        self.adapter.add(path, depth, force, tracker).map_err(map)
    }
}

pub struct LibraryCheckoutClient {
    adapter: Arc<dyn LibraryAdapter>,
}

impl LibraryCheckoutClient {
    pub fn new(adapter: Arc<dyn LibraryAdapter>) -> Self {
        Self { adapter }
    }
}

impl CheckoutClient for LibraryCheckoutClient {
    fn checkout(
        &self,
        url: &str,
        destination: &Path,
        revision: Revision,
        depth: Depth,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<i64, ClientError> {
        check_cancelled(&tracker)?;
        self.adapter
            .checkout(url, destination, revision, depth, tracker)
            .map_err(map)
    }
}

pub struct LibraryCommitClient {
    adapter: Arc<dyn LibraryAdapter>,
}

impl LibraryCommitClient {
    pub fn new(adapter: Arc<dyn LibraryAdapter>) -> Self {
        Self { adapter }
    }
}

impl CommitClient for LibraryCommitClient {
    fn commit(
        &self,
        paths: &[&Path],
        message: &str,
        depth: Depth,
        keep_locks: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Option<i64>, ClientError> {
        check_cancelled(&tracker)?;
        self.adapter
            .commit(paths, message, depth, keep_locks, tracker)
            .map_err(map)
    }
}

pub struct LibraryLockClient {
    adapter: Arc<dyn LibraryAdapter>,
}

impl LibraryLockClient {
    pub fn new(adapter: Arc<dyn LibraryAdapter>) -> Self {
        Self { adapter }
    }
}

impl LockClient for LibraryLockClient {
    fn lock(
        &self,
        path: &Path,
        message: Option<&str>,
        steal: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError> {
        check_cancelled(&tracker)?;
        self.adapter.lock(path, message, steal, tracker).map_err(map)
    }

    fn unlock(
        &self,
        path: &Path,
        break_lock: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError> {
        check_cancelled(&tracker)?;
        self.adapter.unlock(path, break_lock, tracker).map_err(map)
    }
}

pub struct LibraryUpdateClient {
    adapter: Arc<dyn LibraryAdapter>,
}

impl LibraryUpdateClient {
    pub fn new(adapter: Arc<dyn LibraryAdapter>) -> Self {
        Self { adapter }
    }
}

impl UpdateClient for LibraryUpdateClient {
    fn update(
        &self,
        paths: &[&Path],
        revision: Revision,
        depth: Depth,
        allow_unversioned_obstructions: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Vec<i64>, ClientError> {
        check_cancelled(&tracker)?;
        self.adapter
            .update(paths, revision, depth, allow_unversioned_obstructions, tracker)
            .map_err(map)
    }
}
