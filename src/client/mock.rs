//! client::mock
//!
//! Scripted library adapter for tests and embedder bring-up.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::progress::{ProgressEvent, ProgressTracker};
use crate::protocol::{Depth, EventAction, Revision};

use super::library::{LibraryAdapter, LibraryError};

/// Adapter that answers every call with a fixed revision, or a fixed
/// error when constructed with [`MockLibraryAdapter::failing`].
#[derive(Debug, Default)]
pub struct MockLibraryAdapter {
    calls: AtomicUsize,
    failure: Option<String>,
}

impl MockLibraryAdapter {
    /// The revision every successful call reports.
    pub const REVISION: i64 = 7;

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Some(message.into()),
        }
    }

    /// How many adapter calls got past the wrappers.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) -> Result<(), LibraryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(LibraryError(message.clone())),
            None => Ok(()),
        }
    }
}

impl LibraryAdapter for MockLibraryAdapter {
    fn add(
        &self,
        path: &Path,
        _depth: Depth,
        _force: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), LibraryError> {
        self.record()?;
        tracker.consume(ProgressEvent::path_action(path, EventAction::Add));
        Ok(())
    }

    fn checkout(
        &self,
        _url: &str,
        destination: &Path,
        _revision: Revision,
        _depth: Depth,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<i64, LibraryError> {
        self.record()?;
        tracker.consume(ProgressEvent::path_action(destination, EventAction::Add));
        Ok(Self::REVISION)
    }

    fn commit(
        &self,
        paths: &[&Path],
        _message: &str,
        _depth: Depth,
        _keep_locks: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Option<i64>, LibraryError> {
        self.record()?;
        if paths.is_empty() {
            return Ok(None);
        }
        for path in paths {
            tracker.consume(ProgressEvent::path_action(path, EventAction::CommitModified));
        }
        Ok(Some(Self::REVISION))
    }

    fn lock(
        &self,
        path: &Path,
        _message: Option<&str>,
        _steal: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), LibraryError> {
        self.record()?;
        tracker.consume(ProgressEvent::path_action(path, EventAction::Locked));
        Ok(())
    }

    fn unlock(
        &self,
        path: &Path,
        _break_lock: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), LibraryError> {
        self.record()?;
        tracker.consume(ProgressEvent::path_action(path, EventAction::Unlocked));
        Ok(())
    }

    fn update(
        &self,
        paths: &[&Path],
        _revision: Revision,
        _depth: Depth,
        _allow_unversioned_obstructions: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Vec<i64>, LibraryError> {
        self.record()?;
        for path in paths {
            tracker.consume(ProgressEvent::path_action(path, EventAction::Update));
        }
        Ok(vec![Self::REVISION; paths.len()])
    }
}
