//! progress
//!
//! Progress event sink and cooperative cancellation.
//!
//! # Design
//!
//! Both backends report progress through the same [`ProgressTracker`]
//! capability. Events are delivered on whichever thread performs the read
//! (a pipe-drain thread for the CLI backend, the library's callback thread
//! otherwise), so implementations must be safe to call from non-caller
//! threads or hand off internally.
//!
//! Delivery is at-least-once up to a failure point: events already consumed
//! before an attempt fails remain valid.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::protocol::{EventAction, NodeKind};

/// A single structured progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Path the action applies to, when the backend reports one.
    pub path: Option<PathBuf>,
    /// What happened to the path.
    pub action: EventAction,
    /// Node kind, when known.
    pub kind: NodeKind,
    /// Revision associated with the event, when the backend reports one.
    pub revision: Option<i64>,
}

impl ProgressEvent {
    /// Event for a path action with no kind or revision information.
    pub fn path_action(path: impl Into<PathBuf>, action: EventAction) -> Self {
        Self {
            path: Some(path.into()),
            action,
            kind: NodeKind::Unknown,
            revision: None,
        }
    }
}

/// Caller-supplied progress sink and cancellation check.
///
/// `consume` may be called from a non-caller thread. `is_cancelled` is
/// polled before each process spawn and while output is drained; once it
/// returns `true` the spawned process is killed, never abandoned.
pub trait ProgressTracker: Send + Sync {
    /// Consume one progress event.
    fn consume(&self, event: ProgressEvent);

    /// Cooperative cancellation check.
    fn is_cancelled(&self) -> bool;
}

/// Tracker that discards events and never cancels.
#[derive(Debug, Default)]
pub struct NullTracker;

impl ProgressTracker for NullTracker {
    fn consume(&self, _event: ProgressEvent) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Tracker that records events and supports external cancellation.
#[derive(Debug, Default)]
pub struct CollectingTracker {
    events: Mutex<Vec<ProgressEvent>>,
    cancelled: AtomicBool,
}

impl CollectingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation; observed on the next poll.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Snapshot of the events consumed so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("tracker lock poisoned").clone()
    }
}

impl ProgressTracker for CollectingTracker {
    fn consume(&self, event: ProgressEvent) {
        self.events.lock().expect("tracker lock poisoned").push(event);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_tracker_never_cancels() {
        let tracker = NullTracker;
        tracker.consume(ProgressEvent::path_action("a.txt", EventAction::Add));
        assert!(!tracker.is_cancelled());
    }

    #[test]
    fn collecting_tracker_records_in_order() {
        let tracker = CollectingTracker::new();
        tracker.consume(ProgressEvent::path_action("a.txt", EventAction::Add));
        tracker.consume(ProgressEvent::path_action("b.txt", EventAction::Update));

        let events = tracker.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Add);
        assert_eq!(events[1].action, EventAction::Update);
    }

    #[test]
    fn cancellation_is_sticky() {
        let tracker = CollectingTracker::new();
        assert!(!tracker.is_cancelled());
        tracker.cancel();
        assert!(tracker.is_cancelled());
        assert!(tracker.is_cancelled());
    }
}
