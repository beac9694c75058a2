//! protocol::event
//!
//! Action codes reported while an operation runs.
//!
//! # Design
//!
//! The executable reports progress as single-letter codes in line-oriented
//! output (`A    src/main.rs`). The embedded library reports the same
//! actions through its event callback. Both are normalized into
//! [`EventAction`] so progress trackers see one vocabulary.

use std::fmt;

/// Action performed on a single path during an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventAction {
    /// Path was scheduled for addition or added by an update.
    Add,
    /// Path was deleted.
    Delete,
    /// Path contents were updated.
    Update,
    /// Update produced a conflict on the path.
    Conflict,
    /// Local and incoming changes were merged cleanly.
    Merged,
    /// Path already existed with the incoming content.
    Exists,
    /// Path was skipped.
    Skip,
    /// Path was restored from the pristine store.
    Restore,
    /// Path was reverted.
    Revert,
    /// Path was locked.
    Locked,
    /// Path was unlocked.
    Unlocked,
    /// Commit added the path.
    CommitAdded,
    /// Commit modified the path.
    CommitModified,
    /// Commit deleted the path.
    CommitDeleted,
    /// Commit replaced the path.
    CommitReplaced,
}

impl EventAction {
    /// Parse the single-letter code used in update/checkout output.
    ///
    /// Only the content column is interpreted; property-column codes are
    /// handled by the caller.
    pub fn from_update_code(code: char) -> Option<Self> {
        match code {
            'A' => Some(EventAction::Add),
            'D' => Some(EventAction::Delete),
            'U' => Some(EventAction::Update),
            'C' => Some(EventAction::Conflict),
            'G' => Some(EventAction::Merged),
            'E' => Some(EventAction::Exists),
            _ => None,
        }
    }

    /// Parse the verb prefix used in commit output (`Adding`, `Sending`, ...).
    pub fn from_commit_verb(verb: &str) -> Option<Self> {
        match verb {
            "Adding" => Some(EventAction::CommitAdded),
            "Sending" => Some(EventAction::CommitModified),
            "Deleting" => Some(EventAction::CommitDeleted),
            "Replacing" => Some(EventAction::CommitReplaced),
            _ => None,
        }
    }

    /// Stable lowercase name, used in logs and structured output.
    pub fn as_token(&self) -> &'static str {
        match self {
            EventAction::Add => "add",
            EventAction::Delete => "delete",
            EventAction::Update => "update",
            EventAction::Conflict => "conflict",
            EventAction::Merged => "merged",
            EventAction::Exists => "exists",
            EventAction::Skip => "skip",
            EventAction::Restore => "restore",
            EventAction::Revert => "revert",
            EventAction::Locked => "locked",
            EventAction::Unlocked => "unlocked",
            EventAction::CommitAdded => "commit-added",
            EventAction::CommitModified => "commit-modified",
            EventAction::CommitDeleted => "commit-deleted",
            EventAction::CommitReplaced => "commit-replaced",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}
