//! protocol::conflict
//!
//! Conflict descriptions shared by both backends.

use std::fmt;

/// Why a path ended up in conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictReason {
    /// Local edits collide with incoming edits.
    Edited,
    /// An unversioned obstruction sits at the path.
    Obstructed,
    /// The path was locally deleted.
    Deleted,
    /// The path is missing locally.
    Missing,
    /// An unversioned item sits at the path.
    Unversioned,
    /// The path was locally added.
    Added,
    /// The path was locally replaced.
    Replaced,
    /// The path was moved away locally.
    MovedAway,
    /// Another path was moved here locally.
    MovedHere,
}

impl ConflictReason {
    pub fn as_token(&self) -> &'static str {
        match self {
            ConflictReason::Edited => "edit",
            ConflictReason::Obstructed => "obstruction",
            ConflictReason::Deleted => "delete",
            ConflictReason::Missing => "missing",
            ConflictReason::Unversioned => "unversioned",
            ConflictReason::Added => "add",
            ConflictReason::Replaced => "replace",
            ConflictReason::MovedAway => "moved-away",
            ConflictReason::MovedHere => "moved-here",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "edit" => Some(ConflictReason::Edited),
            "obstruction" => Some(ConflictReason::Obstructed),
            "delete" => Some(ConflictReason::Deleted),
            "missing" => Some(ConflictReason::Missing),
            "unversioned" => Some(ConflictReason::Unversioned),
            "add" => Some(ConflictReason::Added),
            "replace" => Some(ConflictReason::Replaced),
            "moved-away" => Some(ConflictReason::MovedAway),
            "moved-here" => Some(ConflictReason::MovedHere),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

/// Which operation produced the conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictOperation {
    None,
    Update,
    Switch,
    Merge,
}

impl ConflictOperation {
    pub fn as_token(&self) -> &'static str {
        match self {
            ConflictOperation::None => "none",
            ConflictOperation::Update => "update",
            ConflictOperation::Switch => "switch",
            ConflictOperation::Merge => "merge",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ConflictOperation::None),
            "update" => Some(ConflictOperation::Update),
            "switch" => Some(ConflictOperation::Switch),
            "merge" => Some(ConflictOperation::Merge),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}
