//! protocol::depth
//!
//! Recursion scope of an operation.

use std::fmt;

/// Traversal depth of an operation.
///
/// Maps one-to-one onto the executable's `--depth` argument values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    /// The target only, no children.
    Empty,
    /// The target and its file children.
    Files,
    /// The target and its immediate children (files and directories).
    Immediates,
    /// Full recursion.
    Infinity,
}

impl Depth {
    /// Canonical CLI argument value.
    pub fn as_arg(&self) -> &'static str {
        match self {
            Depth::Empty => "empty",
            Depth::Files => "files",
            Depth::Immediates => "immediates",
            Depth::Infinity => "infinity",
        }
    }

    /// Parse a depth token.
    ///
    /// Returns `None` for unrecognized tokens; callers decide whether that
    /// is an error.
    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "empty" => Some(Depth::Empty),
            "files" => Some(Depth::Files),
            "immediates" => Some(Depth::Immediates),
            "infinity" => Some(Depth::Infinity),
            _ => None,
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}
