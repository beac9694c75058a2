//! protocol::node_kind
//!
//! Kind of a versioned node.

use std::fmt;

/// Kind of a node as reported by either backend.
///
/// `Unknown` is a real protocol value (the server may report it for
/// unreadable nodes), not a parse fallback; [`NodeKind::from_token`] still
/// rejects unrecognized tokens outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A regular file.
    File,
    /// A directory.
    Dir,
    /// The node does not exist.
    None,
    /// The kind could not be determined.
    Unknown,
}

impl NodeKind {
    /// Canonical output token.
    pub fn as_token(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Dir => "dir",
            NodeKind::None => "none",
            NodeKind::Unknown => "unknown",
        }
    }

    /// Parse an output token.
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "file" => Some(NodeKind::File),
            "dir" => Some(NodeKind::Dir),
            "none" => Some(NodeKind::None),
            "unknown" => Some(NodeKind::Unknown),
            _ => None,
        }
    }

    /// Whether this kind refers to an existing node.
    pub fn exists(&self) -> bool {
        matches!(self, NodeKind::File | NodeKind::Dir)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        for kind in [NodeKind::File, NodeKind::Dir, NodeKind::None, NodeKind::Unknown] {
            assert_eq!(NodeKind::from_token(kind.as_token()), Some(kind));
        }
    }

    #[test]
    fn unrecognized_token_rejected() {
        assert_eq!(NodeKind::from_token("directory"), None);
        assert_eq!(NodeKind::from_token("File"), None);
    }

    #[test]
    fn exists() {
        assert!(NodeKind::File.exists());
        assert!(NodeKind::Dir.exists());
        assert!(!NodeKind::None.exists());
        assert!(!NodeKind::Unknown.exists());
    }
}
