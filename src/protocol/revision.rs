//! protocol::revision
//!
//! Revision specifiers passed to either backend.

use std::fmt;

/// A revision specifier.
///
/// Encodes to the executable's `--revision` argument vocabulary. Keyword
/// encodings are uppercase, matching what the executable itself prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Revision {
    /// Latest revision in the repository.
    Head,
    /// Pristine base of the working copy item.
    Base,
    /// Current working-copy content.
    Working,
    /// Last committed revision at or before BASE.
    Committed,
    /// The revision just before COMMITTED.
    Previous,
    /// An explicit revision number.
    Number(i64),
}

impl Revision {
    /// Canonical CLI argument value.
    pub fn as_arg(&self) -> String {
        match self {
            Revision::Head => "HEAD".to_string(),
            Revision::Base => "BASE".to_string(),
            Revision::Working => "WORKING".to_string(),
            Revision::Committed => "COMMITTED".to_string(),
            Revision::Previous => "PREV".to_string(),
            Revision::Number(n) => n.to_string(),
        }
    }

    /// Parse a revision token (keyword or number).
    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "HEAD" => Some(Revision::Head),
            "BASE" => Some(Revision::Base),
            "WORKING" => Some(Revision::Working),
            "COMMITTED" => Some(Revision::Committed),
            "PREV" => Some(Revision::Previous),
            _ => s.parse::<i64>().ok().filter(|n| *n >= 0).map(Revision::Number),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_round_trip() {
        for rev in [
            Revision::Head,
            Revision::Base,
            Revision::Working,
            Revision::Committed,
            Revision::Previous,
        ] {
            assert_eq!(Revision::from_arg(&rev.as_arg()), Some(rev));
        }
    }

    #[test]
    fn number_round_trip() {
        assert_eq!(Revision::from_arg("1234"), Some(Revision::Number(1234)));
        assert_eq!(Revision::Number(0).as_arg(), "0");
    }

    #[test]
    fn negative_and_garbage_rejected() {
        assert_eq!(Revision::from_arg("-1"), None);
        assert_eq!(Revision::from_arg("head"), None);
        assert_eq!(Revision::from_arg("r1234"), None);
    }
}
