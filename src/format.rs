//! format
//!
//! Working-copy format and executable version compatibility.
//!
//! # Design
//!
//! Backend selection hinges on two ordered descriptors:
//!
//! - [`WorkingCopyFormat`] - the on-disk format of a checked-out working
//!   copy, detected from its format number. Ordering is total and matches
//!   protocol evolution order.
//! - [`Version`] - the `MAJOR.MINOR.PATCH` version reported by the external
//!   executable's version probe.
//!
//! An unknown format number never coerces to a known format: it maps to
//! [`WorkingCopyFormat::Unknown`], which fails every compatibility check.

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from version parsing and format detection.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Probe output did not contain a `MAJOR.MINOR.PATCH` token.
    #[error("unrecognized version output: '{0}'")]
    UnparseableVersion(String),

    /// The path carries no administrative directory.
    #[error("'{0}' is not a working copy")]
    NotAWorkingCopy(PathBuf),

    /// The administrative area could not be read.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Offset of the big-endian user version field in an SQLite file header.
const SQLITE_USER_VERSION_OFFSET: usize = 60;

const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";

/// Known on-disk working-copy formats.
///
/// The numeric format identifiers are what the client stores in the working
/// copy (`entries` format number up to 1.6, `wc.db` user version from 1.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkingCopyFormat {
    /// Format 10, produced by 1.6 clients.
    OneSix,
    /// Format 29, produced by 1.7 clients (single `.svn` root, SQLite store).
    OneSeven,
    /// Format 31, produced by 1.8 clients.
    OneEight,
    /// Anything this crate does not recognize.
    Unknown,
}

impl WorkingCopyFormat {
    /// Detect the format from the working copy's stored format number.
    ///
    /// Unrecognized numbers map to `Unknown`, never to the nearest known
    /// format.
    pub fn from_format_number(number: i32) -> Self {
        match number {
            10 => WorkingCopyFormat::OneSix,
            29 => WorkingCopyFormat::OneSeven,
            31 => WorkingCopyFormat::OneEight,
            _ => WorkingCopyFormat::Unknown,
        }
    }

    /// Detect the format of the working copy rooted at `root`.
    ///
    /// 1.7+ working copies store the format number as the user version of
    /// the `.svn/wc.db` SQLite store; older ones put it on the first line
    /// of `.svn/entries`. Only the file headers are read, never the store
    /// contents.
    ///
    /// # Errors
    ///
    /// `NotAWorkingCopy` when neither administrative file exists. A format
    /// number that is present but unrecognized is not an error; it maps to
    /// [`WorkingCopyFormat::Unknown`].
    pub fn detect(root: &Path) -> Result<Self, FormatError> {
        let admin = root.join(".svn");

        let wc_db = admin.join("wc.db");
        if wc_db.is_file() {
            return Ok(Self::from_format_number(read_sqlite_user_version(&wc_db)?));
        }

        let entries = admin.join("entries");
        if entries.is_file() {
            let text = fs::read_to_string(&entries)?;
            let number = text
                .lines()
                .next()
                .and_then(|line| line.trim().parse().ok())
                .unwrap_or(-1);
            return Ok(Self::from_format_number(number));
        }

        Err(FormatError::NotAWorkingCopy(root.to_path_buf()))
    }

    /// Position in protocol evolution order.
    ///
    /// `None` for `Unknown`, which is not ordered against real formats.
    fn sequence(&self) -> Option<u8> {
        match self {
            WorkingCopyFormat::OneSix => Some(1),
            WorkingCopyFormat::OneSeven => Some(2),
            WorkingCopyFormat::OneEight => Some(3),
            WorkingCopyFormat::Unknown => None,
        }
    }

    /// Whether this format is `other` or a successor of it.
    ///
    /// `Unknown` is never at least anything, and nothing is at least
    /// `Unknown`.
    pub fn is_or_greater(&self, other: WorkingCopyFormat) -> bool {
        match (self.sequence(), other.sequence()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }

    /// Whether this format is literally one of `supported`.
    ///
    /// No range semantics: a format not present in the set is rejected even
    /// if it sits between two supported formats.
    pub fn is_any_of(&self, supported: &[WorkingCopyFormat]) -> bool {
        supported.contains(self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkingCopyFormat::OneSix => "1.6",
            WorkingCopyFormat::OneSeven => "1.7",
            WorkingCopyFormat::OneEight => "1.8",
            WorkingCopyFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WorkingCopyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Read the user version field out of an SQLite file header.
fn read_sqlite_user_version(path: &Path) -> Result<i32, FormatError> {
    let mut header = [0u8; SQLITE_USER_VERSION_OFFSET + 4];
    let mut file = fs::File::open(path)?;
    file.read_exact(&mut header)?;

    if !header.starts_with(SQLITE_MAGIC) {
        // Present but not an SQLite store; treat as an unrecognized format.
        return Ok(-1);
    }
    let bytes: [u8; 4] = header[SQLITE_USER_VERSION_OFFSET..SQLITE_USER_VERSION_OFFSET + 4]
        .try_into()
        .map_err(|_| io::Error::other("short sqlite header"))?;
    Ok(i32::from_be_bytes(bytes))
}

/// Executable version, `MAJOR.MINOR.PATCH`.
///
/// Derive order: field order gives the protocol ordering (major, then
/// minor, then patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the version probe output.
    ///
    /// The probe (`svn --version --quiet`) prints a line such as
    /// `1.14.2` or `1.14.2 (r1234)`; only the first whitespace-separated
    /// token is interpreted.
    ///
    /// # Errors
    ///
    /// Returns `FormatError::UnparseableVersion` if the first token is not
    /// three dot-separated integers.
    pub fn parse(output: &str) -> Result<Self, FormatError> {
        let token = output
            .split_whitespace()
            .next()
            .ok_or_else(|| FormatError::UnparseableVersion(output.to_string()))?;

        let mut parts = token.split('.');
        let mut next = || -> Option<u32> { parts.next()?.parse().ok() };

        match (next(), next(), next()) {
            (Some(major), Some(minor), Some(patch)) => Ok(Version::new(major, minor, patch)),
            _ => Err(FormatError::UnparseableVersion(output.to_string())),
        }
    }

    /// Whether this version is `other` or newer.
    pub fn is_at_least(&self, other: Version) -> bool {
        *self >= other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod working_copy_format {
        use super::*;

        #[test]
        fn known_numbers() {
            assert_eq!(
                WorkingCopyFormat::from_format_number(10),
                WorkingCopyFormat::OneSix
            );
            assert_eq!(
                WorkingCopyFormat::from_format_number(29),
                WorkingCopyFormat::OneSeven
            );
            assert_eq!(
                WorkingCopyFormat::from_format_number(31),
                WorkingCopyFormat::OneEight
            );
        }

        #[test]
        fn unknown_number_never_coerces() {
            for n in [0, 9, 11, 28, 30, 32, 100, -1] {
                assert_eq!(
                    WorkingCopyFormat::from_format_number(n),
                    WorkingCopyFormat::Unknown
                );
            }
        }

        #[test]
        fn ordering_matches_evolution() {
            assert!(WorkingCopyFormat::OneEight.is_or_greater(WorkingCopyFormat::OneSix));
            assert!(WorkingCopyFormat::OneSeven.is_or_greater(WorkingCopyFormat::OneSeven));
            assert!(!WorkingCopyFormat::OneSix.is_or_greater(WorkingCopyFormat::OneSeven));
        }

        #[test]
        fn unknown_fails_every_comparison() {
            assert!(!WorkingCopyFormat::Unknown.is_or_greater(WorkingCopyFormat::OneSix));
            assert!(!WorkingCopyFormat::OneEight.is_or_greater(WorkingCopyFormat::Unknown));
            assert!(!WorkingCopyFormat::Unknown.is_or_greater(WorkingCopyFormat::Unknown));
        }

        #[test]
        fn supported_set_is_literal() {
            let supported = [WorkingCopyFormat::OneSix, WorkingCopyFormat::OneEight];
            assert!(WorkingCopyFormat::OneSix.is_any_of(&supported));
            // 1.7 sits between two supported formats but is not in the set.
            assert!(!WorkingCopyFormat::OneSeven.is_any_of(&supported));
            assert!(!WorkingCopyFormat::Unknown.is_any_of(&supported));
        }
    }

    mod detection {
        use super::*;
        use tempfile::TempDir;

        /// Minimal SQLite header carrying `user_version`.
        fn fake_wc_db(user_version: i32) -> Vec<u8> {
            let mut bytes = vec![0u8; 100];
            bytes[..SQLITE_MAGIC.len()].copy_from_slice(SQLITE_MAGIC);
            bytes[SQLITE_USER_VERSION_OFFSET..SQLITE_USER_VERSION_OFFSET + 4]
                .copy_from_slice(&user_version.to_be_bytes());
            bytes
        }

        fn working_copy_with_db(user_version: i32) -> TempDir {
            let dir = TempDir::new().unwrap();
            fs::create_dir(dir.path().join(".svn")).unwrap();
            fs::write(dir.path().join(".svn/wc.db"), fake_wc_db(user_version)).unwrap();
            dir
        }

        #[test]
        fn sqlite_user_version_maps_to_format() {
            let dir = working_copy_with_db(31);
            assert_eq!(
                WorkingCopyFormat::detect(dir.path()).unwrap(),
                WorkingCopyFormat::OneEight
            );
        }

        #[test]
        fn unrecognized_user_version_is_unknown() {
            let dir = working_copy_with_db(99);
            assert_eq!(
                WorkingCopyFormat::detect(dir.path()).unwrap(),
                WorkingCopyFormat::Unknown
            );
        }

        #[test]
        fn entries_first_line_maps_to_format() {
            let dir = TempDir::new().unwrap();
            fs::create_dir(dir.path().join(".svn")).unwrap();
            fs::write(dir.path().join(".svn/entries"), "10\ntrunk\n").unwrap();
            assert_eq!(
                WorkingCopyFormat::detect(dir.path()).unwrap(),
                WorkingCopyFormat::OneSix
            );
        }

        #[test]
        fn missing_admin_dir_is_an_error() {
            let dir = TempDir::new().unwrap();
            let err = WorkingCopyFormat::detect(dir.path()).unwrap_err();
            assert!(matches!(err, FormatError::NotAWorkingCopy(_)));
        }

        #[test]
        fn non_sqlite_db_is_unknown() {
            let dir = TempDir::new().unwrap();
            fs::create_dir(dir.path().join(".svn")).unwrap();
            fs::write(dir.path().join(".svn/wc.db"), vec![0u8; 100]).unwrap();
            assert_eq!(
                WorkingCopyFormat::detect(dir.path()).unwrap(),
                WorkingCopyFormat::Unknown
            );
        }
    }

    mod version {
        use super::*;

        #[test]
        fn parse_plain() {
            let v = Version::parse("1.14.2").unwrap();
            assert_eq!(v, Version::new(1, 14, 2));
        }

        #[test]
        fn parse_with_revision_suffix() {
            let v = Version::parse("1.14.2 (r1234)").unwrap();
            assert_eq!(v, Version::new(1, 14, 2));
        }

        #[test]
        fn parse_with_trailing_newline() {
            let v = Version::parse("1.9.7\n").unwrap();
            assert_eq!(v, Version::new(1, 9, 7));
        }

        #[test]
        fn parse_rejects_garbage() {
            assert!(Version::parse("").is_err());
            assert!(Version::parse("svn, version 1.14.2").is_err());
            assert!(Version::parse("1.14").is_err());
            assert!(Version::parse("one.two.three").is_err());
        }

        #[test]
        fn ordering() {
            let v1 = Version::new(1, 6, 17);
            let v2 = Version::new(1, 7, 0);
            let v3 = Version::new(1, 14, 2);
            assert!(!v1.is_at_least(v2));
            assert!(v3.is_at_least(v1));
            assert!(v2.is_at_least(v2));
            assert!(v1 < v2 && v2 < v3);
        }

        #[test]
        fn patch_breaks_ties() {
            assert!(Version::new(1, 8, 1).is_at_least(Version::new(1, 8, 0)));
            assert!(!Version::new(1, 8, 0).is_at_least(Version::new(1, 8, 1)));
        }
    }
}
