//! auth::cache
//!
//! In-memory credential cache with parent-realm fallback.
//!
//! # Design
//!
//! The cache is keyed by `(credential kind, realm)`. A realm may be
//! satisfied by an entry stored under a *parent* realm: when no exact entry
//! exists, the longest cached realm that is a path-prefix of the requested
//! one wins. This lets a credential entered for a host be reused for
//! sub-paths of the same server discovered later.
//!
//! The "asked the user already" bookkeeping deliberately does not live
//! here; it belongs to the owning [`AuthenticationService`] instance, whose
//! lifetime defines the at-most-once window.
//!
//! [`AuthenticationService`]: super::AuthenticationService

use std::collections::HashMap;

use super::{Credential, CredentialKind};

/// In-memory credential cache scoped to one authentication service.
#[derive(Debug, Default)]
pub struct CredentialCache {
    entries: HashMap<(CredentialKind, String), Credential>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential under the exact `(kind, realm)` key.
    pub fn put(&mut self, kind: CredentialKind, realm: &str, credential: Credential) {
        self.entries.insert((kind, realm.to_string()), credential);
    }

    /// Look up by exact key only.
    pub fn get_exact(&self, kind: CredentialKind, realm: &str) -> Option<&Credential> {
        self.entries.get(&(kind, realm.to_string()))
    }

    /// Look up with parent-realm fallback.
    ///
    /// Falls back to the longest cached realm of the same kind that is a
    /// path-prefix of `realm`. Prefix matching respects path boundaries:
    /// `https://host/repo` serves `https://host/repo/sub` but not
    /// `https://host/repository`.
    pub fn get(&self, kind: CredentialKind, realm: &str) -> Option<&Credential> {
        if let Some(found) = self.get_exact(kind, realm) {
            return Some(found);
        }
        self.entries
            .iter()
            .filter(|((entry_kind, entry_realm), _)| {
                *entry_kind == kind && is_parent_realm(entry_realm, realm)
            })
            .max_by_key(|((_, entry_realm), _)| entry_realm.len())
            .map(|(_, credential)| credential)
    }

    /// Remove the exact entry, returning it when present.
    pub fn remove(&mut self, kind: CredentialKind, realm: &str) -> Option<Credential> {
        self.entries.remove(&(kind, realm.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `parent` is a strict path-parent of `child`.
fn is_parent_realm(parent: &str, child: &str) -> bool {
    if parent.is_empty() || !child.starts_with(parent) || parent.len() >= child.len() {
        return false;
    }
    // The character after the prefix must start a new path segment, unless
    // the parent itself already ends with a separator.
    parent.ends_with('/') || child.as_bytes()[parent.len()] == b'/'
}
