//! auth::trust
//!
//! Server certificate trust resolution.
//!
//! # Design
//!
//! Trust is a specialization of credential resolution. A presented server
//! certificate is checked in layers:
//!
//! 1. a previously accepted certificate cached for this realm (passive,
//!    no I/O)
//! 2. the platform trust store, behind the [`PlatformTrustStore`] seam
//! 3. interactive accept/reject
//!
//! Only non-rejected decisions are written back into the credential cache.
//! A rejection is terminal for the current operation and is never retried
//! with different username/password material.

use std::fmt;

use chrono::{DateTime, Utc};

/// Outcome of a certificate trust check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// Trust this certificate and remember the decision.
    AcceptedPermanently,
    /// Trust this certificate for the current operation only.
    AcceptedTemporarily,
    /// Do not trust this certificate. Terminal for the operation.
    Rejected,
}

impl TrustDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            TrustDecision::AcceptedPermanently | TrustDecision::AcceptedTemporarily
        )
    }
}

impl fmt::Display for TrustDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrustDecision::AcceptedPermanently => "accepted-permanent",
            TrustDecision::AcceptedTemporarily => "accepted-temporary",
            TrustDecision::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// What is known about a presented server certificate.
///
/// When a challenge arrives through the CLI backend most fields are not
/// available; [`CertificateInfo::from_challenge`] builds the minimal
/// hostname-only description used there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub hostname: String,
    /// Hex fingerprint; empty when the backend did not report one.
    pub fingerprint: String,
    pub issuer: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl CertificateInfo {
    /// Minimal description for a challenge that carried no certificate
    /// details.
    pub fn from_challenge(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            fingerprint: String::new(),
            issuer: None,
            valid_from: None,
            valid_until: None,
        }
    }

    /// Whether the known validity window covers `now`.
    ///
    /// Unknown bounds are treated as covering; this check can only ever
    /// tighten a decision, never loosen one.
    pub fn validity_covers(&self, now: DateTime<Utc>) -> bool {
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return false;
            }
        }
        true
    }
}

/// Seam to the platform's system trust store.
///
/// A certificate trusted here is accepted without prompting.
pub trait PlatformTrustStore: Send + Sync {
    fn is_trusted(&self, info: &CertificateInfo) -> bool;
}

/// Trust store that trusts nothing.
///
/// The default when no platform verifier is wired in; every decision then
/// falls through to the cache or the interactive provider.
#[derive(Debug, Default)]
pub struct NoPlatformTrust;

impl PlatformTrustStore for NoPlatformTrust {
    fn is_trusted(&self, _info: &CertificateInfo) -> bool {
        false
    }
}

/// Certificate-specific realm for a server URL.
///
/// Trust decisions are cached per server, not per repository path, so the
/// realm is the URL root (`scheme://authority`) when one can be
/// extracted.
pub fn certificate_realm(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let authority = rest.split('/').next().unwrap_or(rest);
            format!("{}://{}", scheme, authority)
        }
        None => url.to_string(),
    }
}
