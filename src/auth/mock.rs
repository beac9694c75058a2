//! auth::mock
//!
//! Scripted providers for tests.
//!
//! Kept in the library (not behind `cfg(test)`) so integration tests and
//! downstream consumers can drive the authentication service without a
//! terminal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::trust::{CertificateInfo, PlatformTrustStore, TrustDecision};
use super::{Credential, CredentialKind, InteractiveProvider};

/// Interactive provider that answers from a prepared script.
///
/// Credential requests pop from a queue (empty queue = user declines);
/// certificate requests always answer with one fixed decision. Both are
/// counted.
pub struct ScriptedProvider {
    credentials: Mutex<Vec<Credential>>,
    trust_answer: TrustDecision,
    credential_requests: AtomicUsize,
    certificate_requests: AtomicUsize,
}

impl ScriptedProvider {
    /// Provider that hands out the given credentials in order, then
    /// declines, and rejects every certificate.
    pub fn with_credentials(mut credentials: Vec<Credential>) -> Self {
        credentials.reverse(); // pop() from the back = original order
        Self {
            credentials: Mutex::new(credentials),
            trust_answer: TrustDecision::Rejected,
            credential_requests: AtomicUsize::new(0),
            certificate_requests: AtomicUsize::new(0),
        }
    }

    /// Provider that declines credentials and accepts certificates
    /// permanently.
    pub fn accepting_permanently() -> Self {
        Self::with_trust(TrustDecision::AcceptedPermanently)
    }

    /// Provider that declines credentials and accepts certificates for the
    /// current operation only.
    pub fn accepting_temporarily() -> Self {
        Self::with_trust(TrustDecision::AcceptedTemporarily)
    }

    /// Provider that declines credentials and rejects certificates.
    pub fn rejecting() -> Self {
        Self::with_trust(TrustDecision::Rejected)
    }

    fn with_trust(trust_answer: TrustDecision) -> Self {
        Self {
            credentials: Mutex::new(Vec::new()),
            trust_answer,
            credential_requests: AtomicUsize::new(0),
            certificate_requests: AtomicUsize::new(0),
        }
    }

    /// How many times a credential was requested.
    pub fn credential_requests(&self) -> usize {
        self.credential_requests.load(Ordering::SeqCst)
    }

    /// How many times a certificate decision was requested.
    pub fn certificate_requests(&self) -> usize {
        self.certificate_requests.load(Ordering::SeqCst)
    }
}

impl InteractiveProvider for ScriptedProvider {
    fn request_credential(&self, _kind: CredentialKind, _realm: &str) -> Option<Credential> {
        self.credential_requests.fetch_add(1, Ordering::SeqCst);
        self.credentials
            .lock()
            .expect("scripted provider lock poisoned")
            .pop()
    }

    fn accept_certificate(
        &self,
        _url: &str,
        _realm: &str,
        _info: &CertificateInfo,
        _allow_permanent: bool,
    ) -> TrustDecision {
        self.certificate_requests.fetch_add(1, Ordering::SeqCst);
        self.trust_answer
    }
}

/// Platform trust store with a fixed answer.
#[derive(Debug)]
pub struct FixedTrustStore {
    trusted: bool,
}

impl FixedTrustStore {
    /// Store that trusts every chain.
    pub fn trusting() -> Self {
        Self { trusted: true }
    }

    /// Store that trusts nothing.
    pub fn distrusting() -> Self {
        Self { trusted: false }
    }
}

impl PlatformTrustStore for FixedTrustStore {
    fn is_trusted(&self, _info: &CertificateInfo) -> bool {
        self.trusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_handed_out_in_order() {
        let provider = ScriptedProvider::with_credentials(vec![
            Credential::Username("first".to_string()),
            Credential::Username("second".to_string()),
        ]);

        assert_eq!(
            provider.request_credential(CredentialKind::Username, "realm"),
            Some(Credential::Username("first".to_string()))
        );
        assert_eq!(
            provider.request_credential(CredentialKind::Username, "realm"),
            Some(Credential::Username("second".to_string()))
        );
        assert_eq!(
            provider.request_credential(CredentialKind::Username, "realm"),
            None
        );
        assert_eq!(provider.credential_requests(), 3);
    }

    #[test]
    fn trust_answer_is_fixed() {
        let provider = ScriptedProvider::accepting_permanently();
        let info = CertificateInfo::from_challenge("host");
        assert_eq!(
            provider.accept_certificate("https://host", "https://host", &info, true),
            TrustDecision::AcceptedPermanently
        );
        assert_eq!(provider.certificate_requests(), 1);
    }
}
