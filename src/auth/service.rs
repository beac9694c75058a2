//! auth::service
//!
//! The authentication service backing the runtime's retry loop.
//!
//! # Scoping
//!
//! One service instance exists per top-level operation. The credential
//! cache and the "already requested" set share that lifetime: a given
//! `(kind, realm)` yields usable material at most once per instance,
//! whether it comes from the cache or from the user. This is what bounds
//! the runtime's retry loop - once a pair is marked requested, re-consulting
//! it yields `None` and the loop stops.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;

use super::cache::CredentialCache;
use super::trust::{certificate_realm, CertificateInfo, PlatformTrustStore, TrustDecision};
use super::{Credential, CredentialKind, InteractiveProvider};
use crate::config::RuntimeConfig;

/// Errors from the authentication service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Failed to prepare the sandboxed credential store.
    #[error("failed to prepare sandboxed credential store: {0}")]
    Sandbox(#[from] io::Error),
}

/// Resolves credentials and trust decisions per `(kind, realm)`.
pub struct AuthenticationService {
    config: Arc<RuntimeConfig>,
    cache: CredentialCache,
    requested: HashSet<(CredentialKind, String)>,
    provider: Option<Arc<dyn InteractiveProvider>>,
    trust_store: Arc<dyn PlatformTrustStore>,
    sandbox: Option<TempDir>,
}

impl AuthenticationService {
    pub fn new(
        config: Arc<RuntimeConfig>,
        provider: Option<Arc<dyn InteractiveProvider>>,
        trust_store: Arc<dyn PlatformTrustStore>,
    ) -> Self {
        Self {
            config,
            cache: CredentialCache::new(),
            requested: HashSet::new(),
            provider,
            trust_store,
            sandbox: None,
        }
    }

    /// Whether interactive fallback is available.
    fn interactive(&self) -> bool {
        self.config.interactive && self.provider.is_some()
    }

    /// Seed the cache, e.g. from a persisted credential store.
    pub fn preload(&mut self, kind: CredentialKind, realm: &str, credential: Credential) {
        self.cache.put(kind, realm, credential);
    }

    /// Read access to the cache, mainly for diagnostics.
    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Resolve a credential for `(kind, realm)`.
    ///
    /// Algorithm:
    ///
    /// 1. Cache lookup (exact, then parent-realm fallback). A hit is
    ///    returned once per instance lifetime.
    /// 2. Interactive fallback, asked at most once per `(kind, realm)`.
    ///    A successful answer is written back into the cache (subject to
    ///    `store_credentials`).
    /// 3. Otherwise `None` - the caller treats the challenge as fatal.
    pub fn resolve(&mut self, kind: CredentialKind, realm: &str) -> Option<Credential> {
        let key = (kind, realm.to_string());
        let already_requested = self.requested.contains(&key);

        if !already_requested {
            if let Some(found) = self.cache.get(kind, realm) {
                let found = found.clone();
                debug!(kind = %kind, realm, "credential cache hit");
                self.requested.insert(key);
                return Some(found);
            }
        }

        if self.interactive() && !already_requested {
            self.requested.insert(key);
            let provider = self.provider.as_ref()?;
            if let Some(credential) = provider.request_credential(kind, realm) {
                if self.config.store_credentials {
                    self.cache.put(kind, realm, credential.clone());
                }
                debug!(kind = %kind, realm, "credential obtained interactively");
                return Some(credential);
            }
            debug!(kind = %kind, realm, "user declined credential prompt");
            return None;
        }

        debug!(kind = %kind, realm, already_requested, "no credential available");
        None
    }

    /// Resolve trust for a presented server certificate.
    ///
    /// Layered check: cached acceptance, then the platform trust store,
    /// then interactive accept (at most once per realm). Returns `None`
    /// when no decision is obtainable - distinct from an explicit
    /// `Some(Rejected)`, which callers must treat as terminal.
    pub fn accept_certificate(
        &mut self,
        url: &str,
        info: &CertificateInfo,
    ) -> Option<TrustDecision> {
        let realm = certificate_realm(url);

        // Passive: a previously accepted certificate for this realm.
        if let Some(Credential::ServerTrust {
            fingerprint,
            permanent,
        }) = self.cache.get(CredentialKind::SslServer, &realm)
        {
            let same_certificate = info.fingerprint.is_empty() || *fingerprint == info.fingerprint;
            if same_certificate {
                debug!(realm, "certificate accepted from cache");
                return Some(if *permanent {
                    TrustDecision::AcceptedPermanently
                } else {
                    TrustDecision::AcceptedTemporarily
                });
            }
        }

        // Platform trust store: trusted chains are accepted without
        // prompting.
        if self.trust_store.is_trusted(info) {
            debug!(realm, "certificate trusted by the platform store");
            self.remember_trust(&realm, info, true);
            return Some(TrustDecision::AcceptedPermanently);
        }

        // Interactive, once per realm.
        let key = (CredentialKind::SslServer, realm.clone());
        if self.interactive() && !self.requested.contains(&key) {
            self.requested.insert(key);
            let provider = self.provider.as_ref()?;
            let decision = provider.accept_certificate(url, &realm, info, true);
            match decision {
                TrustDecision::Rejected => {
                    debug!(realm, "certificate rejected by user");
                }
                TrustDecision::AcceptedPermanently => self.remember_trust(&realm, info, true),
                TrustDecision::AcceptedTemporarily => self.remember_trust(&realm, info, false),
            }
            return Some(decision);
        }

        None
    }

    fn remember_trust(&mut self, realm: &str, info: &CertificateInfo, permanent: bool) {
        self.cache.put(
            CredentialKind::SslServer,
            realm,
            Credential::ServerTrust {
                fingerprint: info.fingerprint.clone(),
                permanent,
            },
        );
    }

    /// Sandboxed copy of the persistent credential/config directory.
    ///
    /// Created lazily on first use and removed when the service is dropped.
    /// Operations that must not touch the user's real credential store pass
    /// this directory to the executable instead.
    pub fn sandboxed_config_dir(&mut self) -> Result<&Path, AuthError> {
        if self.sandbox.is_none() {
            let dir = tempfile::Builder::new().prefix("svnbridge-auth-").tempdir()?;
            if let Some(source) = self.config.resolved_config_dir() {
                if source.is_dir() {
                    copy_dir_recursive(&source, dir.path())?;
                }
            }
            debug!(path = %dir.path().display(), "sandboxed credential store created");
            self.sandbox = Some(dir);
        }
        match &self.sandbox {
            Some(dir) => Ok(dir.path()),
            None => Err(AuthError::Sandbox(io::Error::other(
                "sandbox initialization failed",
            ))),
        }
    }
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            copy_dir_recursive(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        }
        // Symlinks in a credential store are not followed.
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mock::{FixedTrustStore, ScriptedProvider};
    use crate::auth::NoPlatformTrust;

    fn config(interactive: bool) -> Arc<RuntimeConfig> {
        Arc::new(RuntimeConfig {
            interactive,
            ..Default::default()
        })
    }

    fn password(user: &str) -> Credential {
        Credential::Password {
            username: user.to_string(),
            password: "pw".to_string(),
        }
    }

    mod resolve {
        use super::*;

        #[test]
        fn cache_hit_returned_once() {
            let mut service = AuthenticationService::new(
                config(false),
                None,
                Arc::new(NoPlatformTrust),
            );
            service.preload(CredentialKind::Password, "https://host/repo", password("a"));

            assert_eq!(
                service.resolve(CredentialKind::Password, "https://host/repo"),
                Some(password("a"))
            );
            // Second consult for the same pair makes no further progress.
            assert_eq!(
                service.resolve(CredentialKind::Password, "https://host/repo"),
                None
            );
        }

        #[test]
        fn parent_realm_fallback() {
            let mut service = AuthenticationService::new(
                config(false),
                None,
                Arc::new(NoPlatformTrust),
            );
            service.preload(CredentialKind::Password, "https://host/repo", password("a"));

            assert_eq!(
                service.resolve(CredentialKind::Password, "https://host/repo/sub"),
                Some(password("a"))
            );
            assert_eq!(
                service.resolve(CredentialKind::Password, "https://otherhost"),
                None
            );
        }

        #[test]
        fn non_interactive_miss_is_none() {
            let mut service = AuthenticationService::new(
                config(false),
                None,
                Arc::new(NoPlatformTrust),
            );
            assert_eq!(
                service.resolve(CredentialKind::Password, "https://host"),
                None
            );
        }

        #[test]
        fn interactive_asked_at_most_once() {
            let provider = Arc::new(ScriptedProvider::with_credentials(vec![
                password("from-user"),
                password("from-user"),
                password("from-user"),
            ]));
            let mut service = AuthenticationService::new(
                config(true),
                Some(provider.clone()),
                Arc::new(NoPlatformTrust),
            );

            assert_eq!(
                service.resolve(CredentialKind::Password, "https://host"),
                Some(password("from-user"))
            );
            // Re-consulting the same pair twice more never reaches the
            // provider again.
            assert_eq!(service.resolve(CredentialKind::Password, "https://host"), None);
            assert_eq!(service.resolve(CredentialKind::Password, "https://host"), None);
            assert_eq!(provider.credential_requests(), 1);
        }

        #[test]
        fn asked_once_even_with_caching_disabled() {
            let provider = Arc::new(ScriptedProvider::with_credentials(vec![
                password("x"),
                password("x"),
                password("x"),
            ]));
            let no_store = Arc::new(RuntimeConfig {
                interactive: true,
                store_credentials: false,
                ..Default::default()
            });
            let mut service = AuthenticationService::new(
                no_store,
                Some(provider.clone()),
                Arc::new(NoPlatformTrust),
            );

            service.resolve(CredentialKind::Password, "https://host");
            service.resolve(CredentialKind::Password, "https://host");
            service.resolve(CredentialKind::Password, "https://host");
            assert_eq!(provider.credential_requests(), 1);
        }

        #[test]
        fn caching_disabled_skips_writeback() {
            let provider = Arc::new(ScriptedProvider::with_credentials(vec![password("x")]));
            let no_store = Arc::new(RuntimeConfig {
                interactive: true,
                store_credentials: false,
                ..Default::default()
            });
            let mut service = AuthenticationService::new(
                no_store,
                Some(provider),
                Arc::new(NoPlatformTrust),
            );

            assert!(service
                .resolve(CredentialKind::Password, "https://host")
                .is_some());
            assert!(service.cache().is_empty());
        }

        #[test]
        fn decline_is_remembered() {
            let provider = Arc::new(ScriptedProvider::with_credentials(vec![]));
            let mut service = AuthenticationService::new(
                config(true),
                Some(provider.clone()),
                Arc::new(NoPlatformTrust),
            );

            assert_eq!(service.resolve(CredentialKind::Password, "https://host"), None);
            assert_eq!(service.resolve(CredentialKind::Password, "https://host"), None);
            assert_eq!(provider.credential_requests(), 1);
        }

        #[test]
        fn distinct_realms_are_independent() {
            let provider = Arc::new(ScriptedProvider::with_credentials(vec![
                password("a"),
                password("b"),
            ]));
            let mut service = AuthenticationService::new(
                config(true),
                Some(provider.clone()),
                Arc::new(NoPlatformTrust),
            );

            assert!(service
                .resolve(CredentialKind::Password, "https://host-a")
                .is_some());
            assert!(service
                .resolve(CredentialKind::Password, "https://host-b")
                .is_some());
            assert_eq!(provider.credential_requests(), 2);
        }
    }

    mod accept_certificate {
        use super::*;

        #[test]
        fn platform_store_accepts_without_prompting() {
            let provider = Arc::new(ScriptedProvider::with_credentials(vec![]));
            let mut service = AuthenticationService::new(
                config(true),
                Some(provider.clone()),
                Arc::new(FixedTrustStore::trusting()),
            );

            let info = CertificateInfo::from_challenge("svn.example.com");
            assert_eq!(
                service.accept_certificate("https://svn.example.com/repo", &info),
                Some(TrustDecision::AcceptedPermanently)
            );
            assert_eq!(provider.certificate_requests(), 0);
        }

        #[test]
        fn accepted_decision_is_cached_for_the_realm() {
            let provider = Arc::new(ScriptedProvider::accepting_temporarily());
            let mut service = AuthenticationService::new(
                config(true),
                Some(provider.clone()),
                Arc::new(NoPlatformTrust),
            );

            let info = CertificateInfo::from_challenge("host");
            assert_eq!(
                service.accept_certificate("https://host/repo", &info),
                Some(TrustDecision::AcceptedTemporarily)
            );
            // Second check for the same server hits the cache passively.
            assert_eq!(
                service.accept_certificate("https://host/other", &info),
                Some(TrustDecision::AcceptedTemporarily)
            );
            assert_eq!(provider.certificate_requests(), 1);
        }

        #[test]
        fn rejection_is_not_cached() {
            let provider = Arc::new(ScriptedProvider::rejecting());
            let mut service = AuthenticationService::new(
                config(true),
                Some(provider),
                Arc::new(NoPlatformTrust),
            );

            let info = CertificateInfo::from_challenge("host");
            assert_eq!(
                service.accept_certificate("https://host/repo", &info),
                Some(TrustDecision::Rejected)
            );
            assert!(service.cache().is_empty());
            // Re-asking the same realm makes no further progress.
            assert_eq!(service.accept_certificate("https://host/repo", &info), None);
        }

        #[test]
        fn non_interactive_without_trust_is_none() {
            let mut service = AuthenticationService::new(
                config(false),
                None,
                Arc::new(NoPlatformTrust),
            );
            let info = CertificateInfo::from_challenge("host");
            assert_eq!(service.accept_certificate("https://host/repo", &info), None);
        }
    }

    mod sandbox {
        use super::*;
        use std::fs;

        #[test]
        fn copies_persistent_store_and_cleans_up() {
            let source = tempfile::tempdir().unwrap();
            fs::create_dir(source.path().join("auth")).unwrap();
            fs::write(source.path().join("auth").join("svn.simple"), b"entry").unwrap();

            let config = Arc::new(RuntimeConfig {
                config_dir: Some(source.path().to_path_buf()),
                ..Default::default()
            });
            let mut service =
                AuthenticationService::new(config, None, Arc::new(NoPlatformTrust));

            let sandbox_path = {
                let path = service.sandboxed_config_dir().unwrap();
                assert!(path.join("auth").join("svn.simple").is_file());
                path.to_path_buf()
            };
            // Repeated calls reuse the same sandbox.
            assert_eq!(service.sandboxed_config_dir().unwrap(), sandbox_path);

            drop(service);
            assert!(!sandbox_path.exists());
        }
    }
}
