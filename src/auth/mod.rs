//! auth
//!
//! Credential resolution and certificate trust.
//!
//! # Design
//!
//! The [`AuthenticationService`] backs the command runtime's retry loop. It
//! is constructed fresh for each top-level operation: its credential cache
//! and "already requested" bookkeeping are scoped to that one operation and
//! must never be shared across concurrent operations.
//!
//! Interactive prompting is a caller-supplied capability
//! ([`InteractiveProvider`]); this module never draws UI beyond the plain
//! terminal implementation in [`interactive`].
//!
//! # Security
//!
//! Credentials must never appear in logs, error messages, or `Debug`
//! output. [`Credential`] has a redacting `Debug` implementation for this
//! reason.

mod cache;
mod interactive;
pub mod mock;
mod service;
mod trust;

pub use cache::CredentialCache;
pub use interactive::TerminalProvider;
pub use service::{AuthError, AuthenticationService};
pub use trust::{
    certificate_realm, CertificateInfo, NoPlatformTrust, PlatformTrustStore, TrustDecision,
};

use std::fmt;
use std::path::PathBuf;

/// The kinds of credential a server may challenge for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Username/password pair.
    Password,
    /// Bare username (tunnel schemes resolve this separately).
    Username,
    /// SSH key and optional passphrase.
    Ssh,
    /// Client certificate presented to the server.
    SslClient,
    /// Trust decision for the server's own certificate.
    SslServer,
}

impl CredentialKind {
    /// Stable name used in cache keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Password => "password",
            CredentialKind::Username => "username",
            CredentialKind::Ssh => "ssh",
            CredentialKind::SslClient => "ssl-client",
            CredentialKind::SslServer => "ssl-server",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An opaque credential value.
///
/// Equality is used by the retry loop to decide whether newly resolved
/// material differs from what was just tried.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Username/password pair.
    Password {
        username: String,
        password: String,
    },
    /// Bare username.
    Username(String),
    /// SSH private key with optional passphrase.
    SshKey {
        username: String,
        key_path: PathBuf,
        passphrase: Option<String>,
    },
    /// Client certificate with optional passphrase.
    SslClientCert {
        cert_path: PathBuf,
        passphrase: Option<String>,
    },
    /// Accepted server certificate, keyed by fingerprint.
    ServerTrust {
        fingerprint: String,
        permanent: bool,
    },
}

impl Credential {
    /// The kind this credential satisfies.
    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::Password { .. } => CredentialKind::Password,
            Credential::Username(_) => CredentialKind::Username,
            Credential::SshKey { .. } => CredentialKind::Ssh,
            Credential::SslClientCert { .. } => CredentialKind::SslClient,
            Credential::ServerTrust { .. } => CredentialKind::SslServer,
        }
    }

    /// CLI arguments that inject this credential into an attempt.
    ///
    /// SSH keys are injected by overriding the tunnel command
    /// (`config:tunnels:ssh`), since the executable has no dedicated key
    /// option. `BatchMode` stops the spawned `ssh` from prompting inside a
    /// non-interactive attempt; a key passphrase cannot be passed to `ssh`
    /// on its command line, so an encrypted key must already be loaded into
    /// the agent. Server trust contributes nothing here; the runtime
    /// injects it through dedicated trust arguments.
    pub fn cli_args(&self) -> Vec<String> {
        match self {
            Credential::Password { username, password } => vec![
                "--username".to_string(),
                username.clone(),
                "--password".to_string(),
                password.clone(),
            ],
            Credential::Username(username) => {
                vec!["--username".to_string(), username.clone()]
            }
            Credential::SshKey {
                username, key_path, ..
            } => vec![
                "--config-option".to_string(),
                format!(
                    "config:tunnels:ssh=ssh -o BatchMode=yes -i {} -l {}",
                    key_path.display(),
                    username
                ),
            ],
            Credential::SslClientCert {
                cert_path,
                passphrase,
            } => {
                let mut args = vec![
                    "--config-option".to_string(),
                    format!(
                        "servers:global:ssl-client-cert-file={}",
                        cert_path.display()
                    ),
                ];
                if let Some(passphrase) = passphrase {
                    args.push("--config-option".to_string());
                    args.push(format!(
                        "servers:global:ssl-client-cert-password={}",
                        passphrase
                    ));
                }
                args
            }
            Credential::ServerTrust { .. } => Vec::new(),
        }
    }
}

// Redacting Debug: never leak secret material into logs or errors.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credential::Username(username) => {
                f.debug_tuple("Username").field(username).finish()
            }
            Credential::SshKey {
                username, key_path, ..
            } => f
                .debug_struct("SshKey")
                .field("username", username)
                .field("key_path", key_path)
                .field("passphrase", &"<redacted>")
                .finish(),
            Credential::SslClientCert { cert_path, .. } => f
                .debug_struct("SslClientCert")
                .field("cert_path", cert_path)
                .field("passphrase", &"<redacted>")
                .finish(),
            Credential::ServerTrust {
                fingerprint,
                permanent,
            } => f
                .debug_struct("ServerTrust")
                .field("fingerprint", fingerprint)
                .field("permanent", permanent)
                .finish(),
        }
    }
}

/// Caller-supplied interactive prompt capability.
///
/// Both methods are synchronous; the runtime blocks on them. Implementations
/// must be `Send + Sync` because challenges can surface from operations
/// running on different threads.
pub trait InteractiveProvider: Send + Sync {
    /// Ask the user for a credential of `kind` scoped to `realm`.
    ///
    /// Returns `None` if the user declines.
    fn request_credential(&self, kind: CredentialKind, realm: &str) -> Option<Credential>;

    /// Ask the user whether to trust a server certificate.
    ///
    /// `allow_permanent` indicates whether a permanent acceptance may be
    /// offered (it may not when the credential store is sandboxed).
    fn accept_certificate(
        &self,
        url: &str,
        realm: &str,
        info: &CertificateInfo,
        allow_permanent: bool,
    ) -> TrustDecision;
}

/// Ordered credential kinds that must be resolvable for a URL scheme.
///
/// The runtime asks for each kind in order until one yields usable
/// material for the current challenge.
///
/// # Table
///
/// - `svn+ssh` - SSH key, then a bare username for the tunnel
/// - `https` - password for password challenges, otherwise client
///   certificate then server trust
/// - `http`, `svn` - password
/// - `file` and unrecognized schemes - nothing to resolve
pub fn kinds_for_url(url: &str, is_password_request: bool) -> Vec<CredentialKind> {
    let scheme = match url.split_once("://") {
        Some((scheme, _)) => scheme,
        None => return Vec::new(),
    };
    match scheme {
        "svn+ssh" => vec![CredentialKind::Ssh, CredentialKind::Username],
        "https" => {
            if is_password_request {
                vec![CredentialKind::Password]
            } else {
                vec![CredentialKind::SslClient, CredentialKind::SslServer]
            }
        }
        "http" | "svn" => vec![CredentialKind::Password],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod kinds_table {
        use super::*;

        #[test]
        fn ssh_tunnel_requires_key_then_username() {
            assert_eq!(
                kinds_for_url("svn+ssh://host/repo", true),
                vec![CredentialKind::Ssh, CredentialKind::Username]
            );
        }

        #[test]
        fn https_password_request() {
            assert_eq!(
                kinds_for_url("https://host/repo", true),
                vec![CredentialKind::Password]
            );
        }

        #[test]
        fn https_certificate_request() {
            assert_eq!(
                kinds_for_url("https://host/repo", false),
                vec![CredentialKind::SslClient, CredentialKind::SslServer]
            );
        }

        #[test]
        fn plain_schemes_use_password() {
            assert_eq!(
                kinds_for_url("http://host/repo", true),
                vec![CredentialKind::Password]
            );
            assert_eq!(
                kinds_for_url("svn://host/repo", true),
                vec![CredentialKind::Password]
            );
        }

        #[test]
        fn local_and_garbage_need_nothing() {
            assert!(kinds_for_url("file:///tmp/repo", true).is_empty());
            assert!(kinds_for_url("not a url", true).is_empty());
        }
    }

    mod credential {
        use super::*;

        #[test]
        fn password_cli_args() {
            let cred = Credential::Password {
                username: "alice".to_string(),
                password: "s3cret".to_string(),
            };
            assert_eq!(
                cred.cli_args(),
                vec!["--username", "alice", "--password", "s3cret"]
            );
        }

        #[test]
        fn ssh_key_overrides_the_tunnel_command() {
            let cred = Credential::SshKey {
                username: "alice".to_string(),
                key_path: "/home/alice/.ssh/id_ed25519".into(),
                passphrase: None,
            };
            assert_eq!(
                cred.cli_args(),
                vec![
                    "--config-option",
                    "config:tunnels:ssh=ssh -o BatchMode=yes \
                     -i /home/alice/.ssh/id_ed25519 -l alice",
                ]
            );
        }

        #[test]
        fn client_cert_passphrase_is_injected() {
            let bare = Credential::SslClientCert {
                cert_path: "/certs/client.p12".into(),
                passphrase: None,
            };
            assert_eq!(
                bare.cli_args(),
                vec![
                    "--config-option",
                    "servers:global:ssl-client-cert-file=/certs/client.p12",
                ]
            );

            let locked = Credential::SslClientCert {
                cert_path: "/certs/client.p12".into(),
                passphrase: Some("hunter2".to_string()),
            };
            assert_eq!(
                locked.cli_args(),
                vec![
                    "--config-option",
                    "servers:global:ssl-client-cert-file=/certs/client.p12",
                    "--config-option",
                    "servers:global:ssl-client-cert-password=hunter2",
                ]
            );
        }

        #[test]
        fn trust_contributes_no_cli_args() {
            let cred = Credential::ServerTrust {
                fingerprint: "ab:cd".to_string(),
                permanent: true,
            };
            assert!(cred.cli_args().is_empty());
        }

        #[test]
        fn debug_redacts_secrets() {
            let cred = Credential::Password {
                username: "alice".to_string(),
                password: "s3cret".to_string(),
            };
            let rendered = format!("{:?}", cred);
            assert!(rendered.contains("alice"));
            assert!(!rendered.contains("s3cret"));

            let key = Credential::SshKey {
                username: "bob".to_string(),
                key_path: "/home/bob/.ssh/id_ed25519".into(),
                passphrase: Some("hunter2".to_string()),
            };
            assert!(!format!("{:?}", key).contains("hunter2"));
        }

        #[test]
        fn kind_matches_variant() {
            assert_eq!(
                Credential::Username("alice".to_string()).kind(),
                CredentialKind::Username
            );
        }
    }
}
