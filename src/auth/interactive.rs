//! auth::interactive
//!
//! Plain-terminal implementation of the interactive provider.
//!
//! # Design
//!
//! Prompts go to stderr so they never mix with operation output on stdout.
//! Passwords and passphrases are read without echo. Every read failure is
//! treated as a decline - the service then reports the challenge as
//! unresolvable instead of erroring.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use super::trust::{CertificateInfo, TrustDecision};
use super::{Credential, CredentialKind, InteractiveProvider};

/// Interactive provider that prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalProvider;

impl TerminalProvider {
    pub fn new() -> Self {
        Self
    }

    fn read_line(prompt: &str) -> Option<String> {
        eprint!("{}", prompt);
        io::stderr().flush().ok()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn read_secret(prompt: &str) -> Option<String> {
        rpassword::prompt_password(prompt).ok().filter(|s| !s.is_empty())
    }
}

impl InteractiveProvider for TerminalProvider {
    fn request_credential(&self, kind: CredentialKind, realm: &str) -> Option<Credential> {
        eprintln!("Authentication realm: {}", realm);
        match kind {
            CredentialKind::Password => {
                let username = Self::read_line("Username: ")?;
                let password = Self::read_secret("Password: ")?;
                Some(Credential::Password { username, password })
            }
            CredentialKind::Username => {
                Self::read_line("Username: ").map(Credential::Username)
            }
            CredentialKind::Ssh => {
                let username = Self::read_line("Username: ")?;
                let key_path = Self::read_line("SSH key file: ").map(PathBuf::from)?;
                let passphrase = Self::read_secret("Passphrase (empty for none): ");
                Some(Credential::SshKey {
                    username,
                    key_path,
                    passphrase,
                })
            }
            CredentialKind::SslClient => {
                let cert_path = Self::read_line("Client certificate file: ").map(PathBuf::from)?;
                let passphrase = Self::read_secret("Passphrase (empty for none): ");
                Some(Credential::SslClientCert {
                    cert_path,
                    passphrase,
                })
            }
            // Server trust goes through accept_certificate, never here.
            CredentialKind::SslServer => None,
        }
    }

    fn accept_certificate(
        &self,
        _url: &str,
        realm: &str,
        info: &CertificateInfo,
        allow_permanent: bool,
    ) -> TrustDecision {
        eprintln!("Error validating server certificate for '{}':", realm);
        eprintln!(" - Hostname: {}", info.hostname);
        if !info.fingerprint.is_empty() {
            eprintln!(" - Fingerprint: {}", info.fingerprint);
        }
        if let Some(issuer) = &info.issuer {
            eprintln!(" - Issuer: {}", issuer);
        }

        let prompt = if allow_permanent {
            "(R)eject, accept (t)emporarily or accept (p)ermanently? "
        } else {
            "(R)eject or accept (t)emporarily? "
        };
        match Self::read_line(prompt).as_deref() {
            Some("t") | Some("T") => TrustDecision::AcceptedTemporarily,
            Some("p") | Some("P") if allow_permanent => TrustDecision::AcceptedPermanently,
            _ => TrustDecision::Rejected,
        }
    }
}
