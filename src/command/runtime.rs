//! command::runtime
//!
//! The retry state machine around the external executable.
//!
//! # State machine
//!
//! Build -> Attempt -> Classify, per logical call:
//!
//! - `Completed` - exit 0 with no challenge marker; return the output.
//! - `Challenged` - stderr matched an authentication or certificate
//!   challenge; consult the authentication service and, if it produced new
//!   material, attempt again with that material injected.
//! - `Fatal` - any other non-zero exit; wrap stderr and return.
//!
//! There is no fixed retry counter. The loop stops as soon as a challenge
//! cannot make progress: the service hands out material for a given
//! `(kind, realm)` at most once per instance, so a server that keeps
//! rejecting the same credential exhausts the loop on the second attempt.
//!
//! # Challenge detection
//!
//! The primary signal is the executable's structured `E`-codes in stderr
//! (`E170001` authorization failed, `E215004` credentials exhausted,
//! `E230001` certificate verification). Human-readable substrings are kept
//! as a fallback for executables that predate stable codes; they are
//! locale-dependent and deliberately secondary.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::executor::{CommandExecutor, ExecutionOutput, LineSink};
use super::request::CommandRequest;
use super::CommandError;
use crate::auth::{
    certificate_realm, kinds_for_url, AuthenticationService, CertificateInfo, Credential,
    TrustDecision,
};
use crate::config::RuntimeConfig;
use crate::format::Version;
use crate::progress::{ProgressEvent, ProgressTracker};
use crate::protocol::EventAction;

/// Structured error codes that mark a credential challenge.
const AUTH_ERROR_CODES: &[&str] = &["E170001", "E215004"];

/// Structured error codes that mark a certificate challenge.
const TRUST_ERROR_CODES: &[&str] = &["E230001"];

/// Locale-default fallback markers for credential challenges.
const AUTH_MARKERS: &[&str] = &["authorization failed", "authentication failed"];

/// Locale-default fallback markers for certificate challenges.
const TRUST_MARKERS: &[&str] = &["server certificate verification failed"];

/// What kind of challenge an attempt surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    /// The server rejected (or demanded) credentials.
    Credentials,
    /// The server's certificate could not be verified.
    ServerTrust,
}

/// Classification of one finished attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Clean success.
    Completed(ExecutionOutput),
    /// A challenge that may be resolved by new authentication material.
    Challenged {
        challenge: Challenge,
        output: ExecutionOutput,
    },
    /// Any other failure. Not retried.
    Fatal { exit_code: i32, stderr: String },
}

/// Classify a finished attempt.
///
/// Exit 0 with a challenge marker still counts as a challenge; some
/// executables print the marker on a side channel before failing later.
pub fn classify_outcome(output: ExecutionOutput) -> AttemptOutcome {
    let challenge = detect_challenge(&output.stderr_text);
    match challenge {
        None if output.exit_code == 0 => AttemptOutcome::Completed(output),
        Some(challenge) => AttemptOutcome::Challenged { challenge, output },
        None => AttemptOutcome::Fatal {
            exit_code: output.exit_code,
            stderr: output.stderr_text.trim().to_string(),
        },
    }
}

/// Detect a challenge marker in stderr.
///
/// Certificate markers win over credential markers: a verification failure
/// often drags an authorization failure along with it, and retrying with
/// different credentials cannot fix an untrusted certificate.
pub fn detect_challenge(stderr: &str) -> Option<Challenge> {
    let lower = stderr.to_lowercase();
    if TRUST_ERROR_CODES.iter().any(|code| stderr.contains(code))
        || TRUST_MARKERS.iter().any(|marker| lower.contains(marker))
    {
        return Some(Challenge::ServerTrust);
    }
    if AUTH_ERROR_CODES.iter().any(|code| stderr.contains(code))
        || AUTH_MARKERS.iter().any(|marker| lower.contains(marker))
    {
        return Some(Challenge::Credentials);
    }
    None
}

/// Operation-specific parser turning stdout lines into progress events.
pub trait OutputParser: Send + Sync {
    fn parse_line(&self, line: &str) -> Option<ProgressEvent>;
}

/// Parser for update-style output (`A    path`, `U    path`, ...).
#[derive(Debug, Default)]
pub struct UpdateOutputParser;

impl OutputParser for UpdateOutputParser {
    fn parse_line(&self, line: &str) -> Option<ProgressEvent> {
        let mut chars = line.chars();
        let code = chars.next()?;
        let rest = chars.as_str();
        // The action column is one character wide followed by whitespace.
        if !rest.starts_with([' ', '\t']) {
            return None;
        }
        let action = EventAction::from_update_code(code)?;
        let path = rest.trim();
        if path.is_empty() {
            return None;
        }
        Some(ProgressEvent::path_action(path, action))
    }
}

/// Parser for commit-style output (`Adding  path`, `Sending  path`, ...).
#[derive(Debug, Default)]
pub struct CommitOutputParser;

impl OutputParser for CommitOutputParser {
    fn parse_line(&self, line: &str) -> Option<ProgressEvent> {
        let (verb, rest) = line.trim_start().split_once(char::is_whitespace)?;
        let action = EventAction::from_commit_verb(verb)?;
        let path = rest.trim();
        if path.is_empty() {
            return None;
        }
        Some(ProgressEvent::path_action(path, action))
    }
}

/// Bridges the executor's line stream to the caller's progress tracker.
struct ParserSink {
    parser: Arc<dyn OutputParser>,
    tracker: Arc<dyn ProgressTracker>,
}

impl LineSink for ParserSink {
    fn line(&self, line: &str) {
        if let Some(event) = self.parser.parse_line(line) {
            self.tracker.consume(event);
        }
    }
}

/// Executes requests against the external executable with the
/// authentication retry loop.
///
/// One runtime (and therefore one [`AuthenticationService`]) serves one
/// top-level operation. Concurrent operations each construct their own;
/// sharing one would corrupt the other's retry accounting.
pub struct CommandRuntime {
    config: Arc<RuntimeConfig>,
    auth: AuthenticationService,
    sandboxed_credentials: bool,
}

impl CommandRuntime {
    pub fn new(config: Arc<RuntimeConfig>, auth: AuthenticationService) -> Self {
        Self {
            config,
            auth,
            sandboxed_credentials: false,
        }
    }

    /// Run attempts against an isolated copy of the credential store
    /// instead of the user's persistent one. The copy lives as long as the
    /// authentication service and is removed with it.
    pub fn with_sandboxed_credentials(mut self) -> Self {
        self.sandboxed_credentials = true;
        self
    }

    /// Access to the authentication service, e.g. to preload cached
    /// credentials.
    pub fn auth_mut(&mut self) -> &mut AuthenticationService {
        &mut self.auth
    }

    /// Execute one request, retrying through the authentication service on
    /// challenges.
    ///
    /// Stdout lines are streamed through `parser` into `tracker` as they
    /// arrive. The request is consumed: a retried attempt reuses its
    /// argument list but always spawns a fresh process.
    ///
    /// # Errors
    ///
    /// - `Cancelled` when the tracker signals cancellation (checked before
    ///   each spawn and while the process runs)
    /// - `TrustRejected` when a certificate is explicitly rejected
    /// - `AuthenticationExhausted` when a challenge cannot make progress
    /// - `Process` for any other non-zero exit
    pub fn execute(
        &mut self,
        request: CommandRequest,
        tracker: Arc<dyn ProgressTracker>,
        parser: Option<Arc<dyn OutputParser>>,
    ) -> Result<ExecutionOutput, CommandError> {
        let config_dir = if self.sandboxed_credentials {
            Some(self.auth.sandboxed_config_dir()?.to_path_buf())
        } else {
            self.config.config_dir.clone()
        };

        let mut credential_args: Vec<String> = Vec::new();
        let mut trust_args: Vec<String> = Vec::new();
        let mut tried: Vec<Credential> = Vec::new();
        let mut attempt = 0u32;

        loop {
            if tracker.is_cancelled() {
                return Err(CommandError::Cancelled);
            }
            attempt += 1;

            let mut auth_args = credential_args.clone();
            auth_args.extend(trust_args.iter().cloned());
            let args = request.cli_args(config_dir.as_deref(), &auth_args);

            debug!(operation = %request.operation(), attempt, "spawning attempt");
            let sink: Option<Arc<dyn LineSink>> = parser.clone().map(|parser| {
                Arc::new(ParserSink {
                    parser,
                    tracker: tracker.clone(),
                }) as Arc<dyn LineSink>
            });
            let executor = CommandExecutor::spawn(
                &self.config.executable,
                &args,
                request.working_dir_path(),
                sink,
            )?;
            let cancel_tracker = tracker.clone();
            let output = executor.wait(&|| cancel_tracker.is_cancelled(), None)?;

            match classify_outcome(output) {
                AttemptOutcome::Completed(output) => {
                    debug!(operation = %request.operation(), attempt, "completed");
                    return Ok(output);
                }
                AttemptOutcome::Fatal { exit_code, stderr } => {
                    return Err(CommandError::Process { exit_code, stderr });
                }
                AttemptOutcome::Challenged { challenge, output } => {
                    warn!(
                        operation = %request.operation(),
                        attempt,
                        ?challenge,
                        "authentication challenge"
                    );
                    match challenge {
                        Challenge::ServerTrust => self.answer_trust_challenge(
                            &request,
                            &output,
                            &mut trust_args,
                        )?,
                        Challenge::Credentials => self.answer_credential_challenge(
                            &request,
                            &mut credential_args,
                            &mut tried,
                        )?,
                    }
                }
            }
        }
    }

    /// Resolve a certificate challenge or fail the call.
    fn answer_trust_challenge(
        &mut self,
        request: &CommandRequest,
        output: &ExecutionOutput,
        trust_args: &mut Vec<String>,
    ) -> Result<(), CommandError> {
        let url = match request.target_url() {
            Some(url) => url,
            // A certificate challenge against a purely local target cannot
            // be answered; surface the raw failure.
            None => {
                return Err(CommandError::Process {
                    exit_code: output.exit_code,
                    stderr: output.stderr_text.trim().to_string(),
                })
            }
        };
        let realm = certificate_realm(url);
        let info = CertificateInfo::from_challenge(host_of(url));

        match self.auth.accept_certificate(url, &info) {
            Some(TrustDecision::Rejected) => Err(CommandError::TrustRejected { realm }),
            Some(_) if trust_args.is_empty() => {
                trust_args.push("--trust-server-cert-failures".to_string());
                trust_args.push("unknown-ca,cn-mismatch,expired,not-yet-valid,other".to_string());
                Ok(())
            }
            // Acceptance was already applied and the server still
            // challenges, or no decision is obtainable: no progress.
            _ => Err(CommandError::AuthenticationExhausted { realm }),
        }
    }

    /// Resolve a credential challenge or fail the call.
    fn answer_credential_challenge(
        &mut self,
        request: &CommandRequest,
        credential_args: &mut Vec<String>,
        tried: &mut Vec<Credential>,
    ) -> Result<(), CommandError> {
        let realm = request.target_url().unwrap_or("<local>").to_string();
        let kinds = request
            .target_url()
            .map(|url| kinds_for_url(url, true))
            .unwrap_or_default();

        for kind in kinds {
            if let Some(credential) = self.auth.resolve(kind, &realm) {
                let args = credential.cli_args();
                // Material that injects nothing cannot change the next
                // attempt; retrying with it would respawn identically.
                if !args.is_empty() && !tried.contains(&credential) {
                    *credential_args = args;
                    tried.push(credential);
                    return Ok(());
                }
            }
        }
        Err(CommandError::AuthenticationExhausted { realm })
    }
}

/// Probe the executable's version.
///
/// This is a bounded call: it must answer within the configured probe
/// timeout or fail, so a wedged executable cannot hang backend selection.
pub fn probe_version(config: &RuntimeConfig) -> Result<Version, CommandError> {
    let args = vec!["--version".to_string(), "--quiet".to_string()];
    let executor = CommandExecutor::spawn(&config.executable, &args, None, None)?;
    let output = executor.wait(&|| false, Some(Instant::now() + config.probe_timeout()))?;

    if output.timed_out {
        return Err(CommandError::Timeout {
            operation: "--version".to_string(),
            timeout_ms: config.probe_timeout_ms,
        });
    }
    if output.exit_code != 0 {
        return Err(CommandError::Process {
            exit_code: output.exit_code,
            stderr: output.stderr_text.trim().to_string(),
        });
    }
    Ok(Version::parse(&output.stdout_text)?)
}

/// Host portion of a URL, for minimal certificate descriptions.
fn host_of(url: &str) -> String {
    url.split_once("://")
        .map(|(_, rest)| rest.split('/').next().unwrap_or(rest))
        .unwrap_or(url)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32, stderr: &str) -> ExecutionOutput {
        ExecutionOutput {
            exit_code,
            stdout_text: String::new(),
            stdout_raw: Vec::new(),
            stderr_text: stderr.to_string(),
            timed_out: false,
        }
    }

    mod classification {
        use super::*;

        #[test]
        fn clean_exit_is_completed() {
            assert!(matches!(
                classify_outcome(output(0, "")),
                AttemptOutcome::Completed(_)
            ));
        }

        #[test]
        fn structured_auth_code_is_a_challenge() {
            let classified =
                classify_outcome(output(1, "svn: E170001: Authorization failed"));
            assert!(matches!(
                classified,
                AttemptOutcome::Challenged {
                    challenge: Challenge::Credentials,
                    ..
                }
            ));
        }

        #[test]
        fn credentials_exhausted_code_is_a_challenge() {
            let classified = classify_outcome(output(
                1,
                "svn: E215004: No more credentials or we tried too many times",
            ));
            assert!(matches!(
                classified,
                AttemptOutcome::Challenged {
                    challenge: Challenge::Credentials,
                    ..
                }
            ));
        }

        #[test]
        fn certificate_code_is_a_trust_challenge() {
            let classified = classify_outcome(output(
                1,
                "svn: E230001: Server SSL certificate verification failed",
            ));
            assert!(matches!(
                classified,
                AttemptOutcome::Challenged {
                    challenge: Challenge::ServerTrust,
                    ..
                }
            ));
        }

        #[test]
        fn trust_wins_over_credentials() {
            let stderr = "svn: E230001: Server certificate verification failed\n\
                          svn: E170001: Authorization failed";
            assert_eq!(detect_challenge(stderr), Some(Challenge::ServerTrust));
        }

        #[test]
        fn substring_fallback_without_codes() {
            assert_eq!(
                detect_challenge("svn: Authorization failed"),
                Some(Challenge::Credentials)
            );
            assert_eq!(
                detect_challenge("Server certificate verification failed: issuer unknown"),
                Some(Challenge::ServerTrust)
            );
        }

        #[test]
        fn ordinary_failure_is_fatal() {
            let classified = classify_outcome(output(1, "svn: E155007: not a working copy"));
            match classified {
                AttemptOutcome::Fatal { exit_code, stderr } => {
                    assert_eq!(exit_code, 1);
                    assert!(stderr.contains("E155007"));
                }
                other => panic!("expected Fatal, got {:?}", other),
            }
        }

        #[test]
        fn unrelated_error_text_is_not_a_challenge() {
            assert_eq!(detect_challenge("svn: E200009: some paths failed"), None);
            assert_eq!(detect_challenge(""), None);
        }
    }

    mod parsers {
        use super::*;
        use std::path::PathBuf;

        #[test]
        fn update_lines() {
            let parser = UpdateOutputParser;
            let event = parser.parse_line("A    src/main.rs").unwrap();
            assert_eq!(event.action, EventAction::Add);
            assert_eq!(event.path, Some(PathBuf::from("src/main.rs")));

            let event = parser.parse_line("U    docs/notes.txt").unwrap();
            assert_eq!(event.action, EventAction::Update);
        }

        #[test]
        fn update_parser_skips_noise() {
            let parser = UpdateOutputParser;
            assert!(parser.parse_line("Updating '.':").is_none());
            assert!(parser.parse_line("At revision 42.").is_none());
            assert!(parser.parse_line("").is_none());
            assert!(parser.parse_line("A").is_none());
        }

        #[test]
        fn commit_lines() {
            let parser = CommitOutputParser;
            let event = parser.parse_line("Adding         trunk/new.txt").unwrap();
            assert_eq!(event.action, EventAction::CommitAdded);

            let event = parser.parse_line("Sending        trunk/old.txt").unwrap();
            assert_eq!(event.action, EventAction::CommitModified);
        }

        #[test]
        fn commit_parser_skips_noise() {
            let parser = CommitOutputParser;
            assert!(parser.parse_line("Transmitting file data .").is_none());
            assert!(parser.parse_line("Committed revision 43.").is_none());
        }
    }

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("https://svn.example.com:8443/repo"), "svn.example.com:8443");
        assert_eq!(host_of("svn+ssh://host/repo"), "host");
        assert_eq!(host_of("garbage"), "garbage");
    }
}
