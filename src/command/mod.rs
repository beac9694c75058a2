//! command
//!
//! Command model and execution runtime for the external executable.
//!
//! # Architecture
//!
//! A [`CommandRequest`] describes one invocation of the external
//! executable. The [`CommandRuntime`] consumes it exactly once, spawning a
//! [`CommandExecutor`] per attempt and driving the authentication retry
//! loop. Classification of an attempt is an ordinary value
//! ([`runtime::AttemptOutcome`]), never control flow by panic.
//!
//! # Error taxonomy
//!
//! Everything the runtime can surface is a [`CommandError`]. Only
//! challenge-classified failures are recovered locally (by retrying);
//! every other classification is wrapped and returned to the operation
//! client, which does not further interpret it.

use thiserror::Error;

mod executor;
mod request;
pub mod runtime;

pub use executor::{CommandExecutor, ExecutionOutput, LineSink};
pub use request::{CommandRequest, OperationName, Target};
pub use runtime::{
    probe_version, CommandRuntime, CommitOutputParser, OutputParser, UpdateOutputParser,
};

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Non-zero exit unrelated to authentication.
    #[error("process exited with code {exit_code}: {stderr}")]
    Process {
        /// Exit code (or -1 when killed by a signal).
        exit_code: i32,
        /// Captured stderr text.
        stderr: String,
    },

    /// A bounded call exceeded its deadline.
    #[error("'{operation}' timed out after {timeout_ms} ms")]
    Timeout {
        /// The operation that was bounded.
        operation: String,
        /// The deadline that elapsed.
        timeout_ms: u64,
    },

    /// The challenge loop could make no further progress.
    ///
    /// Distinct from [`CommandError::Process`] so callers can offer a
    /// "retry with different credentials" experience.
    #[error("authentication exhausted for realm '{realm}'")]
    AuthenticationExhausted {
        /// Realm the last challenge was scoped to.
        realm: String,
    },

    /// The server certificate was explicitly rejected. Never retried.
    #[error("server certificate rejected for realm '{realm}'")]
    TrustRejected {
        /// Certificate realm of the rejected server.
        realm: String,
    },

    /// Cooperative cancellation was observed.
    ///
    /// Must propagate distinctly from failure; callers do not report it as
    /// an error.
    #[error("operation cancelled")]
    Cancelled,

    /// Spawning or reading the process failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Probe output could not be parsed.
    #[error(transparent)]
    Format(#[from] crate::format::FormatError),

    /// The authentication service failed.
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),

    /// Invariant violation inside the runtime.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// Whether this error is the cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_stderr() {
        let err = CommandError::Process {
            exit_code: 1,
            stderr: "svn: E155007: not a working copy".to_string(),
        };
        let rendered = format!("{}", err);
        assert!(rendered.contains("exited with code 1"));
        assert!(rendered.contains("E155007"));
    }

    #[test]
    fn cancellation_is_distinct() {
        assert!(CommandError::Cancelled.is_cancelled());
        assert!(!CommandError::Process {
            exit_code: 1,
            stderr: String::new()
        }
        .is_cancelled());
    }
}
