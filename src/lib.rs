//! svnbridge - backend dispatch and execution for Subversion clients
//!
//! svnbridge exposes a uniform operation interface ("add", "checkout",
//! "commit", "diff", "lock", ...) against a Subversion repository while
//! executing each operation through one of two interchangeable backends: an
//! embedded library adapter and the external `svn` executable.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`protocol`] - Closed vocabulary enums shared by both backends
//! - [`format`] - Working-copy format and executable version compatibility
//! - [`config`] - Immutable runtime configuration
//! - [`command`] - Command model, subprocess executor, and retry runtime
//! - [`auth`] - Credential resolution and certificate trust
//! - [`client`] - Operation interfaces and the backend factory
//! - [`progress`] - Progress event sink and cooperative cancellation
//!
//! # Correctness Invariants
//!
//! svnbridge maintains the following invariants:
//!
//! 1. A factory never hands out a partially-wired operation client
//! 2. A spawned process is owned by exactly one executor and never reused
//! 3. The authentication retry loop stops as soon as it cannot make progress
//! 4. Cancellation kills the child process and propagates distinctly from
//!    failure

pub mod auth;
pub mod client;
pub mod command;
pub mod config;
pub mod format;
pub mod progress;
pub mod protocol;
