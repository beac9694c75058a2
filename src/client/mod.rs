//! client
//!
//! Backend dispatch for working-copy operations.
//!
//! # Design
//!
//! Two backend families produce clients: an embedded library adapter and
//! the external command-line executable. Which family serves a given
//! operation depends on the working copy's on-disk format, whether an
//! adapter is present, and a small set of operations that are pinned to
//! the command line regardless. The [`ClientFactory`] owns the mapping;
//! callers ask it for a typed client and never see the selection logic.
//!
//! Selection is deterministic for a given `(operation, format, adapter)`
//! triple. An unrecognized format never falls through to a guess; it is an
//! error, because running the wrong backend against a newer working copy
//! can corrupt it.

mod cli;
mod factory;
mod library;
pub mod mock;
mod traits;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::auth::{AuthenticationService, InteractiveProvider, PlatformTrustStore};
use crate::command::{CommandError, CommandRuntime};
use crate::config::RuntimeConfig;
use crate::format::WorkingCopyFormat;

pub use cli::{
    CliAddClient, CliCheckoutClient, CliCommitClient, CliDiffClient, CliInfoClient,
    CliLockClient, CliUpdateClient,
};
pub use factory::{AnyClient, ClientFactory, FactoryError};
pub use library::{
    LibraryAdapter, LibraryAddClient, LibraryCheckoutClient, LibraryCommitClient, LibraryError,
    LibraryLockClient, LibraryUpdateClient,
};
pub use traits::{
    AddClient, CheckoutClient, CommitClient, DiffClient, EntryInfo, InfoClient, LockClient,
    UpdateClient,
};

/// Errors surfaced by client construction and execution.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying command attempt failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The embedded library reported a failure.
    #[error("library backend: {0}")]
    Backend(String),

    /// The working copy format has no backend that can serve it.
    #[error("no backend supports working copy format {0}")]
    UnsupportedFormat(WorkingCopyFormat),

    /// Client construction failed.
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// The executable produced output the client could not interpret.
    #[error("malformed output: {0}")]
    MalformedOutput(String),
}

/// The operations the factory can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Add,
    Checkout,
    Commit,
    Diff,
    Info,
    Lock,
    Update,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Add => "add",
            OperationKind::Checkout => "checkout",
            OperationKind::Commit => "commit",
            OperationKind::Diff => "diff",
            OperationKind::Info => "info",
            OperationKind::Lock => "lock",
            OperationKind::Update => "update",
        };
        f.write_str(name)
    }
}

/// Backend family that produced (or would produce) a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendFamily {
    /// In-process library adapter.
    Library,
    /// External command-line executable.
    Cli,
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendFamily::Library => "library",
            BackendFamily::Cli => "cli",
        })
    }
}

/// Working-copy formats the library adapter can operate on.
const LIBRARY_SUPPORTED_FORMATS: &[WorkingCopyFormat] =
    &[WorkingCopyFormat::OneSeven, WorkingCopyFormat::OneEight];

/// Operations pinned to the command line even when a library adapter is
/// available. Diff output must be byte-identical to the executable's, and
/// `info` is interpreted from the executable's key-value output.
fn requires_cli(operation: OperationKind) -> bool {
    matches!(operation, OperationKind::Diff | OperationKind::Info)
}

/// Pick the backend family for one operation.
///
/// # Errors
///
/// `UnsupportedFormat` when the format is unknown, since neither family
/// can be trusted with it.
pub fn select_family(
    operation: OperationKind,
    format: WorkingCopyFormat,
    adapter_present: bool,
) -> Result<BackendFamily, ClientError> {
    if format == WorkingCopyFormat::Unknown {
        return Err(ClientError::UnsupportedFormat(format));
    }
    if requires_cli(operation) {
        return Ok(BackendFamily::Cli);
    }
    if adapter_present && format.is_any_of(LIBRARY_SUPPORTED_FORMATS) {
        return Ok(BackendFamily::Library);
    }
    Ok(BackendFamily::Cli)
}

/// Shared state every client is constructed over.
///
/// The context is cheap to share; each operation that reaches the command
/// line builds its own [`CommandRuntime`] (and therefore its own
/// authentication bookkeeping) from it.
pub struct ClientContext {
    config: Arc<RuntimeConfig>,
    interactive: Option<Arc<dyn InteractiveProvider>>,
    trust_store: Arc<dyn PlatformTrustStore>,
    adapter: Option<Arc<dyn LibraryAdapter>>,
}

impl ClientContext {
    pub fn new(
        config: Arc<RuntimeConfig>,
        interactive: Option<Arc<dyn InteractiveProvider>>,
        trust_store: Arc<dyn PlatformTrustStore>,
        adapter: Option<Arc<dyn LibraryAdapter>>,
    ) -> Self {
        Self {
            config,
            interactive,
            trust_store,
            adapter,
        }
    }

    pub fn config(&self) -> &Arc<RuntimeConfig> {
        &self.config
    }

    pub fn adapter(&self) -> Option<&Arc<dyn LibraryAdapter>> {
        self.adapter.as_ref()
    }

    /// Fresh runtime for one operation. Never shared between operations.
    pub fn new_runtime(&self) -> CommandRuntime {
        let auth = AuthenticationService::new(
            self.config.clone(),
            self.interactive.clone(),
            self.trust_store.clone(),
        );
        CommandRuntime::new(self.config.clone(), auth)
    }
}
