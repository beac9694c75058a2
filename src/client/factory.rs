//! client::factory
//!
//! Maps `(operation, backend family)` to a client constructor.
//!
//! # Design
//!
//! The registry is a closed table of plain constructor functions built at
//! factory construction. There is no runtime discovery: every backend the
//! factory can produce is named in [`ClientFactory::new`], so an
//! unregistered combination is a hard [`FactoryError::NotRegistered`]
//! rather than a silent fallback.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::format::WorkingCopyFormat;

use super::cli::{
    CliAddClient, CliCheckoutClient, CliCommitClient, CliDiffClient, CliInfoClient,
    CliLockClient, CliUpdateClient,
};
use super::library::{
    LibraryAdapter, LibraryAddClient, LibraryCheckoutClient, LibraryCommitClient,
    LibraryLockClient, LibraryUpdateClient,
};
use super::traits::{
    AddClient, CheckoutClient, CommitClient, DiffClient, InfoClient, LockClient, UpdateClient,
};
use super::{select_family, BackendFamily, ClientContext, ClientError, OperationKind};

/// Client construction failures.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// No constructor registered for the combination.
    #[error("no {family} backend registered for {operation}")]
    NotRegistered {
        operation: OperationKind,
        family: BackendFamily,
    },

    /// A constructor produced a client of the wrong operation. Indicates a
    /// registration bug, not a caller error.
    #[error("registered constructor for {operation} produced a different client")]
    Mismatched { operation: OperationKind },

    /// A library constructor was selected but the context carries no
    /// adapter.
    #[error("library backend selected for {operation} but no adapter is configured")]
    AdapterMissing { operation: OperationKind },
}

/// A constructed client of any operation.
pub enum AnyClient {
    Add(Arc<dyn AddClient>),
    Checkout(Arc<dyn CheckoutClient>),
    Commit(Arc<dyn CommitClient>),
    Diff(Arc<dyn DiffClient>),
    Info(Arc<dyn InfoClient>),
    Lock(Arc<dyn LockClient>),
    Update(Arc<dyn UpdateClient>),
}

type ClientCtor = fn(&Arc<ClientContext>) -> Result<AnyClient, FactoryError>;

fn adapter_of(
    context: &Arc<ClientContext>,
    operation: OperationKind,
) -> Result<Arc<dyn LibraryAdapter>, FactoryError> {
    context
        .adapter()
        .cloned()
        .ok_or(FactoryError::AdapterMissing { operation })
}

/// Produces clients for the backend family appropriate to a working copy.
pub struct ClientFactory {
    context: Arc<ClientContext>,
    registry: HashMap<(OperationKind, BackendFamily), ClientCtor>,
}

impl ClientFactory {
    pub fn new(context: Arc<ClientContext>) -> Self {
        let mut registry: HashMap<(OperationKind, BackendFamily), ClientCtor> = HashMap::new();

        registry.insert((OperationKind::Add, BackendFamily::Cli), |context| {
            Ok(AnyClient::Add(Arc::new(CliAddClient::new(context.clone()))))
        });
        registry.insert((OperationKind::Checkout, BackendFamily::Cli), |context| {
            Ok(AnyClient::Checkout(Arc::new(CliCheckoutClient::new(
                context.clone(),
            ))))
        });
        registry.insert((OperationKind::Commit, BackendFamily::Cli), |context| {
            Ok(AnyClient::Commit(Arc::new(CliCommitClient::new(
                context.clone(),
            ))))
        });
        registry.insert((OperationKind::Diff, BackendFamily::Cli), |context| {
            Ok(AnyClient::Diff(Arc::new(CliDiffClient::new(context.clone()))))
        });
        registry.insert((OperationKind::Info, BackendFamily::Cli), |context| {
            Ok(AnyClient::Info(Arc::new(CliInfoClient::new(context.clone()))))
        });
        registry.insert((OperationKind::Lock, BackendFamily::Cli), |context| {
            Ok(AnyClient::Lock(Arc::new(CliLockClient::new(context.clone()))))
        });
        registry.insert((OperationKind::Update, BackendFamily::Cli), |context| {
            Ok(AnyClient::Update(Arc::new(CliUpdateClient::new(
                context.clone(),
            ))))
        });

        registry.insert((OperationKind::Add, BackendFamily::Library), |context| {
            let adapter = adapter_of(context, OperationKind::Add)?;
            Ok(AnyClient::Add(Arc::new(LibraryAddClient::new(adapter))))
        });
        registry.insert((OperationKind::Checkout, BackendFamily::Library), |context| {
            let adapter = adapter_of(context, OperationKind::Checkout)?;
            Ok(AnyClient::Checkout(Arc::new(LibraryCheckoutClient::new(adapter))))
        });
        registry.insert((OperationKind::Commit, BackendFamily::Library), |context| {
            let adapter = adapter_of(context, OperationKind::Commit)?;
            Ok(AnyClient::Commit(Arc::new(LibraryCommitClient::new(adapter))))
        });
        registry.insert((OperationKind::Lock, BackendFamily::Library), |context| {
            let adapter = adapter_of(context, OperationKind::Lock)?;
            Ok(AnyClient::Lock(Arc::new(LibraryLockClient::new(adapter))))
        });
        registry.insert((OperationKind::Update, BackendFamily::Library), |context| {
            let adapter = adapter_of(context, OperationKind::Update)?;
            Ok(AnyClient::Update(Arc::new(LibraryUpdateClient::new(adapter))))
        });

        Self { context, registry }
    }

    /// Which family would serve `operation` against `format`.
    pub fn family_for(
        &self,
        operation: OperationKind,
        format: WorkingCopyFormat,
    ) -> Result<BackendFamily, ClientError> {
        select_family(operation, format, self.context.adapter().is_some())
    }

    fn create(
        &self,
        operation: OperationKind,
        format: WorkingCopyFormat,
    ) -> Result<AnyClient, ClientError> {
        let family = self.family_for(operation, format)?;
        let ctor = self.registry.get(&(operation, family)).ok_or(
            FactoryError::NotRegistered { operation, family },
        )?;
        Ok(ctor(&self.context)?)
    }

    pub fn create_add_client(
        &self,
        format: WorkingCopyFormat,
    ) -> Result<Arc<dyn AddClient>, ClientError> {
        match self.create(OperationKind::Add, format)? {
            AnyClient::Add(client) => Ok(client),
            _ => Err(FactoryError::Mismatched {
                operation: OperationKind::Add,
            }
            .into()),
        }
    }

    pub fn create_checkout_client(
        &self,
        format: WorkingCopyFormat,
    ) -> Result<Arc<dyn CheckoutClient>, ClientError> {
        match self.create(OperationKind::Checkout, format)? {
            AnyClient::Checkout(client) => Ok(client),
            _ => Err(FactoryError::Mismatched {
                operation: OperationKind::Checkout,
            }
            .into()),
        }
    }

    pub fn create_commit_client(
        &self,
        format: WorkingCopyFormat,
    ) -> Result<Arc<dyn CommitClient>, ClientError> {
        match self.create(OperationKind::Commit, format)? {
            AnyClient::Commit(client) => Ok(client),
            _ => Err(FactoryError::Mismatched {
                operation: OperationKind::Commit,
            }
            .into()),
        }
    }

    pub fn create_diff_client(
        &self,
        format: WorkingCopyFormat,
    ) -> Result<Arc<dyn DiffClient>, ClientError> {
        match self.create(OperationKind::Diff, format)? {
            AnyClient::Diff(client) => Ok(client),
            _ => Err(FactoryError::Mismatched {
                operation: OperationKind::Diff,
            }
            .into()),
        }
    }

    pub fn create_info_client(
        &self,
        format: WorkingCopyFormat,
    ) -> Result<Arc<dyn InfoClient>, ClientError> {
        match self.create(OperationKind::Info, format)? {
            AnyClient::Info(client) => Ok(client),
            _ => Err(FactoryError::Mismatched {
                operation: OperationKind::Info,
            }
            .into()),
        }
    }

    pub fn create_lock_client(
        &self,
        format: WorkingCopyFormat,
    ) -> Result<Arc<dyn LockClient>, ClientError> {
        match self.create(OperationKind::Lock, format)? {
            AnyClient::Lock(client) => Ok(client),
            _ => Err(FactoryError::Mismatched {
                operation: OperationKind::Lock,
            }
            .into()),
        }
    }

    pub fn create_update_client(
        &self,
        format: WorkingCopyFormat,
    ) -> Result<Arc<dyn UpdateClient>, ClientError> {
        match self.create(OperationKind::Update, format)? {
            AnyClient::Update(client) => Ok(client),
            _ => Err(FactoryError::Mismatched {
                operation: OperationKind::Update,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NoPlatformTrust;
    use crate::client::mock::MockLibraryAdapter;
    use crate::config::RuntimeConfig;

    fn factory(adapter: Option<Arc<dyn LibraryAdapter>>) -> ClientFactory {
        ClientFactory::new(Arc::new(ClientContext::new(
            Arc::new(RuntimeConfig::default()),
            None,
            Arc::new(NoPlatformTrust),
            adapter,
        )))
    }

    #[test]
    fn cli_clients_need_no_adapter() {
        let factory = factory(None);
        for format in [WorkingCopyFormat::OneSix, WorkingCopyFormat::OneEight] {
            factory.create_update_client(format).unwrap();
            factory.create_commit_client(format).unwrap();
        }
    }

    #[test]
    fn library_family_serves_modern_formats() {
        let factory = factory(Some(Arc::new(MockLibraryAdapter::default())));
        let family = factory
            .family_for(OperationKind::Update, WorkingCopyFormat::OneEight)
            .unwrap();
        assert_eq!(family, BackendFamily::Library);
        factory.create_update_client(WorkingCopyFormat::OneEight).unwrap();
    }

    #[test]
    fn diff_never_goes_through_the_library() {
        let factory = factory(Some(Arc::new(MockLibraryAdapter::default())));
        let family = factory
            .family_for(OperationKind::Diff, WorkingCopyFormat::OneEight)
            .unwrap();
        assert_eq!(family, BackendFamily::Cli);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let factory = factory(None);
        let err = factory
            .create_checkout_client(WorkingCopyFormat::Unknown)
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::UnsupportedFormat(_)));
    }

    #[test]
    fn empty_registry_reports_not_registered() {
        let mut factory = factory(None);
        factory.registry.clear();
        let err = factory
            .create_update_client(WorkingCopyFormat::OneEight)
            .err()
            .unwrap();
        match err {
            ClientError::Factory(FactoryError::NotRegistered { operation, family }) => {
                assert_eq!(operation, OperationKind::Update);
                assert_eq!(family, BackendFamily::Cli);
            }
            other => panic!("expected NotRegistered, got {:?}", other),
        }
    }
}
