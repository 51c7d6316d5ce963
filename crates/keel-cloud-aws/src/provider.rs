//! AWS IAM provider implementation

use async_trait::async_trait;
use keel_cloud::{
    AuthStatus, Backend, CloudError, CloudProvider, ConfiguredDefinition, Console,
    ProviderResource, ResourceKind, Result, Session,
};
use std::sync::Arc;

use crate::group::IamGroup;
use crate::policy::AWS_MANAGED;
use crate::user::IamUser;

const KINDS: [ResourceKind; 2] = [ResourceKind::Group, ResourceKind::User];

/// AWS IAM provider
///
/// Groups and users are listed once per session into reconciliation caches,
/// then matched by name as adapters load.
pub struct IamProvider {
    backend: Arc<dyn Backend>,
    account: String,
}

impl IamProvider {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            account: AWS_MANAGED.to_string(),
        }
    }

    /// Account owning customer-managed policies referenced by bare name
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        let account = account.into();
        if !account.is_empty() {
            self.account = account;
        }
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

#[async_trait]
impl CloudProvider for IamProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "AWS IAM"
    }

    fn kinds(&self) -> &[ResourceKind] {
        &KINDS
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        match self.backend.list(ResourceKind::Group, None).await {
            Ok(_) => Ok(AuthStatus::ok(format!(
                "{} (account {})",
                self.backend.name(),
                self.account
            ))),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn open_session(&self, console: Arc<dyn Console>) -> Result<Arc<Session>> {
        Session::open(self.name(), Arc::clone(&self.backend), console, &KINDS).await
    }

    fn new_adapter(
        &self,
        session: &Arc<Session>,
        definition: Arc<ConfiguredDefinition>,
    ) -> Result<Box<dyn ProviderResource>> {
        match definition.kind {
            ResourceKind::Group => Ok(Box::new(IamGroup::new(session, definition, &self.account))),
            ResourceKind::User => Ok(Box::new(IamUser::new(session, definition, &self.account))),
            kind => Err(CloudError::Unsupported(format!(
                "{} does not manage {} resources",
                self.display_name(),
                kind
            ))),
        }
    }
}
