//! Mock storage provider

use async_trait::async_trait;
use keel_cloud::{
    AuthStatus, Backend, CloudError, CloudProvider, ConfiguredDefinition, Console,
    ProviderResource, ResourceKind, Result, Session,
};
use std::sync::Arc;

use crate::bucket::MockBucket;
use crate::options::MockOptions;

const KINDS: [ResourceKind; 1] = [ResourceKind::Bucket];

/// Provider managing mock buckets on any backend
pub struct MockProvider {
    backend: Arc<dyn Backend>,
    options: MockOptions,
}

impl MockProvider {
    pub fn new(backend: Arc<dyn Backend>, options: MockOptions) -> Self {
        Self { backend, options }
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn display_name(&self) -> &str {
        "Mock Storage"
    }

    fn kinds(&self) -> &[ResourceKind] {
        &KINDS
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok(format!("{} backend", self.backend.name())))
    }

    async fn open_session(&self, console: Arc<dyn Console>) -> Result<Arc<Session>> {
        Session::open(self.name(), Arc::clone(&self.backend), console, &[]).await
    }

    fn new_adapter(
        &self,
        session: &Arc<Session>,
        definition: Arc<ConfiguredDefinition>,
    ) -> Result<Box<dyn ProviderResource>> {
        match definition.kind {
            ResourceKind::Bucket => Ok(Box::new(MockBucket::new(
                session,
                definition,
                self.options.clone(),
            )?)),
            kind => Err(CloudError::Unsupported(format!(
                "{} does not manage {} resources",
                self.display_name(),
                kind
            ))),
        }
    }
}
