//! Provider trait definitions

use crate::audit::{AuditAccumulator, AuditCategory};
use crate::console::Console;
use crate::definition::ConfiguredDefinition;
use crate::error::Result;
use crate::session::Session;
use crate::state::{DeployedSnapshot, ResourceKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cloud provider abstraction trait
///
/// A provider opens sessions against its backend and builds one adapter per
/// configured resource. Swapping the real provider for a test double is a
/// matter of passing a different provider at construction.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws", "mock")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Resource kinds this provider manages
    fn kinds(&self) -> &[ResourceKind];

    fn supports(&self, kind: ResourceKind) -> bool {
        self.kinds().contains(&kind)
    }

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Open a session, building the reconciliation caches this provider uses
    async fn open_session(&self, console: Arc<dyn Console>) -> Result<Arc<Session>>;

    /// Build the adapter managing one configured resource
    fn new_adapter(
        &self,
        session: &Arc<Session>,
        definition: Arc<ConfiguredDefinition>,
    ) -> Result<Box<dyn ProviderResource>>;
}

/// Backend-specific lifecycle of one resource
///
/// The adapter owns the only answer to "is this resource deployed": its
/// current [`DeployedSnapshot`].
#[async_trait]
pub trait ProviderResource: Send + Sync {
    fn definition(&self) -> &Arc<ConfiguredDefinition>;

    /// Snapshot observed by the last load, create or destroy
    fn deployed(&self) -> Option<&DeployedSnapshot>;

    fn created(&self) -> bool {
        self.deployed().is_some()
    }

    fn destroyed(&self) -> bool {
        !self.created()
    }

    async fn load(&mut self) -> Result<()>;

    async fn create(&mut self, flags: &[String]) -> Result<()>;

    async fn destroy(&mut self, flags: &[String]) -> Result<()>;

    /// Converge an existing resource to its definition. No-op when converged.
    async fn provision(&mut self, flags: &[String]) -> Result<()>;

    /// Record configured-only drift for this resource
    fn audit(&self, accumulator: &mut AuditAccumulator) -> Result<()> {
        if self.destroyed() {
            accumulator.record(AuditCategory::Configured, self.definition().name.clone());
        }
        Ok(())
    }

    fn info(&self, console: &dyn Console);
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}
