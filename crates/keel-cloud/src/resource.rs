//! Provider-agnostic resource
//!
//! A [`Resource`] pairs a configured definition with the one adapter a
//! provider built for it. It adds what every kind shares: idempotency guards
//! on create/destroy, audit target resolution and help text. Everything else
//! is delegated to the adapter.

use async_trait::async_trait;
use std::sync::Arc;

use crate::audit::AuditRegistry;
use crate::console::Console;
use crate::definition::ConfiguredDefinition;
use crate::error::Result;
use crate::provider::{CloudProvider, ProviderResource};
use crate::router::{Command, Lifecycle};
use crate::session::Session;
use crate::state::{DeployedSnapshot, ResourceKind, ResourceState};

pub struct Resource {
    definition: Arc<ConfiguredDefinition>,
    adapter: Box<dyn ProviderResource>,
    console: Arc<dyn Console>,
}

impl Resource {
    /// Build a resource through `provider`'s adapter for its kind
    pub fn new(
        definition: Arc<ConfiguredDefinition>,
        provider: &dyn CloudProvider,
        session: &Arc<Session>,
    ) -> Result<Self> {
        tracing::debug!("Initializing {} {:?}", definition.kind, definition.name);
        let adapter = provider.new_adapter(session, Arc::clone(&definition))?;
        Ok(Self::with_adapter(definition, adapter, session.console_handle()))
    }

    pub fn with_adapter(
        definition: Arc<ConfiguredDefinition>,
        adapter: Box<dyn ProviderResource>,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            definition,
            adapter,
            console,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.definition.kind
    }

    pub fn definition(&self) -> &Arc<ConfiguredDefinition> {
        &self.definition
    }

    pub fn deployed(&self) -> Option<&DeployedSnapshot> {
        self.adapter.deployed()
    }

    pub fn created(&self) -> bool {
        self.adapter.created()
    }

    pub fn destroyed(&self) -> bool {
        self.adapter.destroyed()
    }

    /// A resource is always configured, so it is either pending or reconciled
    pub fn state(&self) -> ResourceState {
        ResourceState::from_sides(self.created(), true)
    }
}

#[async_trait]
impl Lifecycle for Resource {
    fn describe(&self) -> String {
        format!("{} {:?}", self.kind(), self.name())
    }

    async fn load(&mut self) -> Result<()> {
        self.adapter.load().await
    }

    async fn create(&mut self, flags: &[String]) -> Result<()> {
        if self.created() {
            self.console
                .detail(&format!("{} exists, skipping...", self.kind().title()));
            return Ok(());
        }
        self.adapter.create(flags).await
    }

    async fn destroy(&mut self, flags: &[String]) -> Result<()> {
        if self.destroyed() {
            self.console
                .detail(&format!("{} does not exist, skipping...", self.kind().title()));
            return Ok(());
        }
        self.adapter.destroy(flags).await
    }

    async fn provision(&mut self, flags: &[String]) -> Result<()> {
        self.adapter.provision(flags).await
    }

    fn audit(&self, flags: &[String], audits: &mut AuditRegistry) -> Result<()> {
        let accumulator = audits.target(flags)?;
        self.adapter.audit(accumulator)
    }

    fn info(&self) {
        if self.destroyed() {
            return;
        }
        self.adapter.info(self.console.as_ref());
    }

    fn print_config(&self) {
        self.definition.print(self.console.as_ref());
    }

    fn help(&self) {
        let kind = self.kind();
        let name = self.name();
        let commands = [
            (Command::Create, format!("create {} {}", kind, name)),
            (Command::Destroy, format!("destroy {} {}", kind, name)),
            (Command::Provision, format!("update {} {}", kind, name)),
            (Command::Audit, format!("audit {} {}", kind, name)),
            (Command::Info, format!("show information about allocated {}", kind)),
            (Command::Config, format!("show the configuration for the given {}", kind)),
            (Command::Help, "show this help".to_string()),
        ];
        self.console.info(&format!("Usage: {} {} <command>", kind, name));
        for (command, description) in commands {
            self.console
                .detail(&format!("{:<12}{}", command.as_str(), description));
        }
    }
}
