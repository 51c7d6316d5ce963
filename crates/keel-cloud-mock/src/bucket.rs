//! Mock storage bucket
//!
//! Buckets are not listed up front; every load reads the backend directly.

use async_trait::async_trait;
use keel_cloud::{
    AuditAccumulator, AuditCategory, ConfiguredDefinition, Console, DeployedSnapshot,
    ProviderResource, Result, Session, StepContext,
};
use std::sync::Arc;

use crate::options::MockOptions;

pub struct MockBucket {
    definition: Arc<ConfiguredDefinition>,
    session: Arc<Session>,
    options: MockOptions,
    deployed: Option<DeployedSnapshot>,
}

impl MockBucket {
    pub fn new(
        session: &Arc<Session>,
        definition: Arc<ConfiguredDefinition>,
        options: MockOptions,
    ) -> Result<Self> {
        tracing::debug!("Initializing Mock Bucket {:?}", definition.name);
        options.check("bkt.New")?;
        Ok(Self {
            definition,
            session: Arc::clone(session),
            options,
            deployed: None,
        })
    }
}

#[async_trait]
impl ProviderResource for MockBucket {
    fn definition(&self) -> &Arc<ConfiguredDefinition> {
        &self.definition
    }

    fn deployed(&self) -> Option<&DeployedSnapshot> {
        self.deployed.as_ref()
    }

    async fn load(&mut self) -> Result<()> {
        tracing::debug!("Loading Mock Bucket {:?}", self.definition.name);
        self.options.check("bkt.Load")?;
        self.deployed = self.session.lookup(&self.definition).await?;
        Ok(())
    }

    async fn create(&mut self, _flags: &[String]) -> Result<()> {
        let name = &self.definition.name;
        self.session
            .console()
            .info(&format!("Creating Mock Bucket {:?}", name));
        self.options.check("bkt.Create")?;
        let created = self
            .session
            .backend()
            .create(self.definition.kind, name)
            .await
            .step(|| format!("create bucket {}", name))?;

        // Re-read for the identity the backend assigned
        let current = self
            .session
            .refresh(&self.definition)
            .await
            .step(|| format!("load bucket {}", name))?;
        if current.is_none() {
            tracing::warn!("bucket {} not readable yet after creation", name);
        }
        self.deployed = current.or(Some(created));
        Ok(())
    }

    async fn destroy(&mut self, _flags: &[String]) -> Result<()> {
        let name = &self.definition.name;
        self.session
            .console()
            .info(&format!("Destroying Mock Bucket {:?}", name));
        self.options.check("bkt.Destroy")?;
        self.session
            .backend()
            .delete(self.definition.kind, name)
            .await
            .step(|| format!("delete bucket {}", name))?;
        self.deployed = None;
        Ok(())
    }

    async fn provision(&mut self, _flags: &[String]) -> Result<()> {
        self.session
            .console()
            .info(&format!("Provisioning Mock Bucket {:?}", self.definition.name));
        self.options.check("bkt.Provision")
    }

    fn audit(&self, accumulator: &mut AuditAccumulator) -> Result<()> {
        self.options.check("bkt.Audit")?;
        if self.destroyed() {
            accumulator.record(AuditCategory::Configured, self.definition.name.clone());
        }
        Ok(())
    }

    fn info(&self, console: &dyn Console) {
        console.info("Mock Bucket");
        console.detail(&format!("{:<20}\t{}", "name", self.definition.name));
        console.detail(&format!(
            "{:<20}\t{}",
            "region",
            self.definition.region.as_deref().unwrap_or("-")
        ));
        if let Some(deployed) = &self.deployed {
            console.detail(&format!("{:<20}\t{}", "id", deployed.id));
        }
    }
}
