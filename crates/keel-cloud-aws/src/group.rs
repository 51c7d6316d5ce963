//! IAM group adapter

use async_trait::async_trait;
use keel_cloud::{
    ConfiguredDefinition, Console, DeployedSnapshot, ProviderResource, Result, Session,
};
use std::sync::Arc;

use crate::entity::IamEntity;

/// Manages one configured IAM group and its managed policies
pub struct IamGroup {
    entity: IamEntity,
}

impl IamGroup {
    pub fn new(session: &Arc<Session>, definition: Arc<ConfiguredDefinition>, account: &str) -> Self {
        Self {
            entity: IamEntity::new(session, definition, account),
        }
    }
}

#[async_trait]
impl ProviderResource for IamGroup {
    fn definition(&self) -> &Arc<ConfiguredDefinition> {
        &self.entity.definition
    }

    fn deployed(&self) -> Option<&DeployedSnapshot> {
        self.entity.deployed.as_ref()
    }

    async fn load(&mut self) -> Result<()> {
        self.entity.load().await
    }

    async fn create(&mut self, _flags: &[String]) -> Result<()> {
        self.entity.create_entity().await?;
        self.entity.attach_policies().await
    }

    async fn destroy(&mut self, _flags: &[String]) -> Result<()> {
        self.entity.detach_policies().await?;
        self.entity.delete_entity().await
    }

    async fn provision(&mut self, _flags: &[String]) -> Result<()> {
        tracing::debug!("Nothing to provision for group {}", self.entity.definition.name);
        Ok(())
    }

    fn info(&self, console: &dyn Console) {
        self.entity.info(console);
    }
}
