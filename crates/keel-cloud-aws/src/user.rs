//! IAM user adapter

use async_trait::async_trait;
use keel_cloud::{
    ConfiguredDefinition, Console, DeployedSnapshot, ProviderResource, Relation, Result, Session,
};
use std::sync::Arc;

use crate::entity::IamEntity;

/// Manages one configured IAM user, its policies and group memberships
pub struct IamUser {
    entity: IamEntity,
}

impl IamUser {
    pub fn new(session: &Arc<Session>, definition: Arc<ConfiguredDefinition>, account: &str) -> Self {
        Self {
            entity: IamEntity::new(session, definition, account),
        }
    }

    fn memberships(&self) -> Vec<Relation> {
        self.entity
            .definition
            .groups
            .iter()
            .map(|g| Relation::Group(g.clone()))
            .collect()
    }
}

#[async_trait]
impl ProviderResource for IamUser {
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
        self.entity.attach_policies().await?;

        let memberships = self.memberships();
        if !memberships.is_empty() {
            let console = self.entity.session.console();
            console.info("Join Groups");
            self.entity.attach(&memberships).await?;
            console.detail("Joined Groups");
        }
        Ok(())
    }

    /// Memberships and policies go first; IAM refuses to delete a user that still has them.
    async fn destroy(&mut self, _flags: &[String]) -> Result<()> {
        let memberships = self.memberships();
        if !memberships.is_empty() {
            let console = self.entity.session.console();
            console.info("Leave Groups");
            self.entity.detach(&memberships).await?;
            console.detail("Left Groups");
        }
        self.entity.detach_policies().await?;
        self.entity.delete_entity().await
    }

    async fn provision(&mut self, _flags: &[String]) -> Result<()> {
        tracing::debug!("Nothing to provision for user {}", self.entity.definition.name);
        Ok(())
    }

    fn info(&self, console: &dyn Console) {
        self.entity.info(console);
        for group in &self.entity.definition.groups {
            console.detail(&format!("{:<20}\t{}", "group", group));
        }
    }
}
