//! Lifecycle steps shared by IAM groups and users

use keel_cloud::{
    ConfiguredDefinition, Console, DeployedSnapshot, Relation, Result, Session, StepContext,
};
use std::sync::Arc;

use crate::policy::IamPolicy;

/// An IAM principal as seen by one session
pub(crate) struct IamEntity {
    pub(crate) definition: Arc<ConfiguredDefinition>,
    pub(crate) session: Arc<Session>,
    pub(crate) policies: Vec<IamPolicy>,
    pub(crate) deployed: Option<DeployedSnapshot>,
}

impl IamEntity {
    pub(crate) fn new(
        session: &Arc<Session>,
        definition: Arc<ConfiguredDefinition>,
        account: &str,
    ) -> Self {
        let policies = definition
            .policies
            .iter()
            .map(|p| IamPolicy::resolve(account, p))
            .collect();
        Self {
            definition,
            session: Arc::clone(session),
            policies,
            deployed: None,
        }
    }

    fn title(&self) -> &'static str {
        self.definition.kind.title()
    }

    fn name(&self) -> &str {
        &self.definition.name
    }

    pub(crate) async fn load(&mut self) -> Result<()> {
        self.deployed = self.session.lookup(&self.definition).await?;
        Ok(())
    }

    /// Create the principal, then re-read it for the backend-assigned identity
    pub(crate) async fn create_entity(&mut self) -> Result<()> {
        let session = Arc::clone(&self.session);
        let kind = self.definition.kind;
        let console = session.console();
        console.info(&format!("{} Creation: {}", self.title(), self.name()));

        let created = session
            .backend()
            .create(kind, self.name())
            .await
            .step(|| format!("create {} {}", kind, self.definition.name))?;
        tracing::info!("Created {} {} ({})", kind, self.name(), created.id);
        self.deployed = Some(created.clone());

        let current = session
            .refresh(&self.definition)
            .await
            .step(|| format!("load {} {}", kind, self.definition.name))?;
        match current {
            Some(current) => self.deployed = Some(current),
            None => {
                tracing::warn!("{} {} not readable yet after creation", kind, self.name());
                session.remember(created, &self.definition);
            }
        }

        console.detail(&format!("{} created: {}", self.title(), self.name()));
        Ok(())
    }

    pub(crate) async fn attach(&self, relations: &[Relation]) -> Result<()> {
        let kind = self.definition.kind;
        for relation in relations {
            self.session
                .backend()
                .attach(kind, self.name(), relation)
                .await
                .step(|| format!("attach {} to {} {}", relation, kind, self.definition.name))?;
        }
        Ok(())
    }

    /// Detach each relation. One that is not attached counts as detached.
    pub(crate) async fn detach(&self, relations: &[Relation]) -> Result<()> {
        let kind = self.definition.kind;
        for relation in relations {
            let detached = self
                .session
                .backend()
                .detach(kind, self.name(), relation)
                .await
                .step(|| format!("detach {} from {} {}", relation, kind, self.definition.name))?;
            if !detached {
                tracing::info!("{} was not attached to {} {}", relation, kind, self.name());
            }
        }
        Ok(())
    }

    pub(crate) async fn attach_policies(&self) -> Result<()> {
        let console = self.session.console();
        console.info("Attach Policies");
        self.attach(&self.policy_relations()).await?;
        console.detail("Attached Policies");
        Ok(())
    }

    pub(crate) async fn detach_policies(&self) -> Result<()> {
        let console = self.session.console();
        console.info("Detach Policies");
        self.detach(&self.policy_relations()).await?;
        console.detail("Detached Policies");
        Ok(())
    }

    /// Delete the principal and forget it
    pub(crate) async fn delete_entity(&mut self) -> Result<()> {
        let session = Arc::clone(&self.session);
        let kind = self.definition.kind;
        let console = session.console();
        console.info(&format!("{} Deletion: {}", self.title(), self.name()));

        session
            .backend()
            .delete(kind, self.name())
            .await
            .step(|| format!("delete {} {}", kind, self.definition.name))?;
        tracing::info!("Deleted {} {}", kind, self.name());

        session.forget(kind, self.name());
        self.deployed = None;
        console.detail(&format!("{} deleted: {}", self.title(), self.name()));
        Ok(())
    }

    fn policy_relations(&self) -> Vec<Relation> {
        self.policies
            .iter()
            .map(|p| Relation::Policy(p.arn().to_string()))
            .collect()
    }

    pub(crate) fn info(&self, console: &dyn Console) {
        let Some(deployed) = &self.deployed else {
            return;
        };
        console.info(self.title());
        console.detail(&format!(
            "{:<20}\t{}",
            "name",
            deployed.name().unwrap_or_default()
        ));
        console.detail(&format!("{:<20}\t{}", "id", deployed.id));
        if let Some(arn) = deployed.get_attribute::<String>("arn") {
            console.detail(&format!("{:<20}\t{}", "arn", arn));
        }
        for policy in &self.policies {
            console.detail(&format!("{:<20}\t{}", "policy", policy));
        }
    }
}
