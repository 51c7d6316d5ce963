//! Resource tree
//!
//! Composes many resources, possibly from several provider sessions, behind
//! one [`Lifecycle`]. Resources are visited in kind order (groups before
//! users before buckets) and in reverse for destroy. A failing resource does
//! not stop its siblings; the tree reports the first failure after visiting
//! everything.

use async_trait::async_trait;
use std::sync::Arc;

use crate::audit::{AuditRegistry, audit_target_id};
use crate::console::Console;
use crate::definition::ConfiguredDefinition;
use crate::error::{CloudError, Result};
use crate::provider::CloudProvider;
use crate::resource::Resource;
use crate::router::{Command, Lifecycle};
use crate::session::Session;
use crate::state::ResourceKind;

pub struct ResourceTree {
    name: String,
    resources: Vec<Resource>,
    sessions: Vec<Arc<Session>>,
    console: Arc<dyn Console>,
}

impl ResourceTree {
    pub fn new(name: impl Into<String>, console: Arc<dyn Console>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            sessions: Vec::new(),
            console,
        }
    }

    /// Track a session whose caches take part in audits
    pub fn add_session(&mut self, session: Arc<Session>) {
        if !self.sessions.iter().any(|s| Arc::ptr_eq(s, &session)) {
            self.sessions.push(session);
        }
    }

    pub fn add(&mut self, resource: Resource) {
        self.resources.push(resource);
        // Stable sort keeps declaration order within a kind.
        self.resources.sort_by_key(|r| r.kind().create_order());
    }

    /// Build and add one resource per definition through `provider`
    pub fn add_all(
        &mut self,
        provider: &dyn CloudProvider,
        session: &Arc<Session>,
        definitions: impl IntoIterator<Item = Arc<ConfiguredDefinition>>,
    ) -> Result<()> {
        self.add_session(Arc::clone(session));
        for definition in definitions {
            if !provider.supports(definition.kind) {
                return Err(CloudError::Unsupported(format!(
                    "provider {} does not manage {} {:?}",
                    provider.name(),
                    definition.kind,
                    definition.name
                )));
            }
            self.add(Resource::new(definition, provider, session)?);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.kind() == kind && r.name() == name)
    }

    pub fn get_mut(&mut self, kind: ResourceKind, name: &str) -> Option<&mut Resource> {
        self.resources
            .iter_mut()
            .find(|r| r.kind() == kind && r.name() == name)
    }

    /// Run `command` on every resource, keeping the first error
    async fn fan_out(&mut self, command: Command, flags: &[String]) -> Result<()> {
        let mut first_error: Option<CloudError> = None;
        let count = self.resources.len();

        for i in 0..count {
            let index = if command == Command::Destroy {
                count - 1 - i
            } else {
                i
            };
            let resource = &mut self.resources[index];
            let result = match command {
                Command::Load => resource.load().await,
                Command::Create => resource.create(flags).await,
                Command::Destroy => resource.destroy(flags).await,
                Command::Provision => resource.provision(flags).await,
                _ => Ok(()),
            };
            if let Err(e) = result {
                let e = name_step(e, || format!("{} {}", command, resource.describe()));
                self.keep_first(&mut first_error, e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Keep the first error; report later ones as they happen
    fn keep_first(&self, first_error: &mut Option<CloudError>, e: CloudError) {
        if first_error.is_some() {
            self.console.error(&e.to_string());
        } else {
            *first_error = Some(e);
        }
    }
}

/// Name the failing resource unless the adapter already named its step
fn name_step(e: CloudError, step: impl FnOnce() -> String) -> CloudError {
    match e {
        CloudError::StepFailed { .. } => e,
        e => e.in_step(step()),
    }
}

#[async_trait]
impl Lifecycle for ResourceTree {
    fn describe(&self) -> String {
        format!("tree {:?}", self.name)
    }

    async fn load(&mut self) -> Result<()> {
        self.fan_out(Command::Load, &[]).await
    }

    async fn create(&mut self, flags: &[String]) -> Result<()> {
        self.fan_out(Command::Create, flags).await
    }

    async fn destroy(&mut self, flags: &[String]) -> Result<()> {
        self.fan_out(Command::Destroy, flags).await
    }

    async fn provision(&mut self, flags: &[String]) -> Result<()> {
        self.fan_out(Command::Provision, flags).await
    }

    /// Resource audits report configured-only drift, then each session's
    /// caches report deployed-only drift. Cache audits run even when a
    /// resource audit failed.
    fn audit(&self, flags: &[String], audits: &mut AuditRegistry) -> Result<()> {
        audit_target_id(flags)?;
        let mut first_error: Option<CloudError> = None;
        for resource in &self.resources {
            if let Err(e) = resource.audit(flags, audits) {
                let e = name_step(e, || format!("{} {}", Command::Audit, resource.describe()));
                self.keep_first(&mut first_error, e);
            }
        }
        let accumulator = audits.target(flags)?;
        for session in &self.sessions {
            session.audit(accumulator);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn info(&self) {
        for resource in &self.resources {
            resource.info();
        }
    }

    fn print_config(&self) {
        self.console.info(&format!("{} Config", self.name));
        for resource in &self.resources {
            resource.print_config();
        }
    }

    fn help(&self) {
        self.console.info(&format!("Usage: {} <command> [<kind>/<name>]", self.name));
        let commands = [
            (Command::Load, "load deployed state of every resource"),
            (Command::Create, "create every configured resource"),
            (Command::Destroy, "destroy every configured resource"),
            (Command::Provision, "update every configured resource"),
            (Command::Audit, "report drift between configuration and backend"),
            (Command::Info, "show information about allocated resources"),
            (Command::Config, "show the configuration"),
            (Command::Help, "show this help"),
        ];
        for (command, description) in commands {
            self.console
                .detail(&format!("{:<12}{}", command.as_str(), description));
        }
    }
}
