//! Command routing
//!
//! A [`Request`] carries a raw command verb and its options. The [`Router`]
//! maps the verb onto a [`Lifecycle`] operation and turns the outcome into a
//! [`Response`], emitting the error detail on the way.

use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

use crate::audit::AuditRegistry;
use crate::console::Console;
use crate::error::{CloudError, Result};

/// Commands every resource answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Load,
    Create,
    Destroy,
    Provision,
    Audit,
    Info,
    Config,
    Help,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Load,
        Command::Create,
        Command::Destroy,
        Command::Provision,
        Command::Audit,
        Command::Info,
        Command::Config,
        Command::Help,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Load => "load",
            Command::Create => "create",
            Command::Destroy => "destroy",
            Command::Provision => "provision",
            Command::Audit => "audit",
            Command::Info => "info",
            Command::Config => "config",
            Command::Help => "help",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Command {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CloudError::Internal(format!("Unknown command {}", s)))
    }
}

/// An inbound command with its options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: String,
    pub flags: Vec<String>,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            flags: Vec::new(),
        }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ok,
    Fail,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok)
    }
}

/// The uniform lifecycle contract a routable target implements
#[async_trait]
pub trait Lifecycle: Send {
    /// Short description used in route logs, e.g. `group "admins"`
    fn describe(&self) -> String;

    async fn load(&mut self) -> Result<()>;

    async fn create(&mut self, flags: &[String]) -> Result<()>;

    async fn destroy(&mut self, flags: &[String]) -> Result<()>;

    async fn provision(&mut self, flags: &[String]) -> Result<()>;

    fn audit(&self, flags: &[String], audits: &mut AuditRegistry) -> Result<()>;

    fn info(&self);

    fn print_config(&self);

    fn help(&self);
}

/// Dispatches requests to lifecycle operations
pub struct Router {
    console: Arc<dyn Console>,
}

impl Router {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self { console }
    }

    pub async fn route(
        &self,
        target: &mut dyn Lifecycle,
        request: &Request,
        audits: &mut AuditRegistry,
    ) -> Response {
        tracing::debug!(
            "Route {} {:?} to {}",
            request.command,
            request.flags,
            target.describe()
        );

        let command = match request.command.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                self.console.error(&e.to_string());
                target.help();
                return Response::Fail;
            }
        };

        let flags = request.flags.as_slice();
        let result = match command {
            Command::Load => target.load().await,
            Command::Create => target.create(flags).await,
            Command::Destroy => target.destroy(flags).await,
            Command::Provision => target.provision(flags).await,
            Command::Audit => target.audit(flags, audits),
            Command::Info => {
                target.info();
                Ok(())
            }
            Command::Config => {
                target.print_config();
                Ok(())
            }
            Command::Help => {
                target.help();
                Ok(())
            }
        };

        match result {
            Ok(()) => Response::Ok,
            Err(e) => {
                tracing::debug!("{} {} failed: {}", command, target.describe(), e);
                self.console.error(&e.to_string());
                Response::Fail
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{LineLevel, RecordingConsole};

    #[derive(Default)]
    struct Probe {
        calls: Vec<&'static str>,
        fail_create: bool,
    }

    #[async_trait]
    impl Lifecycle for Probe {
        fn describe(&self) -> String {
            "probe".to_string()
        }

        async fn load(&mut self) -> Result<()> {
            self.calls.push("load");
            Ok(())
        }

        async fn create(&mut self, _flags: &[String]) -> Result<()> {
            self.calls.push("create");
            if self.fail_create {
                return Err(CloudError::backend("EntityAlreadyExists"));
            }
            Ok(())
        }

        async fn destroy(&mut self, _flags: &[String]) -> Result<()> {
            self.calls.push("destroy");
            Ok(())
        }

        async fn provision(&mut self, _flags: &[String]) -> Result<()> {
            self.calls.push("provision");
            Ok(())
        }

        fn audit(&self, flags: &[String], audits: &mut AuditRegistry) -> Result<()> {
            audits.target(flags).map(|_| ())
        }

        fn info(&self) {}

        fn print_config(&self) {}

        fn help(&self) {}
    }

    #[test]
    fn test_command_parse() {
        for command in Command::ALL {
            assert_eq!(command.as_str().parse::<Command>().unwrap(), command);
        }
        assert!(matches!(
            "explode".parse::<Command>(),
            Err(CloudError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_route_dispatches() {
        let console = Arc::new(RecordingConsole::new());
        let router = Router::new(console.clone());
        let mut probe = Probe::default();
        let mut audits = AuditRegistry::new();

        for verb in ["load", "create", "destroy", "provision", "info", "help"] {
            let response = router.route(&mut probe, &Request::new(verb), &mut audits).await;
            assert_eq!(response, Response::Ok);
        }
        assert_eq!(probe.calls, vec!["load", "create", "destroy", "provision"]);
        assert!(console.messages(LineLevel::Error).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_fails_with_error() {
        let console = Arc::new(RecordingConsole::new());
        let router = Router::new(console.clone());
        let mut probe = Probe::default();
        let mut audits = AuditRegistry::new();

        let response = router
            .route(&mut probe, &Request::new("explode"), &mut audits)
            .await;

        assert_eq!(response, Response::Fail);
        assert!(probe.calls.is_empty());
        assert_eq!(
            console.messages(LineLevel::Error),
            vec!["Internal Error: Unknown command explode"]
        );
    }

    #[tokio::test]
    async fn test_error_emitted_once() {
        let console = Arc::new(RecordingConsole::new());
        let router = Router::new(console.clone());
        let mut probe = Probe {
            fail_create: true,
            ..Default::default()
        };
        let mut audits = AuditRegistry::new();

        let response = router
            .route(&mut probe, &Request::new("create"), &mut audits)
            .await;

        assert_eq!(response, Response::Fail);
        assert_eq!(console.messages(LineLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_audit_without_id_fails() {
        let console = Arc::new(RecordingConsole::new());
        let router = Router::new(console.clone());
        let mut probe = Probe::default();
        let mut audits = AuditRegistry::new();

        let response = router
            .route(&mut probe, &Request::new("audit"), &mut audits)
            .await;
        assert_eq!(response, Response::Fail);
        assert!(console.contains("no flag set"));
    }
}
