//! Backend client abstraction
//!
//! A backend is the API a provider talks to: the real cloud API or an
//! in-memory double. The core never retries a backend call; retry and
//! backoff belong to the client implementing this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::{DeployedSnapshot, ResourceKind};

/// One page of a paginated list call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub items: Vec<DeployedSnapshot>,

    /// Continuation token for the next call
    pub next_token: Option<String>,

    /// Whether more pages follow
    pub is_truncated: bool,
}

impl ListPage {
    /// The last page of a listing
    pub fn last(items: Vec<DeployedSnapshot>) -> Self {
        Self {
            items,
            next_token: None,
            is_truncated: false,
        }
    }

    /// A page followed by more, continued with `token`
    pub fn truncated(items: Vec<DeployedSnapshot>, token: impl Into<String>) -> Self {
        Self {
            items,
            next_token: Some(token.into()),
            is_truncated: true,
        }
    }
}

/// A relationship attached to a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "target")]
pub enum Relation {
    /// Managed policy, by ARN
    Policy(String),
    /// Group membership, by group name
    Group(String),
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relation::Policy(arn) => write!(f, "policy {}", arn),
            Relation::Group(name) => write!(f, "group {}", name),
        }
    }
}

/// Backend client consumed by provider adapters
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the backend name (e.g., "aws-iam", "memory")
    fn name(&self) -> &str;

    /// List one page of deployed resources of `kind`
    async fn list(&self, kind: ResourceKind, page_token: Option<&str>) -> Result<ListPage>;

    /// Read one resource. `Ok(None)` means it does not exist.
    async fn get(&self, kind: ResourceKind, name: &str) -> Result<Option<DeployedSnapshot>>;

    /// Create a resource and return what the backend assigned
    async fn create(&self, kind: ResourceKind, name: &str) -> Result<DeployedSnapshot>;

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<()>;

    async fn attach(&self, kind: ResourceKind, name: &str, relation: &Relation) -> Result<()>;

    /// Remove a relation. `Ok(false)` means it was not attached.
    async fn detach(&self, kind: ResourceKind, name: &str, relation: &Relation) -> Result<bool>;
}
