//! Deployed state of cloud resources
//!
//! A [`DeployedSnapshot`] is what a backend reports for one resource instance.
//! Snapshots are only ever produced by listing or reading a backend, and are
//! discarded with the session that observed them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::CloudError;

/// Kind of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Group,
    User,
    Bucket,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Group, ResourceKind::User, ResourceKind::Bucket];

    /// Capitalized name used in console headings ("Group", "User", ...)
    pub fn title(&self) -> &'static str {
        match self {
            ResourceKind::Group => "Group",
            ResourceKind::User => "User",
            ResourceKind::Bucket => "Bucket",
        }
    }

    /// Position in creation order. Groups exist before users join them.
    pub fn create_order(&self) -> u8 {
        match self {
            ResourceKind::Group => 0,
            ResourceKind::User => 1,
            ResourceKind::Bucket => 2,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Group => write!(f, "group"),
            ResourceKind::User => write!(f, "user"),
            ResourceKind::Bucket => write!(f, "bucket"),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "group" | "groups" => Ok(ResourceKind::Group),
            "user" | "users" => Ok(ResourceKind::User),
            "bucket" | "buckets" => Ok(ResourceKind::Bucket),
            other => Err(CloudError::invalid_argument(format!(
                "unknown resource kind {:?}",
                other
            ))),
        }
    }
}

/// The backend's current representation of one resource instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedSnapshot {
    /// Backend-assigned identifier
    pub id: String,

    /// Resource name. Unnamed entities exist and can never be matched to configuration.
    pub name: Option<String>,

    /// Resource kind
    pub kind: ResourceKind,

    /// Kind-specific deployed attributes (arn, path, create date, ...)
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl DeployedSnapshot {
    pub fn new(kind: ResourceKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            kind,
            attributes: BTreeMap::new(),
        }
    }

    pub fn unnamed(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Reconciliation state of one resource name, derived from whether a deployed
/// snapshot and a configured definition are present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Neither deployed nor configured
    Absent,
    /// Deployed but never matched to configuration (drift)
    DeployedOnly,
    /// Configured but not yet deployed
    PendingCreate,
    /// Deployed and matched to configuration
    Reconciled,
}

impl ResourceState {
    pub fn from_sides(deployed: bool, configured: bool) -> Self {
        match (deployed, configured) {
            (false, false) => ResourceState::Absent,
            (true, false) => ResourceState::DeployedOnly,
            (false, true) => ResourceState::PendingCreate,
            (true, true) => ResourceState::Reconciled,
        }
    }

    /// Whether this state is a discrepancy between configuration and backend
    pub fn is_drift(&self) -> bool {
        matches!(self, ResourceState::DeployedOnly | ResourceState::PendingCreate)
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceState::Absent => write!(f, "absent"),
            ResourceState::DeployedOnly => write!(f, "deployed-only"),
            ResourceState::PendingCreate => write!(f, "pending-create"),
            ResourceState::Reconciled => write!(f, "reconciled"),
        }
    }
}
