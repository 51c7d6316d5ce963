//! Configured (desired) state of a resource

use serde::{Deserialize, Serialize};

use crate::console::Console;
use crate::state::ResourceKind;

/// Desired state of one resource, as declared by configuration
///
/// Definitions are built before any resource and are immutable for the run;
/// they are shared as `Arc<ConfiguredDefinition>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredDefinition {
    /// Unique name within the kind
    pub name: String,

    pub kind: ResourceKind,

    /// Region the resource lives in, if the kind is regional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Policy references to attach (names or full ARNs)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,

    /// Parent groups to join
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl ConfiguredDefinition {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            region: None,
            policies: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policies.push(policy.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Print the configuration of this definition
    pub fn print(&self, console: &dyn Console) {
        console.info(self.kind.title());
        console.detail(&format!("{:<20}\t{}", "name", self.name));
        if let Some(region) = &self.region {
            console.detail(&format!("{:<20}\t{}", "region", region));
        }
        for policy in &self.policies {
            console.detail(&format!("{:<20}\t{}", "policy", policy));
        }
        for group in &self.groups {
            console.detail(&format!("{:<20}\t{}", "group", group));
        }
    }
}
