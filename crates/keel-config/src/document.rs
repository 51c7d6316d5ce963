//! Configuration document
//!
//! ```yaml
//! provider:
//!   name: aws
//!   account: "123456789012"
//!   data:
//!     bkt.Create: false
//! identity_management:
//!   groups:
//!     - name: ops
//!       policies: [ReadOnlyAccess]
//!   users:
//!     - name: alice
//!       groups: [ops]
//! storage:
//!   region: us-east-1
//!   buckets:
//!     - name: logs
//! ```

use keel_cloud::{ConfiguredDefinition, Console, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend to talk to (`aws` or `memory`)
    #[serde(default)]
    pub name: Option<String>,

    /// Account owning customer-managed policies
    #[serde(default)]
    pub account: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// Free-form provider switches
    #[serde(default)]
    pub data: BTreeMap<String, serde_yaml::Value>,
}

impl ProviderConfig {
    /// `data` with scalar values rendered as strings
    pub fn data_strings(&self) -> BTreeMap<String, String> {
        self.data
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Null => String::new(),
                    other => serde_yaml::to_string(other)
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub policies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityManagement {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub buckets: Vec<BucketConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub identity_management: IdentityManagement,
    #[serde(default)]
    pub storage: Storage,
}

impl Document {
    /// Parse and validate a YAML document, logging validation warnings
    pub fn from_yaml(source: &str) -> Result<Self> {
        let document: Document = serde_yaml::from_str(source)?;
        for warning in document.validate()? {
            tracing::warn!("{}", warning);
        }
        Ok(document)
    }

    /// Reject empty or duplicate names; return non-fatal findings
    pub fn validate(&self) -> Result<Vec<String>> {
        let im = &self.identity_management;
        check_names(ResourceKind::Group, im.groups.iter().map(|g| g.name.as_str()))?;
        check_names(ResourceKind::User, im.users.iter().map(|u| u.name.as_str()))?;
        check_names(
            ResourceKind::Bucket,
            self.storage.buckets.iter().map(|b| b.name.as_str()),
        )?;

        // The group may exist outside this document
        let declared: BTreeSet<&str> = im.groups.iter().map(|g| g.name.as_str()).collect();
        let warnings = im
            .users
            .iter()
            .flat_map(|u| {
                u.groups
                    .iter()
                    .filter(|g| !declared.contains(g.as_str()))
                    .map(move |g| format!("user {:?} joins undeclared group {:?}", u.name, g))
            })
            .collect();
        Ok(warnings)
    }

    /// Every declared resource, in declaration order within each section
    pub fn definitions(&self) -> Vec<Arc<ConfiguredDefinition>> {
        let im = &self.identity_management;
        let mut definitions = Vec::new();

        for group in &im.groups {
            let mut definition = ConfiguredDefinition::new(ResourceKind::Group, &group.name);
            definition.region = im.region.clone();
            definition.policies = group.policies.clone();
            definitions.push(Arc::new(definition));
        }
        for user in &im.users {
            let mut definition = ConfiguredDefinition::new(ResourceKind::User, &user.name);
            definition.region = im.region.clone();
            definition.policies = user.policies.clone();
            definition.groups = user.groups.clone();
            definitions.push(Arc::new(definition));
        }
        for bucket in &self.storage.buckets {
            let mut definition = ConfiguredDefinition::new(ResourceKind::Bucket, &bucket.name);
            definition.region = bucket.region.clone().or_else(|| self.storage.region.clone());
            definitions.push(Arc::new(definition));
        }
        definitions
    }

    pub fn is_empty(&self) -> bool {
        let im = &self.identity_management;
        im.groups.is_empty() && im.users.is_empty() && self.storage.buckets.is_empty()
    }

    pub fn print(&self, console: &dyn Console) {
        let definitions = self.definitions();
        let (identity, storage): (Vec<_>, Vec<_>) = definitions
            .iter()
            .partition(|d| d.kind != ResourceKind::Bucket);

        if !identity.is_empty() {
            console.info("Identity Management Config");
            for definition in identity {
                definition.print(console);
            }
        }
        if !storage.is_empty() {
            console.info("Storage Config");
            for definition in storage {
                definition.print(console);
            }
        }
    }
}

fn check_names<'a>(kind: ResourceKind, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{} with an empty name", kind)));
        }
        if !seen.insert(name) {
            return Err(ConfigError::Invalid(format!(
                "duplicate {} name {:?}",
                kind, name
            )));
        }
    }
    Ok(())
}
