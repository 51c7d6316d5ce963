//! Drift findings
//!
//! An audit run registers one or more named [`AuditAccumulator`]s in an
//! [`AuditRegistry`], which is passed to every audit operation. Resources
//! record `Configured` findings (declared but not deployed) and reconciliation
//! caches record `Deployed` findings (deployed but not declared).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CloudError, Result};

/// Which side of the reconciliation a finding was observed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    /// Declared in configuration, missing from the backend
    Configured,
    /// Present in the backend, declared nowhere
    Deployed,
}

impl std::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditCategory::Configured => write!(f, "configured"),
            AuditCategory::Deployed => write!(f, "deployed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub category: AuditCategory,
    pub message: String,
}

/// Named accumulator of drift findings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditAccumulator {
    name: String,
    findings: Vec<AuditFinding>,
}

impl AuditAccumulator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            findings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&mut self, category: AuditCategory, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Audit {}: {} {}", self.name, category, message);
        self.findings.push(AuditFinding { category, message });
    }

    pub fn findings(&self) -> &[AuditFinding] {
        &self.findings
    }

    pub fn by_category(&self, category: AuditCategory) -> Vec<&AuditFinding> {
        self.findings
            .iter()
            .filter(|f| f.category == category)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Registry of accumulators keyed by id
#[derive(Debug, Default)]
pub struct AuditRegistry {
    accumulators: BTreeMap<String, AuditAccumulator>,
}

impl AuditRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty accumulator under `id`, replacing any previous one
    pub fn register(&mut self, id: impl Into<String>) -> &mut AuditAccumulator {
        let id = id.into();
        let accumulator = self.accumulators.entry(id.clone()).or_default();
        *accumulator = AuditAccumulator::new(id);
        accumulator
    }

    pub fn lookup(&self, id: &str) -> Option<&AuditAccumulator> {
        self.accumulators.get(id)
    }

    pub fn lookup_mut(&mut self, id: &str) -> Option<&mut AuditAccumulator> {
        self.accumulators.get_mut(id)
    }

    /// Resolve the accumulator named by the first audit option
    ///
    /// Fails with `InvalidArgument` when no id is given or the id is not
    /// registered.
    pub fn target(&mut self, flags: &[String]) -> Result<&mut AuditAccumulator> {
        let id = audit_target_id(flags)?;
        self.lookup_mut(id).ok_or_else(|| {
            CloudError::invalid_argument(format!("audit object {:?} does not exist", id))
        })
    }
}

/// The accumulator id carried by audit options
pub fn audit_target_id(flags: &[String]) -> Result<&str> {
    match flags.first().map(String::as_str) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(CloudError::invalid_argument(
            "no flag set to find the audit object",
        )),
    }
}
