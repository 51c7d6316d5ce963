//! Fault switches read from the provider `data` map

use keel_cloud::{CloudError, Result};
use std::collections::BTreeMap;

/// Provider data keys such as `bkt.Create` that make the matching mock
/// operation fail
///
/// A key counts as set unless its value is `false`, `no` or `0`.
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    data: BTreeMap<String, String>,
}

impl MockOptions {
    pub fn new(data: BTreeMap<String, String>) -> Self {
        Self { data }
    }

    pub fn fails(&self, key: &str) -> bool {
        match self.data.get(key) {
            Some(value) => !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "false" | "no" | "0"
            ),
            None => false,
        }
    }

    /// `Err(Backend(key))` when the switch is set
    pub fn check(&self, key: &str) -> Result<()> {
        if self.fails(key) {
            tracing::debug!("mock: failing {}", key);
            return Err(CloudError::backend(key));
        }
        Ok(())
    }
}

impl From<BTreeMap<String, String>> for MockOptions {
    fn from(data: BTreeMap<String, String>) -> Self {
        Self::new(data)
    }
}
