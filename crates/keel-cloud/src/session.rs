//! Provider session
//!
//! A session is the shared context every adapter of one provider receives at
//! construction: the backend client, the console, and the reconciliation
//! caches built for the kinds the provider lists up front. It lives for one
//! run and is never persisted.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::audit::AuditAccumulator;
use crate::backend::Backend;
use crate::cache::ReconciliationCache;
use crate::console::Console;
use crate::definition::ConfiguredDefinition;
use crate::error::Result;
use crate::state::{DeployedSnapshot, ResourceKind};

pub struct Session {
    provider: String,
    backend: Arc<dyn Backend>,
    console: Arc<dyn Console>,
    caches: BTreeMap<ResourceKind, Arc<ReconciliationCache>>,
}

impl Session {
    /// Open a session, building one cache per kind in `cached_kinds`
    ///
    /// Caches are built one after another before any resource loads.
    pub async fn open(
        provider: impl Into<String>,
        backend: Arc<dyn Backend>,
        console: Arc<dyn Console>,
        cached_kinds: &[ResourceKind],
    ) -> Result<Arc<Self>> {
        let provider = provider.into();
        let mut caches = BTreeMap::new();
        for kind in cached_kinds {
            let cache = ReconciliationCache::build(*kind, backend.as_ref()).await?;
            caches.insert(*kind, Arc::new(cache));
        }
        tracing::debug!(
            "Opened {} session with {} cache(s)",
            provider,
            caches.len()
        );
        Ok(Arc::new(Self {
            provider,
            backend,
            console,
            caches,
        }))
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn console(&self) -> &dyn Console {
        self.console.as_ref()
    }

    pub fn console_handle(&self) -> Arc<dyn Console> {
        Arc::clone(&self.console)
    }

    pub fn cache(&self, kind: ResourceKind) -> Option<&Arc<ReconciliationCache>> {
        self.caches.get(&kind)
    }

    pub fn caches(&self) -> impl Iterator<Item = &Arc<ReconciliationCache>> {
        self.caches.values()
    }

    /// Current deployed snapshot of a definition
    ///
    /// The kind's cache answers first; a miss, or a kind without a cache,
    /// falls back to a direct backend read. Both paths agree on the result.
    pub async fn lookup(
        &self,
        definition: &Arc<ConfiguredDefinition>,
    ) -> Result<Option<DeployedSnapshot>> {
        if let Some(cache) = self.cache(definition.kind) {
            if let Some(snapshot) = cache.find(definition) {
                tracing::debug!("Skipping {} load, cached...", definition.kind);
                return Ok(Some(snapshot));
            }
        }
        self.refresh(definition).await
    }

    /// Read a definition's snapshot straight from the backend
    ///
    /// A found resource is added to the kind's cache so later lookups agree
    /// with the backend without another listing.
    pub async fn refresh(
        &self,
        definition: &Arc<ConfiguredDefinition>,
    ) -> Result<Option<DeployedSnapshot>> {
        let snapshot = self
            .backend
            .get(definition.kind, &definition.name)
            .await?;
        match &snapshot {
            Some(found) => {
                if let Some(cache) = self.cache(definition.kind) {
                    cache.insert(found.clone(), definition);
                }
            }
            None => {
                tracing::debug!("No such entity: {} {:?}", definition.kind, definition.name);
            }
        }
        Ok(snapshot)
    }

    /// Add a snapshot the backend just returned to the kind's cache
    pub fn remember(&self, snapshot: DeployedSnapshot, definition: &Arc<ConfiguredDefinition>) {
        if let Some(cache) = self.cache(definition.kind) {
            cache.insert(snapshot, definition);
        }
    }

    /// Drop a destroyed resource from its kind's cache
    pub fn forget(&self, kind: ResourceKind, name: &str) {
        if let Some(cache) = self.cache(kind) {
            cache.remove(name);
        }
    }

    /// Run every cache's deployed-only audit into `accumulator`
    pub fn audit(&self, accumulator: &mut AuditAccumulator) {
        for cache in self.caches.values() {
            cache.audit(accumulator);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider)
            .field("backend", &self.backend.name())
            .field("caches", &self.caches.keys().collect::<Vec<_>>())
            .finish()
    }
}
