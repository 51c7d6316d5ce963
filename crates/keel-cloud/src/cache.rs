//! Reconciliation cache
//!
//! One cache exists per resource kind per provider session. It is built once
//! by walking the backend's paginated list API, then consulted by every
//! resource of that kind so a load does not cost a network read. Each entry
//! pairs the deployed snapshot with the configured definition that looked it
//! up, which is what lets the cache report deployed-only drift.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audit::{AuditAccumulator, AuditCategory};
use crate::backend::Backend;
use crate::definition::ConfiguredDefinition;
use crate::error::{CloudError, Result};
use crate::state::{DeployedSnapshot, ResourceKind, ResourceState};

/// One name-keyed cache entry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub deployed: DeployedSnapshot,

    /// Definition bound by the last successful `find`
    pub configured: Option<Arc<ConfiguredDefinition>>,
}

impl CacheEntry {
    fn deployed(snapshot: DeployedSnapshot) -> Self {
        Self {
            deployed: snapshot,
            configured: None,
        }
    }

    pub fn state(&self) -> ResourceState {
        ResourceState::from_sides(true, self.configured.is_some())
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: BTreeMap<String, CacheEntry>,
    unnamed: Vec<DeployedSnapshot>,
}

/// Name-keyed snapshot of everything a backend reports for one kind
#[derive(Debug)]
pub struct ReconciliationCache {
    kind: ResourceKind,
    inner: Mutex<CacheInner>,
}

impl ReconciliationCache {
    /// An empty cache, as if the backend had listed nothing
    pub fn empty(kind: ResourceKind) -> Self {
        Self {
            kind,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Fetch the complete deployed inventory of `kind`
    ///
    /// Pages are requested sequentially until the backend reports the listing
    /// is no longer truncated. A failing page aborts the whole build.
    pub async fn build(kind: ResourceKind, backend: &dyn Backend) -> Result<Self> {
        tracing::debug!("Initializing {} cache from {}", kind, backend.name());

        let mut inner = CacheInner::default();
        let mut next: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = backend.list(kind, next.as_deref()).await?;
            pages += 1;

            for item in page.items {
                match item.name.as_deref().filter(|n| !n.is_empty()) {
                    Some(name) => {
                        tracing::debug!("Caching {}", name);
                        inner
                            .entries
                            .insert(name.to_string(), CacheEntry::deployed(item));
                    }
                    None => {
                        tracing::debug!("Unnamed {} {}", kind, item.id);
                        inner.unnamed.push(item);
                    }
                }
            }

            if !page.is_truncated {
                break;
            }
            match page.next_token {
                Some(token) if !token.is_empty() => next = Some(token),
                _ => {
                    return Err(CloudError::backend(format!(
                        "{} listing truncated without a continuation token after {} page(s)",
                        kind, pages
                    )));
                }
            }
        }

        tracing::debug!(
            "Cached {} named and {} unnamed {}(s) from {} page(s)",
            inner.entries.len(),
            inner.unnamed.len(),
            kind,
            pages
        );

        Ok(Self {
            kind,
            inner: Mutex::new(inner),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Look up the deployed snapshot for a definition and bind the entry to it
    ///
    /// Binding is idempotent; a different definition with the same name takes
    /// over the binding. A miss leaves the cache untouched.
    pub fn find(&self, definition: &Arc<ConfiguredDefinition>) -> Option<DeployedSnapshot> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(&definition.name)?;
        entry.configured = Some(Arc::clone(definition));
        Some(entry.deployed.clone())
    }

    /// Record a resource created during this session, bound to its definition
    pub fn insert(&self, snapshot: DeployedSnapshot, definition: &Arc<ConfiguredDefinition>) {
        let Some(name) = snapshot.name.clone().filter(|n| !n.is_empty()) else {
            tracing::warn!("Not caching unnamed {} {}", self.kind, snapshot.id);
            return;
        };
        tracing::debug!("Adding {} to {} cache", name, self.kind);
        self.lock().entries.insert(
            name,
            CacheEntry {
                deployed: snapshot,
                configured: Some(Arc::clone(definition)),
            },
        );
    }

    /// Evict an entry after its resource was destroyed
    pub fn remove(&self, name: &str) -> Option<CacheEntry> {
        tracing::debug!("Deleting {} from {} cache", name, self.kind);
        self.lock().entries.remove(name)
    }

    /// Reconciliation state of `name` as far as the cache knows
    ///
    /// Configured-only names never enter the cache, so they report `Absent`
    /// here; the resource layer reports them.
    pub fn state(&self, name: &str) -> ResourceState {
        self.lock()
            .entries
            .get(name)
            .map(CacheEntry::state)
            .unwrap_or(ResourceState::Absent)
    }

    pub fn entry(&self, name: &str) -> Option<CacheEntry> {
        self.lock().entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().entries.keys().cloned().collect()
    }

    /// Unnamed deployed entities, in the order the backend listed them
    pub fn unnamed(&self) -> Vec<DeployedSnapshot> {
        self.lock().unnamed.clone()
    }

    /// Record deployed-only drift
    ///
    /// Every entry no definition has looked up is reported by name. Every
    /// unnamed entity is reported with its raw record for manual inspection.
    pub fn audit(&self, accumulator: &mut AuditAccumulator) {
        let inner = self.lock();
        let title = self.kind.title();

        for (name, entry) in &inner.entries {
            if entry.configured.is_none() {
                accumulator.record(AuditCategory::Deployed, name.clone());
            }
        }

        for (i, snapshot) in inner.unnamed.iter().enumerate() {
            let record = serde_json::to_string_pretty(snapshot)
                .unwrap_or_else(|_| format!("{:?}", snapshot));
            let record = format!("\t{}", record.replace('\n', "\n\t"));
            accumulator.record(
                AuditCategory::Deployed,
                format!(
                    "Unnamed {} {} - {} ID: {:?} {}",
                    title,
                    i + 1,
                    title,
                    snapshot.id,
                    record
                ),
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::{ListPage, Relation};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend serving a fixed sequence of list pages
    pub(crate) struct PagedBackend {
        pages: Vec<Result<ListPage>>,
        calls: AtomicUsize,
        tokens: Mutex<Vec<Option<String>>>,
    }

    impl PagedBackend {
        pub(crate) fn new(pages: Vec<Result<ListPage>>) -> Self {
            Self {
                pages,
                calls: AtomicUsize::new(0),
                tokens: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Backend for PagedBackend {
        fn name(&self) -> &str {
            "paged"
        }

        async fn list(&self, _kind: ResourceKind, page_token: Option<&str>) -> Result<ListPage> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens.lock().unwrap().push(page_token.map(str::to_string));
            match &self.pages[call] {
                Ok(page) => Ok(page.clone()),
                Err(e) => Err(CloudError::backend(e.to_string())),
            }
        }

        async fn get(&self, _kind: ResourceKind, _name: &str) -> Result<Option<DeployedSnapshot>> {
            unreachable!("cache build only lists")
        }

        async fn create(&self, _kind: ResourceKind, _name: &str) -> Result<DeployedSnapshot> {
            unreachable!("cache build only lists")
        }

        async fn delete(&self, _kind: ResourceKind, _name: &str) -> Result<()> {
            unreachable!("cache build only lists")
        }

        async fn attach(&self, _: ResourceKind, _: &str, _: &Relation) -> Result<()> {
            unreachable!("cache build only lists")
        }

        async fn detach(&self, _: ResourceKind, _: &str, _: &Relation) -> Result<bool> {
            unreachable!("cache build only lists")
        }
    }

    fn group(name: &str) -> DeployedSnapshot {
        DeployedSnapshot::new(ResourceKind::Group, format!("id-{}", name), name)
    }

    fn definition(name: &str) -> Arc<ConfiguredDefinition> {
        Arc::new(ConfiguredDefinition::new(ResourceKind::Group, name))
    }

    #[tokio::test]
    async fn test_build_walks_every_page() {
        let backend = PagedBackend::new(vec![
            Ok(ListPage::truncated(vec![group("g1"), group("g2")], "t1")),
            Ok(ListPage::last(vec![group("g3")])),
        ]);

        let cache = ReconciliationCache::build(ResourceKind::Group, &backend)
            .await
            .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            *backend.tokens.lock().unwrap(),
            vec![None, Some("t1".to_string())]
        );
        assert_eq!(cache.names(), vec!["g1", "g2", "g3"]);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn test_build_keeps_unnamed_in_order_and_last_duplicate() {
        let newer = group("g1").with_attribute("path", serde_json::json!("/new/"));
        let backend = PagedBackend::new(vec![
            Ok(ListPage::truncated(
                vec![
                    group("g1"),
                    DeployedSnapshot::unnamed(ResourceKind::Group, "u1"),
                ],
                "t1",
            )),
            Ok(ListPage::truncated(
                vec![DeployedSnapshot::unnamed(ResourceKind::Group, "u2")],
                "t2",
            )),
            Ok(ListPage::last(vec![newer.clone()])),
        ]);

        let cache = ReconciliationCache::build(ResourceKind::Group, &backend)
            .await
            .unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.entry("g1").unwrap().deployed, newer);
        let unnamed: Vec<String> = cache.unnamed().into_iter().map(|s| s.id).collect();
        assert_eq!(unnamed, vec!["u1", "u2"]);
    }

    #[tokio::test]
    async fn test_build_aborts_on_page_failure() {
        let backend = PagedBackend::new(vec![
            Ok(ListPage::truncated(vec![group("g1")], "t1")),
            Err(CloudError::backend("throttled")),
        ]);

        let err = ReconciliationCache::build(ResourceKind::Group, &backend)
            .await
            .unwrap_err();

        assert!(err.is_backend());
        assert!(err.to_string().contains("throttled"));
    }

    #[tokio::test]
    async fn test_build_rejects_truncated_page_without_token() {
        let backend = PagedBackend::new(vec![Ok(ListPage {
            items: vec![group("g1")],
            next_token: None,
            is_truncated: true,
        })]);

        let err = ReconciliationCache::build(ResourceKind::Group, &backend)
            .await
            .unwrap_err();
        assert!(err.is_backend());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_find_binds_and_miss_does_not_mutate() {
        let backend = PagedBackend::new(vec![
            Ok(ListPage::truncated(vec![group("g1"), group("g2")], "t1")),
            Ok(ListPage::last(vec![group("g3")])),
        ]);
        let cache = ReconciliationCache::build(ResourceKind::Group, &backend)
            .await
            .unwrap();

        assert!(cache.find(&definition("g4")).is_none());
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("g4"));

        let g2 = definition("g2");
        assert_eq!(cache.find(&g2).unwrap().id, "id-g2");
        assert_eq!(cache.find(&g2).unwrap().id, "id-g2");
        assert_eq!(cache.state("g2"), ResourceState::Reconciled);
        assert_eq!(cache.state("g1"), ResourceState::DeployedOnly);
        assert_eq!(cache.state("g4"), ResourceState::Absent);
    }

    #[test]
    fn test_rebinding_last_caller_wins() {
        let cache = ReconciliationCache::empty(ResourceKind::Group);
        let first = definition("g1");
        cache.insert(group("g1"), &first);

        let second = Arc::new(
            ConfiguredDefinition::new(ResourceKind::Group, "g1").with_policy("ReadOnlyAccess"),
        );
        cache.find(&second).unwrap();

        let bound = cache.entry("g1").unwrap().configured.unwrap();
        assert!(Arc::ptr_eq(&bound, &second));
    }

    #[test]
    fn test_remove_evicts() {
        let cache = ReconciliationCache::empty(ResourceKind::Group);
        let g1 = definition("g1");
        cache.insert(group("g1"), &g1);

        assert!(cache.remove("g1").is_some());
        assert!(cache.find(&g1).is_none());
        assert!(cache.remove("g1").is_none());
    }

    #[tokio::test]
    async fn test_audit_reports_only_deployed_drift() {
        let backend = PagedBackend::new(vec![Ok(ListPage::last(vec![
            group("g1"),
            group("g2"),
            DeployedSnapshot::unnamed(ResourceKind::Group, "AGPAUNNAMED"),
        ]))]);
        let cache = ReconciliationCache::build(ResourceKind::Group, &backend)
            .await
            .unwrap();
        cache.find(&definition("g2"));

        let mut acc = AuditAccumulator::new("run");
        cache.audit(&mut acc);

        let messages: Vec<&str> = acc.findings().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "g1");
        assert!(messages[1].starts_with("Unnamed Group 1 - Group ID: \"AGPAUNNAMED\""));
        assert!(
            acc.findings()
                .iter()
                .all(|f| f.category == AuditCategory::Deployed)
        );
    }
}
