//! In-memory backend
//!
//! Behaves like a small IAM account: named entities with generated ids,
//! paginated listing, policy and membership relations, and the same
//! conflicts the real API reports. Every call is counted and any
//! (operation, target) pair can be made to fail.

use async_trait::async_trait;
use keel_cloud::{Backend, CloudError, DeployedSnapshot, ListPage, Relation, ResourceKind, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// Default number of items per list page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Backend operations, for call counting and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Delete,
    Attach,
    Detach,
}

#[derive(Default)]
struct MemoryState {
    /// Entities per kind in creation order, unnamed ones included
    entities: BTreeMap<ResourceKind, Vec<DeployedSnapshot>>,
    relations: BTreeMap<(ResourceKind, String), Vec<Relation>>,
    calls: BTreeMap<Operation, usize>,
    /// For `List` the target is the page token, empty for the first page
    faults: BTreeSet<(Operation, String)>,
    next_id: u64,
}

impl MemoryState {
    fn record(&mut self, operation: Operation, target: &str) -> Result<()> {
        *self.calls.entry(operation).or_default() += 1;
        if self.faults.contains(&(operation, target.to_string())) {
            return Err(CloudError::backend(format!(
                "injected {:?} failure for {:?}",
                operation, target
            )));
        }
        Ok(())
    }

    fn find(&self, kind: ResourceKind, name: &str) -> Option<&DeployedSnapshot> {
        self.entities
            .get(&kind)
            .and_then(|items| items.iter().find(|s| s.name() == Some(name)))
    }

    fn next_id(&mut self, kind: ResourceKind) -> String {
        self.next_id += 1;
        let prefix = match kind {
            ResourceKind::Group => "AGPA",
            ResourceKind::User => "AIDA",
            ResourceKind::Bucket => "BKT",
        };
        format!("{}{:016}", prefix, self.next_id)
    }

    fn require(&self, kind: ResourceKind, name: &str) -> Result<()> {
        if self.find(kind, name).is_none() {
            return Err(no_such_entity(kind, name));
        }
        Ok(())
    }
}

fn no_such_entity(kind: ResourceKind, name: &str) -> CloudError {
    CloudError::backend(format!(
        "NoSuchEntity: The {} with name {} cannot be found.",
        kind, name
    ))
}

/// Backend keeping every entity in memory
pub struct MemoryBackend {
    account: String,
    page_size: usize,
    state: Mutex<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            account: "000000000000".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Items per list page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn snapshot(&self, kind: ResourceKind, id: String, name: &str) -> DeployedSnapshot {
        let arn = match kind {
            ResourceKind::Bucket => format!("arn:aws:s3:::{}", name),
            kind => format!("arn:aws:iam::{}:{}/{}", self.account, kind, name),
        };
        DeployedSnapshot::new(kind, id, name)
            .with_attribute("arn", serde_json::json!(arn))
            .with_attribute("path", serde_json::json!("/"))
    }

    /// Add a named entity without counting a call
    pub fn seed(&self, kind: ResourceKind, name: &str) -> DeployedSnapshot {
        let mut state = self.lock();
        let id = state.next_id(kind);
        let snapshot = self.snapshot(kind, id, name);
        state
            .entities
            .entry(kind)
            .or_default()
            .push(snapshot.clone());
        snapshot
    }

    /// Add an entity the backend reports without a name
    pub fn seed_unnamed(&self, kind: ResourceKind, id: &str) -> DeployedSnapshot {
        let snapshot = DeployedSnapshot::unnamed(kind, id)
            .with_attribute("path", serde_json::json!("/"));
        self.lock()
            .entities
            .entry(kind)
            .or_default()
            .push(snapshot.clone());
        snapshot
    }

    /// Make every `operation` call on `target` fail with a backend error
    pub fn fail_on(&self, operation: Operation, target: &str) {
        self.lock().faults.insert((operation, target.to_string()));
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Calls that change backend state
    pub fn mutations(&self) -> usize {
        let state = self.lock();
        [
            Operation::Create,
            Operation::Delete,
            Operation::Attach,
            Operation::Detach,
        ]
        .iter()
        .map(|op| state.calls.get(op).copied().unwrap_or(0))
        .sum()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.lock().find(kind, name).is_some()
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        self.lock().entities.get(&kind).map_or(0, Vec::len)
    }

    pub fn relations(&self, kind: ResourceKind, name: &str) -> Vec<Relation> {
        self.lock()
            .relations
            .get(&(kind, name.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, kind: ResourceKind, page_token: Option<&str>) -> Result<ListPage> {
        let mut state = self.lock();
        state.record(Operation::List, page_token.unwrap_or_default())?;

        let start = match page_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                CloudError::invalid_argument(format!("invalid page token {:?}", token))
            })?,
            None => 0,
        };
        let all = state.entities.get(&kind).map(Vec::as_slice).unwrap_or_default();
        let end = start.saturating_add(self.page_size).min(all.len());
        let items = all.get(start..end).map(<[_]>::to_vec).unwrap_or_default();

        if end < all.len() {
            Ok(ListPage::truncated(items, end.to_string()))
        } else {
            Ok(ListPage::last(items))
        }
    }

    async fn get(&self, kind: ResourceKind, name: &str) -> Result<Option<DeployedSnapshot>> {
        let mut state = self.lock();
        state.record(Operation::Get, name)?;
        Ok(state.find(kind, name).cloned())
    }

    async fn create(&self, kind: ResourceKind, name: &str) -> Result<DeployedSnapshot> {
        let mut state = self.lock();
        state.record(Operation::Create, name)?;
        if state.find(kind, name).is_some() {
            return Err(CloudError::backend(format!(
                "EntityAlreadyExists: {} with name {} already exists.",
                kind, name
            )));
        }
        let id = state.next_id(kind);
        let snapshot = self.snapshot(kind, id, name);
        state
            .entities
            .entry(kind)
            .or_default()
            .push(snapshot.clone());
        tracing::debug!("memory: created {} {} ({})", kind, name, snapshot.id);
        Ok(snapshot)
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Operation::Delete, name)?;
        state.require(kind, name)?;
        let key = (kind, name.to_string());
        if state.relations.get(&key).is_some_and(|r| !r.is_empty()) {
            return Err(CloudError::backend(format!(
                "DeleteConflict: Cannot delete entity, must detach all policies and groups first: {} {}",
                kind, name
            )));
        }
        if let Some(items) = state.entities.get_mut(&kind) {
            items.retain(|s| s.name() != Some(name));
        }
        state.relations.remove(&key);
        Ok(())
    }

    async fn attach(&self, kind: ResourceKind, name: &str, relation: &Relation) -> Result<()> {
        let mut state = self.lock();
        state.record(Operation::Attach, name)?;
        state.require(kind, name)?;
        if let Relation::Group(group) = relation {
            state.require(ResourceKind::Group, group)?;
        }
        let relations = state.relations.entry((kind, name.to_string())).or_default();
        if !relations.contains(relation) {
            relations.push(relation.clone());
        }
        Ok(())
    }

    async fn detach(&self, kind: ResourceKind, name: &str, relation: &Relation) -> Result<bool> {
        let mut state = self.lock();
        state.record(Operation::Detach, name)?;
        state.require(kind, name)?;
        let Some(relations) = state.relations.get_mut(&(kind, name.to_string())) else {
            return Ok(false);
        };
        let before = relations.len();
        relations.retain(|r| r != relation);
        Ok(relations.len() < before)
    }
}
