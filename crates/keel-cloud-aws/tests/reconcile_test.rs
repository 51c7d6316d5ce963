//! IAM provider against the in-memory backend

use keel_cloud::{
    AuditCategory, AuditRegistry, CloudError, CloudProvider, ConfiguredDefinition, Lifecycle,
    RecordingConsole, Relation, Resource, ResourceKind, ResourceState, ResourceTree,
};
use keel_cloud_aws::IamProvider;
use keel_cloud_mock::{MemoryBackend, Operation};
use std::sync::Arc;

fn group(name: &str) -> Arc<ConfiguredDefinition> {
    Arc::new(ConfiguredDefinition::new(ResourceKind::Group, name))
}

fn user(name: &str) -> Arc<ConfiguredDefinition> {
    Arc::new(ConfiguredDefinition::new(ResourceKind::User, name))
}

fn provider(backend: &Arc<MemoryBackend>) -> IamProvider {
    IamProvider::new(backend.clone()).with_account("123456789012")
}

fn flags(id: &str) -> Vec<String> {
    vec![id.to_string()]
}

#[tokio::test]
async fn test_pagination_scenario() {
    let backend = Arc::new(MemoryBackend::new().with_page_size(2));
    for name in ["g1", "g2", "g3"] {
        backend.seed(ResourceKind::Group, name);
    }
    let provider = provider(&backend);
    let session = provider
        .open_session(Arc::new(RecordingConsole::new()))
        .await
        .unwrap();

    let cache = session.cache(ResourceKind::Group).unwrap();
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.names(), vec!["g1", "g2", "g3"]);

    // Users and groups: two group pages plus one user page
    assert_eq!(backend.calls(Operation::List), 3);

    assert!(cache.find(&group("g4")).is_none());
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.state("g1"), ResourceState::DeployedOnly);
}

#[tokio::test]
async fn test_load_uses_cache() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(ResourceKind::Group, "ops");
    let provider = provider(&backend);
    let session = provider
        .open_session(Arc::new(RecordingConsole::new()))
        .await
        .unwrap();

    let mut ops = Resource::new(group("ops"), &provider, &session).unwrap();
    ops.load().await.unwrap();
    assert!(ops.created());
    assert_eq!(backend.calls(Operation::Get), 0);

    let mut dev = Resource::new(group("dev"), &provider, &session).unwrap();
    dev.load().await.unwrap();
    assert!(dev.destroyed());
    assert_eq!(backend.calls(Operation::Get), 1);
}

#[tokio::test]
async fn test_create_attaches_policies_and_groups() {
    let backend = Arc::new(MemoryBackend::new());
    let provider = provider(&backend);
    let console = Arc::new(RecordingConsole::new());
    let session = provider.open_session(console.clone()).await.unwrap();

    let ops = Arc::new(
        ConfiguredDefinition::new(ResourceKind::Group, "ops").with_policy("ReadOnlyAccess"),
    );
    let alice = Arc::new(
        ConfiguredDefinition::new(ResourceKind::User, "alice")
            .with_policy("arn:aws:iam::aws:policy/IAMUserChangePassword")
            .with_group("ops"),
    );

    let mut tree = ResourceTree::new("test", console.clone());
    // Users are declared first but groups must exist before memberships
    tree.add_all(&provider, &session, [alice, ops]).unwrap();
    tree.load().await.unwrap();
    tree.create(&[]).await.unwrap();

    assert_eq!(
        backend.relations(ResourceKind::Group, "ops"),
        vec![Relation::Policy(
            "arn:aws:iam::123456789012:policy/ReadOnlyAccess".into()
        )]
    );
    assert_eq!(
        backend.relations(ResourceKind::User, "alice"),
        vec![
            Relation::Policy("arn:aws:iam::aws:policy/IAMUserChangePassword".into()),
            Relation::Group("ops".into()),
        ]
    );
    assert!(console.contains("Group created: ops"));
    assert!(console.contains("User created: alice"));

    let cache = session.cache(ResourceKind::User).unwrap();
    assert_eq!(cache.state("alice"), ResourceState::Reconciled);
}

#[tokio::test]
async fn test_create_and_destroy_are_idempotent() {
    let backend = Arc::new(MemoryBackend::new());
    let provider = provider(&backend);
    let console = Arc::new(RecordingConsole::new());
    let session = provider.open_session(console.clone()).await.unwrap();

    let mut ops = Resource::new(group("ops"), &provider, &session).unwrap();
    ops.load().await.unwrap();
    ops.create(&[]).await.unwrap();
    ops.create(&[]).await.unwrap();
    assert_eq!(backend.calls(Operation::Create), 1);
    assert!(console.contains("Group exists, skipping..."));

    ops.destroy(&[]).await.unwrap();
    ops.destroy(&[]).await.unwrap();
    assert_eq!(backend.calls(Operation::Delete), 1);
    assert!(console.contains("Group does not exist, skipping..."));
}

#[tokio::test]
async fn test_destroy_evicts_cache_entry() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(ResourceKind::Group, "g1");
    backend.seed(ResourceKind::Group, "g2");
    let provider = provider(&backend);
    let session = provider
        .open_session(Arc::new(RecordingConsole::new()))
        .await
        .unwrap();

    let mut g2 = Resource::new(group("g2"), &provider, &session).unwrap();
    g2.load().await.unwrap();
    g2.destroy(&[]).await.unwrap();

    let cache = session.cache(ResourceKind::Group).unwrap();
    assert!(cache.find(&group("g2")).is_none());
    assert!(!g2.created());
    assert!(!backend.contains(ResourceKind::Group, "g2"));

    backend.reset_calls();
    g2.destroy(&[]).await.unwrap();
    assert_eq!(backend.mutations(), 0);
    assert_eq!(backend.calls(Operation::Get), 0);
}

#[tokio::test]
async fn test_destroy_user_leaves_groups_first() {
    let backend = Arc::new(MemoryBackend::new());
    let provider = provider(&backend);
    let console = Arc::new(RecordingConsole::new());
    let session = provider.open_session(console.clone()).await.unwrap();

    let mut tree = ResourceTree::new("test", console.clone());
    tree.add_all(
        &provider,
        &session,
        [
            group("ops"),
            Arc::new(
                ConfiguredDefinition::new(ResourceKind::User, "bob")
                    .with_policy("ReadOnlyAccess")
                    .with_group("ops"),
            ),
        ],
    )
    .unwrap();
    tree.load().await.unwrap();
    tree.create(&[]).await.unwrap();
    tree.destroy(&[]).await.unwrap();

    assert!(!backend.contains(ResourceKind::User, "bob"));
    assert!(!backend.contains(ResourceKind::Group, "ops"));
    assert!(console.contains("Left Groups"));
}

#[tokio::test]
async fn test_partial_create_names_failed_step() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_on(Operation::Attach, "ops");
    let provider = provider(&backend);
    let session = provider
        .open_session(Arc::new(RecordingConsole::new()))
        .await
        .unwrap();

    let definition = Arc::new(
        ConfiguredDefinition::new(ResourceKind::Group, "ops").with_policy("ReadOnlyAccess"),
    );
    let mut ops = Resource::new(definition, &provider, &session).unwrap();
    ops.load().await.unwrap();

    let err = ops.create(&[]).await.unwrap_err();
    assert!(matches!(err, CloudError::StepFailed { .. }));
    assert!(err.is_backend());
    assert!(
        err.to_string().starts_with(
            "attach policy arn:aws:iam::123456789012:policy/ReadOnlyAccess to group ops failed"
        ),
        "{}",
        err
    );

    // The group itself was created and is not rolled back
    assert!(backend.contains(ResourceKind::Group, "ops"));
    assert!(ops.created());

    // A second create skips the existing group
    ops.create(&[]).await.unwrap();
    assert_eq!(backend.calls(Operation::Create), 1);
}

#[tokio::test]
async fn test_destroy_after_partial_create() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_on(Operation::Attach, "ops");
    let provider = provider(&backend);
    let console = Arc::new(RecordingConsole::new());
    let session = provider.open_session(console.clone()).await.unwrap();

    let definition = Arc::new(
        ConfiguredDefinition::new(ResourceKind::Group, "ops").with_policy("ReadOnlyAccess"),
    );
    let mut ops = Resource::new(definition, &provider, &session).unwrap();
    ops.load().await.unwrap();
    ops.create(&[]).await.unwrap_err();
    backend.clear_faults();

    // The policy never got attached; destroy still removes the group
    ops.destroy(&[]).await.unwrap();
    assert!(!backend.contains(ResourceKind::Group, "ops"));
    assert!(ops.destroyed());
    assert!(console.contains("Group deleted: ops"));
}

#[tokio::test]
async fn test_destroy_user_missing_membership() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(ResourceKind::Group, "ops");
    backend.seed(ResourceKind::User, "alice");
    let provider = provider(&backend);
    let session = provider
        .open_session(Arc::new(RecordingConsole::new()))
        .await
        .unwrap();

    let definition =
        Arc::new(ConfiguredDefinition::new(ResourceKind::User, "alice").with_group("ops"));
    let mut alice = Resource::new(definition, &provider, &session).unwrap();
    alice.load().await.unwrap();
    assert!(alice.created());

    alice.destroy(&[]).await.unwrap();
    assert!(!backend.contains(ResourceKind::User, "alice"));
    assert_eq!(backend.calls(Operation::Detach), 1);
}

#[tokio::test]
async fn test_load_failure_is_backend_error() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_on(Operation::Get, "dev");
    let provider = provider(&backend);
    let session = provider
        .open_session(Arc::new(RecordingConsole::new()))
        .await
        .unwrap();

    let mut dev = Resource::new(group("dev"), &provider, &session).unwrap();
    let err = dev.load().await.unwrap_err();
    assert!(err.is_backend());
}

#[tokio::test]
async fn test_session_fails_on_page_error() {
    let backend = Arc::new(MemoryBackend::new().with_page_size(1));
    backend.seed(ResourceKind::Group, "g1");
    backend.seed(ResourceKind::Group, "g2");
    backend.fail_on(Operation::List, "1");
    let provider = provider(&backend);

    let err = provider
        .open_session(Arc::new(RecordingConsole::new()))
        .await
        .unwrap_err();
    assert!(err.is_backend());
}

#[tokio::test]
async fn test_audit_partitions_drift() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(ResourceKind::Group, "g1");
    backend.seed(ResourceKind::Group, "stray");
    backend.seed_unnamed(ResourceKind::Group, "AGPAUNNAMED");
    let provider = provider(&backend);
    let console = Arc::new(RecordingConsole::new());
    let session = provider.open_session(console.clone()).await.unwrap();

    let mut tree = ResourceTree::new("test", console.clone());
    tree.add_all(&provider, &session, [group("g1"), group("g4"), user("carol")])
        .unwrap();
    tree.load().await.unwrap();

    let mut audits = AuditRegistry::new();
    audits.register("run");
    tree.audit(&flags("run"), &mut audits).unwrap();

    let accumulator = audits.lookup("run").unwrap();
    let configured: Vec<_> = accumulator
        .by_category(AuditCategory::Configured)
        .into_iter()
        .map(|f| f.message.clone())
        .collect();
    assert_eq!(configured, vec!["g4", "carol"]);

    let deployed = accumulator.by_category(AuditCategory::Deployed);
    assert_eq!(deployed.len(), 2);
    assert_eq!(deployed[0].message, "stray");
    assert!(
        deployed[1]
            .message
            .starts_with("Unnamed Group 1 - Group ID: \"AGPAUNNAMED\"")
    );
}

#[tokio::test]
async fn test_audit_requires_registered_id() {
    let backend = Arc::new(MemoryBackend::new());
    let provider = provider(&backend);
    let session = provider
        .open_session(Arc::new(RecordingConsole::new()))
        .await
        .unwrap();
    let ops = Resource::new(group("ops"), &provider, &session).unwrap();
    let mut audits = AuditRegistry::new();

    let err = ops.audit(&[], &mut audits).unwrap_err();
    assert!(err.is_invalid_argument());

    let err = ops.audit(&flags("nightly"), &mut audits).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn test_info_lines() {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed(ResourceKind::User, "alice");
    let provider = provider(&backend);
    let console = Arc::new(RecordingConsole::new());
    let session = provider.open_session(console.clone()).await.unwrap();

    let mut alice = Resource::new(user("alice"), &provider, &session).unwrap();
    alice.load().await.unwrap();
    alice.info();

    assert!(console.contains(&format!("{:<20}\t{}", "name", "alice")));
    assert!(console.contains("arn:aws:iam::000000000000:user/alice"));
}

#[tokio::test]
async fn test_check_auth() {
    let backend = Arc::new(MemoryBackend::new());
    let provider = provider(&backend);
    let status = provider.check_auth().await.unwrap();
    assert!(status.authenticated);

    backend.fail_on(Operation::List, "");
    let status = provider.check_auth().await.unwrap();
    assert!(!status.authenticated);
    assert!(status.error.is_some());
}
