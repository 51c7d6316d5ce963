use keel_cloud::{
    AuditAccumulator, AuditCategory, AuditRegistry, CloudError, Command, Console, Lifecycle,
    Request, Resource, ResourceKind, ResourceTree, Response, Router,
};
use std::sync::Arc;

/// Commands that act on deployed state and load it first
fn needs_load(command: Command) -> bool {
    matches!(
        command,
        Command::Create | Command::Destroy | Command::Provision | Command::Audit | Command::Info
    )
}

/// Resolve a `<kind>/<name>` target inside the tree
pub fn resolve_target<'a>(
    tree: &'a mut ResourceTree,
    target: &str,
) -> keel_cloud::Result<&'a mut Resource> {
    let (kind, name) = target.split_once('/').ok_or_else(|| {
        CloudError::invalid_argument(format!("target must be <kind>/<name>, got {:?}", target))
    })?;
    let kind: ResourceKind = kind.parse()?;
    tree.get_mut(kind, name).ok_or_else(|| {
        CloudError::invalid_argument(format!("no {} named {:?} in configuration", kind, name))
    })
}

/// Route `verb` to the whole tree or to one target
pub async fn handle(
    tree: &mut ResourceTree,
    console: Arc<dyn Console>,
    verb: &str,
    target: Option<&str>,
    audit_id: &str,
) -> anyhow::Result<Response> {
    let router = Router::new(Arc::clone(&console));
    let mut audits = AuditRegistry::new();
    let command = verb.parse::<Command>().ok();

    let mut request = Request::new(verb);
    if command == Some(Command::Audit) {
        audits.register(audit_id);
        request = request.with_flag(audit_id);
    }

    let lifecycle: &mut dyn Lifecycle = match target {
        Some(target) => resolve_target(tree, target)?,
        None => tree,
    };

    if command.is_some_and(needs_load) {
        let load = Request::new(Command::Load.as_str());
        if !router.route(lifecycle, &load, &mut audits).await.is_ok() {
            return Ok(Response::Fail);
        }
    }

    let response = router.route(lifecycle, &request, &mut audits).await;
    if response.is_ok() && command == Some(Command::Audit) {
        if let Some(accumulator) = audits.lookup(audit_id) {
            print_audit(console.as_ref(), accumulator);
        }
    }
    Ok(response)
}

/// Print findings grouped by category
pub fn print_audit(console: &dyn Console, accumulator: &AuditAccumulator) {
    console.info(&format!("Audit {}", accumulator.name()));
    if accumulator.is_empty() {
        console.detail("No drift found");
        return;
    }
    for (category, heading) in [
        (AuditCategory::Configured, "Configured, not deployed"),
        (AuditCategory::Deployed, "Deployed, not configured"),
    ] {
        let findings = accumulator.by_category(category);
        if findings.is_empty() {
            continue;
        }
        console.info(&format!("{} ({})", heading, findings.len()));
        for finding in findings {
            console.detail(&finding.message);
        }
    }
}
