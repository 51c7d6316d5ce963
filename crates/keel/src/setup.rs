//! Provider and resource tree assembly

use anyhow::{Context, Result};
use keel_cloud::{Backend, CloudProvider, Console, ResourceTree};
use keel_cloud_aws::IamProvider;
use keel_cloud_mock::{MemoryBackend, MockOptions, MockProvider};
use keel_config::Document;
use std::sync::Arc;

/// Backend used when neither the command line nor the document names one
pub const DEFAULT_PROVIDER: &str = "memory";

/// Every provider one run talks to, sharing a single backend
pub struct Providers {
    pub iam: IamProvider,
    pub storage: MockProvider,
}

impl Providers {
    pub fn all(&self) -> [&dyn CloudProvider; 2] {
        [&self.iam, &self.storage]
    }
}

pub async fn connect(provider: &str, document: &Document) -> Result<Providers> {
    let account = document.provider.account.clone().unwrap_or_default();
    let backend: Arc<dyn Backend> = match provider {
        "memory" => {
            let mut backend = MemoryBackend::new();
            if !account.is_empty() {
                backend = backend.with_account(account.as_str());
            }
            Arc::new(backend)
        }
        "aws" => aws_backend(document).await?,
        other => anyhow::bail!("Unknown provider {:?} (expected memory or aws)", other),
    };
    tracing::debug!("Using {} backend", backend.name());

    Ok(Providers {
        iam: IamProvider::new(Arc::clone(&backend)).with_account(account),
        storage: MockProvider::new(
            backend,
            MockOptions::new(document.provider.data_strings()),
        ),
    })
}

#[cfg(feature = "aws")]
async fn aws_backend(document: &Document) -> Result<Arc<dyn Backend>> {
    let region = document
        .provider
        .region
        .as_deref()
        .or(document.identity_management.region.as_deref());
    Ok(Arc::new(keel_cloud_aws::IamClient::from_env(region).await))
}

#[cfg(not(feature = "aws"))]
async fn aws_backend(_document: &Document) -> Result<Arc<dyn Backend>> {
    anyhow::bail!("keel was built without AWS support; rebuild with `--features aws`")
}

/// Open one session per provider and add every definition it manages
pub async fn build_tree(
    providers: &Providers,
    document: &Document,
    console: Arc<dyn Console>,
) -> Result<ResourceTree> {
    let definitions = document.definitions();
    let mut tree = ResourceTree::new("keel", Arc::clone(&console));

    for provider in providers.all() {
        let session = provider
            .open_session(Arc::clone(&console))
            .await
            .with_context(|| format!("Failed to open {} session", provider.display_name()))?;
        let owned = definitions
            .iter()
            .filter(|d| provider.supports(d.kind))
            .cloned();
        tree.add_all(provider, &session, owned)?;
    }

    tracing::debug!("Built tree with {} resource(s)", tree.len());
    Ok(tree)
}
