//! Keel Cloud Reconciliation Core
//!
//! This crate holds what every Keel provider shares: the lifecycle contract
//! resources obey, the command router, and the reconciliation cache that
//! matches deployed resources against configured ones.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    Keel CLI                      │
//! │            (keel create / audit / ...)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │ Request
//! ┌─────────────────▼───────────────────────────────┐
//! │                  keel-cloud                      │
//! │  Router ──▶ ResourceTree ──▶ Resource            │
//! │                                  │               │
//! │                     trait ProviderResource       │
//! │                                  │               │
//! │  Session { Backend, ReconciliationCache per kind }│
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │ keel-cloud-aws│ │keel-cloud-mock│
//! │  (IAM groups, │ │ (memory       │
//! │   users)      │ │  backend)     │
//! └───────────────┘ └───────────────┘
//! ```

pub mod audit;
pub mod backend;
pub mod cache;
pub mod console;
pub mod definition;
pub mod error;
pub mod provider;
pub mod resource;
pub mod router;
pub mod session;
pub mod state;
pub mod tree;

// Re-exports
pub use audit::{AuditAccumulator, AuditCategory, AuditFinding, AuditRegistry};
pub use backend::{Backend, ListPage, Relation};
pub use cache::{CacheEntry, ReconciliationCache};
pub use console::{Console, ConsoleLine, LineLevel, RecordingConsole, TerminalConsole};
pub use definition::ConfiguredDefinition;
pub use error::{CloudError, Result, StepContext};
pub use provider::{AuthStatus, CloudProvider, ProviderResource};
pub use resource::Resource;
pub use router::{Command, Lifecycle, Request, Response, Router};
pub use session::Session;
pub use state::{DeployedSnapshot, ResourceKind, ResourceState};
pub use tree::ResourceTree;
