//! AWS IAM provider for Keel
//!
//! Manages IAM groups and users: creation, deletion, managed policy
//! attachment and group membership. The provider talks to any
//! [`keel_cloud::Backend`]; the SDK-backed [`IamClient`] is compiled in with
//! the `aws-sdk` feature.

#[cfg(feature = "aws-sdk")]
pub mod client;
mod entity;
pub mod group;
pub mod policy;
pub mod provider;
pub mod user;

#[cfg(feature = "aws-sdk")]
pub use client::IamClient;
pub use group::IamGroup;
pub use policy::IamPolicy;
pub use provider::IamProvider;
pub use user::IamUser;
