//! IAM backend over the AWS SDK

use async_trait::async_trait;
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::types::{Group, User};
use keel_cloud::{Backend, CloudError, DeployedSnapshot, ListPage, Relation, ResourceKind, Result};

fn sdk_error(operation: &str, e: impl std::error::Error) -> CloudError {
    CloudError::backend(format!("{}: {}", operation, DisplayErrorContext(e)))
}

fn unsupported(kind: ResourceKind) -> CloudError {
    CloudError::Unsupported(format!("IAM has no {} resources", kind))
}

fn group_snapshot(group: &Group) -> DeployedSnapshot {
    DeployedSnapshot::new(ResourceKind::Group, group.group_id(), group.group_name())
        .with_attribute("arn", serde_json::json!(group.arn()))
        .with_attribute("path", serde_json::json!(group.path()))
        .with_attribute("create_date", serde_json::json!(group.create_date().secs()))
}

fn user_snapshot(user: &User) -> DeployedSnapshot {
    DeployedSnapshot::new(ResourceKind::User, user.user_id(), user.user_name())
        .with_attribute("arn", serde_json::json!(user.arn()))
        .with_attribute("path", serde_json::json!(user.path()))
        .with_attribute("create_date", serde_json::json!(user.create_date().secs()))
}

fn page(items: Vec<DeployedSnapshot>, truncated: bool, marker: Option<&str>) -> ListPage {
    ListPage {
        items,
        next_token: marker.map(str::to_string),
        is_truncated: truncated,
    }
}

/// IAM client
pub struct IamClient {
    client: aws_sdk_iam::Client,
}

impl IamClient {
    /// Build a client from the default credential chain
    pub async fn from_env(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;
        Self {
            client: aws_sdk_iam::Client::new(&config),
        }
    }
}

#[async_trait]
impl Backend for IamClient {
    fn name(&self) -> &str {
        "aws-iam"
    }

    async fn list(&self, kind: ResourceKind, page_token: Option<&str>) -> Result<ListPage> {
        let marker = page_token.map(str::to_string);
        match kind {
            ResourceKind::Group => {
                let output = self
                    .client
                    .list_groups()
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|e| sdk_error("ListGroups", e))?;
                let items = output.groups().iter().map(group_snapshot).collect();
                Ok(page(items, output.is_truncated(), output.marker()))
            }
            ResourceKind::User => {
                let output = self
                    .client
                    .list_users()
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|e| sdk_error("ListUsers", e))?;
                let items = output.users().iter().map(user_snapshot).collect();
                Ok(page(items, output.is_truncated(), output.marker()))
            }
            kind => Err(unsupported(kind)),
        }
    }

    async fn get(&self, kind: ResourceKind, name: &str) -> Result<Option<DeployedSnapshot>> {
        match kind {
            ResourceKind::Group => {
                match self.client.get_group().group_name(name).send().await {
                    Ok(output) => Ok(output.group().map(group_snapshot)),
                    Err(e)
                        if e.as_service_error()
                            .is_some_and(|s| s.is_no_such_entity_exception()) =>
                    {
                        Ok(None)
                    }
                    Err(e) => Err(sdk_error("GetGroup", e)),
                }
            }
            ResourceKind::User => match self.client.get_user().user_name(name).send().await {
                Ok(output) => Ok(output.user().map(user_snapshot)),
                Err(e)
                    if e.as_service_error()
                        .is_some_and(|s| s.is_no_such_entity_exception()) =>
                {
                    Ok(None)
                }
                Err(e) => Err(sdk_error("GetUser", e)),
            },
            kind => Err(unsupported(kind)),
        }
    }

    async fn create(&self, kind: ResourceKind, name: &str) -> Result<DeployedSnapshot> {
        let created = match kind {
            ResourceKind::Group => self
                .client
                .create_group()
                .group_name(name)
                .send()
                .await
                .map_err(|e| sdk_error("CreateGroup", e))?
                .group()
                .map(group_snapshot),
            ResourceKind::User => self
                .client
                .create_user()
                .user_name(name)
                .send()
                .await
                .map_err(|e| sdk_error("CreateUser", e))?
                .user()
                .map(user_snapshot),
            kind => return Err(unsupported(kind)),
        };
        created.ok_or_else(|| {
            CloudError::backend(format!("create {} {:?} returned no entity", kind, name))
        })
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<()> {
        match kind {
            ResourceKind::Group => {
                self.client
                    .delete_group()
                    .group_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_error("DeleteGroup", e))?;
            }
            ResourceKind::User => {
                self.client
                    .delete_user()
                    .user_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_error("DeleteUser", e))?;
            }
            kind => return Err(unsupported(kind)),
        }
        Ok(())
    }

    async fn attach(&self, kind: ResourceKind, name: &str, relation: &Relation) -> Result<()> {
        match (kind, relation) {
            (ResourceKind::Group, Relation::Policy(arn)) => {
                self.client
                    .attach_group_policy()
                    .group_name(name)
                    .policy_arn(arn)
                    .send()
                    .await
                    .map_err(|e| sdk_error("AttachGroupPolicy", e))?;
            }
            (ResourceKind::User, Relation::Policy(arn)) => {
                self.client
                    .attach_user_policy()
                    .user_name(name)
                    .policy_arn(arn)
                    .send()
                    .await
                    .map_err(|e| sdk_error("AttachUserPolicy", e))?;
            }
            (ResourceKind::User, Relation::Group(group)) => {
                self.client
                    .add_user_to_group()
                    .user_name(name)
                    .group_name(group)
                    .send()
                    .await
                    .map_err(|e| sdk_error("AddUserToGroup", e))?;
            }
            (kind, relation) => {
                return Err(CloudError::Unsupported(format!(
                    "cannot attach {} to {}",
                    relation, kind
                )));
            }
        }
        Ok(())
    }

    /// IAM answers NoSuchEntity for a relation that is not attached
    async fn detach(&self, kind: ResourceKind, name: &str, relation: &Relation) -> Result<bool> {
        match (kind, relation) {
            (ResourceKind::Group, Relation::Policy(arn)) => {
                match self
                    .client
                    .detach_group_policy()
                    .group_name(name)
                    .policy_arn(arn)
                    .send()
                    .await
                {
                    Ok(_) => Ok(true),
                    Err(e)
                        if e.as_service_error()
                            .is_some_and(|s| s.is_no_such_entity_exception()) =>
                    {
                        Ok(false)
                    }
                    Err(e) => Err(sdk_error("DetachGroupPolicy", e)),
                }
            }
            (ResourceKind::User, Relation::Policy(arn)) => {
                match self
                    .client
                    .detach_user_policy()
                    .user_name(name)
                    .policy_arn(arn)
                    .send()
                    .await
                {
                    Ok(_) => Ok(true),
                    Err(e)
                        if e.as_service_error()
                            .is_some_and(|s| s.is_no_such_entity_exception()) =>
                    {
                        Ok(false)
                    }
                    Err(e) => Err(sdk_error("DetachUserPolicy", e)),
                }
            }
            (ResourceKind::User, Relation::Group(group)) => {
                match self
                    .client
                    .remove_user_from_group()
                    .user_name(name)
                    .group_name(group)
                    .send()
                    .await
                {
                    Ok(_) => Ok(true),
                    Err(e)
                        if e.as_service_error()
                            .is_some_and(|s| s.is_no_such_entity_exception()) =>
                    {
                        Ok(false)
                    }
                    Err(e) => Err(sdk_error("RemoveUserFromGroup", e)),
                }
            }
            (kind, relation) => Err(CloudError::Unsupported(format!(
                "cannot detach {} from {}",
                relation, kind
            ))),
        }
    }
}
