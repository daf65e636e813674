//! Access-type resolution for GlobalDNS records.
//!
//! The caller's effective access is resolved in priority order: creator,
//! member list entry, global admin role, none. Only owners may mutate the
//! target-project list. The environment capabilities this needs (user
//! lookup, role binding and role listing, project access probes) are
//! injected as trait objects so the resolver stays independent of the
//! concrete management API.

use crate::errors::GlobalDnsError;
use crate::types::{AccessType, Member};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("user lookup failed: {0}")]
    UserLookup(String),

    #[error("global role binding listing failed: {0}")]
    RoleBindings(String),

    #[error("global role lookup failed: {0}")]
    Roles(String),

    #[error("project access check failed for {0}: {1}")]
    ProjectCheck(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub principal_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRoleBinding {
    pub user_id: String,
    pub global_role_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PolicyRule {
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRole {
    pub id: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

impl GlobalRole {
    /// A role granting all verbs on all resources carries the admin tier.
    pub fn grants_everything(&self) -> bool {
        self.rules.iter().any(|rule| {
            rule.resources.iter().any(|r| r == "*") && rule.verbs.iter().any(|v| v == "*")
        })
    }
}

#[async_trait]
pub trait UserLister: Send + Sync {
    async fn by_principal(&self, principal_id: &str) -> Result<Option<User>, AccessError>;
}

#[async_trait]
pub trait GlobalRoleBindingLister: Send + Sync {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<GlobalRoleBinding>, AccessError>;
}

#[async_trait]
pub trait GlobalRoleLister: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<GlobalRole>, AccessError>;
}

/// Probe for at least read access of a caller to a project.
#[async_trait]
pub trait ProjectAccess: Send + Sync {
    async fn can_access(&self, caller: &str, project_id: &str) -> Result<bool, AccessError>;
}

/// The access oracle the dispatcher consults. Two operations: resolve the
/// caller's access type on a record, and verify the caller can reach a set
/// of target projects.
#[async_trait]
pub trait AccessOracle: Send + Sync {
    async fn access_type_of_caller(
        &self,
        caller: &str,
        creator: &str,
        record_name: &str,
        members: &[Member],
    ) -> Result<AccessType, AccessError>;

    async fn check_target_access(
        &self,
        caller: &str,
        project_ids: &[String],
    ) -> Result<(), GlobalDnsError>;
}

/// Oracle implementation backed by the environment listers.
pub struct MemberAccess {
    pub users: Arc<dyn UserLister>,
    pub grb_lister: Arc<dyn GlobalRoleBindingLister>,
    pub gr_lister: Arc<dyn GlobalRoleLister>,
    pub projects: Arc<dyn ProjectAccess>,
}

#[async_trait]
impl AccessOracle for MemberAccess {
    async fn access_type_of_caller(
        &self,
        caller: &str,
        creator: &str,
        record_name: &str,
        members: &[Member],
    ) -> Result<AccessType, AccessError> {
        if caller == creator {
            return Ok(AccessType::Owner);
        }

        // Members may be recorded by principal id or by user id.
        let user = self.users.by_principal(caller).await?;
        for member in members {
            let principal_match = member.principal_id.as_deref() == Some(caller);
            let user_match = match (&user, &member.user_id) {
                (Some(u), Some(id)) => u.id == *id,
                _ => false,
            };
            if principal_match || user_match {
                return Ok(member.access_type.into());
            }
        }

        // Global admins are treated as owners even when not listed.
        if let Some(user) = user {
            for binding in self.grb_lister.list_for_user(&user.id).await? {
                if let Some(role) = self.gr_lister.get(&binding.global_role_id).await?
                    && role.grants_everything()
                {
                    tracing::debug!(
                        caller,
                        record = record_name,
                        role = %role.id,
                        "caller granted owner access through global role"
                    );
                    return Ok(AccessType::Owner);
                }
            }
        }

        Ok(AccessType::None)
    }

    async fn check_target_access(
        &self,
        caller: &str,
        project_ids: &[String],
    ) -> Result<(), GlobalDnsError> {
        for project_id in project_ids {
            if !self.projects.can_access(caller, project_id).await? {
                return Err(GlobalDnsError::UnauthorizedTarget {
                    user: caller.to_string(),
                    project_id: project_id.clone(),
                });
            }
        }
        Ok(())
    }
}
