use crate::errors::GlobalDnsError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Annotation recording the principal that created a record.
pub const CREATOR_ID_ANNOTATION: &str = "field.cattle.io/creatorId";

/// Header naming the caller principal on incoming requests.
pub const IMPERSONATE_USER_HEADER: &str = "Impersonate-User";

/// Body field carrying the project id list for both actions.
pub const PROJECT_IDS_FIELD: &str = "projectIds";

pub const ADD_PROJECTS_ACTION: &str = "addProjects";
pub const REMOVE_PROJECTS_ACTION: &str = "removeProjects";

/// Access level recorded on a member entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    #[serde(rename = "owner")]
    Owner,
    #[serde(rename = "member")]
    Member,
    #[serde(rename = "read-only")]
    ReadOnly,
}

/// Effective access of a caller to a record, as resolved against the
/// creator annotation, the member list and the global roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Owner,
    Member,
    ReadOnly,
    None,
}

impl From<AccessLevel> for AccessType {
    fn from(level: AccessLevel) -> Self {
        match level {
            AccessLevel::Owner => AccessType::Owner,
            AccessLevel::Member => AccessType::Member,
            AccessLevel::ReadOnly => AccessType::ReadOnly,
        }
    }
}

/// A member entry on a record. A member is referenced either by user id or
/// by principal id; both may be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    pub access_type: AccessLevel,
}

/// Composite identity of a record, rendered on the wire as
/// `"namespace:name"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub namespace: String,
    pub name: String,
}

impl FromStr for RecordId {
    type Err = GlobalDnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => Ok(RecordId {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            _ => Err(GlobalDnsError::MalformedId),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// A GlobalDNS record as carried by the management API. This handler only
/// mutates `project_ids`; everything else is observed and written back
/// verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDnsRecord {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub project_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_cluster_app_name: Option<String>,
    #[serde(default)]
    pub fqdn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    /// Opaque revision token used for optimistic concurrency.
    #[serde(default)]
    pub revision: String,
}

impl GlobalDnsRecord {
    pub fn id(&self) -> RecordId {
        RecordId {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn creator_id(&self) -> Option<&str> {
        self.annotations.get(CREATOR_ID_ANNOTATION).map(String::as_str)
    }

    /// A non-empty multi-cluster app binding marks the record as managed;
    /// direct project edits are rejected while it is set.
    pub fn multi_cluster_app(&self) -> Option<&str> {
        self.multi_cluster_app_name.as_deref().filter(|n| !n.is_empty())
    }
}
