//! HTTP client for the management API. One reqwest client backs both the
//! record store and the environment listers the access resolver consults;
//! the listers sit in front of the API's in-memory caches, whose
//! consistency model is not strengthened here.

use crate::access::{
    AccessError, GlobalRole, GlobalRoleBinding, GlobalRoleBindingLister, GlobalRoleLister,
    ProjectAccess, User, UserLister,
};
use crate::store::{RecordStore, StoreError};
use crate::types::{GlobalDnsRecord, RecordId, IMPERSONATE_USER_HEADER};
use async_trait::async_trait;
use http::StatusCode;
use serde::de::DeserializeOwned;

/// Paged collection envelope used by management API list endpoints.
#[derive(serde::Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Clone)]
pub struct ManagementClient {
    client: reqwest::Client,
    base_url: String,
    impersonation_header: String,
}

impl ManagementClient {
    pub fn new(base_url: &str) -> Self {
        ManagementClient {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            impersonation_header: IMPERSONATE_USER_HEADER.to_string(),
        }
    }

    /// Override the header used to impersonate the caller on scoped reads
    /// and project probes.
    pub fn with_impersonation_header(mut self, name: impl Into<String>) -> Self {
        self.impersonation_header = name.into();
        self
    }

    fn record_url(&self, id: &RecordId) -> String {
        format!(
            "{}/v3/globaldnses/{}/{}",
            self.base_url, id.namespace, id.name
        )
    }

    async fn fetch_record(
        &self,
        id: &RecordId,
        caller: Option<&str>,
    ) -> Result<GlobalDnsRecord, StoreError> {
        let mut request = self.client.get(self.record_url(id));
        if let Some(caller) = caller {
            request = request.header(self.impersonation_header.as_str(), caller);
        }
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<GlobalDnsRecord>()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string())),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                Err(StoreError::Forbidden(id.to_string()))
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.to_string())),
            status => Err(StoreError::Unavailable(format!(
                "unexpected status {status} reading {id}"
            ))),
        }
    }

    async fn get_collection<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, reqwest::Error> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Collection<T>>().await?.data)
    }
}

#[async_trait]
impl RecordStore for ManagementClient {
    async fn get(&self, id: &RecordId) -> Result<GlobalDnsRecord, StoreError> {
        self.fetch_record(id, None).await
    }

    /// Caller-scoped read: the management API sees the request as `caller`
    /// and enforces read access to the record itself.
    async fn get_as(&self, id: &RecordId, caller: &str) -> Result<GlobalDnsRecord, StoreError> {
        self.fetch_record(id, Some(caller)).await
    }

    async fn update(&self, record: &GlobalDnsRecord) -> Result<GlobalDnsRecord, StoreError> {
        let id = record.id();
        let response = self
            .client
            .put(self.record_url(&id))
            .header("If-Match", &record.revision)
            .json(record)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<GlobalDnsRecord>()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string())),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                Err(StoreError::Conflict(id.to_string()))
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.to_string())),
            status => Err(StoreError::Unavailable(format!(
                "unexpected status {status} updating {id}"
            ))),
        }
    }
}

#[async_trait]
impl UserLister for ManagementClient {
    async fn by_principal(&self, principal_id: &str) -> Result<Option<User>, AccessError> {
        let users: Vec<User> = self
            .get_collection("/v3/users", &[("principalId", principal_id)])
            .await
            .map_err(|e| AccessError::UserLookup(e.to_string()))?;
        Ok(users.into_iter().next())
    }
}

#[async_trait]
impl GlobalRoleBindingLister for ManagementClient {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<GlobalRoleBinding>, AccessError> {
        self.get_collection("/v3/globalrolebindings", &[("userId", user_id)])
            .await
            .map_err(|e| AccessError::RoleBindings(e.to_string()))
    }
}

#[async_trait]
impl GlobalRoleLister for ManagementClient {
    async fn get(&self, id: &str) -> Result<Option<GlobalRole>, AccessError> {
        let response = self
            .client
            .get(format!("{}/v3/globalroles/{id}", self.base_url))
            .send()
            .await
            .map_err(|e| AccessError::Roles(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<GlobalRole>()
                .await
                .map(Some)
                .map_err(|e| AccessError::Roles(e.to_string())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(AccessError::Roles(format!("unexpected status {status}"))),
        }
    }
}

#[async_trait]
impl ProjectAccess for ManagementClient {
    async fn can_access(&self, caller: &str, project_id: &str) -> Result<bool, AccessError> {
        // Probe the project as the caller; 403/404 both read as "no access"
        // so project existence is not leaked through this handler.
        let response = self
            .client
            .get(format!("{}/v3/projects/{project_id}", self.base_url))
            .header(self.impersonation_header.as_str(), caller)
            .send()
            .await
            .map_err(|e| AccessError::ProjectCheck(project_id.to_string(), e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(false),
            status => Err(AccessError::ProjectCheck(
                project_id.to_string(),
                format!("unexpected status {status}"),
            )),
        }
    }
}
