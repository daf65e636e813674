//! Action dispatch for GlobalDNS target-project mutations.
//!
//! Two actions are exposed on a record: `addProjects` and
//! `removeProjects`. Both are owner-gated. Adding is additionally refused
//! while the record is bound to a multi-cluster app, and each added
//! project must be reachable by the caller. Removing intentionally skips
//! both checks beyond ownership: owners may always shrink their own
//! record.

use crate::access::AccessOracle;
use crate::diff;
use crate::errors::{GlobalDnsError, Result};
use crate::input;
use crate::metrics_defs::ACTION_REQUESTS;
use crate::store::RecordStore;
use crate::types::{
    AccessType, GlobalDnsRecord, RecordId, ADD_PROJECTS_ACTION, REMOVE_PROJECTS_ACTION,
};
use crate::update::{update_target_projects, Backoff};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const ADDED_PROJECTS_MESSAGE: &str = "addedProjects";
pub const REMOVED_PROJECTS_MESSAGE: &str = "removedProjects";

/// Attaches the two action links to a record's JSON representation so
/// clients discover them.
pub fn advertise(resource_url: &str, resource: &mut Map<String, Value>) {
    let actions = resource
        .entry("actions")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(actions) = actions {
        for action in [ADD_PROJECTS_ACTION, REMOVE_PROJECTS_ACTION] {
            actions.insert(
                action.to_string(),
                Value::String(format!("{resource_url}?action={action}")),
            );
        }
    }
}

pub struct ActionHandler {
    store: Arc<dyn RecordStore>,
    access: Arc<dyn AccessOracle>,
    backoff: Backoff,
}

impl ActionHandler {
    pub fn new(store: Arc<dyn RecordStore>, access: Arc<dyn AccessOracle>) -> Self {
        Self {
            store,
            access,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Resolves a record by its wire identity, reading as `caller` so the
    /// store can enforce read access.
    pub async fn fetch(&self, record_id: &str, caller: &str) -> Result<GlobalDnsRecord> {
        let id: RecordId = record_id.parse()?;
        Ok(self.store.get_as(&id, caller).await?)
    }

    /// Dispatches one action request, returning the success message for
    /// the response envelope.
    pub async fn handle(
        &self,
        action_name: &str,
        record_id: &str,
        caller: &str,
        body: &[u8],
    ) -> Result<&'static str> {
        let result = self.dispatch(action_name, record_id, caller, body).await;
        metrics::counter!(
            ACTION_REQUESTS.name,
            "action" => action_name.to_string(),
            "outcome" => if result.is_ok() { "ok" } else { "error" }
        )
        .increment(1);
        result
    }

    async fn dispatch(
        &self,
        action_name: &str,
        record_id: &str,
        caller: &str,
        body: &[u8],
    ) -> Result<&'static str> {
        let record = self.fetch(record_id, caller).await?;

        let creator = record
            .creator_id()
            .ok_or_else(|| GlobalDnsError::MissingCreatorAnnotation(record.name.clone()))?;

        let access_type = self
            .access
            .access_type_of_caller(caller, creator, &record.name, &record.members)
            .await?;
        if access_type != AccessType::Owner {
            return Err(GlobalDnsError::NotOwner);
        }

        let body = input::parse_action_body(body)?;
        let input_projects = input::project_ids(&body);

        match action_name {
            ADD_PROJECTS_ACTION => self.add_projects(&record, caller, &input_projects).await,
            REMOVE_PROJECTS_ACTION => self.remove_projects(&record, &input_projects).await,
            other => Err(GlobalDnsError::BadAction(other.to_string())),
        }
    }

    async fn add_projects(
        &self,
        record: &GlobalDnsRecord,
        caller: &str,
        input_projects: &[String],
    ) -> Result<&'static str> {
        if let Some(app) = record.multi_cluster_app() {
            return Err(GlobalDnsError::MultiClusterAppBound(app.to_string()));
        }
        self.access
            .check_target_access(caller, input_projects)
            .await?;

        let mut targets = record.project_ids.clone();
        targets.extend(diff::additions(&record.project_ids, input_projects));
        tracing::info!(
            id = %record.id(),
            caller,
            added = targets.len() - record.project_ids.len(),
            "adding target projects"
        );
        update_target_projects(self.store.as_ref(), &record.id(), &targets, &self.backoff).await?;
        Ok(ADDED_PROJECTS_MESSAGE)
    }

    async fn remove_projects(
        &self,
        record: &GlobalDnsRecord,
        input_projects: &[String],
    ) -> Result<&'static str> {
        let targets = diff::remaining(&record.project_ids, input_projects);
        tracing::info!(
            id = %record.id(),
            removed = record.project_ids.len() - targets.len(),
            "removing target projects"
        );
        update_target_projects(self.store.as_ref(), &record.id(), &targets, &self.backoff).await?;
        Ok(REMOVED_PROJECTS_MESSAGE)
    }
}
