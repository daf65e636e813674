use crate::access::{
    AccessError, GlobalRole, GlobalRoleBinding, GlobalRoleBindingLister, GlobalRoleLister,
    MemberAccess, PolicyRule, ProjectAccess, User, UserLister,
};
use crate::store::{RecordStore, StoreError};
use crate::types::{GlobalDnsRecord, RecordId, CREATOR_ID_ANNOTATION};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_CREATOR: &str = "local://u-creator";

pub fn test_record(namespace: &str, name: &str, project_ids: &[&str]) -> GlobalDnsRecord {
    GlobalDnsRecord {
        namespace: namespace.to_string(),
        name: name.to_string(),
        annotations: HashMap::from([(
            CREATOR_ID_ANNOTATION.to_string(),
            TEST_CREATOR.to_string(),
        )]),
        project_ids: project_ids.iter().map(|s| s.to_string()).collect(),
        fqdn: format!("{name}.example.com"),
        revision: "1".to_string(),
        ..GlobalDnsRecord::default()
    }
}

/// Record store over a map, with optimistic concurrency on the revision
/// field and scriptable conflict and failure injection.
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, GlobalDnsRecord>>,
    conflicts_remaining: AtomicU32,
    write_attempts: AtomicU32,
    write_error: Mutex<Option<StoreError>>,
    denied_readers: HashSet<String>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<GlobalDnsRecord>) -> Self {
        InMemoryRecordStore {
            records: Mutex::new(
                records
                    .into_iter()
                    .map(|r| (r.id().to_string(), r))
                    .collect(),
            ),
            conflicts_remaining: AtomicU32::new(0),
            write_attempts: AtomicU32::new(0),
            write_error: Mutex::new(None),
            denied_readers: HashSet::new(),
        }
    }

    /// Make the next `n` writes fail with a revision conflict.
    pub fn with_conflicts(self, n: u32) -> Self {
        self.conflicts_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Make the next write fail with `err` instead of committing.
    pub fn with_write_error(self, err: StoreError) -> Self {
        *self.write_error.lock().unwrap() = Some(err);
        self
    }

    /// Make caller-scoped reads fail for `caller`.
    pub fn with_read_denied(mut self, caller: &str) -> Self {
        self.denied_readers.insert(caller.to_string());
        self
    }

    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn stored_projects(&self, id: &RecordId) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .get(&id.to_string())
            .map(|r| r.project_ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &RecordId) -> Result<GlobalDnsRecord, StoreError> {
        self.records
            .lock()
            .unwrap()
            .get(&id.to_string())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_as(&self, id: &RecordId, caller: &str) -> Result<GlobalDnsRecord, StoreError> {
        if self.denied_readers.contains(caller) {
            return Err(StoreError::Forbidden(id.to_string()));
        }
        self.get(id).await
    }

    async fn update(&self, record: &GlobalDnsRecord) -> Result<GlobalDnsRecord, StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let id = record.id().to_string();

        if let Some(err) = self.write_error.lock().unwrap().take() {
            return Err(err);
        }

        let injected = self
            .conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Conflict(id));
        }

        let mut records = self.records.lock().unwrap();
        let stored = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if stored.revision != record.revision {
            return Err(StoreError::Conflict(id));
        }

        let mut updated = record.clone();
        let next_revision = stored.revision.parse::<u64>().unwrap_or(0) + 1;
        updated.revision = next_revision.to_string();
        *stored = updated.clone();
        Ok(updated)
    }
}

/// Static environment backing the access resolver in tests: users by
/// principal, admin role bindings, and (caller, project) grants.
#[derive(Default)]
pub struct StaticEnv {
    users: HashMap<String, User>,
    bindings: HashMap<String, Vec<GlobalRoleBinding>>,
    roles: HashMap<String, GlobalRole>,
    project_grants: HashSet<(String, String)>,
}

impl StaticEnv {
    pub fn with_user(mut self, principal_id: &str, user_id: &str) -> Self {
        self.users.insert(
            principal_id.to_string(),
            User {
                id: user_id.to_string(),
                principal_ids: vec![principal_id.to_string()],
            },
        );
        self
    }

    /// Registers a user bound to a wildcard global role.
    pub fn with_admin(mut self, principal_id: &str, user_id: &str) -> Self {
        self = self.with_user(principal_id, user_id);
        self.roles.insert(
            "admin".to_string(),
            GlobalRole {
                id: "admin".to_string(),
                rules: vec![PolicyRule {
                    resources: vec!["*".to_string()],
                    verbs: vec!["*".to_string()],
                }],
            },
        );
        self.bindings
            .entry(user_id.to_string())
            .or_default()
            .push(GlobalRoleBinding {
                user_id: user_id.to_string(),
                global_role_id: "admin".to_string(),
            });
        self
    }

    pub fn with_project_access(mut self, caller: &str, project_id: &str) -> Self {
        self.project_grants
            .insert((caller.to_string(), project_id.to_string()));
        self
    }

    pub fn member_access(self) -> MemberAccess {
        let env = Arc::new(self);
        MemberAccess {
            users: env.clone(),
            grb_lister: env.clone(),
            gr_lister: env.clone(),
            projects: env,
        }
    }
}

#[async_trait]
impl UserLister for StaticEnv {
    async fn by_principal(&self, principal_id: &str) -> Result<Option<User>, AccessError> {
        Ok(self.users.get(principal_id).cloned())
    }
}

#[async_trait]
impl GlobalRoleBindingLister for StaticEnv {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<GlobalRoleBinding>, AccessError> {
        Ok(self.bindings.get(user_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl GlobalRoleLister for StaticEnv {
    async fn get(&self, id: &str) -> Result<Option<GlobalRole>, AccessError> {
        Ok(self.roles.get(id).cloned())
    }
}

#[async_trait]
impl ProjectAccess for StaticEnv {
    async fn can_access(&self, caller: &str, project_id: &str) -> Result<bool, AccessError> {
        Ok(self
            .project_grants
            .contains(&(caller.to_string(), project_id.to_string())))
    }
}
