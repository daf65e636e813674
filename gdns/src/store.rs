use crate::types::{GlobalDnsRecord, RecordId};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("global DNS record not found: {0}")]
    NotFound(String),

    #[error("access to global DNS record {0} denied")]
    Forbidden(String),

    /// The revision token was stale; the caller may re-read and retry.
    #[error("revision conflict updating {0}")]
    Conflict(String),

    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}

/// Read and compare-and-swap access to GlobalDNS records.
///
/// `update` must persist the whole record atomically against the revision
/// it carries and fail with [`StoreError::Conflict`] when that revision is
/// stale. No other consistency primitive is assumed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &RecordId) -> Result<GlobalDnsRecord, StoreError>;

    /// Read a record as `caller`, so the backing store can enforce read
    /// access. Stores without caller-scoped reads fall back to [`get`].
    ///
    /// [`get`]: RecordStore::get
    async fn get_as(&self, id: &RecordId, _caller: &str) -> Result<GlobalDnsRecord, StoreError> {
        self.get(id).await
    }

    /// Persist `record` if its revision is current, returning the stored
    /// record with its advanced revision.
    async fn update(&self, record: &GlobalDnsRecord) -> Result<GlobalDnsRecord, StoreError>;
}
