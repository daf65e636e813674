use crate::errors::GlobalDnsError;
use crate::metrics_defs::{UPDATE_CONFLICTS, UPDATE_RETRIES_EXHAUSTED};
use crate::store::{RecordStore, StoreError};
use crate::types::RecordId;
use rand::Rng;
use tokio::time::Duration;

/// Exponential backoff schedule for the compare-and-swap update loop.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub factor: f64,
    /// Each delay is scaled by a uniform random factor in [1, 1 + jitter].
    pub jitter: f64,
    /// Maximum number of write attempts.
    pub steps: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            initial: Duration::from_millis(100),
            factor: 2.0,
            jitter: 0.5,
            steps: 7,
        }
    }
}

impl Backoff {
    /// Jittered delay for the sleep after conflicted attempt `attempt + 1`;
    /// the first sleep uses the initial duration.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial.mul_f64(self.factor.powi(attempt as i32));
        let scale = rand::thread_rng().gen_range(1.0..=1.0 + self.jitter);
        base.mul_f64(scale)
    }
}

/// Rewrites the target-project list of the record identified by `id`.
///
/// Each attempt re-reads the record to pick up the current revision,
/// overwrites its project list and writes it back. Only a revision
/// conflict is retried; read failures and any other write failure abort
/// immediately. Spending the whole retry budget on conflicts surfaces a
/// timeout-style error carrying the last conflict, with nothing committed.
pub async fn update_target_projects(
    store: &dyn RecordStore,
    id: &RecordId,
    targets: &[String],
    backoff: &Backoff,
) -> Result<(), GlobalDnsError> {
    let mut attempt: u32 = 0;
    loop {
        let mut latest = store.get(id).await?;
        latest.project_ids = targets.to_vec();

        match store.update(&latest).await {
            Ok(_) => return Ok(()),
            Err(conflict @ StoreError::Conflict(_)) => {
                metrics::counter!(UPDATE_CONFLICTS.name).increment(1);
                attempt += 1;
                if attempt >= backoff.steps {
                    metrics::counter!(UPDATE_RETRIES_EXHAUSTED.name).increment(1);
                    tracing::warn!(id = %id, attempts = attempt, "update retries exhausted");
                    return Err(GlobalDnsError::UpdateTimedOut {
                        id: id.to_string(),
                        source: conflict,
                    });
                }
                let delay = backoff.delay(attempt - 1);
                tracing::debug!(id = %id, attempt, delay_ms = delay.as_millis() as u64, "revision conflict, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(other) => return Err(other.into()),
        }
    }
}
