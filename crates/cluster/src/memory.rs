//! In-memory cluster backend
//!
//! Keeps submitted jobs in a concurrent map. Statuses are injected by the
//! caller, which makes the backend usable for tests and local simulations
//! of the operator.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adapter_core::{Error, JobId, Result, StatusSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use job_spec::{JobSubmission, PyTorchJob};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{reconcile_existing, ApplyOutcome, ClusterBackend};

/// A job held by the in-memory cluster
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub uid: Uuid,
    pub created_at: DateTime<Utc>,
    pub submission: JobSubmission,

    /// Resource as it would be sent to the API server
    pub resource: PyTorchJob,

    /// Injected status; `None` until the simulated operator reports
    pub status: Option<StatusSnapshot>,
}

/// In-memory cluster backend
///
/// Cloning shares the underlying store.
#[derive(Debug, Clone)]
pub struct InMemoryCluster {
    namespace: String,
    jobs: Arc<DashMap<JobId, StoredJob>>,
    apply_calls: Arc<AtomicU64>,
    reject_next: Arc<Mutex<Option<String>>>,
    unavailable: Arc<Mutex<HashSet<JobId>>>,
    apply_delay: Arc<Mutex<Option<Duration>>>,
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new("default")
    }
}

impl InMemoryCluster {
    /// Create an empty cluster rendering jobs into `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            jobs: Arc::new(DashMap::new()),
            apply_calls: Arc::new(AtomicU64::new(0)),
            reject_next: Arc::new(Mutex::new(None)),
            unavailable: Arc::new(Mutex::new(HashSet::new())),
            apply_delay: Arc::new(Mutex::new(None)),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of jobs held
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Number of `apply` calls received, including rejected ones
    pub fn apply_calls(&self) -> u64 {
        self.apply_calls.load(Ordering::Relaxed)
    }

    /// Copy of a stored job
    pub fn get(&self, job_id: &str) -> Option<StoredJob> {
        self.jobs.get(job_id).map(|job| job.clone())
    }

    /// Inject the status reported for a job
    ///
    /// # Errors
    /// `Error::JobNotFound` if the job was never applied
    pub fn set_status(&self, status: StatusSnapshot) -> Result<()> {
        let mut job = self
            .jobs
            .get_mut(&status.job_id)
            .ok_or_else(|| Error::JobNotFound {
                job_id: status.job_id.clone(),
            })?;
        debug!(job_id = %status.job_id, "Injected job status");
        job.status = Some(status);
        Ok(())
    }

    /// Reject the next `apply` call with `reason`
    pub fn reject_next(&self, reason: impl Into<String>) {
        *self.reject_next.lock() = Some(reason.into());
    }

    /// Make status reads for a job fail until [`InMemoryCluster::mark_available`]
    pub fn mark_unavailable(&self, job_id: impl Into<JobId>) {
        self.unavailable.lock().insert(job_id.into());
    }

    pub fn mark_available(&self, job_id: &str) {
        self.unavailable.lock().remove(job_id);
    }

    /// Delay every `apply` call, simulating a slow API server
    pub fn set_apply_delay(&self, delay: Option<Duration>) {
        *self.apply_delay.lock() = delay;
    }
}

#[async_trait]
impl ClusterBackend for InMemoryCluster {
    #[instrument(skip(self, submission), fields(backend = "memory", job_id = %submission.id()))]
    async fn apply(&self, submission: &JobSubmission) -> Result<ApplyOutcome> {
        self.apply_calls.fetch_add(1, Ordering::Relaxed);

        let delay = *self.apply_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rejection = self.reject_next.lock().take();
        if let Some(message) = rejection {
            return Err(Error::Submission {
                job_id: submission.id().clone(),
                message,
            });
        }

        match self.jobs.entry(submission.id().clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                debug!("Job already exists");
                reconcile_existing(submission, Some(entry.get().submission.content_hash()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let job = StoredJob {
                    uid: Uuid::new_v4(),
                    created_at: Utc::now(),
                    submission: submission.clone(),
                    resource: submission.to_resource(&self.namespace),
                    status: None,
                };
                info!(uid = %job.uid, "Created job");
                entry.insert(job);
                Ok(ApplyOutcome::Created)
            }
        }
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn get_status(&self, job_id: &str) -> Result<Option<StatusSnapshot>> {
        if self.unavailable.lock().contains(job_id) {
            return Err(Error::TransientStatus {
                job_id: job_id.to_string(),
                message: "status endpoint unavailable".to_string(),
            });
        }

        Ok(self.jobs.get(job_id).map(|job| {
            job.status
                .clone()
                .unwrap_or_else(|| StatusSnapshot::accepted(job_id))
        }))
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn delete(&self, job_id: &str) -> Result<()> {
        match self.jobs.remove(job_id) {
            Some(_) => {
                info!("Deleted job");
                Ok(())
            }
            None => Err(Error::JobNotFound {
                job_id: job_id.to_string(),
            }),
        }
    }
}
