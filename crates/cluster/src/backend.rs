//! Cluster backend trait definition
//!
//! Defines the async interface between the adapter and the cluster that
//! runs the training operator.

use adapter_core::{Error, Result, StatusSnapshot};
use async_trait::async_trait;
use job_spec::JobSubmission;

/// Result of applying a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The job did not exist and was created
    Created,

    /// The same job already exists; nothing changed
    AlreadyExists,
}

/// Outcome for a submission whose job name is already taken.
///
/// The existing job counts as this submission only when it carries the
/// same content hash. A different or missing hash means another job holds
/// the name, which is rejected.
pub fn reconcile_existing(
    submission: &JobSubmission,
    existing_hash: Option<&str>,
) -> Result<ApplyOutcome> {
    match existing_hash {
        Some(hash) if hash == submission.content_hash() => Ok(ApplyOutcome::AlreadyExists),
        Some(hash) => Err(Error::Submission {
            job_id: submission.id().clone(),
            message: format!(
                "job name is taken by a different job (content hash {}, submitted {})",
                hash,
                submission.content_hash()
            ),
        }),
        None => Err(Error::Submission {
            job_id: submission.id().clone(),
            message: "job name is taken by a job without a content hash".to_string(),
        }),
    }
}

/// Async trait for cluster backends
///
/// Implementors create `PyTorchJob` resources and report their status.
/// Calls may be slow or fail transiently; callers bound them with their
/// own timeouts.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Create the job described by `submission`
    ///
    /// # Returns
    /// `AlreadyExists` when the same job (identifier and content hash)
    /// exists, which makes re-submission of an attempt idempotent
    ///
    /// # Errors
    /// `Error::Submission` when the cluster rejects the job, with the
    /// rejection reason preserved, or when a different job holds the name
    async fn apply(&self, submission: &JobSubmission) -> Result<ApplyOutcome>;

    /// Latest status of a job
    ///
    /// # Returns
    /// `None` when the job does not exist
    ///
    /// # Errors
    /// `Error::TransientStatus` when the status could not be read
    async fn get_status(&self, job_id: &str) -> Result<Option<StatusSnapshot>>;

    /// Delete a job
    ///
    /// # Errors
    /// `Error::JobNotFound` when the job does not exist
    async fn delete(&self, job_id: &str) -> Result<()>;
}
