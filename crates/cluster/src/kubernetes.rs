//! Kubernetes cluster backend
//!
//! Creates `PyTorchJob` resources through the API server and reads the
//! status written by the Kubeflow training operator.

use adapter_core::{Error, Result, StatusSnapshot};
use async_trait::async_trait;
use job_spec::{JobSubmission, PyTorchJob, CONTENT_HASH_ANNOTATION};
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use tracing::{debug, info, instrument, warn};

use crate::{reconcile_existing, ApplyOutcome, ClusterBackend};

const HTTP_NOT_FOUND: u16 = 404;
const HTTP_CONFLICT: u16 = 409;

/// Kubernetes cluster backend
#[derive(Clone)]
pub struct KubeCluster {
    jobs: Api<PyTorchJob>,
    namespace: String,
}

impl KubeCluster {
    /// Backend for `namespace` using an existing client
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            jobs: Api::namespaced(client, &namespace),
            namespace,
        }
    }

    /// Backend using the in-cluster or kubeconfig credentials
    pub async fn try_default(namespace: impl Into<String>) -> Result<Self> {
        let client = Client::try_default().await.map_err(|e| Error::Internal {
            message: format!("Failed to create Kubernetes client: {}", e),
        })?;
        Ok(Self::new(client, namespace))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

fn api_code(err: &kube::Error) -> Option<u16> {
    match err {
        kube::Error::Api(response) => Some(response.code),
        _ => None,
    }
}

/// Message as returned by the API server, kept verbatim
fn api_message(err: kube::Error) -> String {
    match err {
        kube::Error::Api(response) => response.message,
        other => other.to_string(),
    }
}

/// Whether a create call failed because the name is taken
fn is_conflict(err: &kube::Error) -> bool {
    api_code(err) == Some(HTTP_CONFLICT)
}

fn create_error(job_id: &str, err: kube::Error) -> Error {
    Error::Submission {
        job_id: job_id.to_string(),
        message: api_message(err),
    }
}

fn status_error(job_id: &str, err: kube::Error) -> Error {
    Error::TransientStatus {
        job_id: job_id.to_string(),
        message: api_message(err),
    }
}

fn delete_error(job_id: &str, err: kube::Error) -> Error {
    if api_code(&err) == Some(HTTP_NOT_FOUND) {
        Error::JobNotFound {
            job_id: job_id.to_string(),
        }
    } else {
        status_error(job_id, err)
    }
}

fn content_hash(job: &PyTorchJob) -> Option<&str> {
    job.metadata
        .annotations
        .as_ref()?
        .get(CONTENT_HASH_ANNOTATION)
        .map(String::as_str)
}

#[async_trait]
impl ClusterBackend for KubeCluster {
    #[instrument(skip(self, submission), fields(backend = "kube", namespace = %self.namespace, job_id = %submission.id()))]
    async fn apply(&self, submission: &JobSubmission) -> Result<ApplyOutcome> {
        let resource = submission.to_resource(&self.namespace);

        match self.jobs.create(&PostParams::default(), &resource).await {
            Ok(_) => {
                info!("Created PyTorchJob");
                Ok(ApplyOutcome::Created)
            }
            Err(e) if is_conflict(&e) => {
                debug!("PyTorchJob already exists");
                let existing = self
                    .jobs
                    .get(submission.id())
                    .await
                    .map_err(|e| create_error(submission.id(), e))?;
                reconcile_existing(submission, content_hash(&existing))
            }
            Err(e) => {
                let err = create_error(submission.id(), e);
                warn!(error = %err, "PyTorchJob rejected");
                Err(err)
            }
        }
    }

    #[instrument(skip(self), fields(backend = "kube", namespace = %self.namespace))]
    async fn get_status(&self, job_id: &str) -> Result<Option<StatusSnapshot>> {
        let job = self
            .jobs
            .get_opt(job_id)
            .await
            .map_err(|e| status_error(job_id, e))?;

        Ok(job.map(|job| job_status::snapshot_from_status(job_id, job.status.as_ref())))
    }

    #[instrument(skip(self), fields(backend = "kube", namespace = %self.namespace))]
    async fn delete(&self, job_id: &str) -> Result<()> {
        self.jobs
            .delete(job_id, &DeleteParams::background())
            .await
            .map_err(|e| delete_error(job_id, e))?;
        info!("Deleted PyTorchJob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_conflict_detected() {
        let err = api_error(
            409,
            "AlreadyExists",
            "pytorchjobs.kubeflow.org \"exec1-n0-0\" already exists",
        );
        assert!(is_conflict(&err));
        assert!(!is_conflict(&api_error(403, "Forbidden", "forbidden")));
    }

    #[test]
    fn test_rejection_message_verbatim() {
        let message = "pytorchjobs.kubeflow.org is forbidden: exceeded quota: gpu-quota";
        let err = create_error("exec1-n0-0", api_error(403, "Forbidden", message));
        match err {
            Error::Submission { job_id, message: got } => {
                assert_eq!(job_id, "exec1-n0-0");
                assert_eq!(got, message);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_delete_not_found() {
        let err = delete_error("exec1-n0-0", api_error(404, "NotFound", "not found"));
        assert!(matches!(err, Error::JobNotFound { ref job_id } if job_id == "exec1-n0-0"));

        let err = delete_error("exec1-n0-0", api_error(500, "InternalError", "etcd timeout"));
        assert!(matches!(err, Error::TransientStatus { ref message, .. } if message == "etcd timeout"));
    }

    #[test]
    fn test_status_error_is_transient() {
        let err = status_error("exec1-n0-0", api_error(503, "ServiceUnavailable", "try later"));
        assert!(matches!(err, Error::TransientStatus { .. }));
    }
}
