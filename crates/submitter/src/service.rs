//! Job submitter service

use std::sync::Arc;
use std::time::Duration;

use adapter_core::{
    AdapterConfig, Error, ExecutionPhase, JobId, PhaseReport, Result, RoleSpec, RunPolicy,
    TaskExecutionId, TaskType,
};
use cluster::{ApplyOutcome, ClusterBackend};
use elastic::ElasticTask;
use job_status::interpret;
use tracing::{debug, info, warn};

use crate::{Planner, SubmissionPlan};

/// Result of submitting a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Single-process plan; the host runs the task itself
    Local,

    /// The job exists on the cluster
    Submitted { job_id: JobId, outcome: ApplyOutcome },
}

impl SubmitOutcome {
    pub fn task_type(&self) -> TaskType {
        match self {
            SubmitOutcome::Local => TaskType::SingleProcess,
            SubmitOutcome::Submitted { .. } => TaskType::Distributed,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Local => None,
            SubmitOutcome::Submitted { job_id, .. } => Some(job_id),
        }
    }
}

fn timeout_ms(timeout: Duration) -> u64 {
    timeout.as_millis() as u64
}

/// Plans, submits and polls jobs against a cluster backend
///
/// Cheap to clone; clones share the backend.
pub struct JobSubmitter<B> {
    backend: Arc<B>,
    config: Arc<AdapterConfig>,
    planner: Planner,
}

impl<B> Clone for JobSubmitter<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: Arc::clone(&self.config),
            planner: self.planner.clone(),
        }
    }
}

impl<B: ClusterBackend> JobSubmitter<B> {
    pub fn new(backend: Arc<B>, config: AdapterConfig) -> Self {
        let planner = Planner::new(config.job.clone());
        Self {
            backend,
            config: Arc::new(config),
            planner,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Plan an elastic task for `execution`
    pub fn plan(
        &self,
        task: &ElasticTask,
        execution: &TaskExecutionId,
        template: &RoleSpec,
    ) -> Result<SubmissionPlan> {
        self.planner.plan(task, execution, template)
    }

    /// Submit a plan; single-process plans make no cluster call.
    ///
    /// The apply call is bounded by the configured apply timeout. An
    /// existing job with the same identifier counts as success.
    pub async fn submit(&self, plan: &SubmissionPlan) -> Result<SubmitOutcome> {
        let submission = match plan {
            SubmissionPlan::SingleProcess => return Ok(SubmitOutcome::Local),
            SubmissionPlan::Distributed(submission) => submission,
        };

        let timeout = self.config.submit.apply_timeout;
        let outcome = tokio::time::timeout(timeout, self.backend.apply(submission))
            .await
            .map_err(|_| Error::Timeout {
                operation: format!("apply {}", submission.id()),
                timeout_ms: timeout_ms(timeout),
            })??;

        match outcome {
            ApplyOutcome::Created => info!(job_id = %submission.id(), "Submitted job"),
            ApplyOutcome::AlreadyExists => {
                info!(job_id = %submission.id(), "Job already submitted, reusing it")
            }
        }

        Ok(SubmitOutcome::Submitted {
            job_id: submission.id().clone(),
            outcome,
        })
    }

    /// Current phase of a job.
    ///
    /// Never fails: missing jobs, timeouts and transient errors read as
    /// `Unknown` with the cause as message.
    pub async fn poll(&self, job_id: &str, run_policy: &RunPolicy) -> PhaseReport {
        let timeout = self.config.status.request_timeout;
        let snapshot = match tokio::time::timeout(timeout, self.backend.get_status(job_id)).await {
            Ok(Ok(Some(snapshot))) => snapshot,
            Ok(Ok(None)) => {
                debug!(job_id, "Job not found");
                return PhaseReport::with_message(
                    ExecutionPhase::Unknown,
                    format!("job {} not found", job_id),
                );
            }
            Ok(Err(e)) => {
                warn!(job_id, error = %e, "Status read failed");
                return PhaseReport::with_message(ExecutionPhase::Unknown, e.to_string());
            }
            Err(_) => {
                warn!(job_id, timeout_ms = timeout_ms(timeout), "Status read timed out");
                return PhaseReport::with_message(
                    ExecutionPhase::Unknown,
                    format!("status request timed out after {}ms", timeout_ms(timeout)),
                );
            }
        };

        interpret(&snapshot, run_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_core::config::JobDefaults;
    use adapter_core::{RoleCondition, RoleStatus, StatusSnapshot};
    use cluster::InMemoryCluster;
    use elastic::{ElasticConfig, NodeCount};

    fn submitter() -> JobSubmitter<InMemoryCluster> {
        let config = AdapterConfig {
            job: JobDefaults {
                image: Some("trainer:1.0".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        JobSubmitter::new(Arc::new(InMemoryCluster::new("training")), config)
    }

    fn exec() -> TaskExecutionId {
        TaskExecutionId::new("ml", "dev", "exec1", "n0", 0)
    }

    fn elastic_task(nnodes: NodeCount) -> ElasticTask {
        ElasticTask::new("train", ElasticConfig::new(nnodes))
    }

    #[tokio::test]
    async fn test_single_process_makes_no_cluster_call() {
        let submitter = submitter();
        let plan = submitter
            .plan(&elastic_task(NodeCount::Fixed(1)), &exec(), &RoleSpec::default())
            .unwrap();

        let outcome = submitter.submit(&plan).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Local);
        assert_eq!(outcome.task_type(), TaskType::SingleProcess);
        assert_eq!(submitter.backend().apply_calls(), 0);
    }

    #[tokio::test]
    async fn test_double_submit_is_idempotent() {
        let submitter = submitter();
        let plan = submitter
            .plan(&elastic_task(NodeCount::Fixed(2)), &exec(), &RoleSpec::default())
            .unwrap();

        let first = submitter.submit(&plan).await.unwrap();
        let second = submitter.submit(&plan).await.unwrap();

        assert!(matches!(
            first,
            SubmitOutcome::Submitted { outcome: ApplyOutcome::Created, .. }
        ));
        assert!(matches!(
            second,
            SubmitOutcome::Submitted { outcome: ApplyOutcome::AlreadyExists, .. }
        ));
        assert_eq!(first.job_id(), second.job_id());
        assert_eq!(submitter.backend().job_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_timeout() {
        let submitter = submitter();
        submitter
            .backend()
            .set_apply_delay(Some(Duration::from_secs(120)));
        let plan = submitter
            .plan(&elastic_task(NodeCount::Fixed(2)), &exec(), &RoleSpec::default())
            .unwrap();

        let err = submitter.submit(&plan).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 30_000, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_poll_maps_failures_to_unknown() {
        let submitter = submitter();
        let policy = RunPolicy::default();

        let report = submitter.poll("missing", &policy).await;
        assert_eq!(report.phase, ExecutionPhase::Unknown);

        let plan = submitter
            .plan(&elastic_task(NodeCount::Fixed(2)), &exec(), &RoleSpec::default())
            .unwrap();
        let job_id = submitter.submit(&plan).await.unwrap().job_id().unwrap().to_string();
        assert_eq!(submitter.poll(&job_id, &policy).await.phase, ExecutionPhase::Queued);

        submitter.backend().mark_unavailable(job_id.clone());
        let report = submitter.poll(&job_id, &policy).await;
        assert_eq!(report.phase, ExecutionPhase::Unknown);
        assert!(report.message.unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_poll_interprets_snapshot() {
        let submitter = submitter();
        let plan = submitter
            .plan(&elastic_task(NodeCount::Fixed(2)), &exec(), &RoleSpec::default())
            .unwrap();
        let job_id = submitter.submit(&plan).await.unwrap().job_id().unwrap().to_string();

        submitter
            .backend()
            .set_status(
                StatusSnapshot::accepted(job_id.clone())
                    .with_role("worker", RoleStatus::with_condition(RoleCondition::Succeeded)),
            )
            .unwrap();
        assert_eq!(
            submitter.poll(&job_id, &RunPolicy::default()).await.phase,
            ExecutionPhase::Succeeded
        );
    }
}
