//! End-to-end status tests
//!
//! Simulates the training operator by writing `PyTorchJob` statuses into
//! the in-memory cluster and checks the phases seen by pollers and watches.

use std::sync::Arc;
use std::time::Duration;

use adapter_core::config::JobDefaults;
use adapter_core::{AdapterConfig, ExecutionPhase, RoleSpec, RunPolicy, TaskExecutionId};
use anyhow::Result;
use cluster::InMemoryCluster;
use elastic::{ElasticConfig, ElasticTask, NodeCount};
use job_spec::PyTorchJobStatus;
use job_status::snapshot_from_status;
use submitter::{shutdown_channel, JobSubmitter};
use tokio_stream::StreamExt;

fn operator_status(value: serde_json::Value) -> PyTorchJobStatus {
    serde_json::from_value(value).unwrap()
}

async fn submitted_job(backoff_limit: Option<u32>) -> Result<(JobSubmitter<InMemoryCluster>, String, RunPolicy)> {
    let config = AdapterConfig {
        job: JobDefaults {
            image: Some("trainer:1.0".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let submitter = JobSubmitter::new(Arc::new(InMemoryCluster::new("training")), config);

    let run_policy = RunPolicy {
        backoff_limit,
        ..Default::default()
    };
    let task = ElasticTask::new(
        "train",
        ElasticConfig::new(NodeCount::range(2, 2)?).with_run_policy(run_policy.clone()),
    );
    let plan = submitter.plan(
        &task,
        &TaskExecutionId::new("vision", "development", "f3a1b2c4", "n0", 0),
        &RoleSpec::default(),
    )?;
    let job_id = submitter.submit(&plan).await?.job_id().unwrap().to_string();

    let policy = plan.submission().unwrap().run_policy().clone();
    Ok((submitter, job_id, policy))
}

fn report_status(submitter: &JobSubmitter<InMemoryCluster>, job_id: &str, value: serde_json::Value) {
    let snapshot = snapshot_from_status(job_id, Some(&operator_status(value)));
    submitter.backend().set_status(snapshot).unwrap();
}

#[tokio::test]
async fn test_operator_lifecycle_phases() -> Result<()> {
    let (submitter, job_id, policy) = submitted_job(None).await?;

    assert_eq!(submitter.poll(&job_id, &policy).await.phase, ExecutionPhase::Queued);

    report_status(
        &submitter,
        &job_id,
        serde_json::json!({
            "conditions": [{"type": "Created", "status": "True"}],
            "replicaStatuses": {"Worker": {}}
        }),
    );
    assert_eq!(submitter.poll(&job_id, &policy).await.phase, ExecutionPhase::Queued);

    report_status(
        &submitter,
        &job_id,
        serde_json::json!({
            "conditions": [
                {"type": "Created", "status": "True"},
                {"type": "Running", "status": "True", "message": "PyTorchJob f3a1b2c4-n0-0 is running."}
            ],
            "replicaStatuses": {"Worker": {"active": 2}}
        }),
    );
    let report = submitter.poll(&job_id, &policy).await;
    assert_eq!(report.phase, ExecutionPhase::Running);

    report_status(
        &submitter,
        &job_id,
        serde_json::json!({
            "conditions": [
                {"type": "Created", "status": "True"},
                {"type": "Running", "status": "False"},
                {"type": "Succeeded", "status": "True", "message": "PyTorchJob f3a1b2c4-n0-0 is successfully completed."}
            ],
            "replicaStatuses": {"Worker": {"succeeded": 2}}
        }),
    );
    let report = submitter.poll(&job_id, &policy).await;
    assert_eq!(report.phase, ExecutionPhase::Succeeded);

    // Polling a settled job keeps the same answer
    assert_eq!(submitter.poll(&job_id, &policy).await, report);
    Ok(())
}

#[tokio::test]
async fn test_worker_failure_respects_backoff_budget() -> Result<()> {
    let (submitter, job_id, policy) = submitted_job(Some(2)).await?;
    assert_eq!(policy.backoff_limit, Some(2));

    report_status(
        &submitter,
        &job_id,
        serde_json::json!({
            "replicaStatuses": {"Worker": {"active": 1, "failed": 1}}
        }),
    );
    assert_eq!(submitter.poll(&job_id, &policy).await.phase, ExecutionPhase::Running);

    report_status(
        &submitter,
        &job_id,
        serde_json::json!({
            "replicaStatuses": {"Worker": {"active": 1, "failed": 2}}
        }),
    );
    assert_eq!(submitter.poll(&job_id, &policy).await.phase, ExecutionPhase::Failed);
    Ok(())
}

#[tokio::test]
async fn test_operator_failed_condition_is_final() -> Result<()> {
    let (submitter, job_id, policy) = submitted_job(Some(10)).await?;

    report_status(
        &submitter,
        &job_id,
        serde_json::json!({
            "conditions": [
                {"type": "Failed", "status": "True", "message": "PyTorchJob f3a1b2c4-n0-0 is failed because 1 Worker replica(s) failed."}
            ],
            "replicaStatuses": {"Worker": {"active": 1, "failed": 1}}
        }),
    );
    let report = submitter.poll(&job_id, &policy).await;
    assert_eq!(report.phase, ExecutionPhase::Failed);
    assert!(report.message.unwrap().contains("replica(s) failed"));
    Ok(())
}

#[tokio::test]
async fn test_unavailable_status_reads_unknown() -> Result<()> {
    let (submitter, job_id, policy) = submitted_job(None).await?;

    submitter.backend().mark_unavailable(job_id.clone());
    assert_eq!(submitter.poll(&job_id, &policy).await.phase, ExecutionPhase::Unknown);

    submitter.backend().mark_available(&job_id);
    assert_eq!(submitter.poll(&job_id, &policy).await.phase, ExecutionPhase::Queued);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_watch_follows_operator() -> Result<()> {
    let (submitter, job_id, policy) = submitted_job(None).await?;
    let (_shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut phases = submitter.watch(job_id.clone(), policy, shutdown_rx);

    assert_eq!(phases.next().await.unwrap().phase, ExecutionPhase::Queued);

    report_status(
        &submitter,
        &job_id,
        serde_json::json!({"replicaStatuses": {"Worker": {"active": 2}}}),
    );
    assert_eq!(phases.next().await.unwrap().phase, ExecutionPhase::Running);

    report_status(
        &submitter,
        &job_id,
        serde_json::json!({"replicaStatuses": {"Worker": {"failed": 1, "active": 1}}}),
    );
    let report = phases.next().await.unwrap();
    assert_eq!(report.phase, ExecutionPhase::Failed);

    let end = tokio::time::timeout(Duration::from_secs(300), phases.next()).await?;
    assert!(end.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_all_watches() -> Result<()> {
    let (submitter, job_id, policy) = submitted_job(None).await?;
    let (shutdown_tx, _) = shutdown_channel();

    let mut first = submitter.watch(job_id.clone(), policy.clone(), shutdown_tx.subscribe());
    let mut second = submitter.watch(job_id, policy, shutdown_tx.subscribe());
    assert_eq!(first.next().await.unwrap().phase, ExecutionPhase::Queued);
    assert_eq!(second.next().await.unwrap().phase, ExecutionPhase::Queued);

    shutdown_tx.send(())?;
    assert!(first.next().await.is_none());
    assert!(second.next().await.is_none());
    Ok(())
}
