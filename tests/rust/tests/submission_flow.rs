//! End-to-end submission tests against the in-memory cluster
//!
//! Covers the path from a serialized task declaration to a stored
//! `PyTorchJob`:
//! - Mode selection and overrides
//! - Idempotent re-submission of an execution attempt
//! - Rejections and configuration errors

use std::io::Write;
use std::sync::Arc;

use adapter_core::config::JobDefaults;
use adapter_core::{AdapterConfig, Error, RoleSpec, TaskExecutionId, TaskType};
use anyhow::Result;
use cluster::{ApplyOutcome, ClusterBackend, InMemoryCluster};
use elastic::{ElasticConfig, ElasticTask, NodeCount};
use job_spec::{job_name, PyTorchConfig, CONTENT_HASH_ANNOTATION};
use submitter::{JobSubmitter, SubmissionPlan, SubmitOutcome, TaskDeclaration};

fn config() -> AdapterConfig {
    AdapterConfig {
        job: JobDefaults {
            image: Some("registry.local/trainer:1.0".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn declared_job_id() -> String {
    job_name(&TaskExecutionId::new("vision", "development", "f3a1b2c4", "n0", 0)).unwrap()
}

fn submitter() -> JobSubmitter<InMemoryCluster> {
    JobSubmitter::new(Arc::new(InMemoryCluster::new("training")), config())
}

fn declaration() -> TaskDeclaration {
    serde_json::from_value(serde_json::json!({
        "name": "train-resnet",
        "execution": {
            "project": "vision",
            "domain": "development",
            "name": "f3a1b2c4",
            "node_id": "n0",
            "retry_attempt": 0
        },
        "elastic": {
            "nnodes": "2:4",
            "nproc_per_node": 4,
            "max_restarts": 2,
            "run_policy": {"clean_pod_policy": "All", "backoff_limit": 3}
        },
        "worker": {
            "command": ["python", "-m", "train"],
            "resources": {"limits": {"gpu": "4"}}
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_full_flow() -> Result<()> {
    let submitter = submitter();
    let plan = submitter.planner().plan_declaration(&declaration())?;
    assert_eq!(plan.task_type(), TaskType::Distributed);

    let outcome = submitter.submit(&plan).await?;
    let job_id = outcome.job_id().unwrap().to_string();
    assert_eq!(job_id, declared_job_id());
    assert!(job_id.starts_with("f3a1b2c4-n0-0-"));

    let stored = submitter.backend().get(&job_id).unwrap();
    let manifest = serde_json::to_value(&stored.resource)?;

    assert_eq!(manifest["kind"], "PyTorchJob");
    assert_eq!(manifest["metadata"]["namespace"], "training");
    assert_eq!(
        manifest["metadata"]["annotations"][CONTENT_HASH_ANNOTATION],
        stored.submission.content_hash()
    );

    let spec = &manifest["spec"];
    assert_eq!(spec["elasticPolicy"]["rdzvBackend"], "c10d");
    assert_eq!(spec["elasticPolicy"]["minReplicas"], 2);
    assert_eq!(spec["elasticPolicy"]["maxReplicas"], 4);
    assert_eq!(spec["elasticPolicy"]["nProcPerNode"], 4);
    assert_eq!(spec["elasticPolicy"]["maxRestarts"], 2);
    assert_eq!(spec["nprocPerNode"], "4");
    assert_eq!(spec["runPolicy"]["cleanPodPolicy"], "All");
    assert_eq!(spec["runPolicy"]["backoffLimit"], 3);

    let worker = &spec["pytorchReplicaSpecs"]["Worker"];
    assert_eq!(worker["replicas"], 4);
    assert_eq!(worker["restartPolicy"], "Never");
    assert!(spec["pytorchReplicaSpecs"].get("Master").is_none());

    let pod = &worker["template"]["spec"];
    let container = &pod["containers"][0];
    assert_eq!(container["name"], "pytorch");
    assert_eq!(container["image"], "registry.local/trainer:1.0");
    assert_eq!(container["resources"]["limits"]["nvidia.com/gpu"], "4");
    assert_eq!(pod["volumes"][0]["emptyDir"]["medium"], "Memory");

    let env = container["env"].as_array().unwrap();
    assert!(env
        .iter()
        .any(|var| var["name"] == "PET_NNODES" && var["value"] == "2:4"));
    assert!(env
        .iter()
        .any(|var| var["name"] == "OMP_NUM_THREADS" && var["value"] == "1"));

    Ok(())
}

#[tokio::test]
async fn test_resubmission_creates_one_job() -> Result<()> {
    let submitter = submitter();

    // Two plans of the same attempt, e.g. after a host restart
    let first = submitter.planner().plan_declaration(&declaration())?;
    let second = submitter.planner().plan_declaration(&declaration())?;
    assert_eq!(
        first.submission().unwrap().content_hash(),
        second.submission().unwrap().content_hash()
    );

    let first = submitter.submit(&first).await?;
    let second = submitter.submit(&second).await?;

    assert!(matches!(
        second,
        SubmitOutcome::Submitted {
            outcome: ApplyOutcome::AlreadyExists,
            ..
        }
    ));
    assert_eq!(first.job_id(), second.job_id());
    assert_eq!(submitter.backend().job_count(), 1);
    assert_eq!(submitter.backend().apply_calls(), 2);

    // A retry attempt is a new job
    let mut retry = declaration();
    retry.execution.retry_attempt = 1;
    let plan = submitter.planner().plan_declaration(&retry)?;
    submitter.submit(&plan).await?;
    assert_eq!(submitter.backend().job_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_same_execution_name_in_other_project_is_separate_job() -> Result<()> {
    let submitter = submitter();
    let template = RoleSpec::default();

    let small = ElasticTask::new("train", ElasticConfig::new(NodeCount::Fixed(2)));
    let large = ElasticTask::new("train", ElasticConfig::new(NodeCount::Fixed(4)));
    let a = submitter.plan(&small, &TaskExecutionId::new("proj-a", "dev", "exec1", "n0", 0), &template)?;
    let b = submitter.plan(&large, &TaskExecutionId::new("proj-b", "prod", "exec1", "n0", 0), &template)?;

    let a = submitter.submit(&a).await?;
    let b = submitter.submit(&b).await?;

    assert_ne!(a.job_id(), b.job_id());
    for outcome in [&a, &b] {
        assert!(matches!(
            outcome,
            SubmitOutcome::Submitted {
                outcome: ApplyOutcome::Created,
                ..
            }
        ));
    }
    assert_eq!(submitter.backend().job_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_override_to_single_node_skips_cluster() -> Result<()> {
    let submitter = submitter();
    let exec = TaskExecutionId::new("vision", "development", "f3a1b2c4", "n0", 0);
    let template = RoleSpec::default();

    let task = ElasticTask::new("train", ElasticConfig::new(NodeCount::Fixed(2)));
    assert_eq!(
        submitter.plan(&task, &exec, &template)?.task_type(),
        TaskType::Distributed
    );

    let task = task.with_overrides(ElasticConfig::new("1:1".parse()?));
    let plan = submitter.plan(&task, &exec, &template)?;
    assert_eq!(plan, SubmissionPlan::SingleProcess);

    let outcome = submitter.submit(&plan).await?;
    assert_eq!(outcome, SubmitOutcome::Local);
    assert_eq!(submitter.backend().apply_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn test_rejection_reason_preserved() -> Result<()> {
    let submitter = submitter();
    let plan = submitter.planner().plan_declaration(&declaration())?;

    let reason = "admission webhook \"quota.example.com\" denied the request: exceeded gpu quota";
    submitter.backend().reject_next(reason);

    let err = submitter.submit(&plan).await.unwrap_err();
    match &err {
        Error::Submission { job_id, message } => {
            assert_eq!(*job_id, declared_job_id());
    assert!(job_id.starts_with("f3a1b2c4-n0-0-"));
            assert_eq!(message, reason);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retryable());
    assert_eq!(submitter.backend().job_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_configuration_errors_never_reach_cluster() -> Result<()> {
    let submitter = submitter();
    let exec = TaskExecutionId::new("vision", "development", "f3a1b2c4", "n0", 0);

    let conflicting = PyTorchConfig {
        num_workers: Some(2),
        ..PyTorchConfig::with_workers(2)
    };
    let result = submitter
        .planner()
        .plan_pytorch(conflicting, &exec, &RoleSpec::default());
    assert!(matches!(result, Err(Error::Configuration { .. })));

    let bad_range: Result<TaskDeclaration, _> = serde_json::from_value(serde_json::json!({
        "name": "train",
        "elastic": {"nnodes": "4:2"}
    }));
    assert!(bad_range.is_err());

    let zero_procs = ElasticTask::new(
        "train",
        ElasticConfig::new(NodeCount::Fixed(2)).with_nproc_per_node(0),
    );
    let result = submitter.plan(&zero_procs, &exec, &RoleSpec::default());
    assert!(matches!(result, Err(Error::Configuration { .. })));

    assert_eq!(submitter.backend().apply_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_classic_master_worker_job() -> Result<()> {
    let submitter = submitter();
    let exec = TaskExecutionId::new("vision", "development", "f3a1b2c4", "n1", 0);

    let plan = submitter
        .planner()
        .plan_pytorch(PyTorchConfig::with_workers(3), &exec, &RoleSpec::default())?;
    submitter.submit(&plan).await?;

    let job_id = plan.submission().unwrap().id();
    let stored = submitter.backend().get(job_id).unwrap();
    let replicas = &stored.resource.spec.pytorch_replica_specs;
    assert_eq!(replicas["Master"].replicas, Some(1));
    assert_eq!(replicas["Worker"].replicas, Some(3));
    assert!(stored.resource.spec.elastic_policy.is_none());

    submitter.backend().delete(job_id).await?;
    assert_eq!(submitter.backend().job_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_config_file_drives_namespace() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{"submit": {{"namespace": "research"}}, "job": {{"image": "trainer:2.0", "rdzv_backend": "etcd-v2"}}}}"#
    )?;
    let config = AdapterConfig::from_file(file.path())?;

    let cluster = Arc::new(InMemoryCluster::new(config.submit.namespace.clone()));
    let submitter = JobSubmitter::new(cluster, config);

    let plan = submitter.planner().plan_declaration(&declaration())?;
    submitter.submit(&plan).await?;

    let stored = submitter.backend().get(&declared_job_id()).unwrap();
    assert_eq!(stored.resource.metadata.namespace.as_deref(), Some("research"));
    assert_eq!(
        stored.resource.spec.elastic_policy.as_ref().unwrap().rdzv_backend,
        "etcd-v2"
    );
    assert_eq!(
        stored.submission.role("worker").unwrap().image,
        "trainer:2.0"
    );
    Ok(())
}
