//! Core type definitions for training job declarations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Unique identifier types
pub type JobId = String;
pub type RoleName = String;

/// Conventional name of the coordinating role
pub const MASTER_ROLE: &str = "master";

/// Conventional name of the worker role
pub const WORKER_ROLE: &str = "worker";

/// Returns true if `name` designates the coordinating role
pub fn is_master_role(name: &str) -> bool {
    name.eq_ignore_ascii_case(MASTER_ROLE)
}

/// How the replicas of a role are restarted by the operator
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RestartPolicy {
    /// Never restart a finished replica
    #[default]
    Never,

    /// Restart only on non-zero exit
    OnFailure,

    /// Always restart
    Always,

    /// Restart depending on the exit code (retryable codes only)
    ExitCode,
}

impl RestartPolicy {
    /// Value understood by the training operator
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::Never => "Never",
            RestartPolicy::OnFailure => "OnFailure",
            RestartPolicy::Always => "Always",
            RestartPolicy::ExitCode => "ExitCode",
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestartPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "never" => Ok(RestartPolicy::Never),
            "onfailure" | "failure" => Ok(RestartPolicy::OnFailure),
            "always" => Ok(RestartPolicy::Always),
            "exitcode" => Ok(RestartPolicy::ExitCode),
            _ => Err(Error::configuration(format!("unknown restart policy '{}'", s))),
        }
    }
}

/// What happens to pods once the job finished
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CleanPodPolicy {
    /// Keep every pod
    None,

    /// Delete every pod
    All,

    /// Delete pods still running
    Running,
}

impl CleanPodPolicy {
    /// Value understood by the training operator
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanPodPolicy::None => "None",
            CleanPodPolicy::All => "All",
            CleanPodPolicy::Running => "Running",
        }
    }
}

impl fmt::Display for CleanPodPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute resources, expressed as Kubernetes quantity strings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Resources {
    /// CPU, e.g. "500m" or "2"
    pub cpu: Option<String>,

    /// Memory, e.g. "2Gi"
    pub memory: Option<String>,

    /// GPU count
    pub gpu: Option<String>,

    /// Ephemeral storage, e.g. "1Gi"
    pub ephemeral_storage: Option<String>,
}

impl Resources {
    /// Resource name used for GPUs
    pub const GPU_RESOURCE: &'static str = "nvidia.com/gpu";

    /// Returns true if no resource is set
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Set entries keyed by their Kubernetes resource name
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("cpu", self.cpu.as_deref()),
            ("memory", self.memory.as_deref()),
            (Self::GPU_RESOURCE, self.gpu.as_deref()),
            ("ephemeral-storage", self.ephemeral_storage.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// Requests and limits for a role's containers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResourceRequirements {
    pub requests: Resources,
    pub limits: Resources,
}

/// One training role (master, worker, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoleSpec {
    /// Number of replicas
    pub replicas: u32,

    /// Restart policy; resolved to `Never` when unset
    pub restart_policy: Option<RestartPolicy>,

    /// Resource requirements
    pub resources: ResourceRequirements,

    /// Container image reference
    pub image: Option<String>,

    /// Container command
    pub command: Vec<String>,

    /// Extra environment variables
    pub env: BTreeMap<String, String>,
}

impl RoleSpec {
    /// Create a role with the given replica count
    pub fn new(replicas: u32) -> Self {
        Self {
            replicas,
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = Some(policy);
        self
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resources(mut self, resources: ResourceRequirements) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }
}

/// Job-level execution policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunPolicy {
    /// Pod cleanup after completion
    pub clean_pod_policy: Option<CleanPodPolicy>,

    /// Seconds to keep the finished job around
    pub ttl_seconds_after_finished: Option<u32>,

    /// Seconds the job may stay active
    pub active_deadline_seconds: Option<u64>,

    /// Retries before the job is marked failed
    pub backoff_limit: Option<u32>,
}

impl RunPolicy {
    /// Returns true while `consumed` retries leave part of the backoff budget unused.
    ///
    /// Without a backoff limit there is no budget at all.
    pub fn retry_budget_remaining(&self, consumed: u32) -> bool {
        self.backoff_limit.is_some_and(|limit| consumed < limit)
    }
}

/// Identity of the task execution a job is submitted for
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct TaskExecutionId {
    pub project: String,
    pub domain: String,

    /// Workflow execution name
    pub name: String,

    /// Node within the workflow
    pub node_id: String,

    /// Attempt number of this node
    pub retry_attempt: u32,
}

impl TaskExecutionId {
    pub fn new(
        project: impl Into<String>,
        domain: impl Into<String>,
        name: impl Into<String>,
        node_id: impl Into<String>,
        retry_attempt: u32,
    ) -> Self {
        Self {
            project: project.into(),
            domain: domain.into(),
            name: name.into(),
            node_id: node_id.into(),
            retry_attempt,
        }
    }
}

impl fmt::Display for TaskExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.project, self.domain, self.name, self.node_id, self.retry_attempt
        )
    }
}

/// Task-type tag reported to the host framework; selects the downstream executor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Ordinary single process in a plain pod
    SingleProcess,

    /// Multi-role distributed job handled by the training operator
    Distributed,
}

impl TaskType {
    /// Tag understood by the host framework
    pub fn tag(&self) -> &'static str {
        match self {
            TaskType::SingleProcess => "python-task",
            TaskType::Distributed => "pytorch",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
