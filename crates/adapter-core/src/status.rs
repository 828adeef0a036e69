//! Status snapshot model reported by the cluster

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{is_master_role, JobId};

/// Canonical execution phase reported to the host framework
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExecutionPhase {
    /// Accepted by the cluster, nothing started yet
    Queued,

    /// At least one role is running
    Running,

    /// The coordinating role completed
    Succeeded,

    /// A role failed with no retry budget left
    Failed,

    /// Snapshot stale, malformed or unrecognized
    Unknown,
}

impl ExecutionPhase {
    /// Returns true if the job will not change phase anymore
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionPhase::Succeeded | ExecutionPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPhase::Queued => "Queued",
            ExecutionPhase::Running => "Running",
            ExecutionPhase::Succeeded => "Succeeded",
            ExecutionPhase::Failed => "Failed",
            ExecutionPhase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition reported for one role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleCondition {
    Pending,
    Running,
    Restarting,
    Succeeded,
    Failed,
}

/// Condition reported for the job as a whole
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobConditionKind {
    Created,
    Running,
    Restarting,
    Succeeded,
    Failed,
    Suspended,
}

impl JobConditionKind {
    /// Parse the operator's condition type
    pub fn from_operator(kind: &str) -> Option<Self> {
        match kind {
            "Created" => Some(JobConditionKind::Created),
            "Running" => Some(JobConditionKind::Running),
            "Restarting" => Some(JobConditionKind::Restarting),
            "Succeeded" => Some(JobConditionKind::Succeeded),
            "Failed" => Some(JobConditionKind::Failed),
            "Suspended" => Some(JobConditionKind::Suspended),
            _ => None,
        }
    }
}

/// Replica counts per observed state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReplicaCounts {
    pub active: u32,
    pub succeeded: u32,
    pub failed: u32,
}

/// Observed state of one role
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoleStatus {
    /// Conditions currently reported
    pub conditions: BTreeSet<RoleCondition>,

    /// Replica counts
    pub replicas: ReplicaCounts,

    /// Human-readable detail
    pub message: Option<String>,
}

impl RoleStatus {
    /// Status with a single condition
    pub fn with_condition(condition: RoleCondition) -> Self {
        let mut status = Self::default();
        status.conditions.insert(condition);
        status
    }

    /// Returns true if the role reports `condition`
    pub fn has(&self, condition: RoleCondition) -> bool {
        self.conditions.contains(&condition)
    }

    /// Returns true if the role reports a failure, by condition or replica count
    pub fn is_failed(&self) -> bool {
        self.has(RoleCondition::Failed) || self.replicas.failed > 0
    }

    /// Returns true if the role reports work in progress
    pub fn is_running(&self) -> bool {
        self.has(RoleCondition::Running)
            || self.has(RoleCondition::Restarting)
            || self.replicas.active > 0
    }
}

/// Latest status of a job as returned by the cluster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    /// Job identifier the snapshot belongs to
    pub job_id: JobId,

    /// Whether the cluster accepted the job
    #[serde(default)]
    pub accepted: bool,

    /// Job-level conditions with status "True"
    #[serde(default)]
    pub job_conditions: BTreeSet<JobConditionKind>,

    /// Per-role status, keyed by role name
    #[serde(default)]
    pub roles: BTreeMap<String, RoleStatus>,

    /// Latest job-level message
    #[serde(default)]
    pub message: Option<String>,

    /// When the snapshot was taken
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Empty snapshot for a job
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            accepted: false,
            job_conditions: BTreeSet::new(),
            roles: BTreeMap::new(),
            message: None,
            observed_at: Utc::now(),
        }
    }

    /// Snapshot of a job the cluster accepted but did not start
    pub fn accepted(job_id: impl Into<JobId>) -> Self {
        let mut snapshot = Self::new(job_id);
        snapshot.accepted = true;
        snapshot.job_conditions.insert(JobConditionKind::Created);
        snapshot
    }

    /// Add or replace a role status
    pub fn with_role(mut self, name: impl Into<String>, status: RoleStatus) -> Self {
        self.roles.insert(name.into(), status);
        self
    }

    /// Add a job-level condition
    pub fn with_job_condition(mut self, condition: JobConditionKind) -> Self {
        self.job_conditions.insert(condition);
        self
    }

    /// Returns true if nothing was reported for the job
    pub fn is_empty(&self) -> bool {
        !self.accepted && self.job_conditions.is_empty() && self.roles.is_empty()
    }

    /// Returns true if the job-level condition is set
    pub fn has_job_condition(&self, condition: JobConditionKind) -> bool {
        self.job_conditions.contains(&condition)
    }

    /// Status of the coordinating role, if reported
    pub fn master(&self) -> Option<(&str, &RoleStatus)> {
        self.roles
            .iter()
            .find(|(name, _)| is_master_role(name))
            .map(|(name, status)| (name.as_str(), status))
    }

    /// Total failed replicas across all roles
    pub fn failed_replicas(&self) -> u32 {
        self.roles.values().map(|r| r.replicas.failed).sum()
    }
}

/// Phase plus optional human-readable detail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: ExecutionPhase,
    pub message: Option<String>,
}

impl PhaseReport {
    pub fn new(phase: ExecutionPhase) -> Self {
        Self {
            phase,
            message: None,
        }
    }

    pub fn with_message(phase: ExecutionPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: Some(message.into()),
        }
    }
}
