//! Operator status to snapshot conversion

use adapter_core::{JobConditionKind, ReplicaCounts, RoleCondition, RoleStatus, StatusSnapshot};
use job_spec::resource::ReplicaStatus;
use job_spec::PyTorchJobStatus;
use tracing::debug;

fn count(value: Option<i32>) -> u32 {
    value.unwrap_or(0).max(0) as u32
}

fn role_status(replicas: &ReplicaStatus) -> RoleStatus {
    let counts = ReplicaCounts {
        active: count(replicas.active),
        succeeded: count(replicas.succeeded),
        failed: count(replicas.failed),
    };

    let condition = if counts.failed > 0 {
        RoleCondition::Failed
    } else if counts.active > 0 {
        RoleCondition::Running
    } else if counts.succeeded > 0 {
        RoleCondition::Succeeded
    } else {
        RoleCondition::Pending
    };

    let mut status = RoleStatus::with_condition(condition);
    if counts.failed > 0 && counts.active > 0 {
        status.conditions.insert(RoleCondition::Running);
    }
    status.replicas = counts;
    status
}

/// Snapshot of the status the operator wrote on a `PyTorchJob`.
///
/// Only conditions with status `"True"` are kept. Replica types are keyed
/// by lower-cased role name; `None` means the operator has not written a
/// status yet, which reads as accepted but not started.
pub fn snapshot_from_status(job_id: &str, status: Option<&PyTorchJobStatus>) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot::accepted(job_id);
    let Some(status) = status else {
        return snapshot;
    };

    for condition in status.conditions.iter().filter(|c| c.is_true()) {
        match JobConditionKind::from_operator(&condition.type_) {
            Some(kind) => {
                snapshot.job_conditions.insert(kind);
            }
            None => debug!(job_id, condition = %condition.type_, "Ignoring unknown job condition"),
        }
        if condition.message.is_some() {
            snapshot.message = condition.message.clone();
        }
    }

    for (replica_type, replicas) in &status.replica_statuses {
        snapshot
            .roles
            .insert(replica_type.to_ascii_lowercase(), role_status(replicas));
    }

    snapshot
}
