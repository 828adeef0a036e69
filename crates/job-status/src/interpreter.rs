//! Phase reduction rules

use adapter_core::{
    ExecutionPhase, JobConditionKind, PhaseReport, ReplicaCounts, RoleCondition, RoleStatus,
    RunPolicy, StatusSnapshot,
};

fn report(phase: ExecutionPhase, message: Option<String>) -> PhaseReport {
    PhaseReport { phase, message }
}

fn role_message(name: &str, status: &RoleStatus, fallback: &str) -> String {
    status
        .message
        .clone()
        .unwrap_or_else(|| format!("role '{}' {}", name, fallback))
}

fn failure(snapshot: &StatusSnapshot, run_policy: &RunPolicy) -> Option<PhaseReport> {
    if snapshot.has_job_condition(JobConditionKind::Failed) {
        let message = snapshot
            .message
            .clone()
            .unwrap_or_else(|| "job reported failed".to_string());
        return Some(report(ExecutionPhase::Failed, Some(message)));
    }

    let (name, status) = snapshot.roles.iter().find(|(_, status)| status.is_failed())?;
    // A failure reported without replica counts still consumes one retry
    let consumed = snapshot.failed_replicas().max(1);
    if run_policy.retry_budget_remaining(consumed) {
        return None;
    }
    Some(report(
        ExecutionPhase::Failed,
        Some(role_message(name, status, "failed")),
    ))
}

fn success(snapshot: &StatusSnapshot) -> Option<PhaseReport> {
    if let Some((name, master)) = snapshot.master() {
        if master.has(RoleCondition::Succeeded) {
            return Some(report(
                ExecutionPhase::Succeeded,
                Some(role_message(name, master, "succeeded")),
            ));
        }
    } else if !snapshot.roles.is_empty()
        && snapshot
            .roles
            .values()
            .all(|status| status.has(RoleCondition::Succeeded))
    {
        return Some(report(ExecutionPhase::Succeeded, snapshot.message.clone()));
    }

    if snapshot.has_job_condition(JobConditionKind::Succeeded) {
        return Some(report(ExecutionPhase::Succeeded, snapshot.message.clone()));
    }
    None
}

fn running(snapshot: &StatusSnapshot) -> Option<PhaseReport> {
    if let Some((name, status)) = snapshot.roles.iter().find(|(_, status)| status.is_running()) {
        let message = status
            .message
            .clone()
            .or_else(|| snapshot.message.clone())
            .unwrap_or_else(|| format!("role '{}' running", name));
        return Some(report(ExecutionPhase::Running, Some(message)));
    }

    if snapshot.has_job_condition(JobConditionKind::Running)
        || snapshot.has_job_condition(JobConditionKind::Restarting)
    {
        return Some(report(ExecutionPhase::Running, snapshot.message.clone()));
    }
    None
}

/// The cluster has seen the job: accepted flag, a job-level condition, or a
/// role reporting a condition or replica counts
fn acknowledged(snapshot: &StatusSnapshot) -> bool {
    snapshot.accepted
        || !snapshot.job_conditions.is_empty()
        || snapshot.roles.values().any(|status| {
            !status.conditions.is_empty() || status.replicas != ReplicaCounts::default()
        })
}

/// Reduce a snapshot to a phase; the first matching rule wins.
///
/// 1. A failure with no unexhausted backoff budget is `Failed`. A job-level
///    `Failed` condition is final whatever the budget.
/// 2. The master role succeeded, or without a master every role succeeded,
///    or the job-level `Succeeded` condition is set: `Succeeded`.
/// 3. Any role running or restarting: `Running`.
/// 4. Accepted but nothing started: `Queued`.
/// 5. Anything else, including an empty snapshot or roles that report
///    nothing: `Unknown`.
pub fn interpret(snapshot: &StatusSnapshot, run_policy: &RunPolicy) -> PhaseReport {
    if let Some(report) = failure(snapshot, run_policy) {
        return report;
    }
    if let Some(report) = success(snapshot) {
        return report;
    }
    if let Some(report) = running(snapshot) {
        return report;
    }

    if !acknowledged(snapshot) {
        return report(ExecutionPhase::Unknown, snapshot.message.clone());
    }
    report(
        ExecutionPhase::Queued,
        snapshot
            .message
            .clone()
            .or_else(|| Some("job accepted, no role started".to_string())),
    )
}
