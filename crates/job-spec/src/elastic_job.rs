//! Multi-node elastic jobs

use adapter_core::{RoleSpec, TaskExecutionId, WORKER_ROLE};
use elastic::{ElasticConfig, ElasticLaunch};

use crate::JobSpecBuilder;

/// Builder for a multi-node elastic job.
///
/// Elastic jobs have no master: a single worker role runs `max_nodes`
/// replicas and the operator adds or removes workers within the elastic
/// policy's bounds. `template` supplies image, command and resources of
/// the worker; its replica count is ignored.
pub fn elastic_builder(
    execution: TaskExecutionId,
    launch: &ElasticLaunch,
    config: &ElasticConfig,
    template: RoleSpec,
) -> JobSpecBuilder {
    let mut worker = template;
    worker.replicas = launch.max_nodes;

    for (name, value) in launch.pet_env() {
        worker.env.insert(name, value);
    }
    let user_env = worker.env.clone();
    for (name, value) in launch.launch_env(|name| user_env.get(name).cloned()) {
        worker.env.insert(name, value);
    }

    JobSpecBuilder::new(execution)
        .role(WORKER_ROLE, worker)
        .require_role(WORKER_ROLE)
        .run_policy(config.run_policy.clone().unwrap_or_default())
        .shared_memory(config.increase_shared_mem)
        .elastic(launch.clone())
}
