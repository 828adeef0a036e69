//! Rendering of submissions into `PyTorchJob` resources

use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvVar, PodSpec, PodTemplateSpec,
    ResourceRequirements as K8sResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use adapter_core::{ResourceRequirements, Resources, RunPolicy};

use crate::builder::{JobSubmission, ResolvedRole};
use crate::naming::role_key;
use crate::resource::{PyTorchJob, PyTorchJobSpec, ReplicaSpec, RunPolicySpec};

/// Container name the training operator looks for
pub const CONTAINER_NAME: &str = "pytorch";

/// Annotation carrying the submission's content hash
pub const CONTENT_HASH_ANNOTATION: &str = "torchjob/content-hash";

/// Annotation carrying the originating task execution
pub const EXECUTION_ANNOTATION: &str = "torchjob/task-execution";

const SHM_VOLUME: &str = "shm";
const SHM_MOUNT_PATH: &str = "/dev/shm";

fn quantities(resources: &Resources) -> Option<BTreeMap<String, Quantity>> {
    if resources.is_empty() {
        return None;
    }
    Some(
        resources
            .entries()
            .into_iter()
            .map(|(name, value)| (name.to_string(), Quantity(value.to_string())))
            .collect(),
    )
}

fn requirements(resources: &ResourceRequirements) -> Option<K8sResourceRequirements> {
    let requests = quantities(&resources.requests);
    let limits = quantities(&resources.limits);
    if requests.is_none() && limits.is_none() {
        return None;
    }
    Some(K8sResourceRequirements {
        requests,
        limits,
        ..Default::default()
    })
}

fn run_policy_spec(policy: &RunPolicy) -> Option<RunPolicySpec> {
    if policy == &RunPolicy::default() {
        return None;
    }
    Some(RunPolicySpec {
        clean_pod_policy: policy.clean_pod_policy.map(|p| p.as_str().to_string()),
        ttl_seconds_after_finished: policy.ttl_seconds_after_finished.map(|s| s as i32),
        active_deadline_seconds: policy.active_deadline_seconds.map(|s| s as i64),
        backoff_limit: policy.backoff_limit.map(|n| n as i32),
    })
}

fn pod_template(role: &ResolvedRole, shared_memory: bool) -> PodTemplateSpec {
    let env: Vec<EnvVar> = role
        .env
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            value_from: None,
        })
        .collect();

    let mut container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(role.image.clone()),
        command: (!role.command.is_empty()).then(|| role.command.clone()),
        env: (!env.is_empty()).then_some(env),
        resources: requirements(&role.resources),
        ..Default::default()
    };

    let mut volumes = None;
    if shared_memory {
        container.volume_mounts = Some(vec![VolumeMount {
            name: SHM_VOLUME.to_string(),
            mount_path: SHM_MOUNT_PATH.to_string(),
            ..Default::default()
        }]);
        volumes = Some(vec![Volume {
            name: SHM_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource {
                medium: Some("Memory".to_string()),
                size_limit: None,
            }),
            ..Default::default()
        }]);
    }

    PodTemplateSpec {
        metadata: None,
        spec: Some(PodSpec {
            containers: vec![container],
            volumes,
            ..Default::default()
        }),
    }
}

impl JobSubmission {
    /// Render the `PyTorchJob` resource for `namespace`
    pub fn to_resource(&self, namespace: &str) -> PyTorchJob {
        let replica_specs = self
            .roles()
            .iter()
            .map(|(name, role)| {
                let spec = ReplicaSpec {
                    replicas: Some(role.replicas as i32),
                    restart_policy: Some(role.restart_policy.as_str().to_string()),
                    template: pod_template(role, self.shared_memory()),
                };
                (role_key(name), spec)
            })
            .collect();

        let spec = PyTorchJobSpec {
            run_policy: run_policy_spec(self.run_policy()),
            elastic_policy: self.elastic_policy().cloned(),
            nproc_per_node: self.nproc_per_node().map(|n| n.to_string()),
            pytorch_replica_specs: replica_specs,
        };

        let mut job = PyTorchJob::new(self.id(), spec);
        job.metadata = ObjectMeta {
            name: Some(self.id().clone()),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([
                (
                    CONTENT_HASH_ANNOTATION.to_string(),
                    self.content_hash().to_string(),
                ),
                (
                    EXECUTION_ANNOTATION.to_string(),
                    self.execution().to_string(),
                ),
            ])),
            ..Default::default()
        };
        job
    }
}
