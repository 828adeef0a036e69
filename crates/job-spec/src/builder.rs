//! Job Spec Builder: validated, immutable job submissions

use adapter_core::{
    is_master_role, Error, JobId, ResourceRequirements, RestartPolicy, Result, RoleSpec,
    RunPolicy, TaskExecutionId,
};
use elastic::ElasticLaunch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::naming::{fnv_hex, job_name, validate_label};
use crate::resource::ElasticPolicy;

/// A role after validation; the restart policy is always explicit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedRole {
    pub replicas: u32,
    pub restart_policy: RestartPolicy,
    pub resources: ResourceRequirements,
    pub image: String,
    pub command: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Hashed part of a submission; the identity is excluded
#[derive(Serialize)]
struct HashedContent<'a> {
    roles: &'a BTreeMap<String, ResolvedRole>,
    run_policy: &'a RunPolicy,
    elastic_policy: &'a Option<ElasticPolicy>,
    nproc_per_node: Option<u32>,
    shared_memory: bool,
}

/// The unit submitted to the cluster, created once per execution attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSubmission {
    id: JobId,
    execution: TaskExecutionId,
    roles: BTreeMap<String, ResolvedRole>,
    run_policy: RunPolicy,
    elastic_policy: Option<ElasticPolicy>,
    nproc_per_node: Option<u32>,
    shared_memory: bool,
    content_hash: String,
}

impl JobSubmission {
    /// Resource name; stable across re-submissions of the same attempt
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn execution(&self) -> &TaskExecutionId {
        &self.execution
    }

    pub fn roles(&self) -> &BTreeMap<String, ResolvedRole> {
        &self.roles
    }

    pub fn role(&self, name: &str) -> Option<&ResolvedRole> {
        self.roles.get(name)
    }

    pub fn run_policy(&self) -> &RunPolicy {
        &self.run_policy
    }

    pub fn elastic_policy(&self) -> Option<&ElasticPolicy> {
        self.elastic_policy.as_ref()
    }

    pub fn nproc_per_node(&self) -> Option<u32> {
        self.nproc_per_node
    }

    pub fn shared_memory(&self) -> bool {
        self.shared_memory
    }

    /// FNV-1a hash of the resolved spec, hex encoded
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Total replicas across roles
    pub fn total_replicas(&self) -> u32 {
        self.roles.values().map(|r| r.replicas).sum()
    }
}

/// Builder for [`JobSubmission`]
#[derive(Debug, Clone)]
pub struct JobSpecBuilder {
    execution: TaskExecutionId,
    roles: Vec<(String, RoleSpec)>,
    required: BTreeSet<String>,
    run_policy: RunPolicy,
    elastic: Option<ElasticLaunch>,
    shared_memory: bool,
    default_image: Option<String>,
}

impl JobSpecBuilder {
    /// Start a job for the given task execution
    pub fn new(execution: TaskExecutionId) -> Self {
        Self {
            execution,
            roles: Vec::new(),
            required: BTreeSet::new(),
            run_policy: RunPolicy::default(),
            elastic: None,
            shared_memory: false,
            default_image: None,
        }
    }

    /// Declare a role
    pub fn role(mut self, name: impl Into<String>, spec: RoleSpec) -> Self {
        self.roles.push((name.into(), spec));
        self
    }

    /// Require a role to be declared with at least one replica
    pub fn require_role(mut self, name: impl Into<String>) -> Self {
        self.required.insert(name.into());
        self
    }

    pub fn run_policy(mut self, run_policy: RunPolicy) -> Self {
        self.run_policy = run_policy;
        self
    }

    /// Attach an elastic policy derived from a multi-node launch
    pub fn elastic(mut self, launch: ElasticLaunch) -> Self {
        self.elastic = Some(launch);
        self
    }

    /// Mount a memory-backed /dev/shm into every replica
    pub fn shared_memory(mut self, enabled: bool) -> Self {
        self.shared_memory = enabled;
        self
    }

    /// Image for roles that do not name one
    pub fn default_image(mut self, image: impl Into<String>) -> Self {
        self.default_image = Some(image.into());
        self
    }

    fn resolve_role(&self, name: &str, spec: RoleSpec) -> Result<ResolvedRole> {
        if is_master_role(name) && spec.replicas > 1 {
            return Err(Error::configuration(format!(
                "master role must have 0 or 1 replicas, got {}",
                spec.replicas
            )));
        }

        let image = spec
            .image
            .or_else(|| self.default_image.clone())
            .ok_or_else(|| {
                Error::configuration(format!("role '{}' has no container image", name))
            })?;

        let restart_policy = match spec.restart_policy {
            Some(policy) => policy,
            None => {
                debug!(role = %name, "No restart policy set, using Never");
                RestartPolicy::Never
            }
        };

        Ok(ResolvedRole {
            replicas: spec.replicas,
            restart_policy,
            resources: spec.resources,
            image,
            command: spec.command,
            env: spec.env,
        })
    }

    /// Validate and freeze the submission
    pub fn build(self) -> Result<JobSubmission> {
        if self.roles.is_empty() {
            return Err(Error::configuration("job declares no roles"));
        }

        let mut roles = BTreeMap::new();
        for (name, spec) in self.roles.clone() {
            validate_label(&name, "role name")?;
            if roles.contains_key(&name) {
                return Err(Error::configuration(format!("role '{}' declared twice", name)));
            }
            let resolved = self.resolve_role(&name, spec)?;
            roles.insert(name, resolved);
        }

        for name in &self.required {
            match roles.get(name) {
                None => {
                    return Err(Error::configuration(format!(
                        "required role '{}' is not declared",
                        name
                    )))
                }
                Some(role) if role.replicas == 0 => {
                    return Err(Error::configuration(format!(
                        "required role '{}' declares zero replicas",
                        name
                    )))
                }
                Some(_) => {}
            }
        }

        let id = job_name(&self.execution)?;
        let elastic_policy = self.elastic.as_ref().map(|launch| ElasticPolicy {
            rdzv_backend: launch.rdzv_backend.clone(),
            min_replicas: launch.min_nodes as i32,
            max_replicas: launch.max_nodes as i32,
            n_proc_per_node: launch.nproc_per_node as i32,
            max_restarts: launch.max_restarts as i32,
        });
        let nproc_per_node = self.elastic.as_ref().map(|launch| launch.nproc_per_node);

        let content = HashedContent {
            roles: &roles,
            run_policy: &self.run_policy,
            elastic_policy: &elastic_policy,
            nproc_per_node,
            shared_memory: self.shared_memory,
        };
        let content_hash = fnv_hex(&serde_json::to_vec(&content)?);

        info!(
            job_id = %id,
            roles = roles.len(),
            elastic = elastic_policy.is_some(),
            content_hash = %content_hash,
            "Built job submission"
        );

        Ok(JobSubmission {
            id,
            execution: self.execution,
            roles,
            run_policy: self.run_policy,
            elastic_policy,
            nproc_per_node,
            shared_memory: self.shared_memory,
            content_hash,
        })
    }
}
