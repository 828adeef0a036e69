//! Classic master/worker PyTorch task configuration

use adapter_core::{
    Error, Resources, RestartPolicy, Result, RoleSpec, RunPolicy,
    TaskExecutionId, MASTER_ROLE, WORKER_ROLE,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::JobSpecBuilder;

/// Master replica settings; the master always runs exactly one replica
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MasterConfig {
    pub image: Option<String>,
    pub requests: Option<Resources>,
    pub limits: Option<Resources>,
    pub restart_policy: Option<RestartPolicy>,
}

/// Worker replica settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    pub image: Option<String>,
    pub requests: Option<Resources>,
    pub limits: Option<Resources>,
    pub replicas: Option<u32>,
    pub restart_policy: Option<RestartPolicy>,
}

/// Configuration of a non-elastic PyTorch task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PyTorchConfig {
    pub master: MasterConfig,
    pub worker: WorkerConfig,
    pub run_policy: Option<RunPolicy>,

    /// Deprecated; use `worker.replicas`
    pub num_workers: Option<u32>,

    pub increase_shared_mem: bool,
}

impl Default for PyTorchConfig {
    fn default() -> Self {
        Self {
            master: MasterConfig::default(),
            worker: WorkerConfig::default(),
            run_policy: None,
            num_workers: None,
            increase_shared_mem: true,
        }
    }
}

/// Role from the shared template; per-role settings win over the template
fn role_from_template(
    template: &RoleSpec,
    replicas: u32,
    image: Option<String>,
    requests: Option<Resources>,
    limits: Option<Resources>,
    restart_policy: Option<RestartPolicy>,
) -> RoleSpec {
    let mut role = template.clone();
    role.replicas = replicas;
    if image.is_some() {
        role.image = image;
    }
    if let Some(requests) = requests {
        role.resources.requests = requests;
    }
    if let Some(limits) = limits {
        role.resources.limits = limits;
    }
    role.restart_policy = restart_policy.or(template.restart_policy);
    role
}

impl PyTorchConfig {
    /// Config with `replicas` workers
    pub fn with_workers(replicas: u32) -> Self {
        Self {
            worker: WorkerConfig {
                replicas: Some(replicas),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Worker replica count, from `worker.replicas` or the deprecated `num_workers`
    pub fn worker_replicas(&self) -> Result<u32> {
        match (self.num_workers, self.worker.replicas) {
            (Some(_), Some(_)) => Err(Error::configuration(
                "cannot specify both num_workers and worker.replicas",
            )),
            (None, None) => Err(Error::configuration(
                "one of num_workers or worker.replicas must be specified",
            )),
            (Some(n), None) => {
                warn!("num_workers is deprecated, use worker.replicas instead");
                Ok(n)
            }
            (None, Some(n)) => Ok(n),
        }
    }

    /// Builder for the master/worker job.
    ///
    /// `template` supplies command, env, resources and image shared by the
    /// master and the workers; settings of `master` / `worker` override it.
    /// `image` is used by roles that end up without one.
    pub fn into_builder(
        self,
        execution: TaskExecutionId,
        template: &RoleSpec,
        image: impl Into<String>,
    ) -> Result<JobSpecBuilder> {
        let workers = self.worker_replicas()?;

        let master = role_from_template(
            template,
            1,
            self.master.image,
            self.master.requests,
            self.master.limits,
            self.master.restart_policy,
        );
        let worker = role_from_template(
            template,
            workers,
            self.worker.image,
            self.worker.requests,
            self.worker.limits,
            self.worker.restart_policy,
        );

        Ok(JobSpecBuilder::new(execution)
            .default_image(image)
            .role(MASTER_ROLE, master)
            .role(WORKER_ROLE, worker)
            .require_role(MASTER_ROLE)
            .require_role(WORKER_ROLE)
            .run_policy(self.run_policy.unwrap_or_default())
            .shared_memory(self.increase_shared_mem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec() -> TaskExecutionId {
        TaskExecutionId::new("ml", "dev", "exec1", "n0", 0)
    }

    #[test]
    fn test_num_workers_and_replicas_conflict() {
        let config = PyTorchConfig {
            num_workers: Some(2),
            ..PyTorchConfig::with_workers(3)
        };
        assert!(matches!(
            config.into_builder(exec(), &RoleSpec::default(), "trainer:1.0"),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_worker_count_required() {
        let result = PyTorchConfig::default().into_builder(exec(), &RoleSpec::default(), "trainer:1.0");
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_deprecated_num_workers_still_accepted() {
        let config = PyTorchConfig {
            num_workers: Some(4),
            ..Default::default()
        };
        let submission = config
            .into_builder(exec(), &RoleSpec::default(), "trainer:1.0")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(submission.role(WORKER_ROLE).unwrap().replicas, 4);
    }

    #[test]
    fn test_master_fixed_to_one_replica() {
        let mut config = PyTorchConfig::with_workers(2);
        config.master.image = Some("master:2.0".to_string());
        config.worker.restart_policy = Some(RestartPolicy::OnFailure);

        let submission = config
            .into_builder(exec(), &RoleSpec::default(), "trainer:1.0")
            .unwrap()
            .build()
            .unwrap();

        let master = submission.role(MASTER_ROLE).unwrap();
        assert_eq!(master.replicas, 1);
        assert_eq!(master.image, "master:2.0");
        assert_eq!(master.restart_policy, RestartPolicy::Never);

        let worker = submission.role(WORKER_ROLE).unwrap();
        assert_eq!(worker.image, "trainer:1.0");
        assert_eq!(worker.restart_policy, RestartPolicy::OnFailure);
        assert!(submission.shared_memory());
        assert!(submission.elastic_policy().is_none());
    }

    #[test]
    fn test_template_reaches_master_and_workers() {
        let template = RoleSpec::default()
            .with_command(["python", "train.py"])
            .with_env("LR", "0.1");
        let mut config = PyTorchConfig::with_workers(2);
        config.worker.limits = Some(Resources {
            gpu: Some("1".to_string()),
            ..Default::default()
        });

        let submission = config
            .into_builder(exec(), &template, "trainer:1.0")
            .unwrap()
            .build()
            .unwrap();

        for role in [MASTER_ROLE, WORKER_ROLE] {
            let spec = submission.role(role).unwrap();
            assert_eq!(spec.command, vec!["python", "train.py"], "role={}", role);
            assert_eq!(spec.env["LR"], "0.1", "role={}", role);
        }
        assert_eq!(submission.role(MASTER_ROLE).unwrap().replicas, 1);
        assert_eq!(submission.role(WORKER_ROLE).unwrap().replicas, 2);
        assert!(submission.role(MASTER_ROLE).unwrap().resources.limits.gpu.is_none());
        assert_eq!(
            submission.role(WORKER_ROLE).unwrap().resources.limits.gpu.as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_zero_workers_rejected_at_build() {
        let builder = PyTorchConfig::with_workers(0)
            .into_builder(exec(), &RoleSpec::default(), "trainer:1.0")
            .unwrap();
        assert!(matches!(builder.build(), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_deserialize_task_config() {
        let config: PyTorchConfig = serde_json::from_str(
            r#"{"worker": {"replicas": 3, "limits": {"gpu": "1"}}, "run_policy": {"backoff_limit": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.worker_replicas().unwrap(), 3);
        assert_eq!(config.run_policy.unwrap().backoff_limit, Some(2));
        assert!(config.increase_shared_mem);
    }
}
