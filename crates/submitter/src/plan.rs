//! Submission planning: mode selection followed by job building

use adapter_core::{
    config::JobDefaults, Error, Result, RoleSpec, TaskExecutionId, TaskType,
};
use elastic::{ElasticConfig, ElasticModeSelector, ElasticTask, ModeDecision};
use job_spec::{elastic_builder, JobSubmission, PyTorchConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

/// What to do with a task
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPlan {
    /// Run as an ordinary process; nothing is sent to the cluster
    SingleProcess,

    /// Submit this job
    Distributed(JobSubmission),
}

impl SubmissionPlan {
    pub fn task_type(&self) -> TaskType {
        match self {
            SubmissionPlan::SingleProcess => TaskType::SingleProcess,
            SubmissionPlan::Distributed(_) => TaskType::Distributed,
        }
    }

    pub fn submission(&self) -> Option<&JobSubmission> {
        match self {
            SubmissionPlan::SingleProcess => None,
            SubmissionPlan::Distributed(submission) => Some(submission),
        }
    }
}

/// Serialized task declaration, as read by `render-job` and the Python module
///
/// Declares either an elastic config or a classic master/worker config.
/// Neither means a single-node elastic task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDeclaration {
    pub name: String,
    pub execution: TaskExecutionId,
    pub elastic: Option<ElasticConfig>,
    pub pytorch: Option<PyTorchConfig>,

    /// Image, command, resources and env of the replicas; for PyTorch
    /// configs it is shared by the master and the workers
    pub worker: RoleSpec,
}

/// Turns task declarations into submission plans
#[derive(Debug, Clone)]
pub struct Planner {
    selector: ElasticModeSelector,
    defaults: JobDefaults,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(JobDefaults::default())
    }
}

impl Planner {
    pub fn new(defaults: JobDefaults) -> Self {
        Self {
            selector: ElasticModeSelector::new(defaults.rdzv_backend.clone()),
            defaults,
        }
    }

    pub fn selector(&self) -> &ElasticModeSelector {
        &self.selector
    }

    /// Plan an elastic task; the mode is reselected from the task's current config
    pub fn plan(
        &self,
        task: &ElasticTask,
        execution: &TaskExecutionId,
        template: &RoleSpec,
    ) -> Result<SubmissionPlan> {
        let launch = match task.decision(&self.selector)? {
            ModeDecision::SingleNode => {
                info!(task = %task.name(), "Single-node task, no job submitted");
                return Ok(SubmissionPlan::SingleProcess);
            }
            ModeDecision::MultiNode(launch) => launch,
        };

        let config = task.config();
        let mut builder = elastic_builder(execution.clone(), &launch, config, template.clone())
            .shared_memory(config.increase_shared_mem && self.defaults.increase_shared_mem);
        if let Some(image) = &self.defaults.image {
            builder = builder.default_image(image.clone());
        }

        let submission = builder.build()?;
        info!(
            task = %task.name(),
            job_id = %submission.id(),
            nnodes = %launch.nnodes_arg(),
            "Planned elastic job"
        );
        Ok(SubmissionPlan::Distributed(submission))
    }

    /// Plan a classic master/worker task; always distributed.
    ///
    /// `template` carries the command, env and resources of both roles.
    pub fn plan_pytorch(
        &self,
        config: PyTorchConfig,
        execution: &TaskExecutionId,
        template: &RoleSpec,
    ) -> Result<SubmissionPlan> {
        let image = self
            .defaults
            .image
            .clone()
            .or_else(|| template.image.clone())
            .ok_or_else(|| Error::configuration("no default image configured for PyTorch tasks"))?;
        let shared_memory = config.increase_shared_mem && self.defaults.increase_shared_mem;

        let submission = config
            .into_builder(execution.clone(), template, image)?
            .shared_memory(shared_memory)
            .build()?;
        info!(job_id = %submission.id(), "Planned PyTorch job");
        Ok(SubmissionPlan::Distributed(submission))
    }

    /// Plan a serialized declaration
    pub fn plan_declaration(&self, declaration: &TaskDeclaration) -> Result<SubmissionPlan> {
        match (&declaration.elastic, &declaration.pytorch) {
            (Some(_), Some(_)) => Err(Error::configuration(format!(
                "task '{}' declares both an elastic and a PyTorch config",
                declaration.name
            ))),
            (None, Some(pytorch)) => self.plan_pytorch(
                pytorch.clone(),
                &declaration.execution,
                &declaration.worker,
            ),
            (elastic, None) => {
                let task =
                    ElasticTask::new(declaration.name.clone(), elastic.clone().unwrap_or_default());
                self.plan(&task, &declaration.execution, &declaration.worker)
            }
        }
    }
}
