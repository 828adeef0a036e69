//! Single-node vs multi-node decision

use adapter_core::{Error, Result, TaskType};
use tracing::debug;

use crate::{ElasticConfig, ElasticLaunch};

/// Submission strategy chosen for one evaluation of a config
#[derive(Debug, Clone, PartialEq)]
pub enum ModeDecision {
    /// Run as one ordinary process, no distributed job
    SingleNode,

    /// Submit a distributed job with this launch
    MultiNode(ElasticLaunch),
}

impl ModeDecision {
    /// Task-type tag selecting the downstream executor
    pub fn task_type(&self) -> TaskType {
        match self {
            ModeDecision::SingleNode => TaskType::SingleProcess,
            ModeDecision::MultiNode(_) => TaskType::Distributed,
        }
    }

    pub fn is_multi_node(&self) -> bool {
        matches!(self, ModeDecision::MultiNode(_))
    }

    /// Launch parameters, for multi-node decisions
    pub fn launch(&self) -> Option<&ElasticLaunch> {
        match self {
            ModeDecision::SingleNode => None,
            ModeDecision::MultiNode(launch) => Some(launch),
        }
    }
}

/// Decides the submission strategy of elastic configs
#[derive(Debug, Clone)]
pub struct ElasticModeSelector {
    rdzv_backend: String,
}

impl Default for ElasticModeSelector {
    fn default() -> Self {
        Self::new("c10d")
    }
}

impl ElasticModeSelector {
    /// Selector embedding `rdzv_backend` in multi-node launches
    pub fn new(rdzv_backend: impl Into<String>) -> Self {
        Self {
            rdzv_backend: rdzv_backend.into(),
        }
    }

    /// Evaluate `config` from scratch.
    ///
    /// Single-node iff the maximum node count is 1, whatever the spelling
    /// (`1`, `"1"`, `"1:1"`); `"1:4"` is multi-node.
    pub fn select(&self, config: &ElasticConfig) -> Result<ModeDecision> {
        config.nnodes.validate()?;
        if config.nproc_per_node == 0 {
            return Err(Error::configuration("nproc_per_node must be at least 1"));
        }

        let decision = if config.nnodes.max_nodes() == 1 {
            ModeDecision::SingleNode
        } else {
            ModeDecision::MultiNode(ElasticLaunch::from_config(config, &self.rdzv_backend))
        };

        debug!(
            nnodes = %config.nnodes,
            nproc_per_node = config.nproc_per_node,
            task_type = %decision.task_type(),
            "Selected execution mode"
        );
        Ok(decision)
    }
}
