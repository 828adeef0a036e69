//! Task instance carrying an elastic config

use adapter_core::{Result, TaskType};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ElasticConfig, ElasticModeSelector, ModeDecision};

/// A task declared with an elastic config
///
/// The mode is never cached: every call re-evaluates the current config,
/// so an override takes effect on the next evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElasticTask {
    name: String,
    config: ElasticConfig,
}

impl ElasticTask {
    pub fn new(name: impl Into<String>, config: ElasticConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    /// Replace the whole config of this task instance
    pub fn override_config(&mut self, config: ElasticConfig) {
        info!(
            task = %self.name,
            from = %self.config.nnodes,
            to = %config.nnodes,
            "Overriding elastic config"
        );
        self.config = config;
    }

    /// Same task with `config` in place of the current one
    pub fn with_overrides(mut self, config: ElasticConfig) -> Self {
        self.override_config(config);
        self
    }

    /// Evaluate the current config
    pub fn decision(&self, selector: &ElasticModeSelector) -> Result<ModeDecision> {
        selector.select(&self.config)
    }

    /// Task-type tag for the current config
    pub fn task_type(&self, selector: &ElasticModeSelector) -> Result<TaskType> {
        Ok(self.decision(selector)?.task_type())
    }
}
