//! Elastic launch configuration supplied at task-definition time

use adapter_core::RunPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::NodeCount;

/// Multiprocessing start method for the worker processes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartMethod {
    #[default]
    Spawn,
    Fork,
}

impl StartMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartMethod::Spawn => "spawn",
            StartMethod::Fork => "fork",
        }
    }
}

/// Torch elastic configuration of a task
///
/// Immutable once attached to a task; overrides replace it as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElasticConfig {
    /// Node count or `min:max` node range
    pub nnodes: NodeCount,

    /// Worker processes per node
    pub nproc_per_node: u32,

    /// Start method for worker processes
    pub start_method: StartMethod,

    /// Seconds between worker health checks
    pub monitor_interval: u32,

    /// Worker group restarts before failing
    pub max_restarts: u32,

    /// Extra rendezvous settings, e.g. timeouts
    pub rdzv_configs: BTreeMap<String, Value>,

    /// Mount a memory-backed /dev/shm
    pub increase_shared_mem: bool,

    /// Job-level run policy for multi-node jobs
    pub run_policy: Option<RunPolicy>,
}

impl ElasticConfig {
    /// Default rendezvous timeout in seconds; slow image pulls on fresh nodes need the headroom
    pub const DEFAULT_RDZV_TIMEOUT_SECS: u64 = 900;

    /// Config with the given node count and defaults elsewhere
    pub fn new(nnodes: NodeCount) -> Self {
        Self {
            nnodes,
            ..Default::default()
        }
    }

    pub fn with_nproc_per_node(mut self, nproc_per_node: u32) -> Self {
        self.nproc_per_node = nproc_per_node;
        self
    }

    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub fn with_run_policy(mut self, run_policy: RunPolicy) -> Self {
        self.run_policy = Some(run_policy);
        self
    }
}

impl Default for ElasticConfig {
    fn default() -> Self {
        let mut rdzv_configs = BTreeMap::new();
        rdzv_configs.insert(
            "timeout".to_string(),
            Value::from(Self::DEFAULT_RDZV_TIMEOUT_SECS),
        );
        rdzv_configs.insert(
            "join_timeout".to_string(),
            Value::from(Self::DEFAULT_RDZV_TIMEOUT_SECS),
        );

        Self {
            nnodes: NodeCount::default(),
            nproc_per_node: 1,
            start_method: StartMethod::default(),
            monitor_interval: 5,
            max_restarts: 0,
            rdzv_configs,
            increase_shared_mem: true,
            run_policy: None,
        }
    }
}
