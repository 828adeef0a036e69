//! Resolved launch parameters of a multi-node elastic run

use adapter_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::{ElasticConfig, NodeCount, StartMethod};

/// Rendezvous endpoint used when the operator did not inject one
pub const DEFAULT_RDZV_ENDPOINT: &str = "localhost:0";

const ENV_NNODES: &str = "PET_NNODES";
const ENV_NPROC_PER_NODE: &str = "PET_NPROC_PER_NODE";
const ENV_MAX_RESTARTS: &str = "PET_MAX_RESTARTS";
const ENV_MONITOR_INTERVAL: &str = "PET_MONITOR_INTERVAL";
const ENV_RDZV_ENDPOINT: &str = "PET_RDZV_ENDPOINT";
const ENV_OMP_NUM_THREADS: &str = "OMP_NUM_THREADS";

/// Launch parameters of a multi-node decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElasticLaunch {
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub nproc_per_node: u32,
    pub max_restarts: u32,
    pub monitor_interval: u32,
    pub start_method: StartMethod,
    pub rdzv_backend: String,
    pub rdzv_endpoint: String,
    pub rdzv_configs: BTreeMap<String, Value>,
}

fn parse_env_u32(name: &str, raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| Error::configuration(format!("{}='{}' is not a non-negative integer", name, raw)))
}

impl ElasticLaunch {
    pub(crate) fn from_config(config: &ElasticConfig, rdzv_backend: &str) -> Self {
        Self {
            min_nodes: config.nnodes.min_nodes(),
            max_nodes: config.nnodes.max_nodes(),
            nproc_per_node: config.nproc_per_node,
            max_restarts: config.max_restarts,
            monitor_interval: config.monitor_interval,
            start_method: config.start_method,
            rdzv_backend: rdzv_backend.to_string(),
            rdzv_endpoint: DEFAULT_RDZV_ENDPOINT.to_string(),
            rdzv_configs: config.rdzv_configs.clone(),
        }
    }

    /// `min:max` as passed to `--nnodes`
    pub fn nnodes_arg(&self) -> String {
        format!("{}:{}", self.min_nodes, self.max_nodes)
    }

    /// Apply the `PET_*` variables the operator injects into every replica.
    ///
    /// Malformed values are configuration errors; nothing falls back silently.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_NNODES) {
            let nnodes: NodeCount = raw.parse()?;
            self.min_nodes = nnodes.min_nodes();
            self.max_nodes = nnodes.max_nodes();
        }
        if let Some(raw) = lookup(ENV_NPROC_PER_NODE) {
            self.nproc_per_node = parse_env_u32(ENV_NPROC_PER_NODE, &raw)?;
            if self.nproc_per_node == 0 {
                return Err(Error::configuration(format!("{} must be at least 1", ENV_NPROC_PER_NODE)));
            }
        }
        if let Some(raw) = lookup(ENV_MAX_RESTARTS) {
            self.max_restarts = parse_env_u32(ENV_MAX_RESTARTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MONITOR_INTERVAL) {
            self.monitor_interval = parse_env_u32(ENV_MONITOR_INTERVAL, &raw)?;
        }
        if let Some(endpoint) = lookup(ENV_RDZV_ENDPOINT) {
            self.rdzv_endpoint = endpoint;
        }

        debug!(
            nnodes = %self.nnodes_arg(),
            nproc_per_node = self.nproc_per_node,
            rdzv_endpoint = %self.rdzv_endpoint,
            "Resolved elastic launch"
        );
        Ok(self)
    }

    /// `PET_*` variables describing this launch, for the replica environment
    pub fn pet_env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (ENV_NNODES.to_string(), self.nnodes_arg()),
            (ENV_NPROC_PER_NODE.to_string(), self.nproc_per_node.to_string()),
            (ENV_MAX_RESTARTS.to_string(), self.max_restarts.to_string()),
            (ENV_MONITOR_INTERVAL.to_string(), self.monitor_interval.to_string()),
        ])
    }

    /// Extra environment for the launched processes.
    ///
    /// Mirrors torchrun: `OMP_NUM_THREADS=1` unless already set, when more
    /// than one process shares a node.
    pub fn launch_env<F>(&self, lookup: F) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = BTreeMap::new();
        if self.nproc_per_node > 1 && lookup(ENV_OMP_NUM_THREADS).is_none() {
            env.insert(ENV_OMP_NUM_THREADS.to_string(), "1".to_string());
        }
        env
    }

    /// Arguments for `torchrun`
    pub fn torchrun_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--nnodes={}", self.nnodes_arg()),
            format!("--nproc-per-node={}", self.nproc_per_node),
            format!("--max-restarts={}", self.max_restarts),
            format!("--monitor-interval={}", self.monitor_interval),
            format!("--start-method={}", self.start_method.as_str()),
            format!("--rdzv-backend={}", self.rdzv_backend),
            format!("--rdzv-endpoint={}", self.rdzv_endpoint),
        ];

        if !self.rdzv_configs.is_empty() {
            let conf = self
                .rdzv_configs
                .iter()
                .map(|(key, value)| match value {
                    Value::String(s) => format!("{}={}", key, s),
                    other => format!("{}={}", key, other),
                })
                .collect::<Vec<_>>()
                .join(",");
            args.push(format!("--rdzv-conf={}", conf));
        }

        args
    }
}
