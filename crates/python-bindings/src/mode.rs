//! Elastic mode selection Python bindings

use elastic::{ElasticConfig, ElasticModeSelector, NodeCount};
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use std::collections::BTreeMap;

use crate::to_py_err;

/// Launch parameters of a multi-node task, resolved inside a replica
#[pyclass]
#[derive(Clone)]
pub struct LaunchPlan {
    /// Minimum node count
    #[pyo3(get)]
    pub min_nodes: u32,

    /// Maximum node count
    #[pyo3(get)]
    pub max_nodes: u32,

    /// Worker processes per node
    #[pyo3(get)]
    pub nproc_per_node: u32,

    /// Rendezvous endpoint
    #[pyo3(get)]
    pub rdzv_endpoint: String,

    /// Arguments for `torchrun`
    #[pyo3(get)]
    pub args: Vec<String>,

    /// Extra environment for the launched processes
    #[pyo3(get)]
    pub env: BTreeMap<String, String>,
}

#[pymethods]
impl LaunchPlan {
    fn __repr__(&self) -> String {
        format!(
            "LaunchPlan(nnodes='{}:{}', nproc_per_node={}, rdzv_endpoint='{}')",
            self.min_nodes, self.max_nodes, self.nproc_per_node, self.rdzv_endpoint
        )
    }
}

fn node_count(nnodes: &Bound<'_, PyAny>) -> PyResult<NodeCount> {
    if let Ok(value) = nnodes.extract::<i64>() {
        return NodeCount::try_from(value).map_err(to_py_err);
    }
    if let Ok(value) = nnodes.extract::<String>() {
        return value.parse().map_err(to_py_err);
    }
    Err(PyTypeError::new_err("nnodes must be an int or a string"))
}

fn config(nnodes: &Bound<'_, PyAny>, nproc_per_node: u32, max_restarts: u32) -> PyResult<ElasticConfig> {
    Ok(ElasticConfig::new(node_count(nnodes)?)
        .with_nproc_per_node(nproc_per_node)
        .with_max_restarts(max_restarts))
}

/// Task-type tag for an elastic config: "python-task" or "pytorch"
#[pyfunction]
#[pyo3(signature = (nnodes, nproc_per_node=1))]
pub fn select_task_type(nnodes: &Bound<'_, PyAny>, nproc_per_node: u32) -> PyResult<String> {
    let decision = ElasticModeSelector::default()
        .select(&config(nnodes, nproc_per_node, 0)?)
        .map_err(to_py_err)?;
    Ok(decision.task_type().tag().to_string())
}

/// Resolve the launch of a multi-node task; `None` for single-node tasks.
///
/// With `from_env`, the `PET_*` variables injected by the operator
/// override the static values.
#[pyfunction]
#[pyo3(signature = (nnodes, nproc_per_node=1, max_restarts=0, from_env=true))]
pub fn resolve_launch(
    nnodes: &Bound<'_, PyAny>,
    nproc_per_node: u32,
    max_restarts: u32,
    from_env: bool,
) -> PyResult<Option<LaunchPlan>> {
    let decision = ElasticModeSelector::default()
        .select(&config(nnodes, nproc_per_node, max_restarts)?)
        .map_err(to_py_err)?;
    let Some(launch) = decision.launch().cloned() else {
        return Ok(None);
    };

    let env_lookup = |name: &str| if from_env { std::env::var(name).ok() } else { None };
    let launch = launch.with_env_overrides(env_lookup).map_err(to_py_err)?;

    Ok(Some(LaunchPlan {
        min_nodes: launch.min_nodes,
        max_nodes: launch.max_nodes,
        nproc_per_node: launch.nproc_per_node,
        rdzv_endpoint: launch.rdzv_endpoint.clone(),
        args: launch.torchrun_args(),
        env: launch.launch_env(env_lookup),
    }))
}
