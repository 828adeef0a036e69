//! Job rendering Python bindings

use adapter_core::AdapterConfig;
use pyo3::prelude::*;
use submitter::{Planner, SubmissionPlan, TaskDeclaration};
use tracing::debug;

use crate::to_py_err;

fn parse<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> PyResult<T> {
    serde_json::from_str(raw).map_err(|e| {
        pyo3::exceptions::PyValueError::new_err(format!("Invalid {}: {}", what, e))
    })
}

/// Render the `PyTorchJob` manifest of a task declaration as JSON.
///
/// Returns `None` when the task runs as a single process.
#[pyfunction]
#[pyo3(signature = (task_json, config_json=None))]
pub fn render_elastic_job(task_json: &str, config_json: Option<&str>) -> PyResult<Option<String>> {
    let declaration: TaskDeclaration = parse(task_json, "task declaration")?;
    let config: AdapterConfig = match config_json {
        Some(raw) => parse(raw, "adapter config")?,
        None => AdapterConfig::default(),
    };

    let plan = Planner::new(config.job)
        .plan_declaration(&declaration)
        .map_err(to_py_err)?;

    match plan {
        SubmissionPlan::SingleProcess => {
            debug!(task = %declaration.name, "Single-process task, nothing to render");
            Ok(None)
        }
        SubmissionPlan::Distributed(submission) => {
            let job = submission.to_resource(&config.submit.namespace);
            let manifest = serde_json::to_string(&job)
                .map_err(|e| to_py_err(adapter_core::Error::from(e)))?;
            Ok(Some(manifest))
        }
    }
}
