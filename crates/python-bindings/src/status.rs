//! Status interpretation Python bindings

use adapter_core::{PhaseReport, RunPolicy, StatusSnapshot};
use job_spec::PyTorchJobStatus;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// Execution phase derived from a status snapshot
#[pyclass]
#[derive(Clone)]
pub struct PhaseResult {
    /// "Queued", "Running", "Succeeded", "Failed" or "Unknown"
    #[pyo3(get)]
    pub phase: String,

    /// Detail from the triggering role or condition
    #[pyo3(get)]
    pub message: Option<String>,

    is_terminal: bool,
}

#[pymethods]
impl PhaseResult {
    fn __repr__(&self) -> String {
        match &self.message {
            Some(message) => format!("PhaseResult(phase='{}', message='{}')", self.phase, message),
            None => format!("PhaseResult(phase='{}')", self.phase),
        }
    }

    /// Whether the phase is final
    #[getter]
    fn is_terminal(&self) -> bool {
        self.is_terminal
    }
}

impl From<PhaseReport> for PhaseResult {
    fn from(report: PhaseReport) -> Self {
        Self {
            phase: report.phase.as_str().to_string(),
            message: report.message,
            is_terminal: report.phase.is_terminal(),
        }
    }
}

fn run_policy(backoff_limit: Option<u32>) -> RunPolicy {
    RunPolicy {
        backoff_limit,
        ..Default::default()
    }
}

/// Interpret a serialized status snapshot
#[pyfunction]
#[pyo3(signature = (snapshot_json, backoff_limit=None))]
pub fn interpret_status(snapshot_json: &str, backoff_limit: Option<u32>) -> PyResult<PhaseResult> {
    let snapshot: StatusSnapshot = serde_json::from_str(snapshot_json)
        .map_err(|e| PyValueError::new_err(format!("Invalid status snapshot: {}", e)))?;
    Ok(job_status::interpret(&snapshot, &run_policy(backoff_limit)).into())
}

/// Interpret the `status` field of a `PyTorchJob` as written by the operator
#[pyfunction]
#[pyo3(signature = (job_id, status_json=None, backoff_limit=None))]
pub fn interpret_operator_status(
    job_id: &str,
    status_json: Option<&str>,
    backoff_limit: Option<u32>,
) -> PyResult<PhaseResult> {
    let status: Option<PyTorchJobStatus> = status_json
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| PyValueError::new_err(format!("Invalid PyTorchJob status: {}", e)))?;
    let snapshot = job_status::snapshot_from_status(job_id, status.as_ref());
    Ok(job_status::interpret(&snapshot, &run_policy(backoff_limit)).into())
}
