//! Python bindings for the PyTorchJob submission adapter
//!
//! This crate provides PyO3 bindings exposing the adapter to the Python
//! host framework, including:
//!
//! - `select_task_type` / `resolve_launch`: elastic mode selection
//! - `render_elastic_job`: task declaration to `PyTorchJob` manifest
//! - `interpret_status` / `interpret_operator_status`: status to execution phase
//!
//! # Example
//!
//! ```python
//! from torchjob import select_task_type, interpret_status
//!
//! select_task_type("1:1")          # "python-task"
//! select_task_type(2, 8)           # "pytorch"
//!
//! result = interpret_status(snapshot_json, backoff_limit=3)
//! result.phase                     # "Running"
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

mod job;
mod mode;
mod status;

/// Map adapter errors onto Python exceptions
pub(crate) fn to_py_err(err: adapter_core::Error) -> PyErr {
    match err {
        adapter_core::Error::Configuration { .. } | adapter_core::Error::Serialization(_) => {
            PyValueError::new_err(err.to_string())
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

/// Python module for the PyTorchJob submission adapter
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Register classes
    m.add_class::<mode::LaunchPlan>()?;
    m.add_class::<status::PhaseResult>()?;

    // Register functions
    m.add_function(wrap_pyfunction!(mode::select_task_type, m)?)?;
    m.add_function(wrap_pyfunction!(mode::resolve_launch, m)?)?;
    m.add_function(wrap_pyfunction!(job::render_elastic_job, m)?)?;
    m.add_function(wrap_pyfunction!(status::interpret_status, m)?)?;
    m.add_function(wrap_pyfunction!(status::interpret_operator_status, m)?)?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
