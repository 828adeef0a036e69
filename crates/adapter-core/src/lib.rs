//! Adapter Core - Foundation for the PyTorchJob submission adapter
//!
//! Provides the shared role/policy types, status snapshot model, error
//! handling and configuration used by the selector, builder, interpreter
//! and cluster crates.

pub mod config;
pub mod error;
pub mod status;
pub mod telemetry;
pub mod types;

pub use config::AdapterConfig;
pub use error::{Error, Result};
pub use status::*;
pub use types::*;
