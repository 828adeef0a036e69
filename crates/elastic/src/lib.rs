//! Elastic mode selection for distributed PyTorch tasks
//!
//! This crate decides, before anything is submitted, whether a task runs as
//! a plain single process or as a multi-node torch elastic job:
//! - **Node counts** parsed from `2`, `"2"` or `"1:4"` ranges
//! - **Mode selection** yielding the task-type tag and the resolved launch
//! - **Launch resolution** with `PET_*` environment overrides
//! - **Task overrides** replacing the whole config of a task instance
//!
//! # Example
//!
//! ```rust
//! use elastic::{ElasticConfig, ElasticModeSelector, ElasticTask, NodeCount};
//! use adapter_core::TaskType;
//!
//! let selector = ElasticModeSelector::default();
//! let task = ElasticTask::new("train", ElasticConfig::new(NodeCount::fixed(2).unwrap()));
//! assert_eq!(task.task_type(&selector).unwrap(), TaskType::Distributed);
//!
//! let task = task.with_overrides(ElasticConfig::new("1".parse().unwrap()));
//! assert_eq!(task.task_type(&selector).unwrap(), TaskType::SingleProcess);
//! ```

mod config;
mod launch;
mod node_count;
mod selector;
mod task;

pub use config::{ElasticConfig, StartMethod};
pub use launch::{ElasticLaunch, DEFAULT_RDZV_ENDPOINT};
pub use node_count::NodeCount;
pub use selector::{ElasticModeSelector, ModeDecision};
pub use task::ElasticTask;
