//! Submitter - Orchestrates PyTorchJob submission
//!
//! Ties the pieces together:
//! - **Planning**: elastic mode selection, then job building for multi-node tasks
//! - **Submission**: idempotent apply bounded by a timeout
//! - **Status**: polling and background watches reduced to execution phases
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use adapter_core::{AdapterConfig, RoleSpec, RunPolicy, TaskExecutionId};
//! use cluster::InMemoryCluster;
//! use elastic::{ElasticConfig, ElasticTask};
//! use submitter::JobSubmitter;
//!
//! # async fn example() -> adapter_core::Result<()> {
//! let submitter = JobSubmitter::new(Arc::new(InMemoryCluster::default()), AdapterConfig::default());
//! let task = ElasticTask::new("train", ElasticConfig::new("2:4".parse()?));
//! let exec = TaskExecutionId::new("ml", "dev", "f3a1", "n0", 0);
//!
//! let plan = submitter.plan(&task, &exec, &RoleSpec::default().with_image("trainer:1.0"))?;
//! let outcome = submitter.submit(&plan).await?;
//! if let Some(job_id) = outcome.job_id() {
//!     let report = submitter.poll(job_id, &RunPolicy::default()).await;
//!     println!("{}: {:?}", report.phase, report.message);
//! }
//! # Ok(())
//! # }
//! ```

mod plan;
mod service;
mod watch;

pub use plan::{Planner, SubmissionPlan, TaskDeclaration};
pub use service::{JobSubmitter, SubmitOutcome};
pub use watch::{shutdown_channel, ShutdownReceiver, ShutdownSender};
