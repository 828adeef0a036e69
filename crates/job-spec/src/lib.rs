//! Job Spec Builder for Kubeflow PyTorchJobs
//!
//! Converts a role-based training job declaration into a single
//! `PyTorchJob` custom resource:
//! - **Validation** of replica counts and required roles before any cluster call
//! - **Explicit defaults** (restart policy `Never`) written into the resource
//! - **Stable identity**: a DNS-1123 job name derived from the task execution
//!   and a content hash for idempotent re-submission
//!
//! # Example
//!
//! ```rust
//! use adapter_core::{RoleSpec, TaskExecutionId};
//! use job_spec::JobSpecBuilder;
//!
//! let exec = TaskExecutionId::new("ml", "dev", "f3a1", "n0", 0);
//! let submission = JobSpecBuilder::new(exec)
//!     .role("master", RoleSpec::new(1).with_image("trainer:1.0"))
//!     .role("worker", RoleSpec::new(3).with_image("trainer:1.0"))
//!     .require_role("worker")
//!     .build()
//!     .unwrap();
//!
//! let job = submission.to_resource("training");
//! assert_eq!(job.spec.pytorch_replica_specs["Worker"].replicas, Some(3));
//! ```

mod builder;
mod elastic_job;
mod naming;
mod pytorch;
mod render;
pub mod resource;

pub use builder::{JobSpecBuilder, JobSubmission, ResolvedRole};
pub use elastic_job::elastic_builder;
pub use naming::{job_name, role_key, validate_label};
pub use pytorch::{MasterConfig, PyTorchConfig, WorkerConfig};
pub use render::{CONTAINER_NAME, CONTENT_HASH_ANNOTATION, EXECUTION_ANNOTATION};
pub use resource::{ElasticPolicy, PyTorchJob, PyTorchJobSpec, PyTorchJobStatus};
