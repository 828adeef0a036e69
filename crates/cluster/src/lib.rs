//! Cluster - Pluggable backends for submitting PyTorchJobs
//!
//! Provides the boundary between the adapter and the cluster:
//! - In-memory cluster for tests and local simulation (default feature)
//! - Kubernetes API server (with `kube` feature)
//!
//! # Example
//!
//! ```no_run
//! use adapter_core::{RoleSpec, TaskExecutionId};
//! use cluster::{ApplyOutcome, ClusterBackend, InMemoryCluster};
//! use job_spec::JobSpecBuilder;
//!
//! # async fn example() -> adapter_core::Result<()> {
//! let cluster = InMemoryCluster::new("training");
//! let submission = JobSpecBuilder::new(TaskExecutionId::new("ml", "dev", "f3a1", "n0", 0))
//!     .default_image("trainer:1.0")
//!     .role("worker", RoleSpec::new(2))
//!     .build()?;
//!
//! assert_eq!(cluster.apply(&submission).await?, ApplyOutcome::Created);
//! let status = cluster.get_status(submission.id()).await?;
//! # Ok(())
//! # }
//! ```

mod backend;

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "kube")]
mod kubernetes;

pub use backend::{reconcile_existing, ApplyOutcome, ClusterBackend};

#[cfg(feature = "memory")]
pub use memory::{InMemoryCluster, StoredJob};

#[cfg(feature = "kube")]
pub use kubernetes::KubeCluster;
