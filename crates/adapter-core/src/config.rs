//! Adapter configuration types

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::Result;

/// Main adapter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Submission settings
    pub submit: SubmitConfig,

    /// Status polling settings
    pub status: StatusConfig,

    /// Defaults applied to generated jobs
    pub job: JobDefaults,
}

impl AdapterConfig {
    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), "Loaded adapter configuration");
        Ok(config)
    }
}

/// Submission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    /// Namespace jobs are created in
    pub namespace: String,

    /// Upper bound for one apply call
    #[serde(with = "millis_serde")]
    pub apply_timeout: Duration,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            apply_timeout: Duration::from_secs(30),
        }
    }
}

/// Status polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Delay between two status polls
    #[serde(with = "millis_serde")]
    pub poll_interval: Duration,

    /// Upper bound for one status request
    #[serde(with = "millis_serde")]
    pub request_timeout: Duration,

    /// Buffered phase reports per watch
    pub channel_capacity: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            channel_capacity: 16,
        }
    }
}

/// Defaults applied to generated jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDefaults {
    /// Image used by roles that do not name one
    pub image: Option<String>,

    /// Rendezvous backend for elastic jobs
    pub rdzv_backend: String,

    /// Allow tasks to mount a memory-backed /dev/shm; tasks may still opt out
    pub increase_shared_mem: bool,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            image: None,
            rdzv_backend: "c10d".to_string(),
            increase_shared_mem: true,
        }
    }
}

/// Duration serialization helper, in milliseconds
mod millis_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
