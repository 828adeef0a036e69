//! Tracing setup shared by the binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{Error, Result};

/// Install a global fmt subscriber; `RUST_LOG` wins over `default_filter`
pub fn init_tracing(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Internal {
            message: format!("Failed to install tracing subscriber: {}", e),
        })
}
