//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum chunk payload size in bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
    /// Maximum chunk count per session. Caps both chunk indices and the
    /// declared total at finalize.
    #[serde(default = "default_max_chunks_per_session")]
    pub max_chunks_per_session: u32,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// When enabled, ensure the endpoint is network-restricted to authorized
    /// scraper IPs at the infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_chunk_size() -> u64 {
    crate::DEFAULT_MAX_CHUNK_SIZE
}

fn default_max_chunks_per_session() -> u32 {
    crate::DEFAULT_MAX_CHUNKS_PER_SESSION
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_chunk_size: default_max_chunk_size(),
            max_chunks_per_session: default_max_chunks_per_session(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for chunk payloads and published artifacts.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

/// Idle-session sweep configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Enable the background sweeper (default: true).
    #[serde(default = "default_sweep_enabled")]
    pub enabled: bool,
    /// Interval in seconds between sweep passes.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
    /// Sessions with no chunk activity for this many seconds are
    /// eligible for automatic cancellation.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_sweep_enabled() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_idle_timeout_secs() -> u64 {
    3600 // 1 hour
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweep_enabled(),
            interval_secs: default_sweep_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl SweepConfig {
    /// Get the sweep interval as a std::time::Duration.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    /// Get the idle timeout as a time::Duration.
    pub fn idle_timeout(&self) -> time::Duration {
        let secs = i64::try_from(self.idle_timeout_secs).unwrap_or(i64::MAX);
        time::Duration::seconds(secs)
    }

    /// Validate sweep configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        // A zero interval would panic when creating the sweep timer.
        if self.enabled && self.interval_secs == 0 {
            return Err(
                "sweep.interval_secs cannot be 0; use a value >= 1 second".to_string(),
            );
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Idle-session sweep configuration.
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage under ./data and the
    /// sweeper disabled so tests control reclamation explicitly.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            sweep: SweepConfig {
                enabled: false,
                ..Default::default()
            },
        }
    }
}
