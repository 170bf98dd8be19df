//! Configuration for the path estimator.

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Estimator settings. All fields have defaults so an empty TOML table is
/// a valid configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct EstimatorConfig {
    /// Maximum memory (MB) the multithreaded path-cost generator may spend
    /// on extra tile-pathfinder instances at load time (default: 512,
    /// clamped to at least 64).
    #[serde(default = "default_max_mem_mb")]
    pub max_pathcosts_memory_mb: usize,

    /// Precompute worker count; 0 means one per logical core (default: 0).
    #[serde(default)]
    pub pathing_thread_count: usize,

    /// Scales the per-tick incremental update budget (default: 1.0).
    #[serde(default = "default_pf_update_rate")]
    pub pf_update_rate: f32,
}

fn default_max_mem_mb() -> usize {
    512
}

fn default_pf_update_rate() -> f32 {
    1.0
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_pathcosts_memory_mb: default_max_mem_mb(),
            pathing_thread_count: 0,
            pf_update_rate: default_pf_update_rate(),
        }
    }
}

impl EstimatorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Memory budget in bytes, with the 64 MB floor applied.
    #[inline]
    pub fn max_mem_bytes(&self) -> usize {
        self.max_pathcosts_memory_mb.max(64) * 1024 * 1024
    }

    /// Effective worker thread count.
    pub fn thread_count(&self) -> usize {
        if self.pathing_thread_count == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.pathing_thread_count
        }
    }
}
