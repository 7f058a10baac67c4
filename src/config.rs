use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use strata_runtime::SchedulerConfig;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub sim: SimConfig,
}

// Synthetic world used to drive the scheduler without a renderer
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Visible chunks form a square of `2 * radius + 1` columns around the origin.
    pub radius: i32,
    pub chunk_size: u32,
    /// Simulated mesh build time per chunk.
    pub work_ms: u64,
    /// Ticks between synthetic block edits. Zero disables edits.
    pub edit_every: u64,
    /// Every n-th slot is reported as unloaded. Zero keeps all slots loaded.
    pub unloaded_every: usize,
    /// Player movement along +x per tick, in blocks.
    pub player_speed: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            radius: 4,
            chunk_size: 16,
            work_ms: 4,
            edit_every: 5,
            unloaded_every: 7,
            player_speed: 0.5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
