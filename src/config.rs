use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, Result};
use crate::paths::DataPaths;

/// Environment variable that relocates the assistant's data directory.
pub const DATA_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    64 * 1024
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub reader: ReaderConfig,
}

impl Config {
    /// Load a YAML or JSON config file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| HistoryError::io(path, e))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| HistoryError::Config(format!("{}: {e}", path.display())))
    }

    /// Configured `data_dir`, else `$CLAUDE_CONFIG_DIR`, else `~/.claude`.
    pub fn data_root(&self) -> PathBuf {
        self.data_root_with(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
    }

    fn data_root_with(&self, env_dir: Option<PathBuf>) -> PathBuf {
        self.data_dir
            .clone()
            .or(env_dir.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(DataPaths::default_root)
    }

    pub fn data_paths(&self) -> DataPaths {
        DataPaths::new(self.data_root())
    }
}
