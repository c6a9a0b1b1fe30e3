use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LatencyProfile {
    pub list_leads_ms: u64,
    pub list_opportunities_ms: u64,
    pub update_ms: u64,
    pub convert_ms: u64,
}

impl LatencyProfile {
    pub fn none() -> Self {
        Self {
            list_leads_ms: 0,
            list_opportunities_ms: 0,
            update_ms: 0,
            convert_ms: 0,
        }
    }

    pub fn list_leads(&self) -> Duration {
        Duration::from_millis(self.list_leads_ms)
    }

    pub fn list_opportunities(&self) -> Duration {
        Duration::from_millis(self.list_opportunities_ms)
    }

    pub fn update(&self) -> Duration {
        Duration::from_millis(self.update_ms)
    }

    pub fn convert(&self) -> Duration {
        Duration::from_millis(self.convert_ms)
    }
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            list_leads_ms: 500,
            list_opportunities_ms: 200,
            update_ms: 300,
            convert_ms: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub latency: LatencyProfile,
    pub default_page_size: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database_file: "console.db".to_string(),
            latency: LatencyProfile::default(),
            default_page_size: crate::pagination::DEFAULT_PAGE_SIZE,
        }
    }
}

impl ConsoleConfig {
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => return Err(error.into()),
        };
        let config: Self = serde_json::from_str(&raw).map_err(|error| {
            AppError::Validation(format!("Invalid config {}: {}", path.display(), error))
        })?;
        crate::pagination::validate_page_size(config.default_page_size)?;
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}
