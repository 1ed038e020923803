//! Persisted, per-user telemetry permission (`<config-home>/metrics.json`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const METRICS_FILE_NAME: &str = "metrics.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub enabled: bool,
    pub date: DateTime<Utc>,
}

pub fn metrics_file(config_home: &Path) -> PathBuf {
    config_home.join(METRICS_FILE_NAME)
}

/// Read the metrics file. Missing or unreadable files count as "no decision".
pub fn read(config_home: &Path) -> MetricsConfigFile {
    let path = metrics_file(config_home);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return MetricsConfigFile::default();
    };
    match serde_json::from_str(&content) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "ignoring malformed metrics config");
            MetricsConfigFile::default()
        }
    }
}

/// Persist the user's decision.
pub fn write(config_home: &Path, enabled: bool) -> Result<Permission> {
    std::fs::create_dir_all(config_home)
        .with_context(|| format!("failed to create {}", config_home.display()))?;
    let permission = Permission {
        enabled,
        date: Utc::now(),
    };
    let file = MetricsConfigFile {
        permission: Some(permission.clone()),
    };
    let path = metrics_file(config_home);
    std::fs::write(&path, serde_json::to_string_pretty(&file)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(permission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = TempDir::new().unwrap();
        assert!(read(dir.path()).permission.is_none());
        write(dir.path(), false).unwrap();
        assert_eq!(read(dir.path()).permission.map(|p| p.enabled), Some(false));
    }

    #[test]
    fn test_malformed_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(metrics_file(dir.path()), "{not json").unwrap();
        assert!(read(dir.path()).permission.is_none());
    }
}
