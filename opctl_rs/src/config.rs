//! Project configuration support.
//!
//! Loads an optional `opctl.toml` (or the file named by `--config`). The
//! dispatch core only needs a best-effort snapshot: whether metrics may be
//! sent and whether the project serves static assets.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::env::EnvStore;

/// File name searched for when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "opctl.toml";

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Explicit opt-in/out of usage metrics for this project
    pub send_metrics: Option<bool>,
    pub assets: AssetsConfig,
}

/// Static assets configuration
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub directory: Option<String>,
}

/// A parsed config together with where it came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    pub config: ProjectConfig,
    pub path: Option<PathBuf>,
}

impl ProjectConfig {
    /// Read the project config.
    ///
    /// An explicit path must exist and parse. Without one, `opctl.toml` is
    /// looked up from `cwd` upwards; no file at all yields the defaults.
    pub fn read(explicit: Option<&Path>, cwd: &Path) -> Result<ConfigSnapshot> {
        let path = match explicit {
            Some(path) => Some(cwd.join(path)),
            None => find_config(cwd),
        };
        let Some(path) = path else {
            return Ok(ConfigSnapshot::default());
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(ConfigSnapshot {
            config,
            path: Some(path),
        })
    }

    pub fn has_assets(&self) -> bool {
        self.assets.directory.is_some()
    }
}

fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Per-user state directory (`OPCTL_CONFIG_HOME` overrides).
pub fn config_home(env: &dyn EnvStore) -> PathBuf {
    if let Some(dir) = env.get("OPCTL_CONFIG_HOME") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("opctl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_returns_default() {
        let dir = TempDir::new().unwrap();
        let snapshot = ProjectConfig::read(None, dir.path()).unwrap();
        assert!(snapshot.path.is_none());
        assert!(snapshot.config.send_metrics.is_none());
        assert!(!snapshot.config.has_assets());
    }

    #[test]
    fn test_finds_config_in_parent_directory() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(file, "send_metrics = false\n\n[assets]\ndirectory = \"./public\"").unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let snapshot = ProjectConfig::read(None, &nested).unwrap();
        assert_eq!(snapshot.config.send_metrics, Some(false));
        assert!(snapshot.config.has_assets());
        assert_eq!(snapshot.path, Some(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::read(Some(Path::new("missing.toml")), dir.path()).is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.toml"), "send_metrics = [").unwrap();
        let err = ProjectConfig::read(Some(Path::new("bad.toml")), dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"));
    }
}
