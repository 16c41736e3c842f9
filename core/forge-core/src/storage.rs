//! Storage configuration and path management for SkillForge clients.
//!
//! All on-disk locations live here so tests can point a whole client at a
//! temp directory with `StorageConfig::with_root()`.
//!
//! ```text
//! ~/.skillforge/
//! ├── local-storage.json   key-value slot (auth token, last route)
//! ├── client.toml          client configuration
//! └── logs/                rolling client logs
//! ```

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{ForgeError, Result};

/// Overrides the storage root (used by the CLI and integration tests).
pub const HOME_ENV: &str = "SKILLFORGE_HOME";

const ROOT_DIR_NAME: &str = ".skillforge";

/// Central configuration for all SkillForge storage paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the root from `SKILLFORGE_HOME`, falling back to `~/.skillforge`.
    pub fn resolve() -> Result<Self> {
        if let Some(root) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }
        let home = dirs::home_dir().ok_or(ForgeError::HomeDirNotFound)?;
        Ok(Self::with_root(home.join(ROOT_DIR_NAME)))
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to local-storage.json (persistent key-value slot).
    pub fn local_storage_file(&self) -> PathBuf {
        self.root.join("local-storage.json")
    }

    /// Path to client.toml (client preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("client.toml")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directories
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory and standard subdirectories exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs_err::create_dir_all(&self.root)
            .map_err(|err| ForgeError::io("create storage root", err))?;
        fs_err::create_dir_all(self.logs_dir())
            .map_err(|err| ForgeError::io("create logs directory", err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_with_root_sets_custom_path() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/test-skillforge"));
        assert_eq!(config.root(), Path::new("/tmp/test-skillforge"));
    }

    #[test]
    fn test_file_paths_live_under_root() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/skillforge"));
        assert_eq!(
            config.local_storage_file(),
            PathBuf::from("/tmp/skillforge/local-storage.json")
        );
        assert_eq!(
            config.config_file(),
            PathBuf::from("/tmp/skillforge/client.toml")
        );
        assert_eq!(config.logs_dir(), PathBuf::from("/tmp/skillforge/logs"));
    }

    #[test]
    fn test_ensure_dirs_creates_structure() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::with_root(temp.path().join("skillforge"));

        config.ensure_dirs().unwrap();

        assert!(config.root().exists());
        assert!(config.logs_dir().exists());
    }

    #[test]
    fn test_ensure_dirs_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::with_root(temp.path().to_path_buf());

        config.ensure_dirs().unwrap();
        config.ensure_dirs().unwrap();

        assert!(config.logs_dir().exists());
    }
}
