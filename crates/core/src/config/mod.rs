//! Configuration for the dispatchq runtime
//!
//! Settings for the process-wide queues live in a TOML file:
//! - Type-safe config struct via serde
//! - Auto-generation of a default file
//! - Manual reload capability
//!
//! # Example
//!
//! ```toml
//! version = 1
//! global_label = "dispatchq.global"
//! global_workers = 4
//! reentrancy_check = true
//! ```

mod loader;

use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use loader::{config_path_from_env, CONFIG_ENV_VAR};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Label of the global concurrent queue (worker threads are `{label}-{n}`)
    pub global_label: String,

    /// Worker threads for the global queue, 0 = one per available core
    pub global_workers: usize,

    /// Fail fast on synchronous dispatch that would deadlock
    pub reentrancy_check: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            global_label: "dispatchq.global".to_string(),
            global_workers: 0,
            reentrancy_check: cfg!(debug_assertions),
        }
    }
}

impl CoreConfig {
    /// Load config from file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!("Loaded core config from {:?}", path);
        Ok(config)
    }

    /// Load config from file, creating default if missing.
    pub fn load_or_create(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            Self::load(path)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default core config at {:?}", path);
            Ok(default)
        }
    }

    /// Load the file named by `DISPATCHQ_CONFIG`, or defaults when unset.
    pub fn from_env() -> ConfigResult<Self> {
        match config_path_from_env() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Save config to file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved core config to {:?}", path);
        Ok(())
    }

    /// Reload config from file.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        *self = Self::load(path)?;
        Ok(())
    }

    /// Worker count for the global queue with the 0 = auto rule applied
    pub fn resolved_global_workers(&self) -> usize {
        if self.global_workers > 0 {
            self.global_workers
        } else {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

    // Unique per test so parallel tests never share a file
    fn scratch_path(name: &str) -> PathBuf {
        let n = TEST_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir()
            .join(format!("dispatchq-test-{}-{}", std::process::id(), n))
            .join(name)
    }

    #[test]
    fn test_core_config_default() {
        let config = CoreConfig::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.global_label, "dispatchq.global");
        assert_eq!(config.global_workers, 0);
        assert_eq!(config.reentrancy_check, cfg!(debug_assertions));
    }

    #[test]
    fn test_core_config_serialize() {
        let config = CoreConfig {
            global_workers: 8,
            reentrancy_check: true,
            ..CoreConfig::default()
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("global_workers = 8"));
        assert!(toml_str.contains("reentrancy_check = true"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: CoreConfig = toml::from_str("global_workers = 3").unwrap();
        assert_eq!(config.global_workers, 3);
        assert_eq!(config.global_label, "dispatchq.global");
        assert_eq!(config.version, 1);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let path = scratch_path("core.toml");
        assert!(!path.exists());

        let created = CoreConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, CoreConfig::default());

        let loaded = CoreConfig::load(&path).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let path = scratch_path("core.toml");
        let mut config = CoreConfig::load_or_create(&path).unwrap();

        std::fs::write(&path, "global_label = \"workers\"\nglobal_workers = 2\n").unwrap();
        config.reload(&path).unwrap();

        assert_eq!(config.global_label, "workers");
        assert_eq!(config.global_workers, 2);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let path = scratch_path("broken.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "global_workers = \"many\"").unwrap();

        assert!(matches!(CoreConfig::load(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_resolved_global_workers() {
        let fixed = CoreConfig {
            global_workers: 5,
            ..CoreConfig::default()
        };
        assert_eq!(fixed.resolved_global_workers(), 5);
        assert!(CoreConfig::default().resolved_global_workers() >= 1);
    }
}
