//! Configuration loader with tier-based merging.
//!
//! Tiers, lowest to highest priority: embedded defaults, project
//! (`./task-view/config.yaml`), user (`<config dir>/task-view/config.yaml`),
//! then environment variables. YAML documents are merged field by field.

use super::types::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file (overrides all tiers).
pub const CONFIG_PATH_ENV: &str = "TASK_VIEW_CONFIG_PATH";
pub const CACHE_TTL_ENV: &str = "TASK_VIEW_CACHE_TTL_MS";
pub const BATCH_SIZE_ENV: &str = "TASK_VIEW_BATCH_SIZE";

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover the standard project and user directories.
    pub fn discover() -> Self {
        Self {
            project_dir: Some(PathBuf::from("task-view")),
            user_dir: dirs::config_dir().map(|d| d.join("task-view")),
        }
    }
}

/// Loads and merges configuration tiers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Files that contributed to the merged configuration.
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Load from the standard locations.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load with explicit tier directories.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(explicit);
            let mut config = Config::load(&path)?;
            apply_env_overrides(&mut config);
            return Ok(Self {
                paths,
                config,
                sources: vec![path],
            });
        }

        let mut layers = vec![serde_json::to_value(Config::default())?];
        let mut sources = Vec::new();

        let tier_dirs = [paths.project_dir.as_deref(), paths.user_dir.as_deref()];
        for dir in tier_dirs.into_iter().flatten() {
            let file = dir.join("config.yaml");
            match read_layer(&file) {
                Ok(Some(layer)) => {
                    debug!("Loaded config layer {}", file.display());
                    layers.push(layer);
                    sources.push(file);
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable config {}: {}", file.display(), e),
            }
        }

        let merged = layers.into_iter().fold(Value::Null, merge_values);
        let mut config: Config = serde_json::from_value(merged)?;
        apply_env_overrides(&mut config);
        config.validate()?;

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

impl Config {
    /// Load from the standard tiers, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        match ConfigLoader::load() {
            Ok(loader) => loader.into_config(),
            Err(e) => {
                warn!("Falling back to default configuration: {}", e);
                let mut config = Config::default();
                apply_env_overrides(&mut config);
                config
            }
        }
    }
}

fn read_layer(file: &Path) -> Result<Option<Value>> {
    if !file.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(file)?;
    Ok(Some(serde_yaml::from_str::<Value>(&content)?))
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(ttl) = std::env::var(CACHE_TTL_ENV)
        && let Ok(ttl) = ttl.parse()
    {
        config.engine.cache_ttl_ms = ttl;
    }

    if let Ok(size) = std::env::var(BATCH_SIZE_ENV)
        && let Ok(size) = size.parse::<usize>()
        && size > 0
    {
        config.engine.batch_size = size;
    }
}

/// Merge `overlay` onto `base`. Maps merge key by key, a null overlay keeps
/// the base, anything else (including lists) replaces it.
fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(layer)) => {
            for (key, value) in layer {
                let next = match merged.remove(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverduePolicy;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_merge_values_nested() {
        let base = json!({"engine": {"batch_size": 50, "optimize": true}, "statuses": [1, 2]});
        let overlay = json!({"engine": {"batch_size": 5}, "statuses": [3]});
        let merged = merge_values(base, overlay);
        assert_eq!(
            merged,
            json!({"engine": {"batch_size": 5, "optimize": true}, "statuses": [3]})
        );
    }

    #[test]
    fn test_merge_null_keeps_base() {
        assert_eq!(merge_values(json!(1), Value::Null), json!(1));
    }

    #[test]
    fn test_user_tier_overrides_project_tier() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        std::fs::write(
            project.path().join("config.yaml"),
            "engine:\n  batch_size: 20\n  overdue_policy: include_completed\n",
        )
        .unwrap();
        std::fs::write(user.path().join("config.yaml"), "engine:\n  batch_size: 7\n").unwrap();

        let loader = ConfigLoader::load_with_paths(ConfigPaths {
            project_dir: Some(project.path().to_path_buf()),
            user_dir: Some(user.path().to_path_buf()),
        })
        .unwrap();

        let config = loader.config();
        assert_eq!(config.engine.overdue_policy, OverduePolicy::IncludeCompleted);
        assert_eq!(loader.sources().len(), 2);
        if std::env::var(BATCH_SIZE_ENV).is_err() {
            assert_eq!(config.engine.batch_size, 7);
        }
    }

    #[test]
    fn test_missing_tiers_yield_defaults() {
        let empty = TempDir::new().unwrap();
        let loader = ConfigLoader::load_with_paths(ConfigPaths {
            project_dir: Some(empty.path().join("missing")),
            user_dir: None,
        })
        .unwrap();
        assert!(loader.sources().is_empty());
        assert_eq!(loader.config().statuses, Config::default().statuses);
    }
}
