//! Configuration management

mod schema;

pub use schema::{Config, GeneralConfig};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::engine::EngineOptions;
use crate::rules::{RuleSet, SortingRule};

impl Config {
    /// Load configuration from a file or default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

            let config: Config = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config from {}", config_path.display())
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file (with advisory file locking)
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let lock_path = config_path.with_extension("toml.lock");
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        use fs2::FileExt;
        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config file lock")?;

        let result = std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config to {}", config_path.display()));

        let _ = lock_file.unlock();

        result
    }

    /// Get the default config file path
    /// Uses the platform config directory (via dirs::config_dir), falling back to ~/.config
    pub fn default_path() -> Option<PathBuf> {
        let config_base =
            dirs::config_dir().or_else(|| dirs::home_dir().map(|d| d.join(".config")))?;
        Some(config_base.join("sortify").join("config.toml"))
    }

    /// Build the rule set, dropping rules that fail validation
    pub fn rule_set(&self) -> RuleSet {
        let rules = self
            .rules
            .iter()
            .filter_map(
                |rule| match SortingRule::new(&rule.extension, &rule.folder_name) {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        warn!(
                            "Ignoring rule {:?} -> {:?}: {}",
                            rule.extension, rule.folder_name, e
                        );
                        None
                    }
                },
            )
            .collect();

        RuleSet::new(self.enabled, rules)
    }

    /// Replace the stored rules with a rule set (e.g. after editing)
    pub fn set_rule_set(&mut self, rules: &RuleSet) {
        self.enabled = rules.is_enabled();
        self.rules = rules.rules().to_vec();
    }

    /// Engine tunables from the general section
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            lock_grace_period: Duration::from_millis(self.general.lock_grace_period_ms),
            max_concurrent_moves: self.general.max_concurrent_moves.max(1),
            shutdown_timeout: Duration::from_secs(self.general.shutdown_timeout_secs),
        }
    }

    /// Directory to watch, with `~` and variables expanded
    pub fn watch_path(&self) -> Option<PathBuf> {
        self.general
            .watch_path
            .as_deref()
            .map(crate::expand_path)
            .or_else(crate::default_watch_path)
    }
}
