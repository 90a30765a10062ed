//! Configuration schema

use crate::rules::{RuleSet, SortingRule};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Master switch for sorting
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Extension rules, first match wins
    #[serde(default = "default_rules", rename = "rule")]
    pub rules: Vec<SortingRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            general: GeneralConfig::default(),
            rules: default_rules(),
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path to log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Directory to watch (defaults to the platform downloads folder)
    #[serde(default)]
    pub watch_path: Option<PathBuf>,

    /// Milliseconds to wait before moving a new file
    #[serde(default = "default_lock_grace_period")]
    pub lock_grace_period_ms: u64,

    /// Maximum number of files handled at once
    #[serde(default = "default_max_concurrent_moves")]
    pub max_concurrent_moves: usize,

    /// Seconds to wait for in-flight moves on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Sort files already in the watch folder when starting
    #[serde(default)]
    pub sort_existing_on_start: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
            watch_path: None,
            lock_grace_period_ms: default_lock_grace_period(),
            max_concurrent_moves: default_max_concurrent_moves(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            sort_existing_on_start: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_rules() -> Vec<SortingRule> {
    RuleSet::with_defaults().rules().to_vec()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lock_grace_period() -> u64 {
    500
}

fn default_max_concurrent_moves() -> usize {
    4
}

fn default_shutdown_timeout() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.rules.len(), 12);
        assert_eq!(config.general.lock_grace_period_ms, 500);
        assert!(config.general.watch_path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            enabled = false

            [general]
            log_level = "debug"
            watch_path = "~/Downloads"
            lock_grace_period_ms = 0
            max_concurrent_moves = 1
            sort_existing_on_start = true

            [[rule]]
            extension = ".pdf"
            folder = "Documents"

            [[rule]]
            extension = "mp3"
            folder = "Music"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.lock_grace_period_ms, 0);
        assert_eq!(config.general.max_concurrent_moves, 1);
        assert!(config.general.sort_existing_on_start);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[1].folder_name, "Music");
    }

    #[test]
    fn test_roundtrip_default() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.rules, Config::default().rules);
    }
}
