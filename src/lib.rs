//! Sortify - background downloads sorter
//!
//! Watches one directory and moves each new file into a subfolder chosen by
//! its extension.

pub mod config;
pub mod engine;
pub mod rules;
pub mod watcher;

pub use config::Config;
pub use engine::{EngineOptions, Outcome, SkipReason, SortEngine};
pub use rules::{RuleSet, SharedRuleSet, SortingRule};
pub use watcher::{EventSource, FileEvent, FileEventKind, Watcher};

/// Current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The platform downloads folder, falling back to `~/Downloads`
pub fn default_watch_path() -> Option<std::path::PathBuf> {
    dirs::download_dir().or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
}

/// Expand ~ and environment variables ($VAR, ${VAR}) in a path
pub fn expand_path(path: &std::path::Path) -> std::path::PathBuf {
    let path_str = path.to_string_lossy();

    let expanded = match path_str.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => format!("{}{}", home.to_string_lossy(), rest),
            None => path_str.to_string(),
        },
        _ => path_str.to_string(),
    };

    use std::sync::LazyLock;
    static ENV_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("invalid env regex")
    });

    let result = ENV_RE.replace_all(&expanded, |caps: &regex::Captures| {
        let var_name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    });

    std::path::PathBuf::from(result.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_expand_home() {
        let expanded = expand_path(Path::new("~/Downloads"));
        if dirs::home_dir().is_some() {
            assert!(!expanded.to_string_lossy().starts_with('~'));
            assert!(expanded.ends_with("Downloads"));
        }
    }

    #[test]
    fn test_expand_leaves_unknown_vars() {
        let expanded = expand_path(Path::new("/data/$SORTIFY_SURELY_UNSET_VAR/in"));
        assert_eq!(expanded, Path::new("/data/$SORTIFY_SURELY_UNSET_VAR/in"));
    }

    #[test]
    fn test_expand_tilde_user_untouched() {
        assert_eq!(expand_path(Path::new("~bob/x")), Path::new("~bob/x"));
    }
}
