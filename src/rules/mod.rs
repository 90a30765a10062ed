//! Sorting rules - extension to folder mappings

pub mod action;
mod set;
mod shared;

pub use action::SortError;
pub use set::RuleSet;
pub use shared::SharedRuleSet;

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use thiserror::Error;

/// Errors raised when building a rule from user input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("extension must not be empty")]
    EmptyExtension,

    #[error("folder name must not be empty")]
    EmptyFolder,

    #[error("folder '{0}' must be a relative path inside the watched directory")]
    FolderOutsideRoot(String),
}

/// Maps one file extension to the subfolder its files are moved into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortingRule {
    /// Extension including the leading dot, e.g. ".pdf" (matched case-insensitively)
    pub extension: String,

    /// Subfolder name, relative to the watched directory
    #[serde(rename = "folder")]
    pub folder_name: String,
}

impl SortingRule {
    /// Create a validated rule.
    ///
    /// Both fields are trimmed and a missing leading dot is added to the
    /// extension, so `"pdf"` and `".pdf"` produce the same rule.
    pub fn new(
        extension: impl AsRef<str>,
        folder_name: impl AsRef<str>,
    ) -> Result<Self, RuleError> {
        let extension = extension.as_ref().trim();
        let folder_name = folder_name.as_ref().trim();

        if extension.is_empty() || extension == "." {
            return Err(RuleError::EmptyExtension);
        }
        if folder_name.is_empty() {
            return Err(RuleError::EmptyFolder);
        }

        // Must name a real subfolder: no `..`, no absolute paths, not the root itself
        let components: Vec<Component> = Path::new(folder_name).components().collect();
        let escapes_root = components
            .iter()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        let names_subfolder = components.iter().any(|c| matches!(c, Component::Normal(_)));
        if escapes_root || !names_subfolder {
            return Err(RuleError::FolderOutsideRoot(folder_name.to_string()));
        }

        let extension = if extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{}", extension)
        };

        Ok(Self {
            extension,
            folder_name: folder_name.to_string(),
        })
    }

    /// Check whether this rule applies to an extension like ".pdf"
    pub fn matches(&self, extension: &str) -> bool {
        self.extension.to_lowercase() == extension.to_lowercase()
    }
}

/// Lower-cased extension of a path's file name, with the leading dot.
///
/// Everything from the last dot counts, so a dotfile like `.gitignore` is
/// all extension. Empty when the name has no dot or ends in a bare dot.
pub fn file_extension(path: &Path) -> String {
    let Some(name) = path.file_name() else {
        return String::new();
    };
    match split_name(&name.to_string_lossy()).1 {
        "" | "." => String::new(),
        ext => ext.to_lowercase(),
    }
}

/// Split a file name at its last dot into stem and extension (dot included)
pub(crate) fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) => name.split_at(i),
        None => (name, ""),
    }
}
