//! Rule set - the enabled flag plus ordered rules in force at one point in time

use std::path::Path;
use tracing::trace;

use super::{SortingRule, file_extension};

/// Immutable snapshot of the sorting configuration.
///
/// Never mutated once built; a settings change builds a new set and swaps
/// it in through [`super::SharedRuleSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    enabled: bool,
    rules: Vec<SortingRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RuleSet {
    /// Create a rule set from already-validated rules
    pub fn new(enabled: bool, rules: Vec<SortingRule>) -> Self {
        Self { enabled, rules }
    }

    /// An empty, disabled rule set
    pub fn disabled() -> Self {
        Self::new(false, Vec::new())
    }

    /// The built-in rule table used when no configuration exists
    pub fn with_defaults() -> Self {
        const DEFAULTS: &[(&str, &str)] = &[
            (".pdf", "Documents"),
            (".docx", "Documents"),
            (".doc", "Documents"),
            (".txt", "Documents"),
            (".jpg", "Images"),
            (".png", "Images"),
            (".jpeg", "Images"),
            (".gif", "Images"),
            (".zip", "Archives"),
            (".rar", "Archives"),
            (".exe", "Executables"),
            (".msi", "Executables"),
        ];

        let rules = DEFAULTS
            .iter()
            .map(|(extension, folder)| SortingRule {
                extension: (*extension).to_string(),
                folder_name: (*folder).to_string(),
            })
            .collect();

        Self::new(true, rules)
    }

    /// Whether sorting is switched on
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Rules in lookup order
    pub fn rules(&self) -> &[SortingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Copy of this set with a different enabled flag
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled,
            rules: self.rules.clone(),
        }
    }

    /// Find the first rule whose extension matches, ignoring case.
    ///
    /// Later rules with the same extension are shadowed.
    pub fn lookup(&self, extension: &str) -> Option<&SortingRule> {
        let wanted = extension.to_lowercase();
        let found = self.rules.iter().find(|rule| rule.matches(&wanted));
        trace!("Lookup {:?} -> {:?}", extension, found.map(|r| &r.folder_name));
        found
    }

    /// Look up the rule for a file by its extension
    pub fn lookup_path(&self, path: &Path) -> Option<&SortingRule> {
        self.lookup(&file_extension(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(ext: &str, folder: &str) -> SortingRule {
        SortingRule::new(ext, folder).unwrap()
    }

    #[test]
    fn test_lookup_first_match_wins() {
        let set = RuleSet::new(
            true,
            vec![
                rule(".pdf", "Documents"),
                rule(".PDF", "Scans"),
                rule(".png", "Images"),
            ],
        );

        assert_eq!(set.lookup(".pdf").unwrap().folder_name, "Documents");
        assert_eq!(set.lookup(".Pdf").unwrap().folder_name, "Documents");
        assert_eq!(set.lookup(".PNG").unwrap().folder_name, "Images");
    }

    #[test]
    fn test_lookup_no_match() {
        let set = RuleSet::new(true, vec![rule(".pdf", "Documents")]);
        assert!(set.lookup(".xyz").is_none());
        assert!(set.lookup("").is_none());
        assert!(RuleSet::disabled().lookup(".pdf").is_none());
    }

    #[test]
    fn test_lookup_path() {
        let set = RuleSet::with_defaults();
        let found = set.lookup_path(Path::new("/downloads/Holiday.JPEG")).unwrap();
        assert_eq!(found.folder_name, "Images");
        assert!(set.lookup_path(Path::new("/downloads/Makefile")).is_none());
    }

    #[test]
    fn test_defaults() {
        let set = RuleSet::default();
        assert!(set.is_enabled());
        assert_eq!(set.len(), 12);
        assert_eq!(set.lookup(".msi").unwrap().folder_name, "Executables");
        assert_eq!(set.lookup(".rar").unwrap().folder_name, "Archives");
    }

    #[test]
    fn test_with_enabled_keeps_rules() {
        let set = RuleSet::with_defaults().with_enabled(false);
        assert!(!set.is_enabled());
        assert_eq!(set.rules(), RuleSet::with_defaults().rules());
    }
}
