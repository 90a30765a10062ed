//! Shared handle to the live rule set

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use super::RuleSet;

/// Atomically swappable rule set shared by the settings path and the engine.
///
/// Readers take a snapshot with [`SharedRuleSet::load`] and keep using it for
/// the rest of their work; a concurrent [`SharedRuleSet::replace`] is never
/// visible half-applied. Cloning the handle shares the same slot.
#[derive(Clone)]
pub struct SharedRuleSet(Arc<ArcSwap<RuleSet>>);

impl fmt::Debug for SharedRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedRuleSet").field(&self.0.load()).finish()
    }
}

impl Default for SharedRuleSet {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

impl From<RuleSet> for SharedRuleSet {
    fn from(rules: RuleSet) -> Self {
        Self::new(rules)
    }
}

impl SharedRuleSet {
    pub fn new(rules: RuleSet) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(rules)))
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<RuleSet> {
        self.0.load_full()
    }

    /// Swap in a whole new rule set
    pub fn replace(&self, rules: RuleSet) {
        info!(
            "Rule set replaced ({} rules, enabled: {})",
            rules.len(),
            rules.is_enabled()
        );
        self.0.store(Arc::new(rules));
    }

    /// Toggle sorting without touching the rules.
    ///
    /// Races with a concurrent `replace` are resolved by `rcu`: the toggle
    /// is re-applied on top of whichever set won.
    pub fn set_enabled(&self, enabled: bool) {
        self.0.rcu(|current| Arc::new(current.with_enabled(enabled)));
        info!("Sorting {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load().is_enabled()
    }
}
