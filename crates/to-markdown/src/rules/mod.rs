//! Rule system for HTML to Markdown conversion.

mod rule;
mod standard;
pub mod template;

pub use rule::{Filter, PredicateFn, Replacement, ReplacementFn, Rule};
pub use standard::standard_rules;

use indexmap::IndexMap;

use crate::tree::NodeRef;
use crate::utilities::Context;

/// Ordered, named collection of rules.
///
/// Rules are tried in insertion order and the first match wins, so specific
/// rules have to be added before catch-alls. Re-adding a name replaces that
/// rule without moving it.
#[derive(Debug, Default)]
pub struct Rules {
    rules: IndexMap<String, Rule>,
}

impl Rules {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self {
            rules: IndexMap::new(),
        }
    }

    /// Create a rule set holding the bundled rules
    pub fn standard() -> Self {
        let mut rules = Self::new();
        for (key, rule) in standard_rules() {
            rules.add(key, rule);
        }
        rules
    }

    /// Add a rule at the end, or replace the rule already named `key`
    pub fn add(&mut self, key: &str, rule: Rule) {
        self.rules.insert(key.to_string(), rule);
    }

    /// Remove a rule, keeping the order of the others
    pub fn remove(&mut self, key: &str) -> Option<Rule> {
        self.rules.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules.get(key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names in match order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Append every rule of `other` that is not already named here
    pub fn extend(&mut self, other: Rules) {
        for (key, rule) in other.rules {
            self.rules.entry(key).or_insert(rule);
        }
    }

    /// Find the first rule whose filter matches the node
    pub fn find<'a>(&'a self, node: &NodeRef<'_>, ctx: &Context<'_>) -> Option<(&'a str, &'a Rule)> {
        self.rules
            .iter()
            .find(|(_, rule)| rule.matches(node, ctx))
            .map(|(key, rule)| (key.as_str(), rule))
    }
}
