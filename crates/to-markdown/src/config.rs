//! Declarative rule sets.
//!
//! A rule set is a JSON document describing template rules and option
//! overrides, so conversions can be configured without writing Rust:
//!
//! ```json
//! {
//!   "rules": [
//!     { "name": "strike", "filter": { "tags": ["del", "s"] }, "replacement": "~~{content}~~" },
//!     { "name": "heading", "filter": { "pattern": "^h[1-6]$" }, "replacement": "\n\n## {content}\n\n" }
//!   ],
//!   "include_standard": true,
//!   "unmatched": "keep"
//! }
//! ```

use serde::Deserialize;
use tracing::debug;

use crate::rules::{Filter, Rule, Rules};
use crate::service::{tag_set, ConvertOptions, Converter, UnmatchedPolicy};
use crate::{Result, ToMarkdownError};

/// A complete rule-set document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetConfig {
    /// Custom rules, in match order
    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    /// Append the bundled rules after the custom ones
    #[serde(default)]
    pub include_standard: bool,

    /// Replace the default void tag set
    pub void_elements: Option<Vec<String>>,

    /// Replace the default block-level tag set
    pub block_elements: Option<Vec<String>>,

    /// Replace the default preformatted tag set
    pub preformatted: Option<Vec<String>>,

    #[serde(default)]
    pub unmatched: UnmatchedPolicy,
}

/// One template rule
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub name: String,
    pub filter: FilterSpec,
    /// Replacement template, see [`crate::rules::template`]
    pub replacement: String,
}

/// Filter description; exactly one field must be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    pub tag: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pattern: Option<String>,
}

impl FilterSpec {
    /// Build the filter for the rule named `rule`
    pub fn into_filter(self, rule: &str) -> Result<Filter> {
        match (self.tag, self.tags, self.pattern) {
            (Some(tag), None, None) => Ok(Filter::tag(&tag)),
            (None, Some(tags), None) => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                Ok(Filter::tags(&tags))
            }
            (None, None, Some(pattern)) => Filter::pattern(&pattern).map_err(|err| match err {
                ToMarkdownError::InvalidFilter(reason) => {
                    ToMarkdownError::InvalidFilter(format!("rule `{rule}`: {reason}"))
                }
                other => other,
            }),
            (None, None, None) => Err(ToMarkdownError::InvalidFilter(format!(
                "rule `{rule}`: filter names no tag, tags or pattern"
            ))),
            _ => Err(ToMarkdownError::InvalidFilter(format!(
                "rule `{rule}`: filter must name exactly one of tag, tags or pattern"
            ))),
        }
    }
}

impl RuleSetConfig {
    /// Parse a rule-set document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the rule collection this document describes
    pub fn build_rules(&self) -> Result<Rules> {
        let mut rules = Rules::new();
        for spec in &self.rules {
            let filter = spec.filter.clone().into_filter(&spec.name)?;
            rules.add(&spec.name, Rule::template(filter, &spec.replacement));
        }
        if self.include_standard {
            rules.extend(Rules::standard());
        }
        Ok(rules)
    }

    /// Build options, starting from the defaults
    pub fn build_options(&self) -> ConvertOptions {
        let mut options = ConvertOptions::default();
        if let Some(tags) = &self.void_elements {
            options.void_elements = tag_set(tags);
        }
        if let Some(tags) = &self.block_elements {
            options.block_elements = tag_set(tags);
        }
        if let Some(tags) = &self.preformatted {
            options.preformatted = tag_set(tags);
        }
        options.unmatched = self.unmatched;
        options
    }
}

impl Converter {
    /// Create a Converter from a rule-set document
    pub fn from_config(config: &RuleSetConfig) -> Result<Self> {
        let rules = config.build_rules()?;
        debug!(rules = rules.len(), "loaded rule set");
        Ok(Self::with_options(rules, config.build_options()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let config = RuleSetConfig::from_json(r#"{"rules": []}"#).unwrap();
        assert!(config.rules.is_empty());
        assert!(!config.include_standard);
        assert_eq!(config.unmatched, UnmatchedPolicy::Unwrap);
    }

    #[test]
    fn test_build_rules_in_order() {
        let config = RuleSetConfig::from_json(
            r##"{
                "rules": [
                    {"name": "bold", "filter": {"tags": ["b", "strong"]}, "replacement": "**{content}**"},
                    {"name": "any_heading", "filter": {"pattern": "^h[1-6]$"}, "replacement": "# {content}"}
                ],
                "include_standard": true
            }"##,
        )
        .unwrap();
        let rules = config.build_rules().unwrap();
        let names: Vec<_> = rules.names().collect();
        assert_eq!(&names[..3], &["bold", "any_heading", "paragraph"]);
    }

    #[test]
    fn test_options_override() {
        let config = RuleSetConfig::from_json(
            r#"{"void_elements": ["BR", "img"], "preformatted": ["pre"], "unmatched": "keep"}"#,
        )
        .unwrap();
        let options = config.build_options();
        assert!(options.is_void("br"));
        assert!(!options.is_void("hr"));
        assert!(!options.is_preformatted("code"));
        assert!(options.is_block("p"));
        assert_eq!(options.unmatched, UnmatchedPolicy::Keep);
    }

    #[test]
    fn test_empty_filter_rejected() {
        let config = RuleSetConfig::from_json(
            r#"{"rules": [{"name": "nothing", "filter": {}, "replacement": "x"}]}"#,
        )
        .unwrap();
        let err = config.build_rules().unwrap_err();
        assert!(matches!(err, ToMarkdownError::InvalidFilter(_)));
        assert!(err.to_string().contains("rule `nothing`"));
    }

    #[test]
    fn test_ambiguous_filter_rejected() {
        let spec = FilterSpec {
            tag: Some("b".into()),
            pattern: Some("^b$".into()),
            ..FilterSpec::default()
        };
        assert!(matches!(spec.into_filter("both"), Err(ToMarkdownError::InvalidFilter(_))));
    }

    #[test]
    fn test_bad_pattern_names_rule() {
        let spec = FilterSpec {
            pattern: Some("h(".into()),
            ..FilterSpec::default()
        };
        let err = spec.into_filter("broken").unwrap_err();
        assert!(err.to_string().contains("rule `broken`"));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            RuleSetConfig::from_json("{\"rules\": 3}"),
            Err(ToMarkdownError::Config(_))
        ));
        assert!(matches!(
            RuleSetConfig::from_json(r#"{"rulez": []}"#),
            Err(ToMarkdownError::Config(_))
        ));
    }

    #[cfg(feature = "html")]
    #[test]
    fn test_converter_from_config() {
        let config = RuleSetConfig::from_json(
            r#"{"rules": [{"name": "link", "filter": {"tag": "a"}, "replacement": "<{attr:href}|{content}>"}]}"#,
        )
        .unwrap();
        let converter = Converter::from_config(&config).unwrap();
        let result = converter.convert(r#"<p>See <a href="/docs">docs</a></p>"#).unwrap();
        assert_eq!(result, "See </docs|docs>");
    }
}
