//! Rule, Filter and Replacement types for HTML conversion.

use std::fmt;

use regex::Regex;

use super::template;
use crate::tree::NodeRef;
use crate::utilities::Context;
use crate::{Result, ToMarkdownError};

/// Type alias for filter predicates
pub type PredicateFn = Box<dyn Fn(&NodeRef<'_>, &Context<'_>) -> bool + Send + Sync>;

/// Type alias for replacement functions: `(decoded content, node, context)`
pub type ReplacementFn = Box<dyn Fn(&str, &NodeRef<'_>, &Context<'_>) -> String + Send + Sync>;

/// A filter determines which elements a rule applies to
pub enum Filter {
    /// Match a single tag name, ignoring case
    TagName(String),
    /// Match any of multiple tag names, ignoring case
    TagNames(Vec<String>),
    /// Match the lowercase tag name against a regular expression
    Pattern(Regex),
    /// Match using a predicate function
    Predicate(PredicateFn),
}

impl Filter {
    /// Create a filter for a single tag
    pub fn tag(name: &str) -> Self {
        Filter::TagName(name.to_lowercase())
    }

    /// Create a filter for multiple tags
    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_lowercase()).collect())
    }

    /// Create a filter from a regular expression source.
    ///
    /// Fails with [`ToMarkdownError::InvalidFilter`] when the pattern does
    /// not compile.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Filter::Pattern)
            .map_err(|e| ToMarkdownError::InvalidFilter(format!("invalid pattern `{pattern}`: {e}")))
    }

    /// Create a filter with a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&NodeRef<'_>, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    /// Check if this filter matches a node
    pub fn matches(&self, node: &NodeRef<'_>, ctx: &Context<'_>) -> bool {
        let tag = node.tag_name();
        match self {
            Filter::TagName(t) => tag.eq_ignore_ascii_case(t),
            Filter::TagNames(tags) => tags.iter().any(|t| tag.eq_ignore_ascii_case(t)),
            Filter::Pattern(re) => re.is_match(tag),
            Filter::Predicate(f) => f(node, ctx),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::TagName(t) => f.debug_tuple("TagName").field(t).finish(),
            Filter::TagNames(tags) => f.debug_tuple("TagNames").field(tags).finish(),
            Filter::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// How a matched element becomes Markdown
pub enum Replacement {
    /// Call a function with the decoded content and the node
    Function(ReplacementFn),
    /// Render a template, see [`template`](super::template)
    Template(String),
}

impl Replacement {
    /// Produce the Markdown for a matched node
    pub fn render(&self, content: &str, node: &NodeRef<'_>, ctx: &Context<'_>) -> Result<String> {
        match self {
            Replacement::Function(f) => Ok(f(content, node, ctx)),
            Replacement::Template(source) => template::render(source, content, node),
        }
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Function(_) => f.write_str("Function(..)"),
            Replacement::Template(source) => f.debug_tuple("Template").field(source).finish(),
        }
    }
}

/// A rule defines how to convert a matched HTML element to Markdown
#[derive(Debug)]
pub struct Rule {
    /// Filter to determine which elements this rule applies to
    pub filter: Filter,
    /// Replacement that generates Markdown
    pub replacement: Replacement,
}

impl Rule {
    /// Create a new rule
    pub fn new<F>(filter: Filter, replacement: F) -> Self
    where
        F: Fn(&str, &NodeRef<'_>, &Context<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            filter,
            replacement: Replacement::Function(Box::new(replacement)),
        }
    }

    /// Create a rule rendering a template
    pub fn template(filter: Filter, template: &str) -> Self {
        Self {
            filter,
            replacement: Replacement::Template(template.to_string()),
        }
    }

    /// Create a rule that matches a single tag
    pub fn for_tag<F>(tag: &str, replacement: F) -> Self
    where
        F: Fn(&str, &NodeRef<'_>, &Context<'_>) -> String + Send + Sync + 'static,
    {
        Self::new(Filter::tag(tag), replacement)
    }

    /// Create a rule that matches multiple tags
    pub fn for_tags<F>(tags: &[&str], replacement: F) -> Self
    where
        F: Fn(&str, &NodeRef<'_>, &Context<'_>) -> String + Send + Sync + 'static,
    {
        Self::new(Filter::tags(tags), replacement)
    }

    /// Check if this rule applies to a node
    pub fn matches(&self, node: &NodeRef<'_>, ctx: &Context<'_>) -> bool {
        self.filter.matches(node, ctx)
    }

    /// Apply this rule's replacement
    pub fn replace(&self, content: &str, node: &NodeRef<'_>, ctx: &Context<'_>) -> Result<String> {
        self.replacement.render(content, node, ctx)
    }
}
