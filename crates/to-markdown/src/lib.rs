//! # to-markdown
//!
//! Convert HTML fragments to Markdown with an ordered, pluggable rule set.
//!
//! ## Design
//!
//! The input is parsed into an arena [`Tree`] and converted in place:
//!
//! - whitespace is normalized the way a browser would render it;
//! - elements are visited deepest first (reverse breadth-first order), so a
//!   rule always sees its element with every descendant already converted;
//! - the first matching [`Rule`] replaces the element with a text node;
//! - the document's inner HTML is decoded and tidied into the final Markdown.
//!
//! Rules are plain closures or templates, tried in insertion order. Elements
//! no rule matches are unwrapped by default, see [`UnmatchedPolicy`].
//!
//! ## Example
//!
//! ```rust
//! let markdown = to_markdown::convert("<h1>Title</h1><p>Some <em>text</em></p>").unwrap();
//! assert_eq!(markdown, "# Title\n\nSome _text_");
//! ```
//!
//! ## Custom rules
//!
//! ```rust
//! use to_markdown::{Converter, Filter, Rule, Rules};
//!
//! let mut converter = Converter::with_rules(Rules::new());
//! converter
//!     .add_rule("bold", Rule::for_tags(&["b", "strong"], |content, _, _| format!("**{content}**")))
//!     .add_rule("heading", Rule::template(Filter::pattern("^h[1-6]$").unwrap(), "## {content}"));
//!
//! assert_eq!(converter.convert("<p>Hello <b>World</b></p>").unwrap(), "Hello **World**");
//! ```

mod config;
#[cfg(feature = "html")]
pub mod html;
pub mod order;
mod rules;
mod service;
pub mod tree;
pub mod utilities;
pub mod whitespace;

pub use config::{FilterSpec, RuleSetConfig, RuleSpec};
#[cfg(feature = "html")]
pub use html::parse_html;
pub use order::bfs_order;
pub use rules::{standard_rules, template, Filter, PredicateFn, Replacement, ReplacementFn, Rule, Rules};
pub use service::{escape_list_markers, ConvertOptions, Converter, UnmatchedPolicy};
pub use tree::{Children, NodeId, NodeKind, NodeRef, Tree};
pub use utilities::Context;
pub use whitespace::normalize as normalize_whitespace;

/// Error type for to-markdown operations
#[derive(Debug, thiserror::Error)]
pub enum ToMarkdownError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid rule filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid replacement: {0}")]
    InvalidReplacement(String),

    #[error("Invalid rule set: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ToMarkdownError>;

/// Convert an HTML fragment with the bundled rules and default options
#[cfg(feature = "html")]
pub fn convert(html: &str) -> Result<String> {
    static STANDARD: once_cell::sync::Lazy<Converter> = once_cell::sync::Lazy::new(Converter::new);
    STANDARD.convert(html)
}
