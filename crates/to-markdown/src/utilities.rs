//! Utility functions and constants for HTML processing.
//!
//! These are also the helpers rule authors reach for: [`Context`] bundles
//! them together with the active tag sets and is passed to every filter
//! predicate and replacement function.

use crate::service::ConvertOptions;
use crate::tree::NodeRef;

/// Block-level HTML elements
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas",
    "center", "dd", "dir", "div", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "form", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "html", "isindex", "li", "main", "menu",
    "nav", "noframes", "noscript", "ol", "output", "p", "pre", "section",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Void (self-closing) HTML elements
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text is kept verbatim by the whitespace pass
pub const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "code"];

/// Check if a tag is a block-level element
pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Check if a tag is a void element
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Decode named and numeric HTML character references
pub fn decode_html_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Strip leading and trailing whitespace
pub fn trim(text: &str) -> &str {
    text.trim()
}

/// True when the string is empty or whitespace only
pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Collapse every run of three or more newlines into exactly two
pub fn collapse_newlines(text: &str) -> String {
    let mut newline_count = 0;
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        if c == '\n' {
            newline_count += 1;
            if newline_count <= 2 {
                result.push(c);
            }
        } else {
            newline_count = 0;
            result.push(c);
        }
    }

    result
}

/// Clean an attribute value (trim and handle empty)
pub fn clean_attribute(value: Option<&str>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Helpers handed to rule filters and replacements.
///
/// Everything here is bound to the tag sets of the converter running the
/// rule, so custom block-level or void lists are honoured by rules too.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    options: &'a ConvertOptions,
}

impl<'a> Context<'a> {
    pub fn new(options: &'a ConvertOptions) -> Self {
        Self { options }
    }

    /// Options of the running conversion
    pub fn options(&self) -> &'a ConvertOptions {
        self.options
    }

    pub fn decode_entities(&self, text: &str) -> String {
        decode_html_entities(text)
    }

    /// True for elements whose tag is in the block-level set
    pub fn is_block_level(&self, node: &NodeRef<'_>) -> bool {
        node.is_element() && self.options.is_block(node.tag_name())
    }

    pub fn is_block_tag(&self, tag: &str) -> bool {
        self.options.is_block(tag)
    }

    pub fn is_void_tag(&self, tag: &str) -> bool {
        self.options.is_void(tag)
    }

    pub fn trim<'s>(&self, text: &'s str) -> &'s str {
        trim(text)
    }
}
