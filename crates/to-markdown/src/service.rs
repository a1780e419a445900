//! Converter - the main entry point for HTML to Markdown conversion.

use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::{debug, debug_span, trace, warn};

#[cfg(feature = "html")]
use crate::html::parse_html;
use crate::order::bfs_order;
use crate::rules::{Rule, Rules};
use crate::tree::{NodeId, NodeRef, Tree};
use crate::utilities::{
    collapse_newlines, decode_html_entities, is_blank, Context, BLOCK_ELEMENTS,
    PREFORMATTED_ELEMENTS, VOID_ELEMENTS,
};
use crate::whitespace::normalize;
use crate::{Result, ToMarkdownError};

/// What happens to an element no rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Replace the element with its children, so only its content surfaces
    #[default]
    Unwrap,
    /// Leave the element in place; its markup ends up in the output as HTML
    Keep,
}

/// Options for Converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Tags never treated as blank, even without content
    pub void_elements: BTreeSet<String>,

    /// Tags whose surrounding whitespace carries no meaning
    pub block_elements: BTreeSet<String>,

    /// Tags whose text is exempt from whitespace collapsing
    pub preformatted: BTreeSet<String>,

    /// Handling of elements without a matching rule
    pub unmatched: UnmatchedPolicy,
}

impl ConvertOptions {
    pub fn is_void(&self, tag: &str) -> bool {
        self.void_elements.contains(&tag.to_ascii_lowercase())
    }

    pub fn is_block(&self, tag: &str) -> bool {
        self.block_elements.contains(&tag.to_ascii_lowercase())
    }

    pub fn is_preformatted(&self, tag: &str) -> bool {
        self.preformatted.contains(&tag.to_ascii_lowercase())
    }
}

pub(crate) fn tag_set<S: AsRef<str>>(tags: &[S]) -> BTreeSet<String> {
    tags.iter().map(|t| t.as_ref().to_ascii_lowercase()).collect()
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            void_elements: tag_set(VOID_ELEMENTS),
            block_elements: tag_set(BLOCK_ELEMENTS),
            preformatted: tag_set(PREFORMATTED_ELEMENTS),
            unmatched: UnmatchedPolicy::Unwrap,
        }
    }
}

/// The main service for converting HTML to Markdown
#[derive(Debug)]
pub struct Converter {
    options: ConvertOptions,
    rules: Rules,
}

impl Converter {
    /// Create a Converter with the bundled rules and default options
    pub fn new() -> Self {
        Self {
            options: ConvertOptions::default(),
            rules: Rules::standard(),
        }
    }

    /// Create a Converter with a caller-supplied rule set
    pub fn with_rules(rules: Rules) -> Self {
        Self {
            options: ConvertOptions::default(),
            rules,
        }
    }

    /// Create a Converter with custom rules and options
    pub fn with_options(rules: Rules, options: ConvertOptions) -> Self {
        Self { options, rules }
    }

    /// Convert an HTML fragment to Markdown
    #[cfg(feature = "html")]
    pub fn convert(&self, html: &str) -> Result<String> {
        let input = escape_list_markers(html);
        self.convert_tree(parse_html(&input))
    }

    /// Convert raw bytes, which must be UTF-8 encoded HTML
    #[cfg(feature = "html")]
    pub fn convert_bytes(&self, bytes: &[u8]) -> Result<String> {
        let html = std::str::from_utf8(bytes).map_err(|e| {
            ToMarkdownError::InvalidInput(format!("input is not valid UTF-8 text: {e}"))
        })?;
        self.convert(html)
    }

    /// Convert an already parsed tree, consuming it
    pub fn convert_tree(&self, mut tree: Tree) -> Result<String> {
        let _span = debug_span!("convert", nodes = tree.len()).entered();

        normalize(&mut tree, &self.options);

        let order = bfs_order(&tree, tree.root());
        debug!(elements = order.len(), rules = self.rules.len(), "replacing elements");

        let ctx = Context::new(&self.options);
        for &id in order.iter().rev() {
            self.apply(&mut tree, id, &ctx)?;
        }

        let output = decode_html_entities(&tree.inner_html(tree.root()));
        let markdown = post_process(&output);
        if markdown.is_empty() && tree.len() > 1 {
            warn!("conversion produced empty output");
        }
        Ok(markdown)
    }

    /// Replace one element in place, or apply the unmatched policy
    fn apply(&self, tree: &mut Tree, id: NodeId, ctx: &Context<'_>) -> Result<()> {
        if tree.parent(id).is_none() {
            return Ok(());
        }

        match self.replacement_for(&tree.node(id), ctx)? {
            Some(markdown) => {
                let text = tree.create_text(markdown);
                tree.replace(id, text);
            }
            None => match self.options.unmatched {
                UnmatchedPolicy::Unwrap => {
                    trace!(tag = tree.tag_name(id), "no rule matched, unwrapping");
                    tree.unwrap(id);
                }
                UnmatchedPolicy::Keep => {
                    trace!(tag = tree.tag_name(id), "no rule matched, keeping markup");
                }
            },
        }
        Ok(())
    }

    /// The Markdown that replaces a node, or `None` when no rule matches
    fn replacement_for(&self, node: &NodeRef<'_>, ctx: &Context<'_>) -> Result<Option<String>> {
        let inner = node.inner_html();

        if !self.options.is_void(node.tag_name()) && is_blank(&inner) {
            return Ok(Some(String::new()));
        }

        let Some((key, rule)) = self.rules.find(node, ctx) else {
            return Ok(None);
        };
        trace!(rule = key, tag = node.tag_name(), "rule matched");

        let content = decode_html_entities(&inner);
        rule.replace(&content, node, ctx)
            .map(Some)
            .map_err(|err| match err {
                ToMarkdownError::InvalidReplacement(reason) => {
                    ToMarkdownError::InvalidReplacement(format!("rule `{key}`: {reason}"))
                }
                other => other,
            })
    }

    /// Add a custom rule at the end of the rule set
    pub fn add_rule(&mut self, key: &str, rule: Rule) -> &mut Self {
        self.rules.add(key, rule);
        self
    }

    /// Remove a rule by name
    pub fn remove_rule(&mut self, key: &str) -> &mut Self {
        self.rules.remove(key);
        self
    }

    /// Apply a plugin
    pub fn use_plugin<F>(&mut self, plugin: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        plugin(self);
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut Rules {
        &mut self.rules
    }

    /// Get the current options
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut ConvertOptions {
        &mut self.options
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape `digits. ` so literal text is not read as an ordered list marker
pub fn escape_list_markers(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut prev_is_digit = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '.' && prev_is_digit && chars.peek() == Some(&' ') {
            result.push('\\');
        }
        result.push(c);
        prev_is_digit = c.is_ascii_digit();
    }

    result
}

/// Post-process the result
fn post_process(output: &str) -> String {
    let trimmed = output
        .trim_start_matches(['\t', '\r', '\n'])
        .trim_end();
    collapse_newlines(&collapse_blank_lines(trimmed))
}

/// Turn whitespace between two newlines into a plain blank line.
///
/// Inside each whitespace run, everything from the first to the last newline
/// becomes `\n\n` when anything sits between them. Indentation after the last
/// newline is left alone.
fn collapse_blank_lines(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(char::is_whitespace) {
        result.push_str(&rest[..start]);
        let run_len = rest[start..]
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(rest.len() - start);
        let run = &rest[start..start + run_len];

        match (run.find('\n'), run.rfind('\n')) {
            (Some(first), Some(last)) if last > first + 1 => {
                result.push_str(&run[..first]);
                result.push_str("\n\n");
                result.push_str(&run[last + 1..]);
            }
            _ => result.push_str(run),
        }
        rest = &rest[start + run_len..];
    }
    result.push_str(rest);

    result
}

#[cfg(all(test, feature = "html"))]
mod tests {
    use super::*;
    use crate::rules::Filter;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn bold_only() -> Converter {
        let mut converter = Converter::with_rules(Rules::new());
        converter.add_rule("bold", Rule::for_tags(&["b", "strong"], |c, _, _| format!("**{c}**")));
        converter
    }

    #[test]
    fn test_escape_list_markers() {
        assert_eq!(escape_list_markers("1. First"), "1\\. First");
        assert_eq!(escape_list_markers("10. a 2. b"), "10\\. a 2\\. b");
        assert_eq!(escape_list_markers("1.5 and x. y"), "1.5 and x. y");
    }

    #[test]
    fn test_post_process_trims() {
        assert_eq!(post_process("\n\t\nHello  \n \t"), "Hello");
        assert_eq!(post_process("  Hello"), "  Hello");
    }

    #[test]
    fn test_post_process_collapses_blank_lines() {
        assert_eq!(post_process("a\n   \nb"), "a\n\nb");
        assert_eq!(post_process("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(post_process("a\n \n \n \nb"), "a\n\nb");
    }

    #[test]
    fn test_post_process_keeps_indentation() {
        assert_eq!(post_process("a\n\n    code"), "a\n\n    code");
        assert_eq!(post_process("a\n    b"), "a\n    b");
    }

    #[test]
    fn test_bold_inside_unmatched_paragraph() {
        let result = bold_only().convert("<p>Hello <b>World</b></p>").unwrap();
        assert_eq!(result, "Hello **World**");
    }

    #[test]
    fn test_keep_policy_leaves_markup() {
        let mut converter = bold_only();
        converter.options_mut().unmatched = UnmatchedPolicy::Keep;
        let result = converter.convert("<p>Hello <b>World</b></p>").unwrap();
        assert_eq!(result, "<p>Hello **World**</p>");
    }

    #[test]
    fn test_blank_element_removed_without_rule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut converter = Converter::with_rules(Rules::new());
        converter.add_rule(
            "any",
            Rule::new(Filter::predicate(|_, _| true), move |c, _, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                c.to_string()
            }),
        );
        assert_eq!(converter.convert("<p>   </p><span>\n</span>").unwrap(), "");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_nbsp_only_element_is_not_blank() {
        let result = Converter::new().convert("a<b>&nbsp;</b>b").unwrap();
        assert_eq!(result, "a**\u{a0}**b");

        let result = bold_only().convert("<p>x<strong>\u{a0}</strong>y</p>").unwrap();
        assert_eq!(result, "x**\u{a0}**y");
    }

    #[test]
    fn test_void_element_rule_fires() {
        let mut converter = Converter::with_rules(Rules::new());
        converter.add_rule("br", Rule::for_tag("br", |_, _, _| "[BR]".to_string()));
        assert_eq!(converter.convert("a<br>b").unwrap(), "a[BR]b");
    }

    #[test]
    fn test_void_set_is_configurable() {
        let mut converter = Converter::with_rules(Rules::new());
        converter.add_rule("br", Rule::for_tag("br", |_, _, _| "[BR]".to_string()));
        converter.options_mut().void_elements.remove("br");
        assert_eq!(converter.convert("a<br>b").unwrap(), "ab");
    }

    #[test]
    fn test_rule_precedence() {
        let mut converter = Converter::with_rules(Rules::new());
        converter
            .add_rule("first", Rule::for_tag("b", |c, _, _| format!("<{c}>")))
            .add_rule("second", Rule::for_tag("b", |c, _, _| format!("**{c}**")));
        assert_eq!(converter.convert("<b>x</b>").unwrap(), "<x>");
    }

    #[test]
    fn test_content_is_entity_decoded() {
        let mut converter = Converter::with_rules(Rules::new());
        converter.add_rule("code", Rule::for_tag("code", |c, _, _| format!("[{c}]")));
        assert_eq!(converter.convert("<code>a &lt; b &amp; c</code>").unwrap(), "[a < b & c]");
    }

    #[test]
    fn test_template_error_names_rule() {
        let mut converter = Converter::with_rules(Rules::new());
        converter.add_rule("broken", Rule::template(Filter::tag("b"), "{nope}"));
        let err = converter.convert("<b>x</b>").unwrap_err();
        assert!(matches!(err, ToMarkdownError::InvalidReplacement(_)));
        assert!(err.to_string().contains("rule `broken`"));
    }

    #[test]
    fn test_template_error_only_when_used() {
        let mut converter = Converter::with_rules(Rules::new());
        converter.add_rule("broken", Rule::template(Filter::tag("b"), "{nope}"));
        assert_eq!(converter.convert("<i>x</i>").unwrap(), "x");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = Converter::new().convert_bytes(&[0x3c, 0x70, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ToMarkdownError::InvalidInput(_)));
    }

    #[test]
    fn test_use_plugin() {
        let mut converter = Converter::with_rules(Rules::new());
        converter.use_plugin(|c| {
            c.add_rule("strike", Rule::for_tags(&["del", "s"], |content, _, _| format!("~~{content}~~")));
        });
        assert_eq!(converter.convert("<del>gone</del>").unwrap(), "~~gone~~");
    }

    #[test]
    fn test_rules_never_see_unconverted_descendants() {
        let stale = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&stale);
        let mut converter = Converter::with_rules(Rules::new());
        converter.add_rule(
            "wrap",
            Rule::new(Filter::predicate(|_, _| true), move |c, node, _| {
                if node.element_children().next().is_some() {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                format!("({c})")
            }),
        );

        let result = converter
            .convert("<div><ul><li><a href='#'>x<b>y</b></a></li><li>z</li></ul><p><i>w</i></p></div>")
            .unwrap();
        assert_eq!(stale.load(Ordering::SeqCst), 0);
        assert_eq!(result, "((((x(y)))(z))((w)))");
    }

    #[test]
    fn test_convert_tree_directly() {
        let mut tree = Tree::new();
        let root = tree.root();
        let em = tree.create_element("em");
        let text = tree.create_text("hi");
        tree.append_child(em, text);
        tree.append_child(root, em);
        assert_eq!(Converter::new().convert_tree(tree).unwrap(), "_hi_");
    }

    fn nested_fragment() -> impl Strategy<Value = String> {
        let leaf = prop_oneof!["[a-z]{1,4}", Just(" ".to_string()), Just("<br>".to_string())];
        leaf.prop_recursive(6, 64, 4, |inner| {
            (
                prop::sample::select(vec!["div", "p", "ul", "ol", "li", "a", "b", "em", "pre", "span"]),
                prop::collection::vec(inner, 1..4),
            )
                .prop_map(|(tag, children)| format!("<{tag}>{}</{tag}>", children.concat()))
        })
    }

    proptest! {
        #[test]
        fn prop_rules_see_only_converted_children(parts in prop::collection::vec(nested_fragment(), 1..4)) {
            let stale = Arc::new(AtomicUsize::new(0));
            let seen = Arc::clone(&stale);
            let mut converter = Converter::with_rules(Rules::new());
            converter.add_rule(
                "wrap",
                Rule::new(Filter::predicate(|_, _| true), move |c, node, _| {
                    if node.element_children().next().is_some() {
                        seen.fetch_add(1, Ordering::SeqCst);
                    }
                    format!("({c})")
                }),
            );

            converter.convert(&parts.concat()).unwrap();
            prop_assert_eq!(stale.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn prop_no_three_newlines_survive(text in "[a-c \\n\\t]{0,40}") {
            let result = post_process(&text);
            prop_assert!(!result.contains("\n\n\n"));
            prop_assert!(!result.ends_with(char::is_whitespace));
        }

        #[test]
        fn prop_blank_elements_deleted(tag in "[a-z]{1,8}", ws in "[ \\n\\t]{0,5}") {
            let options = ConvertOptions::default();
            prop_assume!(!options.is_void(&tag));

            let mut converter = Converter::with_rules(Rules::new());
            converter.add_rule("any", Rule::new(Filter::predicate(|_, _| true), |_, _, _| "X".to_string()));

            let mut tree = Tree::new();
            let root = tree.root();
            let el = tree.create_element(&tag);
            let text = tree.create_text(ws);
            tree.append_child(el, text);
            tree.append_child(root, el);

            prop_assert_eq!(converter.convert_tree(tree).unwrap(), "");
        }
    }
}
