//! The bundled rule table.
//!
//! Rules see their element after every descendant has already been turned
//! into text, so `content` is finished Markdown. Elements no rule matches
//! are handled by the converter's unmatched policy.

use super::{Filter, Rule};
use crate::tree::NodeRef;
use crate::utilities::{clean_attribute, collapse_newlines};

/// Create all bundled rules, in match order
pub fn standard_rules() -> Vec<(&'static str, Rule)> {
    vec![
        ("paragraph", paragraph_rule()),
        ("line_break", line_break_rule()),
        ("heading", heading_rule()),
        ("horizontal_rule", horizontal_rule()),
        ("emphasis", emphasis_rule()),
        ("strong", strong_rule()),
        ("inline_code", inline_code_rule()),
        ("inline_link", inline_link_rule()),
        ("image", image_rule()),
        ("code_block", code_block_rule()),
        ("blockquote", blockquote_rule()),
        ("list_item", list_item_rule()),
        ("list", list_rule()),
    ]
}

fn paragraph_rule() -> Rule {
    Rule::for_tag("p", |content, _, _| format!("\n\n{content}\n\n"))
}

fn line_break_rule() -> Rule {
    Rule::for_tag("br", |_, _, _| "  \n".to_string())
}

fn heading_rule() -> Rule {
    Rule::for_tags(&["h1", "h2", "h3", "h4", "h5", "h6"], |content, node, _| {
        let level: usize = node.tag_name()[1..].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), content)
    })
}

fn horizontal_rule() -> Rule {
    Rule::for_tag("hr", |_, _, _| "\n\n* * *\n\n".to_string())
}

fn emphasis_rule() -> Rule {
    Rule::for_tags(&["em", "i"], |content, _, _| format!("_{content}_"))
}

fn strong_rule() -> Rule {
    Rule::for_tags(&["strong", "b"], |content, _, _| format!("**{content}**"))
}

fn inline_code_rule() -> Rule {
    Rule::new(
        Filter::predicate(|node, _| node.tag_name() == "code" && !is_code_block(node)),
        |content, _, _| format!("`{content}`"),
    )
}

/// A `<code>` that is the only child of a `<pre>` belongs to a code block
fn is_code_block(node: &NodeRef<'_>) -> bool {
    let has_siblings = node.previous_sibling().is_some() || node.next_sibling().is_some();
    let in_pre = node.parent().is_some_and(|p| p.tag_name() == "pre");
    in_pre && !has_siblings
}

fn inline_link_rule() -> Rule {
    Rule::new(
        Filter::predicate(|node, _| {
            node.tag_name() == "a" && node.attr("href").is_some_and(|href| !href.is_empty())
        }),
        |content, node, _| {
            let href = node.attr("href").unwrap_or_default();
            format!("[{}]({}{})", content, href, title_part(node))
        },
    )
}

fn image_rule() -> Rule {
    Rule::for_tag("img", |_, node, _| {
        let alt = node.attr("alt").unwrap_or_default();
        let src = clean_attribute(node.attr("src"));

        if src.is_empty() {
            return String::new();
        }

        format!("![{}]({}{})", alt, src, title_part(node))
    })
}

fn title_part(node: &NodeRef<'_>) -> String {
    let title = clean_attribute(node.attr("title"));
    if title.is_empty() {
        String::new()
    } else {
        format!(" \"{title}\"")
    }
}

fn code_block_rule() -> Rule {
    Rule::for_tag("pre", |_, node, _| {
        // The text content survives whether or not the inner <code> was unwrapped.
        let code = node.text_content();
        let code = code.trim_end_matches('\n');
        format!("\n\n    {}\n\n", code.replace('\n', "\n    "))
    })
}

fn blockquote_rule() -> Rule {
    Rule::for_tag("blockquote", |content, _, ctx| {
        let content = collapse_newlines(ctx.trim(content));
        let quoted: Vec<String> = content.split('\n').map(|line| format!("> {line}")).collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    })
}

fn list_item_rule() -> Rule {
    Rule::for_tag("li", |content, node, _| {
        let content = content.trim().replace('\n', "\n    ");

        // Earlier siblings are still elements when an item is replaced.
        let prefix = match node.parent() {
            Some(parent) if parent.tag_name() == "ol" => format!("{}.  ", node.element_index()),
            _ => "*   ".to_string(),
        };

        format!("{prefix}{content}\n")
    })
}

fn list_rule() -> Rule {
    Rule::for_tags(&["ul", "ol"], |content, node, _| {
        let content = content.trim_end();
        let is_nested = node.parent().is_some_and(|p| p.tag_name() == "li");

        if is_nested {
            format!("\n{content}")
        } else {
            format!("\n\n{content}\n\n")
        }
    })
}
