//! Replacement templates for rules declared as data.
//!
//! | Placeholder   | Expands to                                   |
//! |---------------|----------------------------------------------|
//! | `{content}`   | decoded inner content of the matched element |
//! | `{tag}`       | lowercase tag name                           |
//! | `{attr:NAME}` | attribute value, empty when absent           |
//! | `{{` / `}}`   | a literal brace                              |

use crate::tree::NodeRef;
use crate::{Result, ToMarkdownError};

/// Render `template` for a matched node.
///
/// Fails with [`ToMarkdownError::InvalidReplacement`] on an unknown
/// placeholder or an unbalanced brace.
pub fn render(template: &str, content: &str, node: &NodeRef<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len() + content.len());
    let mut chars = template.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let rest = &template[start + 1..];
                let Some(len) = rest.find('}') else {
                    return Err(invalid(template, "unterminated placeholder"));
                };
                let name = &rest[..len];
                out.push_str(&expand(template, name, content, node)?);
                // Skip the placeholder body and its closing brace.
                for _ in 0..=name.chars().count() {
                    chars.next();
                }
            }
            '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(invalid(template, "unmatched `}`")),
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn expand(template: &str, name: &str, content: &str, node: &NodeRef<'_>) -> Result<String> {
    match name {
        "content" => Ok(content.to_string()),
        "tag" => Ok(node.tag_name().to_string()),
        _ => match name.strip_prefix("attr:") {
            Some(attr) if !attr.is_empty() => Ok(node.attr(attr).unwrap_or_default().to_string()),
            _ => Err(invalid(template, &format!("unknown placeholder `{{{name}}}`"))),
        },
    }
}

fn invalid(template: &str, reason: &str) -> ToMarkdownError {
    ToMarkdownError::InvalidReplacement(format!("template `{template}`: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    fn render_for_link(template: &str, content: &str) -> Result<String> {
        let mut tree = Tree::new();
        let a = tree.create_element_with_attrs("a", [("href", "https://example.com")]);
        render(template, content, &tree.node(a))
    }

    #[test]
    fn test_content_placeholder() {
        assert_eq!(render_for_link("[{content}]", "x").unwrap(), "[x]");
    }

    #[test]
    fn test_attr_and_tag_placeholders() {
        assert_eq!(
            render_for_link("[{content}]({attr:href}) <{tag}>{attr:title}", "Link").unwrap(),
            "[Link](https://example.com) <a>"
        );
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(render_for_link("{{{content}}}", "x").unwrap(), "{x}");
    }

    #[test]
    fn test_multibyte_text_around_placeholder() {
        assert_eq!(render_for_link("« {content} »", "ü").unwrap(), "« ü »");
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = render_for_link("{body}", "x").unwrap_err();
        assert!(matches!(err, ToMarkdownError::InvalidReplacement(_)));
        assert!(err.to_string().contains("{body}"));
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(render_for_link("{content", "x").is_err());
        assert!(render_for_link("content}", "x").is_err());
        assert!(render_for_link("{attr:}", "x").is_err());
    }
}
