//! HTML parsing support.
//!
//! Parses HTML fragments with scraper (html5ever) and copies the result into
//! the arena [`Tree`] the converter mutates.

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::tree::{NodeId, Tree};

/// Parse an HTML fragment into a [`Tree`].
///
/// The fragment's nodes become children of the tree's document root. Use
/// this when you need to inspect or edit the tree before converting it.
///
/// # Example
///
/// ```rust
/// use to_markdown::{parse_html, Converter};
///
/// let tree = parse_html("<h1>Hello <em>World</em></h1>");
/// assert_eq!(tree.inner_html(tree.root()), "<h1>Hello <em>World</em></h1>");
///
/// let markdown = Converter::new().convert_tree(tree).unwrap();
/// assert_eq!(markdown, "# Hello _World_");
/// ```
pub fn parse_html(html: &str) -> Tree {
    let document = Html::parse_fragment(html);
    let mut tree = Tree::new();
    let root = tree.root();
    copy_children(&mut tree, root, document.root_element());
    tree
}

fn copy_children(tree: &mut Tree, parent: NodeId, element: ElementRef<'_>) {
    for child in element.children() {
        let id = match child.value() {
            ScraperNode::Text(text) => tree.create_text(&*text.text),
            ScraperNode::Comment(comment) => tree.create_comment(&*comment.comment),
            ScraperNode::Element(_) => {
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                let el = child_element.value();
                let id = tree.create_element_with_attrs(el.name(), el.attrs());
                copy_children(tree, id, child_element);
                id
            }
            _ => continue,
        };
        tree.append_child(parent, id);
    }
}
