//! Whitespace normalization.
//!
//! Runs once over a freshly parsed tree, before any rule fires:
//!
//! - comments are removed and the text nodes they separated are merged;
//! - text outside preformatted containers has whitespace runs collapsed to a
//!   single space;
//! - whitespace-only text next to a block-level element is removed, other
//!   whitespace-only text becomes a single separating space;
//! - block-level elements (and the document root) have leading and trailing
//!   whitespace trimmed from their content.

use crate::service::ConvertOptions;
use crate::tree::{NodeId, NodeKind, Tree};

/// Normalize whitespace in the whole tree.
///
/// Running it a second time on its own output changes nothing.
pub fn normalize(tree: &mut Tree, options: &ConvertOptions) {
    let root = tree.root();
    strip_comments(tree, root);
    normalize_node(tree, root, options);
}

/// Remove comment nodes and merge the text nodes left adjacent by removal
fn strip_comments(tree: &mut Tree, id: NodeId) {
    let children: Vec<NodeId> = tree.children(id).collect();
    for child in children {
        match tree.kind(child) {
            NodeKind::Comment => tree.detach(child),
            NodeKind::Element | NodeKind::Document => strip_comments(tree, child),
            NodeKind::Text => {}
        }
    }

    let children: Vec<NodeId> = tree.children(id).collect();
    for child in children {
        if tree.kind(child) != NodeKind::Text {
            continue;
        }
        if let Some(prev) = tree.previous_sibling(child) {
            if tree.kind(prev) == NodeKind::Text {
                let merged = format!("{}{}", tree.value(prev), tree.value(child));
                tree.set_value(prev, merged);
                tree.detach(child);
            }
        }
    }
}

fn normalize_node(tree: &mut Tree, id: NodeId, options: &ConvertOptions) {
    match tree.kind(id) {
        NodeKind::Text => normalize_text(tree, id, options),
        NodeKind::Comment => tree.detach(id),
        NodeKind::Element | NodeKind::Document => {
            if should_trim(tree, id, options) {
                trim_content(tree, id);
            }

            // Children may detach themselves, so walk a snapshot.
            let children: Vec<NodeId> = tree.children(id).collect();
            for child in children {
                normalize_node(tree, child, options);
            }
        }
    }
}

fn normalize_text(tree: &mut Tree, id: NodeId, options: &ConvertOptions) {
    let Some(parent) = tree.parent(id) else {
        return;
    };
    if tree.kind(parent) == NodeKind::Element && options.is_preformatted(tree.tag_name(parent)) {
        return;
    }

    let value = tree.value(id);
    if value.chars().any(|c| !is_collapsible(c)) {
        let collapsed = collapse_whitespace(value);
        tree.set_value(id, collapsed);
    } else if has_adjacent_block(tree, id, options) {
        tree.detach(id);
    } else {
        tree.set_value(id, " ");
    }
}

fn has_adjacent_block(tree: &Tree, id: NodeId, options: &ConvertOptions) -> bool {
    let is_block = |sibling: Option<NodeId>| {
        sibling.is_some_and(|s| {
            tree.kind(s) == NodeKind::Element && options.is_block(tree.tag_name(s))
        })
    };
    is_block(tree.previous_sibling(id)) || is_block(tree.next_sibling(id))
}

fn should_trim(tree: &Tree, id: NodeId, options: &ConvertOptions) -> bool {
    match tree.kind(id) {
        NodeKind::Document => true,
        NodeKind::Element => {
            let tag = tree.tag_name(id);
            options.is_block(tag) && !options.is_preformatted(tag)
        }
        NodeKind::Text | NodeKind::Comment => false,
    }
}

/// Trim the serialized content of a node by editing its edge text children.
///
/// Serialized content can only start or end with whitespace through a text
/// child, so trimming leading and trailing text nodes (dropping the ones
/// that become empty) is the same as trimming the serialized string.
fn trim_content(tree: &mut Tree, id: NodeId) {
    while let Some(first) = tree.first_child(id) {
        if tree.kind(first) != NodeKind::Text {
            break;
        }
        let trimmed = tree.value(first).trim_start_matches(is_collapsible).to_string();
        if trimmed.is_empty() {
            tree.detach(first);
            continue;
        }
        tree.set_value(first, trimmed);
        break;
    }

    while let Some(last) = tree.last_child(id) {
        if tree.kind(last) != NodeKind::Text {
            break;
        }
        let trimmed = tree.value(last).trim_end_matches(is_collapsible).to_string();
        if trimmed.is_empty() {
            tree.detach(last);
            continue;
        }
        tree.set_value(last, trimmed);
        break;
    }
}

/// U+00A0 is content, never collapsible whitespace
fn is_collapsible(c: char) -> bool {
    c.is_whitespace() && c != '\u{a0}'
}

/// Collapse whitespace in text
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_whitespace = false;

    for c in s.chars() {
        if is_collapsible(c) {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
        } else {
            result.push(c);
            prev_was_whitespace = false;
        }
    }

    result
}
