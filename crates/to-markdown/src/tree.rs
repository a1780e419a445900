//! Arena-backed document tree.
//!
//! Every node lives in a single `Vec` owned by [`Tree`] and refers to its
//! neighbours by [`NodeId`]. The converter rewrites the tree while it walks
//! it, so parent/child/sibling links are plain indices: detaching or
//! replacing a node only rewires the indices of its neighbours, and ids held
//! by a traversal stay valid for the whole conversion call.
//!
//! Detached nodes are not reclaimed. They stay in the arena, unreachable from
//! the root, until the tree is dropped.

use std::fmt;

use crate::utilities::is_void;

/// Stable index of a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node kinds, matching the DOM `nodeType` values the converter cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root (nodeType = 9)
    Document,
    /// Element node (nodeType = 1)
    Element,
    /// Text node (nodeType = 3)
    Text,
    /// Comment node (nodeType = 8)
    Comment,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    /// Lowercase tag name for elements, `#text` / `#comment` / `#document` otherwise
    name: String,
    attributes: Vec<(String, String)>,
    /// Character data for text and comment nodes
    value: String,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind, name: String) -> Self {
        Self {
            kind,
            name,
            attributes: Vec::new(),
            value: String::new(),
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

/// A mutable document tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    /// Create a tree holding only an empty document root
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document, "#document".to_string())],
        }
    }

    /// The document root
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes ever allocated, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the arena holds only the document root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Borrow a read-only view of a node
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef::new(self, id)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    /// Create a detached element node
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(NodeData::new(NodeKind::Element, tag_name.to_ascii_lowercase()))
    }

    /// Create a detached element node with attributes
    pub fn create_element_with_attrs<'a, I>(&mut self, tag_name: &str, attrs: I) -> NodeId
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut data = NodeData::new(NodeKind::Element, tag_name.to_ascii_lowercase());
        data.attributes = attrs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.push(data)
    }

    /// Create a detached text node
    pub fn create_text(&mut self, value: impl Into<String>) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text, "#text".to_string());
        data.value = value.into();
        self.push(data)
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, value: impl Into<String>) -> NodeId {
        let mut data = NodeData::new(NodeKind::Comment, "#comment".to_string());
        data.value = value.into();
        self.push(data)
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    /// Lowercase tag name for elements, `#text`, `#comment` or `#document` otherwise
    pub fn tag_name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Attribute value by case-insensitive name
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(attr_name, _)| attr_name.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Character data of a text or comment node (empty for other kinds)
    pub fn value(&self, id: NodeId) -> &str {
        &self.nodes[id.0].value
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        self.nodes[id.0].value = value.into();
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].last_child
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev_sibling
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next_sibling
    }

    /// Iterate over the current children of a node.
    ///
    /// The iterator follows live sibling links. Collect it first when the
    /// loop body mutates the tree.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.nodes[id.0].first_child,
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);

        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => self.nodes[last.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Insert `node` right before `reference` under the same parent.
    ///
    /// Does nothing when `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        if reference == node {
            return;
        }
        self.detach(node);

        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        let prev = self.nodes[reference.0].prev_sibling;
        {
            let data = &mut self.nodes[node.0];
            data.parent = Some(parent);
            data.prev_sibling = prev;
            data.next_sibling = Some(reference);
        }
        self.nodes[reference.0].prev_sibling = Some(node);
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(node),
            None => self.nodes[parent.0].first_child = Some(node),
        }
    }

    /// Unlink a node from its parent and siblings. Its own subtree is kept.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.0];
            (node.parent, node.prev_sibling, node.next_sibling)
        };

        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.nodes[next.0].prev_sibling = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = prev;
                }
            }
        }

        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Put `replacement` in the exact slot `old` occupies, then detach `old`.
    ///
    /// Does nothing when `old` has no parent.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) {
        if old == replacement || self.nodes[old.0].parent.is_none() {
            return;
        }
        self.insert_before(old, replacement);
        self.detach(old);
    }

    /// Move the children of `id` into its place and detach `id`.
    ///
    /// Does nothing when `id` has no parent.
    pub fn unwrap(&mut self, id: NodeId) {
        if self.nodes[id.0].parent.is_none() {
            return;
        }
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.insert_before(id, child);
        }
        self.detach(id);
    }

    /// Serialized children of a node (the DOM `innerHTML`)
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Serialized node including its own markup (the DOM `outerHTML`)
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match node.kind {
            NodeKind::Text => {
                let raw = node
                    .parent
                    .is_some_and(|parent| is_raw_text(&self.nodes[parent.0].name));
                if raw {
                    out.push_str(&node.value);
                } else {
                    push_nbsp_escaped(out, &html_escape::encode_text(&node.value));
                }
            }
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&node.value);
                out.push_str("-->");
            }
            NodeKind::Document => {
                for child in self.children(id) {
                    self.write_html(child, out);
                }
            }
            NodeKind::Element => {
                out.push('<');
                out.push_str(&node.name);
                for (name, value) in &node.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    push_nbsp_escaped(out, &html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');

                if node.first_child.is_none() && is_void(&node.name) {
                    return;
                }
                for child in self.children(id) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&node.name);
                out.push('>');
            }
        }
    }

    /// Concatenated text of all descendant text nodes (the DOM `textContent`)
    pub fn text_content(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        match node.kind {
            NodeKind::Text => node.value.clone(),
            NodeKind::Comment => String::new(),
            NodeKind::Element | NodeKind::Document => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in self.children(id) {
            match self.nodes[child.0].kind {
                NodeKind::Text => out.push_str(&self.nodes[child.0].value),
                NodeKind::Element => self.collect_text(child, out),
                NodeKind::Comment | NodeKind::Document => {}
            }
        }
    }

    /// Check that every node reachable from the root has exactly one parent
    /// and that sibling links agree in both directions.
    pub fn is_consistent(&self) -> bool {
        let mut stack = vec![self.root()];
        let mut seen = vec![false; self.nodes.len()];

        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.0], true) {
                return false;
            }

            let mut prev = None;
            let mut child = self.nodes[id.0].first_child;
            while let Some(current) = child {
                let data = &self.nodes[current.0];
                if data.parent != Some(id) || data.prev_sibling != prev {
                    return false;
                }
                stack.push(current);
                prev = Some(current);
                child = data.next_sibling;
            }
            if self.nodes[id.0].last_child != prev {
                return false;
            }
        }

        true
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Append `text`, writing U+00A0 as `&nbsp;` like the innerHTML serializer
fn push_nbsp_escaped(out: &mut String, text: &str) {
    for (i, part) in text.split('\u{a0}').enumerate() {
        if i > 0 {
            out.push_str("&nbsp;");
        }
        out.push_str(part);
    }
}

/// Elements whose text children serialize without escaping
fn is_raw_text(tag: &str) -> bool {
    matches!(
        tag,
        "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext"
    )
}

/// Iterator over the children of a node, see [`Tree::children`]
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.nodes[id.0].next_sibling;
        Some(id)
    }
}

/// A read-only view of one node, handed to rule filters and replacements.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn new(tree: &'a Tree, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.kind(self.id)
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn is_text(&self) -> bool {
        self.kind() == NodeKind::Text
    }

    /// Lowercase tag name (`#text` etc. for non-elements)
    pub fn tag_name(&self) -> &'a str {
        self.tree.tag_name(self.id)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.tree.attr(self.id, name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn value(&self) -> &'a str {
        self.tree.value(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.parent(self.id).map(|id| NodeRef::new(self.tree, id))
    }

    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        self.tree.first_child(self.id).map(|id| NodeRef::new(self.tree, id))
    }

    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        self.tree
            .previous_sibling(self.id)
            .map(|id| NodeRef::new(self.tree, id))
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        self.tree.next_sibling(self.id).map(|id| NodeRef::new(self.tree, id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id).map(move |id| NodeRef::new(tree, id))
    }

    pub fn element_children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.children().filter(|child| child.is_element())
    }

    /// 1-based position among the element children of the parent
    pub fn element_index(&self) -> usize {
        let mut index = 1;
        let mut current = self.tree.previous_sibling(self.id);
        while let Some(id) = current {
            if self.tree.kind(id) == NodeKind::Element {
                index += 1;
            }
            current = self.tree.previous_sibling(id);
        }
        index
    }

    pub fn text_content(&self) -> String {
        self.tree.text_content(self.id)
    }

    pub fn inner_html(&self) -> String {
        self.tree.inner_html(self.id)
    }

    pub fn outer_html(&self) -> String {
        self.tree.outer_html(self.id)
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("name", &self.tag_name())
            .finish()
    }
}
