//! Index-based node arena.
//!
//! Nodes live in one `Vec` and link to each other through [`NodeId`]
//! indices (parent, first/last child, prev/next sibling). Structural edits
//! such as [`Arena::replace_child`] rewrite those links explicitly; nothing
//! is ever removed from the vector, detached nodes simply become
//! unreachable from the document root.

use html5ever::{LocalName, QualName};

/// Handle to a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for "no node".
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

pub struct Arena {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    /// Create an arena holding only the document root.
    pub fn new() -> Self {
        let mut arena = Self {
            nodes: Vec::new(),
            root: NodeId::NONE,
        };
        arena.root = arena.alloc(NodeData::Document);
        arena
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.alloc(NodeData::Element { name, attrs })
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(NodeData::Text(text))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(NodeData::Comment(text))
    }

    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> NodeId {
        self.alloc(NodeData::Doctype {
            name,
            public_id,
            system_id,
        })
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// `child` must already be detached.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if let Some(node) = self.get_mut(last) {
            node.next_sibling = child;
        }
        if let Some(node) = self.get_mut(parent) {
            if node.first_child.is_none() {
                node.first_child = child;
            }
            node.last_child = child;
        }
    }

    /// Append text, merging into a trailing text node when there is one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last = self.get(parent).map_or(NodeId::NONE, |n| n.last_child);
        if let Some(node) = self.get_mut(last)
            && let NodeData::Text(existing) = &mut node.data
        {
            existing.push_str(text);
            return;
        }
        let id = self.create_text(text.to_string());
        self.append(parent, id);
    }

    /// Insert `new_node` immediately before `sibling` under the same parent.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(node) = self.get_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = sibling;
        }
        if let Some(node) = self.get_mut(sibling) {
            node.prev_sibling = new_node;
        }
        if prev.is_some() {
            if let Some(node) = self.get_mut(prev) {
                node.next_sibling = new_node;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.first_child = new_node;
        }
    }

    /// Unlink a node from its parent and siblings. Its subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(node) = self.get_mut(prev) {
                node.next_sibling = next;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.first_child = next;
        }

        if next.is_some() {
            if let Some(node) = self.get_mut(next) {
                node.prev_sibling = prev;
            }
        } else if let Some(node) = self.get_mut(parent) {
            node.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Put `new` where `old` is in `old`'s parent's child list, then detach `old`.
    ///
    /// Returns `false` (and changes nothing) when `old` has no parent.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        if self.parent(old).is_none() {
            return false;
        }
        self.detach(new);
        self.insert_before(old, new);
        self.detach(old);
        true
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_some())
    }

    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            arena: self,
            current: self.get(parent).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// All nodes below `from` in document (pre-)order, `from` excluded.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(from).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            let mark = stack.len();
            stack.extend(self.children(id));
            stack[mark..].reverse();
        }
        out
    }

    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    pub fn is_element_named(&self, id: NodeId, tag: &str) -> bool {
        self.element_name(id).is_some_and(|n| n.as_ref() == tag)
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.prefix.is_none() && a.name.local.as_ref() == name)
            .map(|a| a.value.as_str())
    }
}

pub struct Children<'a> {
    arena: &'a Arena,
    current: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.arena.get(id).map_or(NodeId::NONE, |n| n.next_sibling);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html5ever::ns;

    fn el(arena: &mut Arena, tag: &str) -> NodeId {
        arena.create_element(QualName::new(None, ns!(html), LocalName::from(tag)), vec![])
    }

    fn tags(arena: &Arena, parent: NodeId) -> Vec<String> {
        arena
            .children(parent)
            .map(|c| arena.element_name(c).map(|n| n.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn append_links_siblings_in_order() {
        let mut arena = Arena::new();
        let div = el(&mut arena, "div");
        let a = el(&mut arena, "a");
        let b = el(&mut arena, "b");
        arena.append(arena.root(), div);
        arena.append(div, a);
        arena.append(div, b);

        assert_eq!(tags(&arena, div), vec!["a", "b"]);
        assert_eq!(arena.parent(a), Some(div));
        assert_eq!(arena.get(b).unwrap().prev_sibling, a);
    }

    #[test]
    fn replace_child_keeps_position() {
        let mut arena = Arena::new();
        let div = el(&mut arena, "div");
        let first = el(&mut arena, "p");
        let middle = el(&mut arena, "img");
        let last = el(&mut arena, "span");
        arena.append(arena.root(), div);
        arena.append(div, first);
        arena.append(div, middle);
        arena.append(div, last);

        let picture = el(&mut arena, "picture");
        assert!(arena.replace_child(middle, picture));

        assert_eq!(tags(&arena, div), vec!["p", "picture", "span"]);
        assert_eq!(arena.parent(middle), None);
        assert_eq!(arena.parent(picture), Some(div));
    }

    #[test]
    fn replace_only_child_updates_first_and_last() {
        let mut arena = Arena::new();
        let div = el(&mut arena, "div");
        let img = el(&mut arena, "img");
        arena.append(arena.root(), div);
        arena.append(div, img);

        let picture = el(&mut arena, "picture");
        arena.replace_child(img, picture);

        let node = arena.get(div).unwrap();
        assert_eq!(node.first_child, picture);
        assert_eq!(node.last_child, picture);
    }

    #[test]
    fn replace_detached_node_is_rejected() {
        let mut arena = Arena::new();
        let orphan = el(&mut arena, "img");
        let picture = el(&mut arena, "picture");
        assert!(!arena.replace_child(orphan, picture));
    }

    #[test]
    fn descendants_are_in_document_order() {
        let mut arena = Arena::new();
        let div = el(&mut arena, "div");
        let p = el(&mut arena, "p");
        let em = el(&mut arena, "em");
        let span = el(&mut arena, "span");
        arena.append(arena.root(), div);
        arena.append(div, p);
        arena.append(p, em);
        arena.append(div, span);

        assert_eq!(arena.descendants(arena.root()), vec![div, p, em, span]);
    }

    #[test]
    fn text_merges_into_trailing_text_node() {
        let mut arena = Arena::new();
        let p = el(&mut arena, "p");
        arena.append(arena.root(), p);
        arena.append_text(p, "Hello, ");
        arena.append_text(p, "World!");

        let children: Vec<_> = arena.children(p).collect();
        assert_eq!(children.len(), 1);
        assert!(matches!(&arena.get(children[0]).unwrap().data, NodeData::Text(t) if t == "Hello, World!"));
    }
}
