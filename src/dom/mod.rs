//! Mutable HTML document tree.
//!
//! html5ever parses into an index [`Arena`](arena::Arena) through
//! [`ArenaSink`](tree_sink::ArenaSink); edits are explicit operations on
//! child lists, and [`Document::to_html`] writes the tree back out.
//!
//! Inputs that never mention `<html>`, `<head>`, `<body>` or a doctype are
//! treated as fragments (template partials, includes) and serialize back
//! without the implied document scaffolding the parser adds.

pub mod arena;
pub mod serialize;
pub mod tree_sink;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{LocalName, QualName, ns};

pub use arena::{Arena, Attribute, NodeData, NodeId};
use tree_sink::ArenaSink;

/// A parsed HTML document owned by one rewrite.
pub struct Document {
    arena: Arena,
    fragment: bool,
}

impl Document {
    /// Parse with scripting disabled, so `<noscript>` content is markup.
    pub fn parse(html: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..TreeBuilderOpts::default()
            },
            ..ParseOpts::default()
        };
        let arena = parse_document(ArenaSink::new(), opts)
            .one(html)
            .into_arena();
        Self {
            arena,
            fragment: !has_document_markers(html),
        }
    }

    #[cfg(test)]
    fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// Every element with the given local name, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.arena
            .descendants(self.arena.root())
            .into_iter()
            .filter(|&id| self.arena.is_element_named(id, tag))
            .collect()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.parent(id)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.arena.attr(id, name)
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.arena.attrs(id)
    }

    pub fn is_element_named(&self, id: NodeId, tag: &str) -> bool {
        self.arena.is_element_named(id, tag)
    }

    /// Create a detached HTML element with plain (un-namespaced) attributes.
    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| attribute(name, value))
            .collect();
        self.create_element_with(tag, attrs)
    }

    pub fn create_element_with(&mut self, tag: &str, attrs: Vec<Attribute>) -> NodeId {
        self.arena
            .create_element(QualName::new(None, ns!(html), LocalName::from(tag)), attrs)
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.arena.append(parent, child);
    }

    /// Swap `new` into `old`'s slot in its parent. `false` if `old` is detached.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        self.arena.replace_child(old, new)
    }

    #[cfg(test)]
    fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::serialize_node(&self.arena, id, false, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        if !self.fragment {
            serialize::serialize_children(&self.arena, self.arena.root(), &mut out);
            return out;
        }
        // Fragment: emit what the parser placed in the implied head and body.
        let root = self.arena.root();
        for top in self.arena.children(root) {
            if !self.arena.is_element_named(top, "html") {
                serialize::serialize_node(&self.arena, top, false, &mut out);
                continue;
            }
            for section in self.arena.children(top) {
                if self.arena.is_element_named(section, "head")
                    || self.arena.is_element_named(section, "body")
                {
                    serialize::serialize_children(&self.arena, section, &mut out);
                } else {
                    serialize::serialize_node(&self.arena, section, false, &mut out);
                }
            }
        }
        out
    }
}

/// A plain attribute with no namespace or prefix.
pub fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: value.to_string(),
    }
}

/// A marker only counts as a whole tag name: `<head>` does, `<header>` does not.
fn has_document_markers(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    ["<!doctype", "<html", "<head", "<body"].iter().any(|marker| {
        lower.match_indices(marker).any(|(at, _)| {
            bytes
                .get(at + marker.len())
                .is_some_and(|&b| b.is_ascii_whitespace() || b == b'>' || b == b'/')
        })
    })
}
