//! HTML serialization of an [`Arena`] subtree.
//!
//! Follows the HTML fragment serialization algorithm: void elements get no
//! end tag, raw-text elements are written verbatim, everything else is
//! escaped (`&`, `<`, `>`, U+00A0 in text; `&`, `"`, U+00A0 in attributes).

use super::arena::{Arena, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp",
];

/// Elements whose first newline the parser drops, so one is written back.
const NEWLINE_ELEMENTS: &[&str] = &["listing", "pre", "textarea"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Serialize the children of `parent` (not `parent` itself).
pub fn serialize_children(arena: &Arena, parent: NodeId, out: &mut String) {
    let raw = arena
        .element_name(parent)
        .is_some_and(|n| RAW_TEXT_ELEMENTS.contains(&n.as_ref()));
    for child in arena.children(parent) {
        serialize_node(arena, child, raw, out);
    }
}

/// Serialize a single node including its own tags.
pub fn serialize_node(arena: &Arena, id: NodeId, raw_text: bool, out: &mut String) {
    let Some(node) = arena.get(id) else {
        return;
    };
    match &node.data {
        NodeData::Document => serialize_children(arena, id, out),
        NodeData::Doctype { name, .. } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Text(text) if raw_text => out.push_str(text),
        NodeData::Text(text) => escape_into(text, false, out),
        NodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                out.push(' ');
                if let Some(prefix) = &attr.name.prefix {
                    out.push_str(prefix.as_ref());
                    out.push(':');
                }
                out.push_str(attr.name.local.as_ref());
                out.push_str("=\"");
                escape_into(&attr.value, true, out);
                out.push('"');
            }
            out.push('>');
            if is_void(tag) {
                return;
            }
            if NEWLINE_ELEMENTS.contains(&tag) && starts_with_newline(arena, node.first_child) {
                out.push('\n');
            }
            serialize_children(arena, id, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn starts_with_newline(arena: &Arena, child: NodeId) -> bool {
    matches!(arena.get(child).map(|n| &n.data), Some(NodeData::Text(t)) if t.starts_with('\n'))
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}
