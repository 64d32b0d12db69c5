// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Serialization of [`ArenaDom`] trees back to markup.

use phf::phf_set;

use crate::arena_dom::{ArenaDom, NodeData, NodeId};

/// Elements whose end tag is never written.
static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame",
    "hr", "img", "input", "keygen", "link", "meta", "param", "source",
    "spacer", "wbr",
};

/// Serialize the children of the document node: the markup for the
/// whole parse.
pub fn serialize_document(dom: &ArenaDom) -> String {
    let mut out = String::new();
    for &child in &dom.node(dom.document).children {
        serialize_node(dom, child, &mut out);
    }
    out
}

/// Serialize one node and its subtree.
pub fn serialize_node(dom: &ArenaDom, id: NodeId, out: &mut String) {
    let node = dom.node(id);
    match node.data {
        NodeData::Document => {
            for &child in &node.children {
                serialize_node(dom, child, out);
            }
        },

        NodeData::Doctype { ref name, .. } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        },

        NodeData::Text { ref contents } => escape_text(contents, out),

        NodeData::Comment { ref contents } => {
            out.push_str("<!--");
            out.push_str(contents);
            out.push_str("-->");
        },

        NodeData::Element {
            ref name,
            ref attrs,
        } => {
            out.push('<');
            out.push_str(name);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attr(&attr.value, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&**name) {
                return;
            }
            for &child in &node.children {
                serialize_node(dom, child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        },
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
