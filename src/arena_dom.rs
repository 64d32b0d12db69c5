// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A simple arena-backed DOM.
//!
//! Nodes live in one `Vec` and are addressed by stable [`NodeId`]
//! handles, so the same node can sit on the stack of open elements and
//! in the active formatting list without any sharing hazards. The
//! parent link is a plain back-reference; children are owned, in order.
//!
//! This is sufficient as a static parse tree, but don't build a web
//! browser using it. :)

use std::borrow::Cow;
use std::mem;

use mac::unwrap_or_return;
use tendril::StrTendril;

use crate::interface::{Attribute, NodeOrText, TreeSink};
use crate::interface::NodeOrText::{AppendNode, AppendText};

/// Reference to a node in an [`ArenaDom`]. Stable for the life of the
/// arena.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
pub struct NodeId(usize);

/// The different kinds of nodes in the DOM.
#[derive(Debug)]
pub enum NodeData {
    /// The `Document` itself.
    Document,

    /// A `DOCTYPE` with name, public id, and system id.
    Doctype {
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    },

    /// A text node.
    Text { contents: StrTendril },

    /// A comment.
    Comment { contents: StrTendril },

    /// An element with attributes.
    Element {
        name: StrTendril,
        attrs: Vec<Attribute>,
    },
}

/// A DOM node.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// The DOM itself; the result of parsing.
pub struct ArenaDom {
    nodes: Vec<Node>,

    /// The `Document` node.
    pub document: NodeId,

    /// Errors that occurred during parsing.
    pub errors: Vec<Cow<'static, str>>,
}

impl ArenaDom {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn new_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: vec![],
        });
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.0].parent.is_none());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn append_to_existing_text(&mut self, prev: NodeId, text: &str) -> bool {
        match self.nodes[prev.0].data {
            NodeData::Text { ref mut contents } => {
                contents.push_slice(text);
                true
            },
            _ => false,
        }
    }

    fn position_in_parent(&self, target: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes[target.0].parent?;
        let i = self.nodes[parent.0]
            .children
            .iter()
            .position(|&child| child == target)
            .expect("have parent but couldn't find in parent's children");
        Some((parent, i))
    }
}

impl Default for ArenaDom {
    fn default() -> ArenaDom {
        let mut dom = ArenaDom {
            nodes: vec![],
            document: NodeId(0),
            errors: vec![],
        };
        dom.document = dom.new_node(NodeData::Document);
        dom
    }
}

impl TreeSink for ArenaDom {
    type Handle = NodeId;
    type Output = ArenaDom;

    fn finish(self) -> ArenaDom {
        self
    }

    fn parse_error(&mut self, msg: Cow<'static, str>) {
        self.errors.push(msg);
    }

    fn get_document(&mut self) -> NodeId {
        self.document
    }

    fn elem_name(&self, target: &NodeId) -> StrTendril {
        match self.nodes[target.0].data {
            NodeData::Element { ref name, .. } => name.clone(),
            _ => panic!("not an element!"),
        }
    }

    fn same_node(&self, x: &NodeId, y: &NodeId) -> bool {
        x == y
    }

    fn create_element(&mut self, name: StrTendril, attrs: Vec<Attribute>) -> NodeId {
        // The first occurrence of an attribute name wins.
        let mut deduped: Vec<Attribute> = Vec::with_capacity(attrs.len());
        for attr in attrs {
            if !deduped.iter().any(|seen| seen.name == attr.name) {
                deduped.push(attr);
            }
        }
        self.new_node(NodeData::Element {
            name,
            attrs: deduped,
        })
    }

    fn create_comment(&mut self, text: StrTendril) -> NodeId {
        self.new_node(NodeData::Comment { contents: text })
    }

    fn append(&mut self, parent: &NodeId, child: NodeOrText<NodeId>) {
        match child {
            // Append to an existing Text node if we have one.
            AppendText(text) => {
                if let Some(&prev) = self.nodes[parent.0].children.last() {
                    if self.append_to_existing_text(prev, &text) {
                        return;
                    }
                }
                let node = self.new_node(NodeData::Text { contents: text });
                self.attach(*parent, node);
            },
            AppendNode(node) => self.attach(*parent, node),
        }
    }

    fn append_before_sibling(&mut self, sibling: &NodeId, child: NodeOrText<NodeId>) {
        let (parent, i) = self
            .position_in_parent(*sibling)
            .expect("append_before_sibling called on node without parent");

        let node = match (child, i) {
            // No previous node: nothing to merge with.
            (AppendText(text), 0) => self.new_node(NodeData::Text { contents: text }),

            // Look for a text node before the insertion point.
            (AppendText(text), i) => {
                let prev = self.nodes[parent.0].children[i - 1];
                if self.append_to_existing_text(prev, &text) {
                    return;
                }
                self.new_node(NodeData::Text { contents: text })
            },

            // Any other kind of node.
            (AppendNode(node), _) => {
                self.remove_from_parent(&node);
                node
            },
        };

        self.nodes[node.0].parent = Some(parent);
        let i = self.nodes[parent.0]
            .children
            .iter()
            .position(|&child| child == *sibling)
            .expect("sibling moved during insertion");
        self.nodes[parent.0].children.insert(i, node);
    }

    fn append_doctype_to_document(
        &mut self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        let node = self.new_node(NodeData::Doctype {
            name,
            public_id,
            system_id,
        });
        let doc = self.document;
        self.attach(doc, node);
    }

    fn add_attrs_if_missing(&mut self, target: &NodeId, attrs: Vec<Attribute>) {
        let mut missing = vec![];
        for attr in attrs {
            if !self.has_attr(target, &attr.name) {
                missing.push(attr);
            }
        }
        match self.nodes[target.0].data {
            NodeData::Element { ref mut attrs, .. } => attrs.extend(missing),
            _ => panic!("not an element!"),
        }
    }

    fn has_attr(&self, target: &NodeId, name: &str) -> bool {
        match self.nodes[target.0].data {
            NodeData::Element { ref attrs, .. } => attrs.iter().any(|attr| &*attr.name == name),
            _ => false,
        }
    }

    fn remove_from_parent(&mut self, target: &NodeId) {
        let (parent, i) = unwrap_or_return!(self.position_in_parent(*target), ());
        self.nodes[parent.0].children.remove(i);
        self.nodes[target.0].parent = None;
    }

    fn reparent_children(&mut self, node: &NodeId, new_parent: &NodeId) {
        let children = mem::take(&mut self.nodes[node.0].children);
        for &child in &children {
            self.nodes[child.0].parent = Some(*new_parent);
        }
        self.nodes[new_parent.0].children.extend(children);
    }

    fn shallow_clone(&mut self, target: &NodeId) -> NodeId {
        let data = match self.nodes[target.0].data {
            NodeData::Element {
                ref name,
                ref attrs,
            } => NodeData::Element {
                name: name.clone(),
                attrs: attrs.clone(),
            },
            _ => panic!("not an element!"),
        };
        self.new_node(data)
    }

    fn parent_node(&self, target: &NodeId) -> Option<NodeId> {
        self.nodes[target.0].parent
    }
}
