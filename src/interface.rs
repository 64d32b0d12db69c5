// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The interface between the tree builder and the DOM it grows.
//!
//! The tree builder never owns nodes. All tree mutation goes through a
//! [`TreeSink`], and the builder holds only the `Handle`s the sink gives
//! out. A handle may be stored in several places at once (the stack of
//! open elements and the list of active formatting elements both alias
//! into the same tree); removing it from one place never detaches the
//! node itself.

use std::borrow::Cow;

use tendril::StrTendril;

pub use self::NodeOrText::{AppendNode, AppendText};

/// A tag attribute.
///
/// Attributes keep their source order. When the same name appears twice,
/// the first occurrence wins; sinks enforce this at element creation.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Attribute {
    pub name: StrTendril,
    pub value: StrTendril,
}

/// Something which can be inserted into the tree.
pub enum NodeOrText<Handle> {
    AppendNode(Handle),
    AppendText(StrTendril),
}

/// Types which can process the tree modifications requested by the tree
/// builder.
pub trait TreeSink {
    /// `Handle` is a reference to a DOM node. The tree builder requires
    /// that a `Handle` implements `Clone` to get another reference to
    /// the same node.
    type Handle: Clone;

    /// The overall result of parsing.
    type Output;

    /// Consume this sink and return the overall result of parsing.
    fn finish(self) -> Self::Output;

    /// Signal a parse error. Parse errors are reports, not aborts: the
    /// parse always continues.
    fn parse_error(&mut self, msg: Cow<'static, str>);

    /// Get a handle to the `Document` node.
    fn get_document(&mut self) -> Self::Handle;

    /// What is the name of this element?
    ///
    /// Should never be called on a non-element node.
    fn elem_name(&self, target: &Self::Handle) -> StrTendril;

    /// Do these two handles refer to the same node?
    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool;

    /// Create an element with the given name and attributes.
    fn create_element(&mut self, name: StrTendril, attrs: Vec<Attribute>) -> Self::Handle;

    /// Create a comment node.
    fn create_comment(&mut self, text: StrTendril) -> Self::Handle;

    /// Append a node or some text as the last child of the given node.
    /// Text appended next to an existing text node is merged into it.
    fn append(&mut self, parent: &Self::Handle, child: NodeOrText<Self::Handle>);

    /// Insert a node or some text immediately before the given sibling,
    /// which must have a parent.
    fn append_before_sibling(&mut self, sibling: &Self::Handle, child: NodeOrText<Self::Handle>);

    /// Append a `DOCTYPE` node to the `Document`.
    fn append_doctype_to_document(
        &mut self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    );

    /// Add each attribute to the given element, unless an attribute with
    /// that name already exists on it.
    fn add_attrs_if_missing(&mut self, target: &Self::Handle, attrs: Vec<Attribute>);

    /// Does the element carry an attribute with the given name?
    fn has_attr(&self, target: &Self::Handle, name: &str) -> bool;

    /// Detach the given node from its parent, if it has one.
    fn remove_from_parent(&mut self, target: &Self::Handle);

    /// Remove all the children from `node` and append them to
    /// `new_parent`, preserving order.
    fn reparent_children(&mut self, node: &Self::Handle, new_parent: &Self::Handle);

    /// Clone an element: same name and attributes, no children.
    fn shallow_clone(&mut self, target: &Self::Handle) -> Self::Handle;

    /// The parent of the given node, if it is attached to one.
    fn parent_node(&self, target: &Self::Handle) -> Option<Self::Handle>;
}
