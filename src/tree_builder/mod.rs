// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML5 tree builder.
//!
//! Consumes a token stream and grows a DOM through a [`TreeSink`],
//! following the tree-construction algorithm of the HTML standard:
//! insertion modes, the stack of open elements, the list of active
//! formatting elements, scope resolution, formatting reconstruction, the
//! adoption agency, foster parenting and implied end tags. Malformed
//! input is repaired, never rejected; every byte sequence yields a tree.

use std::borrow::Cow::{self, Borrowed};
use std::fmt;

use log::{debug, warn};
use tendril::StrTendril;

use crate::interface::{AppendNode, AppendText, Attribute, NodeOrText, TreeSink};
use crate::tokenizer::states::RawKind;
use crate::tokenizer::{states, Doctype, Tag, Token, TokenSink, TokenSinkResult, TokenSource};

use self::tag_sets::{element_category, ElementCategory};
use self::types::*;

mod rules;
mod tag_sets;
mod types;

/// The adoption agency's outer loop is bounded; the reference algorithm
/// runs it unbounded, which loops forever on pathological markup.
const ADOPTION_AGENCY_OUTER_LIMIT: usize = 8;

/// Tree builder options, with an impl for Default.
#[derive(Copy, Clone)]
pub struct TreeBuilderOpts {
    /// Report parse errors with token and mode detail, at some
    /// performance penalty? Default: false
    pub exact_errors: bool,

    /// Is scripting enabled?
    ///
    /// This affects how `<noscript>` elements are parsed: with scripting
    /// on, their contents are raw text; with scripting off, they are
    /// parsed as a normal tree of nodes.
    pub scripting_enabled: bool,

    /// Should we drop the DOCTYPE (if any) from the tree?
    pub drop_doctype: bool,
}

impl Default for TreeBuilderOpts {
    fn default() -> TreeBuilderOpts {
        TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: true,
            drop_doctype: false,
        }
    }
}

pub(crate) enum PushFlag {
    Push,
    NoPush,
}

/// Where a re-opened formatting element lands in the active list during
/// the adoption agency.
enum Bookmark<Handle> {
    Replace(Handle),
    InsertAfter(Handle),
}

/// The HTML tree builder.
pub struct TreeBuilder<Handle, Sink> {
    /// Options controlling the behavior of the tree builder.
    opts: TreeBuilderOpts,

    /// Consumer of tree modifications.
    pub sink: Sink,

    /// Insertion mode.
    mode: InsertionMode,

    /// Original insertion mode, restored when a raw-text detour ends.
    orig_mode: Option<InsertionMode>,

    /// The document node, which is created by the sink.
    doc_handle: Handle,

    /// Stack of open elements, most recently added at end.
    open_elems: Vec<Handle>,

    /// List of active formatting elements.
    active_formatting: Vec<FormatEntry<Handle>>,

    /// Head element pointer.
    head_elem: Option<Handle>,

    /// Form element pointer. At most one live form per parse.
    form_elem: Option<Handle>,

    /// Frameset-ok flag.
    frameset_ok: bool,

    /// Ignore a following U+000A LINE FEED?
    ignore_lf: bool,

    /// Is foster parenting enabled for the current delegation?
    foster_parenting: bool,
}

impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    /// Create a new tree builder which sends tree modifications to a
    /// particular `TreeSink`.
    ///
    /// The tree builder is also a `TokenSink`.
    pub fn new(mut sink: Sink, opts: TreeBuilderOpts) -> TreeBuilder<Handle, Sink> {
        let doc_handle = sink.get_document();
        TreeBuilder {
            opts,
            sink,
            mode: InsertionMode::Initial,
            orig_mode: None,
            doc_handle,
            open_elems: vec![],
            active_formatting: vec![],
            head_elem: None,
            form_elem: None,
            frameset_ok: true,
            ignore_lf: false,
            foster_parenting: false,
        }
    }

    /// Pump tokens from `source` until EOF, honoring the lexical-state
    /// switches the rules request.
    pub fn run<Source>(&mut self, source: &mut Source)
    where
        Source: TokenSource,
    {
        let mut state = states::State::Data;
        loop {
            let token = source.next_token(state);
            let at_eof = matches!(token, Token::Eof);
            state = match self.process_token(token) {
                TokenSinkResult::Continue => states::State::Data,
                TokenSinkResult::RawData(kind) => states::State::RawData(kind),
                TokenSinkResult::Plaintext => states::State::Plaintext,
            };
            if at_eof {
                break;
            }
        }
        self.end();
    }

    /// Consume the builder and return the sink's finished output: the
    /// tree built so far.
    pub fn finish(self) -> Sink::Output {
        self.sink.finish()
    }

    fn debug_step(&self, mode: InsertionMode, token: &Token) {
        debug!("processing {:?} in insertion mode {:?}", token, mode);
    }

    /// The explicit work loop behind token processing. Rules answer with
    /// `Reprocess` instead of calling back into the dispatcher, so
    /// adversarial reprocessing chains consume iterations, not stack.
    fn process_to_completion(&mut self, mut token: Token) -> TokenSinkResult {
        loop {
            let mode = self.mode;
            match self.step(mode, token) {
                ProcessResult::Done => return TokenSinkResult::Continue,
                ProcessResult::Reprocess(m, t) => {
                    self.mode = m;
                    token = t;
                },
                ProcessResult::ToRawData(kind) => return TokenSinkResult::RawData(kind),
                ProcessResult::ToPlaintext => return TokenSinkResult::Plaintext,
            }
        }
    }

    fn unexpected<T: fmt::Debug>(&mut self, _thing: &T) -> ProcessResult {
        self.sink.parse_error(if self.opts.exact_errors {
            Cow::from(format!(
                "Unexpected token {:?} in insertion mode {:?}",
                _thing, self.mode
            ))
        } else {
            Borrowed("Unexpected token")
        });
        ProcessResult::Done
    }

    fn stop_parsing(&mut self) -> ProcessResult {
        ProcessResult::Done
    }

    //§ parsing-elements-that-contain-only-text
    // Switch to the Text insertion mode, save the old mode, and ask the
    // token source for a raw-data state. The latter only takes effect
    // after the current `process_token` returns!
    fn to_raw_text_mode(&mut self, kind: RawKind) -> ProcessResult {
        self.orig_mode = Some(self.mode);
        self.mode = InsertionMode::Text;
        ProcessResult::ToRawData(kind)
    }

    // The generic raw text / RCDATA parsing algorithm.
    fn parse_raw_data(&mut self, tag: Tag, kind: RawKind) -> ProcessResult {
        self.insert_element_for(tag);
        self.to_raw_text_mode(kind)
    }
    //§ END

    fn current_node(&self) -> Handle {
        self.open_elems.last().expect("no current element").clone()
    }

    /// Get the first element on the stack, which will be the `<html>`
    /// element.
    fn html_elem(&self) -> Handle {
        self.open_elems[0].clone()
    }

    /// Get the second element on the stack, if it's an HTML body element.
    fn body_elem(&self) -> Option<Handle> {
        if self.open_elems.len() <= 1 {
            return None;
        }
        let node = self.open_elems[1].clone();
        if self.elem_named(&node, "body") {
            Some(node)
        } else {
            None
        }
    }

    fn elem_named(&self, elem: &Handle, name: &str) -> bool {
        &*self.sink.elem_name(elem) == name
    }

    fn elem_in(&self, elem: &Handle, set: &phf::Set<&'static str>) -> bool {
        set.contains(&*self.sink.elem_name(elem))
    }

    fn current_node_named(&self, name: &str) -> bool {
        self.elem_named(&self.current_node(), name)
    }

    fn current_node_in(&self, set: &phf::Set<&'static str>) -> bool {
        self.elem_in(&self.current_node(), set)
    }

    fn push(&mut self, elem: &Handle) {
        self.open_elems.push(elem.clone());
    }

    fn pop(&mut self) -> Handle {
        self.open_elems.pop().expect("no current element")
    }

    fn remove_from_stack(&mut self, elem: &Handle) {
        let position = self
            .open_elems
            .iter()
            .rposition(|x| self.sink.same_node(elem, x));
        if let Some(position) = position {
            self.open_elems.remove(position);
        }
    }

    //§ has-an-element-in-scope
    /// Walk the stack top-down looking for `name`. A `table` element ends
    /// the search in failure; with `table_scope`, so do caption, cell,
    /// button, marquee and object elements. Reaching the root fails.
    fn in_scope_named(&self, name: &str, table_scope: bool) -> bool {
        for node in self.open_elems.iter().rev() {
            let node_name = self.sink.elem_name(node);
            if &*node_name == name {
                return true;
            }
            if &*node_name == "table" {
                return false;
            }
            if table_scope && tag_sets::TABLE_SCOPE_BOUNDARY.contains(&*node_name) {
                return false;
            }
        }
        false
    }

    fn any_in_scope(&self, names: &[&str], table_scope: bool) -> bool {
        names
            .iter()
            .any(|name| self.in_scope_named(name, table_scope))
    }
    //§ END

    //§ generate-implied-end-tags
    fn generate_implied_end_tags(&mut self, exclude: Option<&str>) {
        loop {
            let name = match self.open_elems.last() {
                Some(node) => self.sink.elem_name(node),
                None => return,
            };
            if !tag_sets::IMPLIED_END.contains(&*name) {
                return;
            }
            if let Some(exclude) = exclude {
                if &*name == exclude {
                    return;
                }
            }
            self.pop();
        }
    }
    //§ END

    // Pop elements until the current element is in the set.
    fn pop_until_current_in(&mut self, set: &phf::Set<&'static str>) {
        while !self.current_node_in(set) {
            self.open_elems.pop();
        }
    }

    // Pop elements until an element from the set has been popped.
    // Returns the number of elements popped.
    fn pop_until_in(&mut self, set: &phf::Set<&'static str>) -> usize {
        let mut n = 0;
        loop {
            n += 1;
            match self.open_elems.pop() {
                None => break,
                Some(elem) => {
                    if self.elem_in(&elem, set) {
                        break;
                    }
                },
            }
        }
        n
    }

    fn pop_until_named(&mut self, name: &str) -> usize {
        let mut n = 0;
        loop {
            n += 1;
            match self.open_elems.pop() {
                None => break,
                Some(elem) => {
                    if self.elem_named(&elem, name) {
                        break;
                    }
                },
            }
        }
        n
    }

    /// Pop elements until one with the given name has been popped.
    /// Signal an error if it was not the first one.
    fn expect_to_close(&mut self, name: &str) {
        if self.pop_until_named(name) != 1 {
            self.sink.parse_error(if self.opts.exact_errors {
                Cow::from(format!("Unexpected open element while closing <{}>", name))
            } else {
                Borrowed("Unexpected open element")
            });
        }
    }

    fn close_p_element(&mut self) {
        self.generate_implied_end_tags(Some("p"));
        self.expect_to_close("p");
    }

    fn close_p_element_in_scope(&mut self) {
        if self.in_scope_named("p", false) {
            self.close_p_element();
        }
    }

    fn close_the_cell(&mut self) {
        for cell in ["td", "th"] {
            if self.in_scope_named(cell, true) {
                self.generate_implied_end_tags(Some(cell));
                self.expect_to_close(cell);
                self.clear_active_formatting_to_marker();
                break;
            }
        }
    }

    /// Signal an error depending on the state of the stack of open
    /// elements at the end of the body.
    fn check_body_end(&mut self) {
        let mut unclosed = None;
        for elem in self.open_elems.iter() {
            let name = self.sink.elem_name(elem);
            if !tag_sets::BODY_END_OK.contains(&*name) {
                unclosed = Some(name);
                break;
            }
        }
        if let Some(name) = unclosed {
            self.sink.parse_error(if self.opts.exact_errors {
                Cow::from(format!("Unclosed element <{}> at end of body", name))
            } else {
                Borrowed("Unclosed elements at end of body")
            });
        }
    }

    // Check <input> tags for type=hidden.
    fn is_type_hidden(&self, tag: &Tag) -> bool {
        match tag.get_attribute("type") {
            Some(value) => value.eq_ignore_ascii_case("hidden"),
            None => false,
        }
    }

    //§ the-list-of-active-formatting-elements
    fn position_in_active_formatting(&self, element: &Handle) -> Option<usize> {
        self.active_formatting.iter().position(|entry| match entry {
            FormatEntry::Marker => false,
            FormatEntry::Element(handle) => self.sink.same_node(handle, element),
        })
    }

    fn is_marker_or_open(&self, entry: &FormatEntry<Handle>) -> bool {
        match entry {
            FormatEntry::Marker => true,
            FormatEntry::Element(node) => self
                .open_elems
                .iter()
                .rev()
                .any(|open| self.sink.same_node(open, node)),
        }
    }

    fn clear_active_formatting_to_marker(&mut self) {
        loop {
            match self.active_formatting.pop() {
                None | Some(FormatEntry::Marker) => break,
                _ => (),
            }
        }
    }

    /// <https://html.spec.whatwg.org/#reconstruct-the-active-formatting-elements>
    ///
    /// Re-opens formatting elements that were closed by an intervening
    /// boundary: each entry past the last open one is shallow-cloned,
    /// appended to the current node, pushed, and replaces its list entry.
    /// Calling this twice without an intervening mutation is a no-op the
    /// second time.
    fn reconstruct_active_formatting_elements(&mut self) {
        // Nothing to reconstruct when the list is empty, ends in a
        // marker, or ends in an element that is still open.
        match self.active_formatting.last() {
            None => return,
            Some(last) => {
                if self.is_marker_or_open(last) {
                    return;
                }
            },
        }

        // Rewind to the earliest entry that is not already on the stack,
        // stopping at a marker or the start of the list.
        let mut entry_index = self.active_formatting.len() - 1;
        loop {
            if entry_index == 0 {
                break;
            }
            entry_index -= 1;
            if self.is_marker_or_open(&self.active_formatting[entry_index]) {
                entry_index += 1;
                break;
            }
        }

        // Walk forward, re-opening each entry.
        loop {
            let old_entry = match &self.active_formatting[entry_index] {
                FormatEntry::Element(handle) => handle.clone(),
                FormatEntry::Marker => panic!("marker during formatting reconstruction"),
            };
            let new_elem = self.sink.shallow_clone(&old_entry);
            let current = self.current_node();
            self.sink.append(&current, AppendNode(new_elem.clone()));
            self.push(&new_elem);
            self.active_formatting[entry_index] = FormatEntry::Element(new_elem);
            if entry_index == self.active_formatting.len() - 1 {
                break;
            }
            entry_index += 1;
        }
    }
    //§ END

    //§ creating-and-inserting-nodes
    fn create_root(&mut self, attrs: Vec<Attribute>) {
        let elem = self
            .sink
            .create_element(StrTendril::from_slice("html"), attrs);
        self.push(&elem);
        let doc = self.doc_handle.clone();
        self.sink.append(&doc, AppendNode(elem));
    }

    /// <https://html.spec.whatwg.org/#appropriate-place-for-inserting-a-node>
    fn appropriate_place_for_insertion(
        &self,
        override_target: Option<Handle>,
    ) -> InsertionPoint<Handle> {
        let target = override_target.unwrap_or_else(|| self.current_node());
        if self.foster_parenting && self.elem_in(&target, &tag_sets::TABLE_FOSTER_TARGETS) {
            return self.foster_insertion_point();
        }
        InsertionPoint::LastChild(target)
    }

    /// The foster point: immediately before the last `table` on the
    /// stack if that table has a parent; the stack entry below the table
    /// if it has none; the root element if no table is open.
    fn foster_insertion_point(&self) -> InsertionPoint<Handle> {
        for (i, node) in self.open_elems.iter().enumerate().rev() {
            if self.elem_named(node, "table") {
                if self.sink.parent_node(node).is_some() {
                    return InsertionPoint::BeforeSibling(node.clone());
                }
                return InsertionPoint::LastChild(self.open_elems[i - 1].clone());
            }
        }
        InsertionPoint::LastChild(self.html_elem())
    }

    fn insert_at(&mut self, insertion_point: InsertionPoint<Handle>, child: NodeOrText<Handle>) {
        match insertion_point {
            InsertionPoint::LastChild(parent) => self.sink.append(&parent, child),
            InsertionPoint::BeforeSibling(sibling) => {
                self.sink.append_before_sibling(&sibling, child)
            },
        }
    }

    // Insert at the appropriate place for inserting a node. The routing
    // decision is computed here and consumed by this one insertion.
    fn insert_appropriately(&mut self, child: NodeOrText<Handle>, override_target: Option<Handle>) {
        let insertion_point = self.appropriate_place_for_insertion(override_target);
        self.insert_at(insertion_point, child);
    }

    fn insert_element(&mut self, push: PushFlag, name: StrTendril, attrs: Vec<Attribute>) -> Handle {
        let elem = self.sink.create_element(name, attrs);
        self.insert_appropriately(AppendNode(elem.clone()), None);
        match push {
            PushFlag::Push => self.push(&elem),
            PushFlag::NoPush => (),
        }
        elem
    }

    fn insert_element_for(&mut self, tag: Tag) -> Handle {
        self.insert_element(PushFlag::Push, tag.name, tag.attrs)
    }

    fn insert_and_pop_element_for(&mut self, tag: Tag) -> Handle {
        self.insert_element(PushFlag::NoPush, tag.name, tag.attrs)
    }

    fn insert_phantom(&mut self, name: &str) -> Handle {
        self.insert_element(PushFlag::Push, StrTendril::from_slice(name), vec![])
    }

    fn insert_formatting_element_for(&mut self, tag: Tag) -> Handle {
        let elem = self.insert_element_for(tag);
        self.active_formatting
            .push(FormatEntry::Element(elem.clone()));
        elem
    }

    fn append_text(&mut self, text: StrTendril) -> ProcessResult {
        self.insert_appropriately(AppendText(text), None);
        ProcessResult::Done
    }

    fn append_comment(&mut self, text: StrTendril) -> ProcessResult {
        let comment = self.sink.create_comment(text);
        self.insert_appropriately(AppendNode(comment), None);
        ProcessResult::Done
    }

    fn append_comment_to_doc(&mut self, text: StrTendril) -> ProcessResult {
        let comment = self.sink.create_comment(text);
        let doc = self.doc_handle.clone();
        self.sink.append(&doc, AppendNode(comment));
        ProcessResult::Done
    }

    fn append_comment_to_html(&mut self, text: StrTendril) -> ProcessResult {
        let comment = self.sink.create_comment(text);
        let target = self.html_elem();
        self.sink.append(&target, AppendNode(comment));
        ProcessResult::Done
    }
    //§ END

    /// Run a single token through the InBody rules with foster parenting
    /// armed: any insertion that would land inside table internals is
    /// rerouted to the foster point instead. The flag lives for exactly
    /// this delegation.
    fn foster_parent_in_body(&mut self, token: Token) -> ProcessResult {
        self.foster_parenting = true;
        let result = self.step(InsertionMode::InBody, token);
        self.foster_parenting = false;
        result
    }

    // <https://html.spec.whatwg.org/#reset-the-insertion-mode-appropriately>
    fn reset_insertion_mode(&self) -> InsertionMode {
        for node in self.open_elems.iter().rev() {
            let name = self.sink.elem_name(node);
            match &*name {
                "select" => return InsertionMode::InSelect,
                "td" | "th" => return InsertionMode::InCell,
                "tr" => return InsertionMode::InRow,
                "tbody" | "thead" | "tfoot" => return InsertionMode::InTableBody,
                "caption" => return InsertionMode::InCaption,
                "colgroup" => return InsertionMode::InColumnGroup,
                "table" => return InsertionMode::InTable,
                // In body, not in head!
                "head" | "body" => return InsertionMode::InBody,
                "frameset" => return InsertionMode::InFrameset,
                "html" => {
                    return if self.head_elem.is_some() {
                        InsertionMode::AfterHead
                    } else {
                        InsertionMode::BeforeHead
                    };
                },
                _ => (),
            }
        }
        InsertionMode::InBody
    }

    //§ adoption-agency-algorithm
    /// Resolve an end tag for a formatting element that may span a block
    /// boundary, cloning and re-parenting as needed. The outer loop is
    /// capped; past the cap the end tag is abandoned and parsing simply
    /// continues.
    fn adoption_agency(&mut self, subject: &str) {
        for _ in 0..ADOPTION_AGENCY_OUTER_LIMIT {
            // Find the most recent matching entry since the last marker:
            // the formatting element.
            let mut fmt = None;
            for (i, entry) in self.active_formatting.iter().enumerate().rev() {
                match entry {
                    FormatEntry::Marker => break,
                    FormatEntry::Element(handle) => {
                        if self.elem_named(handle, subject) {
                            fmt = Some((i, handle.clone()));
                            break;
                        }
                    },
                }
            }

            // No formatting element: the token is ignored.
            let Some((fmt_index, fmt_elem)) = fmt else {
                return;
            };

            // In the list but not open: drop the stale entry and ignore
            // the token.
            let fmt_on_stack = self
                .open_elems
                .iter()
                .any(|n| self.sink.same_node(n, &fmt_elem));
            if !fmt_on_stack {
                self.sink
                    .parse_error(Borrowed("Formatting element not open"));
                self.active_formatting.remove(fmt_index);
                return;
            }
            let fmt_stack_index = self
                .open_elems
                .iter()
                .rposition(|n| self.sink.same_node(n, &fmt_elem))
                .expect("formatting element not on stack");

            if !self.in_scope_named(subject, false) {
                self.sink
                    .parse_error(Borrowed("Formatting element not in scope"));
                return;
            }

            if !self.sink.same_node(&self.current_node(), &fmt_elem) {
                self.sink
                    .parse_error(Borrowed("Misnested formatting element"));
            }

            // The furthest block: the topmost stack entry below the
            // formatting element that is neither phrasing nor formatting.
            let furthest = self
                .open_elems
                .iter()
                .enumerate()
                .skip(fmt_stack_index + 1)
                .find(|&(_, open_elem)| {
                    let category = element_category(&self.sink.elem_name(open_elem));
                    category != ElementCategory::Phrasing && category != ElementCategory::Formatting
                })
                .map(|(i, handle)| (i, handle.clone()));

            // No furthest block: pop through the formatting element, drop
            // it from the list, and this end tag is fully handled.
            let Some((furthest_index, furthest_block)) = furthest else {
                self.open_elems.truncate(fmt_stack_index);
                self.active_formatting.remove(fmt_index);
                return;
            };

            let common_ancestor = self.open_elems[fmt_stack_index - 1].clone();
            let mut bookmark = Bookmark::Replace(fmt_elem.clone());

            // Walk up from the furthest block toward the formatting
            // element. Nodes not in the formatting list fall off the
            // stack; nodes in it are cloned, and the chain built so far
            // is re-parented under each clone in turn.
            let mut node_index = furthest_index;
            let mut last_node = furthest_block.clone();
            loop {
                node_index -= 1;
                let node = self.open_elems[node_index].clone();
                if self.sink.same_node(&node, &fmt_elem) {
                    break;
                }

                let Some(node_fmt_index) = self.position_in_active_formatting(&node) else {
                    self.open_elems.remove(node_index);
                    continue;
                };

                let new_elem = self.sink.shallow_clone(&node);
                self.open_elems[node_index] = new_elem.clone();
                self.active_formatting[node_fmt_index] = FormatEntry::Element(new_elem.clone());

                if self.sink.same_node(&last_node, &furthest_block) {
                    bookmark = Bookmark::InsertAfter(new_elem.clone());
                }

                self.sink.remove_from_parent(&last_node);
                self.sink.append(&new_elem, AppendNode(last_node.clone()));
                last_node = new_elem;
            }

            // Move the chain under the common ancestor, foster-routed
            // when the ancestor is table internals.
            self.sink.remove_from_parent(&last_node);
            if self.elem_in(&common_ancestor, &tag_sets::TABLE_FOSTER_TARGETS) {
                let insertion_point = self.foster_insertion_point();
                self.insert_at(insertion_point, AppendNode(last_node.clone()));
            } else {
                self.sink
                    .append(&common_ancestor, AppendNode(last_node.clone()));
            }

            // Re-open the formatting element inside the furthest block:
            // its clone adopts the block's children and takes the
            // original's place in both the list and the stack.
            let new_elem = self.sink.shallow_clone(&fmt_elem);
            self.sink.reparent_children(&furthest_block, &new_elem);
            self.sink
                .append(&furthest_block, AppendNode(new_elem.clone()));

            match bookmark {
                Bookmark::Replace(to_replace) => {
                    let index = self
                        .position_in_active_formatting(&to_replace)
                        .expect("bookmark not found in active formatting elements");
                    self.active_formatting[index] = FormatEntry::Element(new_elem.clone());
                },
                Bookmark::InsertAfter(previous) => {
                    let index = self
                        .position_in_active_formatting(&previous)
                        .expect("bookmark not found in active formatting elements")
                        + 1;
                    self.active_formatting
                        .insert(index, FormatEntry::Element(new_elem.clone()));
                    let old_index = self
                        .position_in_active_formatting(&fmt_elem)
                        .expect("formatting element not found in active formatting elements");
                    self.active_formatting.remove(old_index);
                },
            }

            self.remove_from_stack(&fmt_elem);
            let new_furthest_index = self
                .open_elems
                .iter()
                .position(|n| self.sink.same_node(n, &furthest_block))
                .expect("furthest block missing from open element stack");
            self.open_elems.insert(new_furthest_index + 1, new_elem);
        }

        warn!("adoption agency iteration limit reached for </{}>", subject);
        self.sink
            .parse_error(Borrowed("Giving up on misnested formatting element"));
    }
    //§ END

    /// A second `<a>` before the first was closed: close the old one via
    /// the adoption agency and scrub any leftover entries.
    fn handle_misnested_a_tags(&mut self, tag: &Tag) {
        let mut misnested = None;
        for entry in self.active_formatting.iter().rev() {
            match entry {
                FormatEntry::Marker => break,
                FormatEntry::Element(handle) => {
                    if self.elem_named(handle, "a") {
                        misnested = Some(handle.clone());
                        break;
                    }
                },
            }
        }
        let Some(node) = misnested else {
            return;
        };

        self.unexpected(tag);
        self.adoption_agency("a");
        if let Some(index) = self.position_in_active_formatting(&node) {
            self.active_formatting.remove(index);
        }
        self.remove_from_stack(&node);
    }

    /// Any other end tag in body: walk the stack for a match, generating
    /// implied end tags on success; give up at the first special or
    /// scoping element.
    fn process_end_tag_in_body(&mut self, tag: Tag) {
        let mut outcome = None;
        for (i, elem) in self.open_elems.iter().enumerate().rev() {
            if self.elem_named(elem, &tag.name) {
                outcome = Some(Ok(i));
                break;
            }
            let category = element_category(&self.sink.elem_name(elem));
            if category == ElementCategory::Special || category == ElementCategory::Scoping {
                outcome = Some(Err(()));
                break;
            }
        }

        match outcome {
            Some(Ok(match_index)) => {
                self.generate_implied_end_tags(Some(&*tag.name));
                if match_index != self.open_elems.len() - 1 {
                    // mis-nested tags
                    self.unexpected(&tag);
                }
                self.open_elems.truncate(match_index);
            },
            _ => {
                self.unexpected(&tag);
            },
        }
    }
}

impl<Handle, Sink> TokenSink for TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    fn process_token(&mut self, token: Token) -> TokenSinkResult {
        let ignore_lf = self.ignore_lf;
        self.ignore_lf = false;

        // DOCTYPE tokens are resolved here; everything else goes through
        // the mode dispatch.
        let token = match token {
            Token::Doctype(dt) => {
                if self.mode == InsertionMode::Initial {
                    let conforming = dt.name.as_deref() == Some("html")
                        && dt.public_id.is_none()
                        && match dt.system_id.as_deref() {
                            None => true,
                            Some(system_id) => system_id == "about:legacy-compat",
                        };
                    if !conforming {
                        self.sink.parse_error(if self.opts.exact_errors {
                            Cow::from(format!("Bad DOCTYPE: {:?}", dt))
                        } else {
                            Borrowed("Bad DOCTYPE")
                        });
                    }
                    let Doctype {
                        name,
                        public_id,
                        system_id,
                    } = dt;
                    if !self.opts.drop_doctype {
                        self.sink.append_doctype_to_document(
                            name.unwrap_or_default(),
                            public_id.unwrap_or_default(),
                            system_id.unwrap_or_default(),
                        );
                    }
                    self.mode = InsertionMode::BeforeHtml;
                } else {
                    self.sink.parse_error(if self.opts.exact_errors {
                        Cow::from(format!("DOCTYPE in insertion mode {:?}", self.mode))
                    } else {
                        Borrowed("Unexpected DOCTYPE")
                    });
                }
                return TokenSinkResult::Continue;
            },

            Token::Characters(mut text) => {
                if ignore_lf && text.starts_with('\n') {
                    text.pop_front(1);
                }
                if text.is_empty() {
                    return TokenSinkResult::Continue;
                }
                Token::Characters(text)
            },

            token => token,
        };

        self.process_to_completion(token)
    }

    fn end(&mut self) {
        self.open_elems.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_dom::ArenaDom;
    use crate::tokenizer::{StartTag, TagKind};

    fn tag(kind: TagKind, name: &str) -> Token {
        Token::Tag(Tag {
            kind,
            name: StrTendril::from_slice(name),
            self_closing: false,
            attrs: vec![],
        })
    }

    fn builder_with(tokens: &[Token]) -> TreeBuilder<crate::arena_dom::NodeId, ArenaDom> {
        let mut tb = TreeBuilder::new(ArenaDom::default(), TreeBuilderOpts::default());
        for token in tokens {
            let _ = tb.process_token(token.clone());
        }
        tb
    }

    #[test]
    fn stack_is_never_empty_after_root_creation() {
        let tb = builder_with(&[
            tag(StartTag, "html"),
            tag(StartTag, "body"),
            tag(TagKind::EndTag, "body"),
            tag(TagKind::EndTag, "html"),
        ]);
        assert!(!tb.open_elems.is_empty());
    }

    #[test]
    fn stack_and_formatting_list_alias_independently() {
        // </p> pops the <b> from the stack, but the list keeps its entry.
        let tb = builder_with(&[
            tag(StartTag, "html"),
            tag(StartTag, "body"),
            tag(StartTag, "p"),
            tag(StartTag, "b"),
            tag(TagKind::EndTag, "p"),
        ]);
        assert_eq!(tb.active_formatting.len(), 1);
        let last = tb.active_formatting.last().unwrap();
        assert!(!tb.is_marker_or_open(last));
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let mut tb = builder_with(&[
            tag(StartTag, "html"),
            tag(StartTag, "body"),
            tag(StartTag, "p"),
            tag(StartTag, "b"),
            tag(TagKind::EndTag, "p"),
            tag(StartTag, "p"),
        ]);
        tb.reconstruct_active_formatting_elements();
        let stack_len = tb.open_elems.len();
        let list_len = tb.active_formatting.len();
        tb.reconstruct_active_formatting_elements();
        assert_eq!(tb.open_elems.len(), stack_len);
        assert_eq!(tb.active_formatting.len(), list_len);
    }

    #[test]
    fn scope_fails_across_table_boundary() {
        let tb = builder_with(&[
            tag(StartTag, "html"),
            tag(StartTag, "body"),
            tag(StartTag, "div"),
            tag(StartTag, "table"),
        ]);
        assert!(!tb.in_scope_named("div", false));
        assert!(!tb.in_scope_named("body", false));
        assert!(tb.in_scope_named("table", true));
    }

    #[test]
    fn table_scope_adds_boundaries() {
        let tb = builder_with(&[
            tag(StartTag, "html"),
            tag(StartTag, "body"),
            tag(StartTag, "marquee"),
        ]);
        // marquee blocks the table-scope variant only
        assert!(tb.in_scope_named("body", false));
        assert!(!tb.in_scope_named("body", true));
    }

    #[test]
    fn foster_parenting_flag_never_outlives_a_delegation() {
        let tb = builder_with(&[
            tag(StartTag, "html"),
            tag(StartTag, "body"),
            tag(StartTag, "table"),
            Token::Characters(StrTendril::from_slice("foo")),
        ]);
        assert!(!tb.foster_parenting);
    }

    #[test]
    fn reset_insertion_mode_maps_structural_tags() {
        let tb = builder_with(&[
            tag(StartTag, "html"),
            tag(StartTag, "body"),
            tag(StartTag, "table"),
            tag(StartTag, "td"),
        ]);
        // stack is html body table tbody tr td
        assert_eq!(tb.reset_insertion_mode(), InsertionMode::InCell);
    }
}
