// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// The tree builder rules, as a single, enormous nested match expression.

use std::borrow::Cow::Borrowed;

use tendril::StrTendril;

use crate::interface::{Attribute, TreeSink};
use crate::tokenizer::states::{Rawtext, Rcdata};
use crate::tokenizer::TagKind::{EndTag, StartTag};
use crate::tokenizer::{Tag, Token};

use super::tag_sets::{self, element_category, ElementCategory};
use super::types::*;
use super::TreeBuilder;

fn any_not_whitespace(x: &StrTendril) -> bool {
    x.chars().any(|c| !c.is_ascii_whitespace())
}

fn start_tag(name: &str) -> Token {
    Token::Tag(Tag {
        kind: StartTag,
        name: StrTendril::from_slice(name),
        self_closing: false,
        attrs: vec![],
    })
}

fn end_tag(name: &str) -> Token {
    Token::Tag(Tag {
        kind: EndTag,
        name: StrTendril::from_slice(name),
        self_closing: false,
        attrs: vec![],
    })
}

impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    fn before_html_anything_else(&mut self, token: Token) -> ProcessResult {
        self.create_root(vec![]);
        ProcessResult::Reprocess(InsertionMode::BeforeHead, token)
    }

    fn before_head_anything_else(&mut self, token: Token) -> ProcessResult {
        let head = self.insert_phantom("head");
        self.head_elem = Some(head);
        ProcessResult::Reprocess(InsertionMode::InHead, token)
    }

    fn in_head_anything_else(&mut self, token: Token) -> ProcessResult {
        self.pop();
        ProcessResult::Reprocess(InsertionMode::AfterHead, token)
    }

    fn in_head_noscript_anything_else(&mut self, token: Token) -> ProcessResult {
        self.unexpected(&token);
        self.pop();
        ProcessResult::Reprocess(InsertionMode::InHead, token)
    }

    fn after_head_anything_else(&mut self, token: Token) -> ProcessResult {
        self.insert_phantom("body");
        // The one step that re-arms the frameset-ok flag.
        self.frameset_ok = true;
        ProcessResult::Reprocess(InsertionMode::InBody, token)
    }

    fn column_group_anything_else(&mut self, token: Token) -> ProcessResult {
        if self.current_node_named("colgroup") {
            self.pop();
            ProcessResult::Reprocess(InsertionMode::InTable, token)
        } else {
            self.unexpected(&token)
        }
    }

    /// Process a token in the given insertion mode.
    ///
    /// <https://html.spec.whatwg.org/#parsing-main-inhtml>
    pub(crate) fn step(&mut self, mode: InsertionMode, token: Token) -> ProcessResult {
        self.debug_step(mode, &token);

        match mode {
            // <https://html.spec.whatwg.org/#the-initial-insertion-mode>
            // The DOCTYPE itself is handled before dispatch; anything else
            // here is missing its DOCTYPE.
            InsertionMode::Initial => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => ProcessResult::Done,
                Token::Comment(text) => self.append_comment_to_doc(text),
                token => {
                    self.unexpected(&token);
                    ProcessResult::Reprocess(InsertionMode::BeforeHtml, token)
                },
            },

            // <https://html.spec.whatwg.org/#the-before-html-insertion-mode>
            InsertionMode::BeforeHtml => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => ProcessResult::Done,
                Token::Comment(text) => self.append_comment_to_doc(text),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => {
                            self.create_root(tag.attrs);
                            self.mode = InsertionMode::BeforeHead;
                            ProcessResult::Done
                        },
                        (EndTag, "head" | "body" | "html" | "br") => {
                            self.before_html_anything_else(Token::Tag(tag))
                        },
                        (EndTag, _) => self.unexpected(&tag),
                        _ => self.before_html_anything_else(Token::Tag(tag)),
                    }
                },

                token => self.before_html_anything_else(token),
            },

            // <https://html.spec.whatwg.org/#the-before-head-insertion-mode>
            InsertionMode::BeforeHead => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => ProcessResult::Done,
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                        (StartTag, "head") => {
                            let head = self.insert_element_for(tag);
                            self.head_elem = Some(head);
                            self.mode = InsertionMode::InHead;
                            ProcessResult::Done
                        },
                        (EndTag, "head" | "body" | "html" | "br") => {
                            self.before_head_anything_else(Token::Tag(tag))
                        },
                        (EndTag, _) => self.unexpected(&tag),
                        _ => self.before_head_anything_else(Token::Tag(tag)),
                    }
                },

                token => self.before_head_anything_else(token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-inhead>
            InsertionMode::InHead => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                        (StartTag, "base" | "command" | "link" | "meta") => {
                            self.insert_and_pop_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "title") => self.parse_raw_data(tag, Rcdata),

                        (StartTag, "noscript") if !self.opts.scripting_enabled => {
                            self.insert_element_for(tag);
                            self.mode = InsertionMode::InHeadNoscript;
                            ProcessResult::Done
                        },

                        (StartTag, "noscript" | "noframes" | "style" | "script") => {
                            self.parse_raw_data(tag, Rawtext)
                        },

                        (EndTag, "head") => {
                            self.pop();
                            self.mode = InsertionMode::AfterHead;
                            ProcessResult::Done
                        },

                        (StartTag, "head") => self.unexpected(&tag),
                        (EndTag, "html") => self.in_head_anything_else(Token::Tag(tag)),
                        (EndTag, _) => self.unexpected(&tag),
                        _ => self.in_head_anything_else(Token::Tag(tag)),
                    }
                },

                token => self.in_head_anything_else(token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-inheadnoscript>
            InsertionMode::InHeadNoscript => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => {
                    self.step(InsertionMode::InHead, Token::Characters(text))
                },
                Token::Comment(text) => self.step(InsertionMode::InHead, Token::Comment(text)),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                        (EndTag, "noscript") => {
                            self.pop();
                            self.mode = InsertionMode::InHead;
                            ProcessResult::Done
                        },

                        (StartTag, "link" | "meta" | "noframes" | "style") => {
                            self.step(InsertionMode::InHead, Token::Tag(tag))
                        },

                        (StartTag, "head" | "noscript") => self.unexpected(&tag),
                        (EndTag, "br") => self.in_head_noscript_anything_else(Token::Tag(tag)),
                        (EndTag, _) => self.unexpected(&tag),
                        _ => self.in_head_noscript_anything_else(Token::Tag(tag)),
                    }
                },

                token => self.in_head_noscript_anything_else(token),
            },

            // <https://html.spec.whatwg.org/#the-after-head-insertion-mode>
            InsertionMode::AfterHead => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                        (StartTag, "body") => {
                            self.insert_element_for(tag);
                            self.frameset_ok = false;
                            self.mode = InsertionMode::InBody;
                            ProcessResult::Done
                        },

                        (StartTag, "frameset") => {
                            self.insert_element_for(tag);
                            self.mode = InsertionMode::InFrameset;
                            ProcessResult::Done
                        },

                        (
                            StartTag,
                            "base" | "link" | "meta" | "noframes" | "script" | "style" | "title",
                        ) => {
                            self.unexpected(&tag);
                            let head = self.head_elem.clone().expect("no head element");
                            self.push(&head);
                            let result = self.step(InsertionMode::InHead, Token::Tag(tag));
                            self.remove_from_stack(&head);
                            result
                        },

                        (StartTag, "head") => self.unexpected(&tag),
                        (EndTag, "body" | "html" | "br") => {
                            self.after_head_anything_else(Token::Tag(tag))
                        },
                        (EndTag, _) => self.unexpected(&tag),
                        _ => self.after_head_anything_else(Token::Tag(tag)),
                    }
                },

                token => self.after_head_anything_else(token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-inbody>
            InsertionMode::InBody => match token {
                Token::Characters(text) => {
                    self.reconstruct_active_formatting_elements();
                    if any_not_whitespace(&text) {
                        self.frameset_ok = false;
                    }
                    self.append_text(text)
                },

                Token::Comment(text) => self.append_comment(text),

                Token::Eof => {
                    self.check_body_end();
                    self.stop_parsing()
                },

                Token::Doctype(_) => ProcessResult::Done,

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => {
                            self.unexpected(&tag);
                            let top = self.html_elem();
                            self.sink.add_attrs_if_missing(&top, tag.attrs);
                            ProcessResult::Done
                        },

                        (
                            StartTag,
                            "base" | "command" | "link" | "meta" | "noframes" | "script" | "style"
                            | "title",
                        ) => self.step(InsertionMode::InHead, Token::Tag(tag)),

                        (StartTag, "body") => {
                            self.unexpected(&tag);
                            if self.open_elems.len() > 1 {
                                if let Some(body) = self.body_elem() {
                                    self.frameset_ok = false;
                                    self.sink.add_attrs_if_missing(&body, tag.attrs);
                                }
                            }
                            ProcessResult::Done
                        },

                        (StartTag, "frameset") => {
                            self.unexpected(&tag);
                            if !self.frameset_ok {
                                return ProcessResult::Done;
                            }
                            let Some(body) = self.body_elem() else {
                                return ProcessResult::Done;
                            };
                            self.sink.remove_from_parent(&body);
                            self.open_elems.truncate(1);
                            self.insert_element_for(tag);
                            self.mode = InsertionMode::InFrameset;
                            ProcessResult::Done
                        },

                        (
                            StartTag,
                            "address" | "article" | "aside" | "blockquote" | "center" | "datagrid"
                            | "details" | "dialog" | "dir" | "div" | "dl" | "fieldset" | "figure"
                            | "footer" | "header" | "hgroup" | "menu" | "nav" | "ol" | "p"
                            | "section" | "ul",
                        ) => {
                            self.close_p_element_in_scope();
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                            self.close_p_element_in_scope();
                            if self.current_node_in(&tag_sets::HEADING) {
                                self.sink.parse_error(Borrowed("nested heading tags"));
                                self.pop();
                            }
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "pre" | "listing") => {
                            self.close_p_element_in_scope();
                            self.insert_element_for(tag);
                            self.ignore_lf = true;
                            self.frameset_ok = false;
                            ProcessResult::Done
                        },

                        (StartTag, "form") => {
                            if self.form_elem.is_some() {
                                self.sink.parse_error(Borrowed("nested forms"));
                            } else {
                                self.close_p_element_in_scope();
                                let elem = self.insert_element_for(tag);
                                self.form_elem = Some(elem);
                            }
                            ProcessResult::Done
                        },

                        (StartTag, "li" | "dd" | "dt") => {
                            self.frameset_ok = false;
                            let is_li = &*name == "li";
                            let mut close_needed = false;
                            for node in self.open_elems.iter().rev() {
                                let node_name = self.sink.elem_name(node);
                                if (is_li && &*node_name == "li")
                                    || &*node_name == "dd"
                                    || &*node_name == "dt"
                                {
                                    close_needed = true;
                                    break;
                                }
                                let category = element_category(&node_name);
                                if category != ElementCategory::Formatting
                                    && category != ElementCategory::Phrasing
                                    && !matches!(&*node_name, "address" | "div" | "p")
                                {
                                    break;
                                }
                            }
                            if close_needed {
                                let _ = self.step(InsertionMode::InBody, end_tag(&name));
                            }
                            self.close_p_element_in_scope();
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "plaintext") => {
                            self.close_p_element_in_scope();
                            self.insert_element_for(tag);
                            ProcessResult::ToPlaintext
                        },

                        (StartTag, "a") => {
                            self.handle_misnested_a_tags(&tag);
                            self.reconstruct_active_formatting_elements();
                            self.insert_formatting_element_for(tag);
                            ProcessResult::Done
                        },

                        (
                            StartTag,
                            "b" | "big" | "code" | "em" | "font" | "i" | "s" | "small" | "strike"
                            | "strong" | "tt" | "u",
                        ) => {
                            self.reconstruct_active_formatting_elements();
                            self.insert_formatting_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "nobr") => {
                            self.reconstruct_active_formatting_elements();
                            if self.in_scope_named("nobr", false) {
                                self.sink.parse_error(Borrowed("Nested <nobr>"));
                                self.adoption_agency("nobr");
                                self.reconstruct_active_formatting_elements();
                            }
                            self.insert_formatting_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "button") => {
                            if self.in_scope_named("button", false) {
                                self.sink.parse_error(Borrowed("nested buttons"));
                                self.generate_implied_end_tags(None);
                                self.pop_until_named("button");
                                self.clear_active_formatting_to_marker();
                            }
                            self.reconstruct_active_formatting_elements();
                            self.insert_element_for(tag);
                            self.active_formatting.push(FormatEntry::Marker);
                            self.frameset_ok = false;
                            ProcessResult::Done
                        },

                        (StartTag, "applet" | "marquee" | "object") => {
                            self.reconstruct_active_formatting_elements();
                            self.insert_element_for(tag);
                            self.active_formatting.push(FormatEntry::Marker);
                            self.frameset_ok = false;
                            ProcessResult::Done
                        },

                        (StartTag, "table") => {
                            self.close_p_element_in_scope();
                            self.insert_element_for(tag);
                            self.frameset_ok = false;
                            self.mode = InsertionMode::InTable;
                            ProcessResult::Done
                        },

                        (
                            StartTag,
                            "area" | "basefont" | "bgsound" | "br" | "embed" | "img" | "input"
                            | "keygen" | "spacer" | "wbr",
                        ) => {
                            let keep_frameset_ok =
                                &*name == "input" && self.is_type_hidden(&tag);
                            self.reconstruct_active_formatting_elements();
                            self.insert_and_pop_element_for(tag);
                            if !keep_frameset_ok {
                                self.frameset_ok = false;
                            }
                            ProcessResult::Done
                        },

                        (StartTag, "param" | "source") => {
                            self.insert_and_pop_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "hr") => {
                            self.close_p_element_in_scope();
                            self.insert_and_pop_element_for(tag);
                            self.frameset_ok = false;
                            ProcessResult::Done
                        },

                        (StartTag, "image") => {
                            // Change the token's tag name to "img" and
                            // reprocess it. (Don't ask.)
                            self.unexpected(&tag);
                            self.step(
                                InsertionMode::InBody,
                                Token::Tag(Tag {
                                    name: StrTendril::from_slice("img"),
                                    ..tag
                                }),
                            )
                        },

                        (StartTag, "isindex") => {
                            self.unexpected(&tag);
                            if self.form_elem.is_some() {
                                return ProcessResult::Done;
                            }
                            let mut form_attrs = vec![];
                            if let Some(action) = tag.get_attribute("action") {
                                form_attrs.push(Attribute {
                                    name: StrTendril::from_slice("action"),
                                    value: action.clone(),
                                });
                            }
                            let prompt = match tag.get_attribute("prompt") {
                                Some(prompt) => prompt.clone(),
                                None => StrTendril::from_slice(
                                    "This is a searchable index. Enter search keywords: ",
                                ),
                            };
                            let mut input_attrs: Vec<Attribute> = tag
                                .attrs
                                .into_iter()
                                .filter(|attr| {
                                    !matches!(&*attr.name, "name" | "action" | "prompt")
                                })
                                .collect();
                            input_attrs.push(Attribute {
                                name: StrTendril::from_slice("name"),
                                value: StrTendril::from_slice("isindex"),
                            });

                            let _ = self.step(
                                InsertionMode::InBody,
                                Token::Tag(Tag {
                                    kind: StartTag,
                                    name: StrTendril::from_slice("form"),
                                    self_closing: false,
                                    attrs: form_attrs,
                                }),
                            );
                            let _ = self.step(InsertionMode::InBody, start_tag("hr"));
                            let _ = self.step(InsertionMode::InBody, start_tag("p"));
                            let _ = self.step(InsertionMode::InBody, start_tag("label"));
                            let _ = self.append_text(prompt);
                            let _ = self.step(
                                InsertionMode::InBody,
                                Token::Tag(Tag {
                                    kind: StartTag,
                                    name: StrTendril::from_slice("input"),
                                    self_closing: false,
                                    attrs: input_attrs,
                                }),
                            );
                            let _ = self.step(InsertionMode::InBody, end_tag("label"));
                            let _ = self.step(InsertionMode::InBody, end_tag("p"));
                            let _ = self.step(InsertionMode::InBody, start_tag("hr"));
                            let _ = self.step(InsertionMode::InBody, end_tag("form"));
                            ProcessResult::Done
                        },

                        (StartTag, "textarea") => {
                            self.ignore_lf = true;
                            self.frameset_ok = false;
                            self.parse_raw_data(tag, Rcdata)
                        },

                        (StartTag, "xmp") => {
                            self.reconstruct_active_formatting_elements();
                            self.frameset_ok = false;
                            self.parse_raw_data(tag, Rawtext)
                        },

                        (StartTag, "iframe") => {
                            self.frameset_ok = false;
                            self.parse_raw_data(tag, Rawtext)
                        },

                        (StartTag, "noembed") => self.parse_raw_data(tag, Rawtext),

                        (StartTag, "noscript") => {
                            if self.opts.scripting_enabled {
                                self.parse_raw_data(tag, Rawtext)
                            } else {
                                self.reconstruct_active_formatting_elements();
                                self.insert_element_for(tag);
                                ProcessResult::Done
                            }
                        },

                        (StartTag, "select") => {
                            self.reconstruct_active_formatting_elements();
                            self.insert_element_for(tag);
                            self.frameset_ok = false;
                            // NB: mode == InBody but possibly self.mode !=
                            // mode, if we're processing "as in the rules for
                            // InBody".
                            self.mode = match self.mode {
                                InsertionMode::InTable
                                | InsertionMode::InCaption
                                | InsertionMode::InColumnGroup
                                | InsertionMode::InTableBody
                                | InsertionMode::InRow
                                | InsertionMode::InCell => InsertionMode::InSelectInTable,
                                _ => InsertionMode::InSelect,
                            };
                            ProcessResult::Done
                        },

                        (StartTag, "option" | "optgroup") => {
                            if self.current_node_named("option") {
                                self.pop();
                            }
                            self.reconstruct_active_formatting_elements();
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "rp" | "rt") => {
                            if self.in_scope_named("ruby", false) {
                                self.generate_implied_end_tags(None);
                                if !self.current_node_named("ruby") {
                                    self.unexpected(&tag);
                                    while !self.current_node_named("ruby") {
                                        self.pop();
                                    }
                                }
                            }
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "math" | "svg") => {
                            // Foreign content (MathML/SVG) is out of scope.
                            self.sink
                                .parse_error(Borrowed("Foreign content is not supported"));
                            ProcessResult::Done
                        },

                        (
                            StartTag,
                            "caption" | "col" | "colgroup" | "frame" | "head" | "tbody" | "td"
                            | "tfoot" | "th" | "thead" | "tr",
                        ) => self.unexpected(&tag),

                        (StartTag, _) => {
                            // This element will be a phrasing element.
                            self.reconstruct_active_formatting_elements();
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (EndTag, "body") => {
                            if self.in_scope_named("body", false) {
                                self.check_body_end();
                                self.mode = InsertionMode::AfterBody;
                            } else {
                                self.sink
                                    .parse_error(Borrowed("</body> with no <body> in scope"));
                            }
                            ProcessResult::Done
                        },

                        (EndTag, "html") => {
                            if self.in_scope_named("body", false) {
                                self.check_body_end();
                                ProcessResult::Reprocess(InsertionMode::AfterBody, Token::Tag(tag))
                            } else {
                                self.sink
                                    .parse_error(Borrowed("</html> with no <body> in scope"));
                                ProcessResult::Done
                            }
                        },

                        (
                            EndTag,
                            "address" | "article" | "aside" | "blockquote" | "center" | "datagrid"
                            | "details" | "dir" | "div" | "dl" | "fieldset" | "figure" | "footer"
                            | "header" | "hgroup" | "listing" | "menu" | "nav" | "ol" | "pre"
                            | "section" | "ul",
                        ) => {
                            if self.in_scope_named(&name, false) {
                                self.generate_implied_end_tags(None);
                                self.expect_to_close(&name);
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (EndTag, "form") => {
                            if self.in_scope_named("form", false) {
                                self.generate_implied_end_tags(None);
                            }
                            if self.current_node_named("form") {
                                self.pop();
                            } else {
                                self.unexpected(&tag);
                            }
                            // In any case, the form element pointer is gone.
                            self.form_elem = None;
                            ProcessResult::Done
                        },

                        (EndTag, "p") => {
                            if self.in_scope_named("p", false) {
                                self.close_p_element();
                            } else {
                                self.sink.parse_error(Borrowed("No <p> tag to close"));
                                self.insert_phantom("p");
                                self.close_p_element();
                            }
                            ProcessResult::Done
                        },

                        (EndTag, "li" | "dd" | "dt") => {
                            if self.in_scope_named(&name, false) {
                                self.generate_implied_end_tags(Some(&*name));
                                self.expect_to_close(&name);
                            } else {
                                self.sink.parse_error(Borrowed("No matching tag to close"));
                            }
                            ProcessResult::Done
                        },

                        (EndTag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                            if self.any_in_scope(&["h1", "h2", "h3", "h4", "h5", "h6"], false) {
                                self.generate_implied_end_tags(None);
                                if !self.current_node_named(&name) {
                                    self.sink.parse_error(Borrowed("Closing wrong heading tag"));
                                }
                                self.pop_until_in(&tag_sets::HEADING);
                            } else {
                                self.sink.parse_error(Borrowed("No heading tag to close"));
                            }
                            ProcessResult::Done
                        },

                        (
                            EndTag,
                            "a" | "b" | "big" | "em" | "font" | "i" | "nobr" | "s" | "small"
                            | "strike" | "strong" | "tt" | "u",
                        ) => {
                            self.adoption_agency(&name);
                            ProcessResult::Done
                        },

                        (EndTag, "applet" | "button" | "marquee" | "object") => {
                            if self.in_scope_named(&name, false) {
                                self.generate_implied_end_tags(None);
                                self.expect_to_close(&name);
                                self.clear_active_formatting_to_marker();
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (EndTag, "br") => {
                            self.unexpected(&tag);
                            self.step(
                                InsertionMode::InBody,
                                Token::Tag(Tag {
                                    kind: StartTag,
                                    attrs: vec![],
                                    ..tag
                                }),
                            )
                        },

                        (EndTag, _) => {
                            self.process_end_tag_in_body(tag);
                            ProcessResult::Done
                        },
                    }
                },
            },

            // <https://html.spec.whatwg.org/#parsing-main-incdata>
            // Raw text or RCDATA collected on behalf of the current
            // element; the matching end tag (or EOF) pops it and restores
            // the saved mode.
            InsertionMode::Text => match token {
                Token::Characters(text) => self.append_text(text),

                Token::Eof => {
                    self.unexpected(&Token::Eof);
                    self.pop();
                    let mode = self.orig_mode.take().expect("no original mode");
                    ProcessResult::Reprocess(mode, Token::Eof)
                },

                Token::Tag(tag) => {
                    if tag.kind == EndTag {
                        self.pop();
                        self.mode = self.orig_mode.take().expect("no original mode");
                    } else {
                        self.unexpected(&tag);
                    }
                    ProcessResult::Done
                },

                token => self.unexpected(&token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-intable>
            InsertionMode::InTable => match token {
                Token::Characters(text) => {
                    if any_not_whitespace(&text) {
                        self.sink
                            .parse_error(Borrowed("Stray character data in table"));
                        self.foster_parent_in_body(Token::Characters(text))
                    } else {
                        self.append_text(text)
                    }
                },

                Token::Comment(text) => self.append_comment(text),

                Token::Eof => {
                    if !self.current_node_named("html") {
                        self.unexpected(&Token::Eof);
                    }
                    self.stop_parsing()
                },

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "caption") => {
                            self.pop_until_current_in(&tag_sets::TABLE_CONTEXT);
                            self.active_formatting.push(FormatEntry::Marker);
                            self.insert_element_for(tag);
                            self.mode = InsertionMode::InCaption;
                            ProcessResult::Done
                        },

                        (StartTag, "colgroup") => {
                            self.pop_until_current_in(&tag_sets::TABLE_CONTEXT);
                            self.insert_element_for(tag);
                            self.mode = InsertionMode::InColumnGroup;
                            ProcessResult::Done
                        },

                        (StartTag, "col") => {
                            self.pop_until_current_in(&tag_sets::TABLE_CONTEXT);
                            self.insert_phantom("colgroup");
                            ProcessResult::Reprocess(InsertionMode::InColumnGroup, Token::Tag(tag))
                        },

                        (StartTag, "tbody" | "tfoot" | "thead") => {
                            self.pop_until_current_in(&tag_sets::TABLE_CONTEXT);
                            self.insert_element_for(tag);
                            self.mode = InsertionMode::InTableBody;
                            ProcessResult::Done
                        },

                        (StartTag, "td" | "th" | "tr") => {
                            self.pop_until_current_in(&tag_sets::TABLE_CONTEXT);
                            self.insert_phantom("tbody");
                            ProcessResult::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
                        },

                        (StartTag, "table") => {
                            self.unexpected(&tag);
                            if self.in_scope_named("table", true) {
                                self.pop_until_named("table");
                                self.mode = self.reset_insertion_mode();
                            }
                            ProcessResult::Done
                        },

                        (EndTag, "table") => {
                            if self.in_scope_named("table", true) {
                                self.pop_until_named("table");
                                self.mode = self.reset_insertion_mode();
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (
                            EndTag,
                            "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td"
                            | "tfoot" | "th" | "thead" | "tr",
                        ) => self.unexpected(&tag),

                        (StartTag, "style" | "script") => {
                            self.step(InsertionMode::InHead, Token::Tag(tag))
                        },

                        (StartTag, "input") => {
                            self.unexpected(&tag);
                            if self.is_type_hidden(&tag) {
                                self.insert_and_pop_element_for(tag);
                                ProcessResult::Done
                            } else {
                                self.foster_parent_in_body(Token::Tag(tag))
                            }
                        },

                        _ => {
                            self.unexpected(&tag);
                            self.foster_parent_in_body(Token::Tag(tag))
                        },
                    }
                },

                token => {
                    self.unexpected(&token);
                    ProcessResult::Done
                },
            },

            // <https://html.spec.whatwg.org/#parsing-main-incaption>
            InsertionMode::InCaption => match token {
                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (
                            StartTag,
                            "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th"
                            | "thead" | "tr",
                        )
                        | (EndTag, "table" | "caption") => {
                            if self.in_scope_named("caption", true) {
                                self.generate_implied_end_tags(None);
                                self.expect_to_close("caption");
                                self.clear_active_formatting_to_marker();
                                if tag.kind == EndTag && &*name == "caption" {
                                    self.mode = InsertionMode::InTable;
                                    ProcessResult::Done
                                } else {
                                    ProcessResult::Reprocess(
                                        InsertionMode::InTable,
                                        Token::Tag(tag),
                                    )
                                }
                            } else {
                                self.unexpected(&tag)
                            }
                        },

                        (
                            EndTag,
                            "body" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th"
                            | "thead" | "tr",
                        ) => self.unexpected(&tag),

                        _ => self.step(InsertionMode::InBody, Token::Tag(tag)),
                    }
                },

                token => self.step(InsertionMode::InBody, token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-incolgroup>
            InsertionMode::InColumnGroup => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Eof => {
                    if self.current_node_named("html") {
                        self.stop_parsing()
                    } else {
                        self.column_group_anything_else(Token::Eof)
                    }
                },

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                        (StartTag, "col") => {
                            self.insert_and_pop_element_for(tag);
                            ProcessResult::Done
                        },

                        (EndTag, "colgroup") => {
                            if self.current_node_named("colgroup") {
                                self.pop();
                                self.mode = InsertionMode::InTable;
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (EndTag, "col") => self.unexpected(&tag),

                        _ => self.column_group_anything_else(Token::Tag(tag)),
                    }
                },

                token => self.column_group_anything_else(token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-intbody>
            InsertionMode::InTableBody => match token {
                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "tr") => {
                            self.pop_until_current_in(&tag_sets::TABLE_BODY_CONTEXT);
                            self.insert_element_for(tag);
                            self.mode = InsertionMode::InRow;
                            ProcessResult::Done
                        },

                        (StartTag, "th" | "td") => {
                            self.unexpected(&tag);
                            self.pop_until_current_in(&tag_sets::TABLE_BODY_CONTEXT);
                            self.insert_phantom("tr");
                            ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                        },

                        (EndTag, "tbody" | "tfoot" | "thead") => {
                            if self.in_scope_named(&name, true) {
                                self.pop_until_current_in(&tag_sets::TABLE_BODY_CONTEXT);
                                self.pop();
                                self.mode = InsertionMode::InTable;
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (StartTag, "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead")
                        | (EndTag, "table") => {
                            if self.any_in_scope(&["tbody", "thead", "tfoot"], true) {
                                self.pop_until_current_in(&tag_sets::TABLE_BODY_CONTEXT);
                                self.pop();
                                ProcessResult::Reprocess(InsertionMode::InTable, Token::Tag(tag))
                            } else {
                                self.unexpected(&tag)
                            }
                        },

                        (
                            EndTag,
                            "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" | "tr",
                        ) => self.unexpected(&tag),

                        _ => self.step(InsertionMode::InTable, Token::Tag(tag)),
                    }
                },

                token => self.step(InsertionMode::InTable, token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-intr>
            InsertionMode::InRow => match token {
                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "th" | "td") => {
                            self.pop_until_current_in(&tag_sets::TABLE_ROW_CONTEXT);
                            self.insert_element_for(tag);
                            self.mode = InsertionMode::InCell;
                            self.active_formatting.push(FormatEntry::Marker);
                            ProcessResult::Done
                        },

                        (EndTag, "tr") => {
                            if self.in_scope_named("tr", true) {
                                self.pop_until_current_in(&tag_sets::TABLE_ROW_CONTEXT);
                                self.pop();
                                self.mode = InsertionMode::InTableBody;
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (
                            StartTag,
                            "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr",
                        )
                        | (EndTag, "table") => {
                            if self.in_scope_named("tr", true) {
                                self.pop_until_current_in(&tag_sets::TABLE_ROW_CONTEXT);
                                self.pop();
                                ProcessResult::Reprocess(
                                    InsertionMode::InTableBody,
                                    Token::Tag(tag),
                                )
                            } else {
                                self.unexpected(&tag)
                            }
                        },

                        (EndTag, "tbody" | "tfoot" | "thead") => {
                            if self.in_scope_named(&name, true) {
                                if self.in_scope_named("tr", true) {
                                    self.pop_until_current_in(&tag_sets::TABLE_ROW_CONTEXT);
                                    self.pop();
                                    ProcessResult::Reprocess(
                                        InsertionMode::InTableBody,
                                        Token::Tag(tag),
                                    )
                                } else {
                                    ProcessResult::Done
                                }
                            } else {
                                self.unexpected(&tag)
                            }
                        },

                        (EndTag, "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th") => {
                            self.unexpected(&tag)
                        },

                        _ => self.step(InsertionMode::InTable, Token::Tag(tag)),
                    }
                },

                token => self.step(InsertionMode::InTable, token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-intd>
            InsertionMode::InCell => match token {
                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (EndTag, "td" | "th") => {
                            if self.in_scope_named(&name, true) {
                                self.generate_implied_end_tags(Some(&*name));
                                self.expect_to_close(&name);
                                self.clear_active_formatting_to_marker();
                                self.mode = InsertionMode::InRow;
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (
                            StartTag,
                            "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th"
                            | "thead" | "tr",
                        ) => {
                            if self.any_in_scope(&["td", "th"], true) {
                                self.close_the_cell();
                                ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                            } else {
                                self.unexpected(&tag)
                            }
                        },

                        (EndTag, "body" | "caption" | "col" | "colgroup" | "html") => {
                            self.unexpected(&tag)
                        },

                        (EndTag, "table" | "tbody" | "tfoot" | "thead" | "tr") => {
                            if self.in_scope_named(&name, true) {
                                self.close_the_cell();
                                ProcessResult::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                            } else {
                                self.unexpected(&tag)
                            }
                        },

                        _ => self.step(InsertionMode::InBody, Token::Tag(tag)),
                    }
                },

                token => self.step(InsertionMode::InBody, token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-inselect>
            InsertionMode::InSelect => match token {
                Token::Characters(text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Eof => {
                    if !self.current_node_named("html") {
                        self.unexpected(&Token::Eof);
                    }
                    self.stop_parsing()
                },

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                        (StartTag, "option") => {
                            if self.current_node_named("option") {
                                self.pop();
                            }
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "optgroup") => {
                            if self.current_node_named("option") {
                                self.pop();
                            }
                            if self.current_node_named("optgroup") {
                                self.pop();
                            }
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (EndTag, "optgroup") => {
                            if self.open_elems.len() >= 2
                                && self.current_node_named("option")
                                && self.elem_named(
                                    &self.open_elems[self.open_elems.len() - 2].clone(),
                                    "optgroup",
                                )
                            {
                                self.pop();
                            }
                            if self.current_node_named("optgroup") {
                                self.pop();
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (EndTag, "option") => {
                            if self.current_node_named("option") {
                                self.pop();
                            } else {
                                self.unexpected(&tag);
                            }
                            ProcessResult::Done
                        },

                        (StartTag, "select") | (EndTag, "select") => {
                            let in_scope = self.in_scope_named("select", true);
                            if !in_scope || tag.kind == StartTag {
                                self.unexpected(&tag);
                            }
                            if in_scope {
                                self.pop_until_named("select");
                                self.mode = self.reset_insertion_mode();
                            }
                            ProcessResult::Done
                        },

                        (StartTag, "input" | "keygen" | "textarea") => {
                            self.unexpected(&tag);
                            if self.in_scope_named("select", true) {
                                self.pop_until_named("select");
                                ProcessResult::Reprocess(
                                    self.reset_insertion_mode(),
                                    Token::Tag(tag),
                                )
                            } else {
                                ProcessResult::Done
                            }
                        },

                        (StartTag, "script") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                        _ => self.unexpected(&tag),
                    }
                },

                token => self.unexpected(&token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-inselectintable>
            InsertionMode::InSelectInTable => match token {
                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (
                            StartTag,
                            "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th",
                        ) => {
                            self.unexpected(&tag);
                            self.pop_until_named("select");
                            ProcessResult::Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                        },

                        (
                            EndTag,
                            "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th",
                        ) => {
                            self.unexpected(&tag);
                            if self.in_scope_named(&name, true) {
                                self.pop_until_named("select");
                                ProcessResult::Reprocess(
                                    self.reset_insertion_mode(),
                                    Token::Tag(tag),
                                )
                            } else {
                                ProcessResult::Done
                            }
                        },

                        _ => self.step(InsertionMode::InSelect, Token::Tag(tag)),
                    }
                },

                token => self.step(InsertionMode::InSelect, token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-afterbody>
            InsertionMode::AfterBody => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => {
                    self.step(InsertionMode::InBody, Token::Characters(text))
                },
                Token::Comment(text) => self.append_comment_to_html(text),
                Token::Eof => self.stop_parsing(),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                        (EndTag, "html") => {
                            self.mode = InsertionMode::AfterAfterBody;
                            ProcessResult::Done
                        },
                        _ => {
                            self.unexpected(&tag);
                            ProcessResult::Reprocess(InsertionMode::InBody, Token::Tag(tag))
                        },
                    }
                },

                token => {
                    self.unexpected(&token);
                    ProcessResult::Reprocess(InsertionMode::InBody, token)
                },
            },

            // <https://html.spec.whatwg.org/#parsing-main-inframeset>
            InsertionMode::InFrameset => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),

                Token::Eof => {
                    if self.open_elems.len() != 1 {
                        self.unexpected(&Token::Eof);
                    }
                    self.stop_parsing()
                },

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                        (StartTag, "frameset") => {
                            self.insert_element_for(tag);
                            ProcessResult::Done
                        },

                        (EndTag, "frameset") => {
                            if self.open_elems.len() == 1 {
                                self.unexpected(&tag);
                            } else {
                                self.pop();
                                if !self.current_node_named("frameset") {
                                    self.mode = InsertionMode::AfterFrameset;
                                }
                            }
                            ProcessResult::Done
                        },

                        (StartTag, "frame") => {
                            self.insert_and_pop_element_for(tag);
                            ProcessResult::Done
                        },

                        (StartTag, "noframes") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                        _ => self.unexpected(&tag),
                    }
                },

                token => self.unexpected(&token),
            },

            // <https://html.spec.whatwg.org/#parsing-main-afterframeset>
            InsertionMode::AfterFrameset => match token {
                Token::Characters(text) if !any_not_whitespace(&text) => self.append_text(text),
                Token::Comment(text) => self.append_comment(text),
                Token::Eof => self.stop_parsing(),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                        (EndTag, "html") => {
                            self.mode = InsertionMode::AfterAfterFrameset;
                            ProcessResult::Done
                        },
                        (StartTag, "noframes") => self.step(InsertionMode::InHead, Token::Tag(tag)),
                        _ => self.unexpected(&tag),
                    }
                },

                token => self.unexpected(&token),
            },

            // <https://html.spec.whatwg.org/#the-after-after-body-insertion-mode>
            InsertionMode::AfterAfterBody => match token {
                Token::Comment(text) => self.append_comment_to_doc(text),
                Token::Characters(text) if !any_not_whitespace(&text) => {
                    self.step(InsertionMode::InBody, Token::Characters(text))
                },
                Token::Eof => self.stop_parsing(),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                        _ => {
                            self.unexpected(&tag);
                            ProcessResult::Reprocess(InsertionMode::InBody, Token::Tag(tag))
                        },
                    }
                },

                token => {
                    self.unexpected(&token);
                    ProcessResult::Reprocess(InsertionMode::InBody, token)
                },
            },

            // <https://html.spec.whatwg.org/#the-after-after-frameset-insertion-mode>
            InsertionMode::AfterAfterFrameset => match token {
                Token::Comment(text) => self.append_comment_to_doc(text),
                Token::Characters(text) if !any_not_whitespace(&text) => {
                    self.step(InsertionMode::InBody, Token::Characters(text))
                },
                Token::Eof => self.stop_parsing(),

                Token::Tag(tag) => {
                    let name = tag.name.clone();
                    match (tag.kind, &*name) {
                        (StartTag, "html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                        (StartTag, "noframes") => self.step(InsertionMode::InHead, Token::Tag(tag)),
                        _ => self.unexpected(&tag),
                    }
                },

                token => self.unexpected(&token),
            },
        }
    }
}
