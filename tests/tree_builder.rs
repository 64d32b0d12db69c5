// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end tree construction tests: scripted token streams go
//! through the tree builder into an arena DOM, and the serialized tree
//! is compared against the expected markup.

use arbor::serialize::serialize_document;
use arbor::tendril::StrTendril;
use arbor::tokenizer::states::State;
use arbor::tokenizer::{Attribute, Doctype, Tag, TagKind, Token, TokenSource};
use arbor::{ArenaDom, TreeBuilder, TreeBuilderOpts};

/// A token source that replays a scripted stream, then EOF forever.
/// Lexical-state switches are already baked into the script.
struct Script(std::vec::IntoIter<Token>);

impl TokenSource for Script {
    fn next_token(&mut self, _state: State) -> Token {
        self.0.next().unwrap_or(Token::Eof)
    }
}

fn parse_with_opts(tokens: Vec<Token>, opts: TreeBuilderOpts) -> ArenaDom {
    let mut builder = TreeBuilder::new(ArenaDom::default(), opts);
    let mut source = Script(tokens.into_iter());
    builder.run(&mut source);
    builder.finish()
}

fn parse(tokens: Vec<Token>) -> ArenaDom {
    parse_with_opts(tokens, TreeBuilderOpts::default())
}

fn parse_to_string(tokens: Vec<Token>) -> String {
    serialize_document(&parse(tokens))
}

fn start(name: &str) -> Token {
    Token::Tag(Tag {
        kind: TagKind::StartTag,
        name: StrTendril::from_slice(name),
        self_closing: false,
        attrs: vec![],
    })
}

fn start_attrs(name: &str, attrs: &[(&str, &str)]) -> Token {
    Token::Tag(Tag {
        kind: TagKind::StartTag,
        name: StrTendril::from_slice(name),
        self_closing: false,
        attrs: attrs
            .iter()
            .map(|&(name, value)| Attribute {
                name: StrTendril::from_slice(name),
                value: StrTendril::from_slice(value),
            })
            .collect(),
    })
}

fn end(name: &str) -> Token {
    Token::Tag(Tag {
        kind: TagKind::EndTag,
        name: StrTendril::from_slice(name),
        self_closing: false,
        attrs: vec![],
    })
}

fn text(data: &str) -> Token {
    Token::Characters(StrTendril::from_slice(data))
}

fn comment(data: &str) -> Token {
    Token::Comment(StrTendril::from_slice(data))
}

fn doctype(name: &str) -> Token {
    Token::Doctype(Doctype {
        name: Some(StrTendril::from_slice(name)),
        public_id: None,
        system_id: None,
    })
}

#[test]
fn well_formed_document() {
    let out = parse_to_string(vec![
        doctype("html"),
        start("html"),
        start("head"),
        end("head"),
        start("body"),
        text("Hi"),
        Token::Eof,
    ]);
    assert_eq!(
        out,
        "<!DOCTYPE html><html><head></head><body>Hi</body></html>"
    );
}

#[test]
fn empty_input_still_yields_a_tree() {
    let out = parse_to_string(vec![]);
    assert_eq!(out, "<html><head></head><body></body></html>");
}

#[test]
fn missing_doctype_is_reported() {
    let dom = parse(vec![start("html"), start("body"), text("x")]);
    assert!(!dom.errors.is_empty());
}

#[test]
fn adoption_agency_reopens_formatting_inside_block() {
    // <b><p></b>X</p>: the <b> spans a block boundary; the adoption
    // agency closes it and re-opens a clone inside the <p>.
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("b"),
        start("p"),
        end("b"),
        text("X"),
        end("p"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><b></b><p><b></b>X</p></body></html>"
    );
}

#[test]
fn table_character_data_is_foster_parented() {
    let dom = parse(vec![start("html"), start("body"), start("table"), text("foo")]);
    assert_eq!(
        serialize_document(&dom),
        "<html><head></head><body>foo<table></table></body></html>"
    );
    assert!(!dom.errors.is_empty());
}

#[test]
fn void_element_does_not_nest_following_content() {
    // <hr> is popped immediately, so the <p> is its sibling.
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("hr"),
        start("p"),
        text("y"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><hr><p>y</p></body></html>"
    );
}

#[test]
fn table_start_tag_inside_select_in_table_closes_the_select() {
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("table"),
        start("select"),
        start("table"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><select></select><table></table></body></html>"
    );
}

#[test]
fn paragraph_start_tag_closes_open_paragraph() {
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("p"),
        text("one"),
        start("p"),
        text("two"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><p>one</p><p>two</p></body></html>"
    );
}

#[test]
fn list_items_close_each_other() {
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("ul"),
        start("li"),
        text("a"),
        start("li"),
        text("b"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><ul><li>a</li><li>b</li></ul></body></html>"
    );
}

#[test]
fn nested_heading_is_popped() {
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("h1"),
        text("a"),
        start("h2"),
        text("b"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><h1>a</h1><h2>b</h2></body></html>"
    );
}

#[test]
fn formatting_element_is_reconstructed_in_next_block() {
    // The <b> left open across </p> re-opens inside the next <p>.
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("p"),
        start("b"),
        text("one"),
        end("p"),
        start("p"),
        text("two"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><p><b>one</b></p><p><b>two</b></p></body></html>"
    );
}

#[test]
fn table_row_and_cell_get_implied_tbody() {
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("table"),
        start("tr"),
        start("td"),
        text("Hi"),
        end("td"),
        end("tr"),
        end("table"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><table><tbody><tr><td>Hi</td></tr></tbody></table></body></html>"
    );
}

#[test]
fn caption_collects_body_content() {
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start("table"),
        start("caption"),
        text("cap"),
        end("table"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><table><caption>cap</caption></table></body></html>"
    );
}

#[test]
fn title_collects_raw_text() {
    let out = parse_to_string(vec![
        start("html"),
        start("head"),
        start("title"),
        text("hi"),
        end("title"),
        end("head"),
    ]);
    assert_eq!(
        out,
        "<html><head><title>hi</title></head><body></body></html>"
    );
}

#[test]
fn eof_inside_raw_text_recovers() {
    let dom = parse(vec![start("html"), start("head"), start("title"), text("hi")]);
    assert_eq!(
        serialize_document(&dom),
        "<html><head><title>hi</title></head><body></body></html>"
    );
    assert!(!dom.errors.is_empty());
}

#[test]
fn raw_text_is_escaped_on_serialization() {
    let out = parse_to_string(vec![
        start("html"),
        start("head"),
        start("noscript"),
        text("<b>"),
        end("noscript"),
    ]);
    assert_eq!(
        out,
        "<html><head><noscript>&lt;b&gt;</noscript></head><body></body></html>"
    );
}

#[test]
fn noscript_parses_as_markup_when_scripting_is_off() {
    let opts = TreeBuilderOpts {
        scripting_enabled: false,
        ..Default::default()
    };
    let dom = parse_with_opts(
        vec![
            start("html"),
            start("head"),
            start("noscript"),
            start("link"),
            end("noscript"),
            end("head"),
        ],
        opts,
    );
    assert_eq!(
        serialize_document(&dom),
        "<html><head><noscript><link></noscript></head><body></body></html>"
    );
}

#[test]
fn comment_after_body_attaches_to_html() {
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        end("body"),
        comment("x"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body></body><!--x--></html>"
    );
}

#[test]
fn frameset_document() {
    let out = parse_to_string(vec![
        start("html"),
        start("frameset"),
        start("frame"),
        end("frameset"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><frameset><frame></frameset></html>"
    );
}

#[test]
fn stray_end_tag_is_ignored() {
    let dom = parse(vec![start("html"), start("body"), end("div"), text("x")]);
    assert_eq!(
        serialize_document(&dom),
        "<html><head></head><body>x</body></html>"
    );
    assert!(!dom.errors.is_empty());
}

#[test]
fn end_tag_br_becomes_start_tag() {
    let out = parse_to_string(vec![start("html"), start("body"), end("br")]);
    assert_eq!(out, "<html><head></head><body><br></body></html>");
}

#[test]
fn image_start_tag_is_renamed_to_img() {
    let out = parse_to_string(vec![start("html"), start("body"), start("image")]);
    assert_eq!(out, "<html><head></head><body><img></body></html>");
}

#[test]
fn repeated_attribute_first_occurrence_wins() {
    let out = parse_to_string(vec![
        start("html"),
        start("body"),
        start_attrs("a", &[("href", "x"), ("href", "y"), ("class", "z")]),
        text("link"),
        end("a"),
    ]);
    assert_eq!(
        out,
        "<html><head></head><body><a href=\"x\" class=\"z\">link</a></body></html>"
    );
}

#[test]
fn isindex_expands_into_form() {
    let out = parse_to_string(vec![start("html"), start("body"), start("isindex")]);
    assert_eq!(
        out,
        "<html><head></head><body><form><hr><p><label>This is a searchable index. \
         Enter search keywords: <input name=\"isindex\"></label></p><hr></form></body></html>"
    );
}

#[test]
fn adoption_agency_terminates_on_pathological_input() {
    // Alternating misnested formatting elements and blocks; the bounded
    // outer loop must chew through this without hanging.
    let mut tokens = vec![start("html"), start("body")];
    for _ in 0..10 {
        tokens.push(start("a"));
        tokens.push(start("div"));
    }
    for _ in 0..10 {
        tokens.push(end("a"));
    }
    let dom = parse(tokens);
    assert!(!serialize_document(&dom).is_empty());
    assert!(!dom.errors.is_empty());
}

#[test]
fn deeply_nested_formatting_terminates() {
    let mut tokens = vec![start("html"), start("body")];
    for _ in 0..50 {
        tokens.push(start("b"));
        tokens.push(start("p"));
    }
    tokens.push(end("b"));
    let dom = parse(tokens);
    assert!(!serialize_document(&dom).is_empty());
}

#[test]
fn whitespace_before_head_is_dropped() {
    let out = parse_to_string(vec![
        doctype("html"),
        text("  \n"),
        start("html"),
        text("\t "),
        start("body"),
        text("x"),
    ]);
    assert_eq!(
        out,
        "<!DOCTYPE html><html><head></head><body>x</body></html>"
    );
}

#[test]
fn body_end_audit_reports_unclosed_elements() {
    let dom = parse(vec![start("html"), start("body"), start("div"), Token::Eof]);
    assert!(dom
        .errors
        .iter()
        .any(|msg| msg.contains("Unclosed elements")));
}
