// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The token boundary between tokenization and tree construction.
//!
//! This crate does not tokenize. These are the tokens a source hands the
//! tree builder, and the contracts both sides of the boundary follow:
//! the source implements [`TokenSource`], the tree builder implements
//! [`TokenSink`] and answers each token with a [`TokenSinkResult`]
//! telling the source which lexical state to produce the next tokens in.

pub use self::TagKind::{EndTag, StartTag};
pub use crate::interface::Attribute;

pub mod states;

use self::states::RawKind;
use tendril::StrTendril;

/// A `DOCTYPE` token.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Doctype {
    pub name: Option<StrTendril>,
    pub public_id: Option<StrTendril>,
    pub system_id: Option<StrTendril>,
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum TagKind {
    StartTag,
    EndTag,
}

/// A tag token.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tag {
    pub kind: TagKind,
    pub name: StrTendril,
    pub self_closing: bool,
    pub attrs: Vec<Attribute>,
}

impl Tag {
    /// The value of the attribute with the given name, if present.
    pub fn get_attribute(&self, name: &str) -> Option<&StrTendril> {
        self.attrs
            .iter()
            .find(|attr| &*attr.name == name)
            .map(|attr| &attr.value)
    }
}

/// A token produced by the source. Immutable once produced; the tree
/// builder synthesizes fresh tokens where the algorithm calls for it.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Token {
    Doctype(Doctype),
    Tag(Tag),
    Characters(StrTendril),
    Comment(StrTendril),
    Eof,
}

/// What the sink wants the token source to do next.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[must_use]
pub enum TokenSinkResult {
    /// Keep producing tokens in the data state.
    Continue,
    /// Switch to a raw-content state until the matching end tag or EOF.
    RawData(RawKind),
    /// Switch to the PLAINTEXT state for the rest of the input.
    Plaintext,
}

/// Types which can receive tokens from a token source.
pub trait TokenSink {
    /// Process a token. The result tells the source which lexical state
    /// the next tokens should be produced under.
    fn process_token(&mut self, token: Token) -> TokenSinkResult;

    /// Signal that the token stream has ended.
    fn end(&mut self) {}
}

/// A source of tokens, usually a tokenizer over characters.
///
/// The source must honor the `state` passed to `next_token`: once the
/// sink requests a raw-content or PLAINTEXT state, tokens are produced
/// under that state until its own exit condition (the matching end tag,
/// or end of input).
pub trait TokenSource {
    fn next_token(&mut self, state: states::State) -> Token;
}
