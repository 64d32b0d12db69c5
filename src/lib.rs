// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Browser-grade HTML5 tree construction.
//!
//! `arbor` is the tree-construction stage of an HTML5 parser: it takes
//! the token stream an HTML tokenizer produces and builds a DOM tree,
//! following the tree-construction algorithm of the HTML standard
//! (insertion modes, the stack of open elements, the list of active
//! formatting elements, the adoption agency, foster parenting) with
//! the standard's recovery behavior for malformed markup. Every input
//! yields a tree; parse errors are reported, never thrown.
//!
//! Tokenization is out of scope. A token source implements
//! [`tokenizer::TokenSource`] and must honor the lexical-state switches
//! the tree builder requests (RCDATA, RAWTEXT, PLAINTEXT). The tree is
//! grown through a [`TreeSink`]; [`ArenaDom`] is the sink shipped with
//! the crate.

pub use crate::arena_dom::ArenaDom;
pub use crate::interface::{Attribute, NodeOrText, TreeSink};
pub use crate::tree_builder::{TreeBuilder, TreeBuilderOpts};

pub mod arena_dom;
pub mod interface;
pub mod serialize;
pub mod tokenizer;
pub mod tree_builder;

/// Re-export the tendril crate.
pub use tendril;
