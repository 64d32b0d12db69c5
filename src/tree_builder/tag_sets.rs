// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Static tag tables driving classification and scope checks.
//!
//! Membership tests on these sets are on the hot path of nearly every
//! rule, so they are compile-time perfect-hash sets rather than linear
//! scans.

use phf::{phf_set, Set};

/// How a tag behaves for stack-repair purposes. Every tag not in one of
/// the three named sets is phrasing content.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum ElementCategory {
    Special,
    Scoping,
    Formatting,
    Phrasing,
}

/// Tags with their own parsing rules. A generic end tag stops dead when
/// it meets one of these, and the adoption agency picks its "furthest
/// block" from this category (together with the scoping set).
pub(crate) static SPECIAL: Set<&'static str> = phf_set! {
    "address", "area", "base", "basefont", "bgsound", "blockquote", "body",
    "br", "center", "col", "colgroup", "dd", "dir", "div", "dl", "dt",
    "embed", "fieldset", "form", "frame", "frameset", "h1", "h2", "h3",
    "h4", "h5", "h6", "head", "hr", "iframe", "image", "img", "input",
    "isindex", "li", "link", "listing", "menu", "meta", "noembed",
    "noframes", "noscript", "ol", "optgroup", "option", "p", "param",
    "plaintext", "pre", "script", "select", "spacer", "style", "tbody",
    "textarea", "tfoot", "thead", "title", "tr", "ul", "wbr",
};

/// Tags that bound formatting scopes.
pub(crate) static SCOPING: Set<&'static str> = phf_set! {
    "button", "caption", "html", "marquee", "object", "table", "td", "th",
};

/// Tags the adoption agency is responsible for re-opening.
pub(crate) static FORMATTING: Set<&'static str> = phf_set! {
    "a", "b", "big", "em", "font", "i", "nobr", "s", "small", "strike",
    "strong", "tt", "u",
};

pub(crate) fn element_category(name: &str) -> ElementCategory {
    if SPECIAL.contains(name) {
        ElementCategory::Special
    } else if SCOPING.contains(name) {
        ElementCategory::Scoping
    } else if FORMATTING.contains(name) {
        ElementCategory::Formatting
    } else {
        ElementCategory::Phrasing
    }
}

/// Extra boundaries for the table-scope variant of the scope check; a
/// plain scope check fails only on `table`.
pub(crate) static TABLE_SCOPE_BOUNDARY: Set<&'static str> = phf_set! {
    "caption", "td", "th", "button", "marquee", "object",
};

/// Elements closed by generated implied end tags.
pub(crate) static IMPLIED_END: Set<&'static str> = phf_set! {
    "dd", "dt", "li", "option", "optgroup", "p", "rp", "rt", "td", "th",
    "tr",
};

/// Insertions targeting one of these elements are foster parented while
/// table-context recovery is active.
pub(crate) static TABLE_FOSTER_TARGETS: Set<&'static str> = phf_set! {
    "table", "tbody", "tfoot", "thead", "tr",
};

/// Stop set for clearing the stack back to a table context.
pub(crate) static TABLE_CONTEXT: Set<&'static str> = phf_set! {
    "html", "table",
};

/// Stop set for clearing the stack back to a table body context.
pub(crate) static TABLE_BODY_CONTEXT: Set<&'static str> = phf_set! {
    "tbody", "tfoot", "thead", "html",
};

/// Stop set for clearing the stack back to a table row context.
pub(crate) static TABLE_ROW_CONTEXT: Set<&'static str> = phf_set! {
    "tr", "html",
};

/// Elements allowed to still be open when the body ends.
pub(crate) static BODY_END_OK: Set<&'static str> = phf_set! {
    "dd", "dt", "li", "optgroup", "option", "p", "rp", "rt", "tbody",
    "td", "tfoot", "th", "thead", "tr", "body", "html",
};

/// The heading tags.
pub(crate) static HEADING: Set<&'static str> = phf_set! {
    "h1", "h2", "h3", "h4", "h5", "h6",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_partition_by_priority() {
        assert_eq!(element_category("p"), ElementCategory::Special);
        assert_eq!(element_category("table"), ElementCategory::Scoping);
        assert_eq!(element_category("b"), ElementCategory::Formatting);
        assert_eq!(element_category("span"), ElementCategory::Phrasing);
        assert_eq!(element_category("made-up-tag"), ElementCategory::Phrasing);
    }

    #[test]
    fn scope_boundaries_are_disjoint_from_implied_end() {
        for tag in ["caption", "button", "marquee", "object"] {
            assert!(!IMPLIED_END.contains(tag));
            assert!(TABLE_SCOPE_BOUNDARY.contains(tag));
        }
    }
}
