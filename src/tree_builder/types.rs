// Copyright 2026 The arbor Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Types used within the tree builder code. Not exported to users.

use crate::tokenizer::states::RawKind;
use crate::tokenizer::Token;

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum InsertionMode {
    /// <https://html.spec.whatwg.org/#the-initial-insertion-mode>
    Initial,
    /// <https://html.spec.whatwg.org/#the-before-html-insertion-mode>
    BeforeHtml,
    /// <https://html.spec.whatwg.org/#the-before-head-insertion-mode>
    BeforeHead,
    /// <https://html.spec.whatwg.org/#parsing-main-inhead>
    InHead,
    /// <https://html.spec.whatwg.org/#parsing-main-inheadnoscript>
    InHeadNoscript,
    /// <https://html.spec.whatwg.org/#the-after-head-insertion-mode>
    AfterHead,
    /// <https://html.spec.whatwg.org/#parsing-main-inbody>
    InBody,
    /// <https://html.spec.whatwg.org/#parsing-main-incdata>
    Text,
    /// <https://html.spec.whatwg.org/#parsing-main-intable>
    InTable,
    /// <https://html.spec.whatwg.org/#parsing-main-incaption>
    InCaption,
    /// <https://html.spec.whatwg.org/#parsing-main-incolgroup>
    InColumnGroup,
    /// <https://html.spec.whatwg.org/#parsing-main-intbody>
    InTableBody,
    /// <https://html.spec.whatwg.org/#parsing-main-intr>
    InRow,
    /// <https://html.spec.whatwg.org/#parsing-main-intd>
    InCell,
    /// <https://html.spec.whatwg.org/#parsing-main-inselect>
    InSelect,
    /// <https://html.spec.whatwg.org/#parsing-main-inselectintable>
    InSelectInTable,
    /// <https://html.spec.whatwg.org/#parsing-main-afterbody>
    AfterBody,
    /// <https://html.spec.whatwg.org/#parsing-main-inframeset>
    InFrameset,
    /// <https://html.spec.whatwg.org/#parsing-main-afterframeset>
    AfterFrameset,
    /// <https://html.spec.whatwg.org/#the-after-after-body-insertion-mode>
    AfterAfterBody,
    /// <https://html.spec.whatwg.org/#the-after-after-frameset-insertion-mode>
    AfterAfterFrameset,
}

/// What one dispatch step asks the driving loop to do next.
pub(crate) enum ProcessResult {
    Done,
    Reprocess(InsertionMode, Token),
    ToRawData(RawKind),
    ToPlaintext,
}

/// An entry in the list of active formatting elements: a live element,
/// or a marker bounding the entries opened in the current scoping
/// context (button, applet/marquee/object, table cell, caption).
pub(crate) enum FormatEntry<Handle> {
    Element(Handle),
    Marker,
}

/// Where the next node goes. Computed immediately before an insertion
/// and consumed by that same insertion; never stored across two.
pub(crate) enum InsertionPoint<Handle> {
    /// Append as the last child of this node.
    LastChild(Handle),
    /// Insert immediately before this sibling (the foster case where the
    /// table has a parent).
    BeforeSibling(Handle),
}
