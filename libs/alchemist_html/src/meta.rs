//! Cleaned up and indexed data about HTML elements, for tag lookup during
//! rendering.

use std::collections::HashMap;

use anyhow::{bail, Result};
use kstring::KString;

// https://developer.mozilla.org/en-US/docs/Web/HTML/Element
// Includes deprecated elements (keygen, param) that still occur in the
// wild and in the void set.
const HTML_TAG_NAMES: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "audio",
    "b", "base", "bdi", "bdo", "blockquote", "body", "br", "button",
    "canvas", "caption", "cite", "code", "col", "colgroup",
    "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div",
    "dl", "dt",
    "em", "embed",
    "fieldset", "figcaption", "figure", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr",
    "html",
    "i", "iframe", "img", "input", "ins",
    "kbd", "keygen",
    "label", "legend", "li", "link",
    "main", "map", "mark", "menu", "meta", "meter",
    "nav", "noscript",
    "object", "ol", "optgroup", "option", "output",
    "p", "param", "picture", "pre", "progress",
    "q",
    "rp", "rt", "ruby",
    "s", "samp", "script", "search", "section", "select", "slot", "small",
    "source", "span", "strong", "style", "sub", "summary", "sup",
    "table", "tbody", "td", "template", "textarea", "tfoot", "th", "thead",
    "time", "title", "tr", "track",
    "u", "ul",
    "var", "video",
    "wbr",
];

// https://developer.mozilla.org/en-US/docs/Glossary/Void_element
const VOID_TAG_NAMES: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen",
    "link", "meta", "param", "source", "track", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMeta {
    pub tag_name: KString,
    pub has_closing_tag: bool,
}

/// Indexed element metadata. Unknown tag names (custom elements) are
/// permitted everywhere; they serialize with a closing tag.
#[derive(Debug)]
pub struct MetaDb {
    elementmeta: HashMap<KString, ElementMeta>,
}

impl MetaDb {
    pub fn get(&self, tag_name: &str) -> Option<&ElementMeta> {
        self.elementmeta.get(tag_name)
    }

    pub fn is_void(&self, tag_name: &str) -> bool {
        self.get(tag_name).map_or(false, |meta| !meta.has_closing_tag)
    }

    pub fn has_closing_tag(&self, tag_name: &str) -> bool {
        !self.is_void(tag_name)
    }

    pub fn element_names(&self) -> impl Iterator<Item = &KString> {
        self.elementmeta.keys()
    }

    pub fn len(&self) -> usize {
        self.elementmeta.len()
    }
}

pub fn read_meta_db() -> Result<MetaDb> {
    for tag_name in VOID_TAG_NAMES {
        if !HTML_TAG_NAMES.contains(tag_name) {
            bail!("void tag {tag_name:?} missing from the element list")
        }
    }
    let elementmeta = HTML_TAG_NAMES
        .iter()
        .map(|&tag_name| {
            (
                KString::from_static(tag_name),
                ElementMeta {
                    tag_name: KString::from_static(tag_name),
                    has_closing_tag: !VOID_TAG_NAMES.contains(&tag_name),
                },
            )
        })
        .collect();
    Ok(MetaDb { elementmeta })
}
