//! The string backend: serializes expressions straight to HTML text.
//!
//! This backend performs no escaping on text content or attribute
//! values; callers escape what needs escaping (see `escape`). That makes
//! it textually identical to the live-document serializer on shared
//! input.

use std::fmt::Write;

use anyhow::Result;
use alchemist_html::meta::MetaDb;

use crate::dom::NodeId;
use crate::error::AlchemistError;
use crate::expr::{is_event_key, Expr};
use crate::interp::{self, Backend, ResolvedElement};
use crate::METADB;

pub struct HtmlBackend {
    metadb: &'static MetaDb,
}

impl HtmlBackend {
    pub fn new() -> HtmlBackend {
        HtmlBackend::new_with_metadb(&METADB)
    }

    pub fn new_with_metadb(metadb: &'static MetaDb) -> HtmlBackend {
        HtmlBackend { metadb }
    }
}

impl Default for HtmlBackend {
    fn default() -> Self {
        HtmlBackend::new()
    }
}

/// Render an expression to an HTML string.
pub fn alchemize(expr: &Expr) -> Result<String> {
    interp::alchemize(&HtmlBackend::new(), expr)
}

impl Backend for HtmlBackend {
    type Output = String;

    fn empty_placeholder(&self) -> Result<String> {
        Ok("<span></span>".to_string())
    }

    fn text(&self, s: &str) -> Result<String> {
        Ok(s.to_string())
    }

    fn passthrough(&self, node: NodeId) -> Result<String> {
        // a live node handle carries no serializable content here
        Err(AlchemistError::UnrecognizedExpression(format!("<node {node:?}>")).into())
    }

    fn element(&self, chain: &[ResolvedElement], children: Vec<String>) -> Result<String> {
        let mut out = String::new();
        self.write_element(chain, &children, &mut out)?;
        Ok(out)
    }

    fn siblings(&self, items: Vec<String>) -> Result<String> {
        // plain concatenation, no wrapper
        Ok(items.concat())
    }
}

impl HtmlBackend {
    fn write_element(
        &self,
        chain: &[ResolvedElement],
        children: &[String],
        out: &mut String,
    ) -> Result<()> {
        let (elem, rest) = chain.split_first().expect("chain is never empty");
        write!(out, "<{}", elem.tag)?;
        for (key, value) in elem.attrs.iter() {
            if is_event_key(key) {
                // handler properties are not representable in markup
                continue;
            }
            if let Some(value) = value.markup_form() {
                write!(out, " {key}=\"{value}\"")?;
            }
        }
        write!(out, ">")?;
        if !self.metadb.has_closing_tag(&elem.tag) {
            // void tag: no content even if some was supplied, and no
            // closing tag
            return Ok(());
        }
        if rest.is_empty() {
            for child in children {
                out.push_str(child);
            }
        } else {
            self.write_element(rest, children, out)?;
        }
        write!(out, "</{}>", elem.tag)?;
        Ok(())
    }
}

/// Wrap preserialized trusted HTML in an element, without escaping: the
/// deliberate escape hatch for pre-rendered content. The caller
/// guarantees `raw` is safe.
pub fn insert_raw(tag: &str, raw: &str) -> String {
    format!("<{tag}>{raw}</{tag}>")
}

/// Replace HTML metacharacters with entities. The rendering path never
/// calls this; callers apply it to untrusted text before building
/// expressions.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr;

    fn t(expr: &Expr) -> String {
        alchemize(expr).unwrap()
    }

    #[test]
    fn t_every_known_tag() {
        for tag in METADB.element_names() {
            let rendered = t(&expr!([(tag.as_str()), ""]));
            assert!(rendered.starts_with(&format!("<{tag}")), "{rendered}");
        }
    }

    #[test]
    fn t_void_tags() {
        assert_eq!(
            t(&expr!(["img", {"src": "x.png"}])),
            "<img src=\"x.png\">"
        );
        // content supplied to a void tag is dropped
        assert_eq!(
            t(&expr!(["img", {"src": "x.png"}, "nope"])),
            "<img src=\"x.png\">"
        );
        assert_eq!(t(&expr!(["br"])), "<br>");
        // unknown (custom element) tags always close
        assert_eq!(t(&expr!(["counter-app", ""])), "<counter-app></counter-app>");
    }

    #[test]
    fn t_attribute_suppression() {
        assert_eq!(
            t(&expr!(["input", {"disabled": false, "value": "x"}])),
            "<input value=\"x\">"
        );
        assert_eq!(
            t(&expr!(["div", {"data-x": ()}, ""])),
            "<div></div>"
        );
        assert_eq!(
            t(&expr!(["input", {"checked": true}])),
            "<input checked=\"true\">"
        );
        assert_eq!(
            t(&expr!(["input", {"maxlength": 10}])),
            "<input maxlength=\"10\">"
        );
    }

    #[test]
    fn t_handlers_omitted() {
        use crate::expr::AttrValue;
        assert_eq!(
            t(&expr!(["button", {"onclick": (AttrValue::handler(|_, _| ()))}, "hit"])),
            "<button>hit</button>"
        );
    }

    #[test]
    fn t_no_escaping() {
        // the backend writes text verbatim; escaping is the caller's job
        assert_eq!(t(&expr!(["p", "a < b & c"])), "<p>a < b & c</p>");
        assert_eq!(
            t(&expr!(["p", (escape("a < b & c"))])),
            "<p>a &lt; b &amp; c</p>"
        );
    }

    #[test]
    fn t_escape() {
        assert_eq!(escape("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape(""), "");
    }

    #[test]
    fn t_insert_raw() {
        assert_eq!(
            insert_raw("div", "<em>pre-rendered</em>"),
            "<div><em>pre-rendered</em></div>"
        );
    }

    #[test]
    fn t_passthrough_unrepresentable() {
        use crate::dom::Document;
        let document = Document::new(100);
        let node = document.create_element("p").unwrap();
        let err = alchemize(&Expr::Node(node)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AlchemistError>(),
            Some(AlchemistError::UnrecognizedExpression(_))
        ));
    }
}
