//! Thin helpers over a `Document` for application wiring: lookup, event
//! binding, subtree replacement, raw insertion. No shared state; each is
//! a small wrapper over the document's own operations.

use anyhow::{anyhow, Result};
use kstring::KString;

use crate::dom::{self, Document, EventHandler, NodeId};
use crate::expr::Expr;

/// Element lookup by id.
pub fn lookup_by_id(document: &Document, id: &str) -> Option<NodeId> {
    document.get_element_by_id(id)
}

/// Attach a listener to the element with the given id.
pub fn bind_event(
    document: &Document,
    id: &str,
    event_type: &str,
    handler: EventHandler,
) -> Result<()> {
    let node =
        lookup_by_id(document, id).ok_or_else(|| anyhow!("no element with id {id:?}"))?;
    document.add_event_listener(node, event_type, handler)
}

/// Either an element id or an already-resolved node; what
/// `replace_content` accepts as its target.
pub enum Anchor {
    Id(KString),
    Node(NodeId),
}

impl From<&str> for Anchor {
    fn from(id: &str) -> Self {
        Anchor::Id(KString::from_ref(id))
    }
}
impl From<KString> for Anchor {
    fn from(id: KString) -> Self {
        Anchor::Id(id)
    }
}
impl From<NodeId> for Anchor {
    fn from(node: NodeId) -> Self {
        Anchor::Node(node)
    }
}

/// Replace the target's entire child content with one freshly alchemized
/// tree. Returns the new child.
pub fn replace_content(
    document: &Document,
    target: impl Into<Anchor>,
    expr: &Expr,
) -> Result<NodeId> {
    let node = match target.into() {
        Anchor::Node(node) => node,
        Anchor::Id(id) => lookup_by_id(document, &id)
            .ok_or_else(|| anyhow!("no element with id {:?}", id.as_str()))?,
    };
    let fresh = dom::alchemize(document, expr)?;
    document.replace_children(node, &[fresh])?;
    Ok(fresh)
}

/// Wrap preserialized trusted HTML in a fresh element. No escaping is
/// performed and none ever will be: this is the deliberate escape hatch
/// for pre-rendered content; the caller guarantees `raw` is safe.
pub fn insert_raw(document: &Document, tag: &str, raw: &str) -> Result<NodeId> {
    let elem = document.create_element(tag)?;
    let chunk = document.create_raw(raw)?;
    document.append_child(elem, chunk)?;
    Ok(elem)
}
