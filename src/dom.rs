//! The live-node backend: an arena `Document` that owns every node it
//! creates and hands out `NodeId` handles.
//!
//! Handles carry the owning document's id; using one against another
//! document is a programming error and panics. The arena is
//! capacity-bounded at construction. Nodes are never freed individually;
//! the whole document is dropped at once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Mutex;

use anyhow::{bail, Result};
use alchemist_html::meta::MetaDb;
use kstring::KString;
use lazy_static::lazy_static;

use crate::expr::{is_event_key, AttrValue, Expr};
use crate::interp::{self, Backend, ResolvedElement};
use crate::{EVENT_ATTRIBUTE_PREFIX, METADB};

lazy_static! {
    static ref NEXT_DOCUMENT_ID: Mutex<u32> = Mutex::new(0);
}

fn next_document_id() -> u32 {
    let mut guard = NEXT_DOCUMENT_ID.lock().unwrap();
    let id = *guard;
    *guard = guard.wrapping_add(1);
    id
}

/// A handle to a node inside one particular `Document`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NodeId {
    document_id: u32,
    index: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NodeId({}:{})", self.document_id, self.index)
    }
}

/// The event value handed to handlers and listeners.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: KString,
    pub target: NodeId,
}

/// Handlers get the owning document back so they can look up and mutate
/// nodes; storing a document reference inside the closure would tie the
/// document to itself.
pub type EventHandler = Rc<dyn Fn(&Document, &Event)>;

enum DomNode {
    Element(DomElement),
    Text(KString),
    /// Preserialized HTML written verbatim on serialization. Only
    /// `insert_raw` creates these.
    Raw(KString),
}

struct DomElement {
    tag: KString,
    attrs: Vec<(KString, KString)>,
    /// `on*` properties, keyed by the full attribute name ("onclick").
    handlers: Vec<(KString, EventHandler)>,
    /// Listeners, keyed by event type ("click"), in attachment order.
    listeners: Vec<(KString, EventHandler)>,
    children: Vec<NodeId>,
}

impl DomElement {
    fn new(tag: KString) -> DomElement {
        DomElement {
            tag,
            attrs: Vec::new(),
            handlers: Vec::new(),
            listeners: Vec::new(),
            children: Vec::new(),
        }
    }
}

pub struct Document {
    document_id: u32,
    metadb: &'static MetaDb,
    max_nodes: usize,
    nodes: RefCell<Vec<DomNode>>,
}

impl Document {
    pub fn new(max_nodes: u32) -> Document {
        Document::new_with_metadb(max_nodes, &METADB)
    }

    pub fn new_with_metadb(max_nodes: u32, metadb: &'static MetaDb) -> Document {
        Document {
            document_id: next_document_id(),
            metadb,
            max_nodes: max_nodes as usize,
            nodes: RefCell::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn allocate(&self, node: DomNode) -> Result<NodeId> {
        let mut nodes = self.nodes.borrow_mut();
        if nodes.len() >= self.max_nodes {
            bail!("Document: out of node memory")
        }
        let index = nodes.len() as u32;
        nodes.push(node);
        Ok(NodeId {
            document_id: self.document_id,
            index,
        })
    }

    fn index(&self, id: NodeId) -> usize {
        if id.document_id != self.document_id {
            panic!(
                "NodeId from an incompatible Document used: expected {}, got {}",
                self.document_id, id.document_id
            );
        }
        id.index as usize
    }

    pub fn create_element(&self, tag: &str) -> Result<NodeId> {
        self.allocate(DomNode::Element(DomElement::new(KString::from_ref(tag))))
    }

    pub fn create_text(&self, s: &str) -> Result<NodeId> {
        self.allocate(DomNode::Text(KString::from_ref(s)))
    }

    pub fn create_raw(&self, s: &str) -> Result<NodeId> {
        self.allocate(DomNode::Raw(KString::from_ref(s)))
    }

    fn with_element<R>(
        &self,
        id: NodeId,
        f: impl FnOnce(&DomElement) -> R,
    ) -> Result<R> {
        let index = self.index(id);
        let nodes = self.nodes.borrow();
        match &nodes[index] {
            DomNode::Element(elem) => Ok(f(elem)),
            _ => bail!("node {id:?} is not an element"),
        }
    }

    fn with_element_mut<R>(
        &self,
        id: NodeId,
        f: impl FnOnce(&mut DomElement) -> R,
    ) -> Result<R> {
        let index = self.index(id);
        let mut nodes = self.nodes.borrow_mut();
        match &mut nodes[index] {
            DomNode::Element(elem) => Ok(f(elem)),
            _ => bail!("node {id:?} is not an element"),
        }
    }

    /// The attribute-setting primitive: plain strings, replacing an
    /// existing value in place.
    pub fn set_attribute(&self, id: NodeId, key: &str, value: &str) -> Result<()> {
        self.with_element_mut(id, |elem| {
            if let Some(slot) = elem.attrs.iter_mut().find(|(k, _)| k.as_str() == key) {
                slot.1 = KString::from_ref(value);
            } else {
                elem.attrs
                    .push((KString::from_ref(key), KString::from_ref(value)));
            }
        })
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<KString> {
        self.with_element(id, |elem| {
            elem.attrs
                .iter()
                .find(|(k, _)| k.as_str() == key)
                .map(|(_, v)| v.clone())
        })
        .ok()
        .flatten()
    }

    /// Assign an `on*` handler property ("onclick"), replacing any
    /// previous handler under the same name.
    pub fn set_handler(&self, id: NodeId, key: &str, handler: EventHandler) -> Result<()> {
        self.with_element_mut(id, |elem| {
            if let Some(slot) = elem.handlers.iter_mut().find(|(k, _)| k.as_str() == key) {
                slot.1 = handler;
            } else {
                elem.handlers.push((KString::from_ref(key), handler));
            }
        })
    }

    /// Attach a listener for `event_type` ("click"). Listeners stack in
    /// attachment order and fire after the `on*` property handler.
    pub fn add_event_listener(
        &self,
        id: NodeId,
        event_type: &str,
        handler: EventHandler,
    ) -> Result<()> {
        self.with_element_mut(id, |elem| {
            elem.listeners.push((KString::from_ref(event_type), handler));
        })
    }

    /// Fire the `on<type>` property handler, then the listeners for
    /// `event_type`, in order. Handlers may mutate the document.
    pub fn dispatch(&self, target: NodeId, event_type: &str) -> Result<()> {
        let to_fire: Vec<EventHandler> = self.with_element(target, |elem| {
            let property_key = format!("{EVENT_ATTRIBUTE_PREFIX}{event_type}");
            let mut handlers: Vec<EventHandler> = elem
                .handlers
                .iter()
                .filter(|(k, _)| k.as_str() == property_key)
                .map(|(_, h)| h.clone())
                .collect();
            handlers.extend(
                elem.listeners
                    .iter()
                    .filter(|(k, _)| k.as_str() == event_type)
                    .map(|(_, h)| h.clone()),
            );
            handlers
        })?;
        let event = Event {
            event_type: KString::from_ref(event_type),
            target,
        };
        for handler in to_fire {
            handler(self, &event);
        }
        Ok(())
    }

    pub fn tag_name(&self, id: NodeId) -> Option<KString> {
        self.with_element(id, |elem| elem.tag.clone()).ok()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.with_element(id, |elem| elem.children.clone())
            .unwrap_or_default()
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.index(child); // ownership check
        self.with_element_mut(parent, |elem| elem.children.push(child))
    }

    pub fn replace_children(&self, parent: NodeId, children: &[NodeId]) -> Result<()> {
        for child in children {
            self.index(*child);
        }
        self.with_element_mut(parent, |elem| {
            elem.children.clear();
            elem.children.extend_from_slice(children);
        })
    }

    /// The first element in allocation order whose `id` attribute equals
    /// `want`. The whole arena is searched; there is no notion of
    /// attached vs. detached here.
    pub fn get_element_by_id(&self, want: &str) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        for (index, node) in nodes.iter().enumerate() {
            if let DomNode::Element(elem) = node {
                if elem
                    .attrs
                    .iter()
                    .any(|(k, v)| k.as_str() == "id" && v.as_str() == want)
                {
                    return Some(NodeId {
                        document_id: self.document_id,
                        index: index as u32,
                    });
                }
            }
        }
        None
    }

    /// Serialize a subtree. Void tags are emitted unclosed with their
    /// children ignored; text is written verbatim, matching the string
    /// backend byte for byte on shared input.
    pub fn outer_html(&self, id: NodeId) -> Result<String> {
        let index = self.index(id);
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        self.write_node(&nodes, index, &mut out);
        Ok(out)
    }

    fn write_node(&self, nodes: &[DomNode], index: usize, out: &mut String) {
        match &nodes[index] {
            DomNode::Text(s) => out.push_str(s),
            DomNode::Raw(s) => out.push_str(s),
            DomNode::Element(elem) => {
                out.push('<');
                out.push_str(&elem.tag);
                for (key, value) in &elem.attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                out.push('>');
                if !self.metadb.has_closing_tag(&elem.tag) {
                    return;
                }
                for child in &elem.children {
                    self.write_node(nodes, child.index as usize, out);
                }
                out.push_str("</");
                out.push_str(&elem.tag);
                out.push('>');
            }
        }
    }

    /// Plain text of a subtree, completely ignoring markup. Errors on
    /// preserialized HTML, which would need re-parsing.
    pub fn text_content(&self, id: NodeId) -> Result<String> {
        let index = self.index(id);
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        Self::collect_text(&nodes, index, &mut out)?;
        Ok(out)
    }

    fn collect_text(nodes: &[DomNode], index: usize, out: &mut String) -> Result<()> {
        match &nodes[index] {
            DomNode::Text(s) => out.push_str(s),
            DomNode::Raw(_) => {
                bail!("cannot take the plain text of preserialized HTML")
            }
            DomNode::Element(elem) => {
                for child in &elem.children {
                    Self::collect_text(nodes, child.index as usize, out)?;
                }
            }
        }
        Ok(())
    }
}

impl Backend for Document {
    type Output = NodeId;

    fn empty_placeholder(&self) -> Result<NodeId> {
        self.create_element("span")
    }

    fn text(&self, s: &str) -> Result<NodeId> {
        self.create_text(s)
    }

    fn passthrough(&self, node: NodeId) -> Result<NodeId> {
        self.index(node); // ownership check; identity, never a clone
        Ok(node)
    }

    fn element(&self, chain: &[ResolvedElement], children: Vec<NodeId>) -> Result<NodeId> {
        let mut first = None;
        let mut prev: Option<NodeId> = None;
        for elem in chain {
            let id = self.create_element(&elem.tag)?;
            for (key, value) in elem.attrs.iter() {
                if is_event_key(key) {
                    if let AttrValue::Handler(handler) = value {
                        self.set_handler(id, key, handler.clone())?;
                    }
                    // non-callable on* values never reach markup
                } else if let Some(value) = value.coerced_form() {
                    self.set_attribute(id, key, &value)?;
                }
            }
            match prev {
                Some(prev) => self.append_child(prev, id)?,
                None => first = Some(id),
            }
            prev = Some(id);
        }
        let terminal = prev.expect("chain is never empty");
        for child in children {
            self.append_child(terminal, child)?;
        }
        Ok(first.expect("chain is never empty"))
    }

    fn siblings(&self, items: Vec<NodeId>) -> Result<NodeId> {
        // one synthetic container element
        let container = self.create_element("div")?;
        for item in items {
            self.append_child(container, item)?;
        }
        Ok(container)
    }
}

/// Render an expression to live nodes owned by `document`.
pub fn alchemize(document: &Document, expr: &Expr) -> Result<NodeId> {
    interp::alchemize(document, expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::AttrValue;
    use crate::{expr, html};

    fn t(document: &Document, expr: &Expr) -> String {
        let id = alchemize(document, expr).unwrap();
        document.outer_html(id).unwrap()
    }

    #[test]
    fn t_build_and_serialize() {
        let document = Document::new(1000);
        assert_eq!(
            t(&document, &expr!(["div.foo#bar", "hi"])),
            "<div id=\"bar\" class=\"foo\">hi</div>"
        );
    }

    #[test]
    fn t_matches_string_backend() {
        let document = Document::new(1000);
        for e in [
            expr!(["p>span", "hello"]),
            expr!(["div", ["p", "a"], ["p", "b"]]),
            expr!(["h1", "x"]),
            expr!(["ul.list", ["li", "one"], ["li", "two"]]),
        ] {
            assert_eq!(t(&document, &e), html::alchemize(&e).unwrap());
        }
    }

    #[test]
    fn t_empty_placeholder() {
        let document = Document::new(100);
        let id = alchemize(&document, &Expr::Empty).unwrap();
        assert_eq!(document.tag_name(id).unwrap(), "span");
        assert!(document.children(id).is_empty());
    }

    #[test]
    fn t_passthrough_identity() {
        let document = Document::new(100);
        let node = document.create_element("p").unwrap();
        let got = alchemize(&document, &Expr::Node(node)).unwrap();
        assert_eq!(got, node);
        // reused inside content it is attached, not copied
        let parent = alchemize(&document, &expr!(["div", (Expr::from(node))])).unwrap();
        assert_eq!(document.children(parent), vec![node]);
    }

    #[test]
    fn t_attribute_coercion() {
        let document = Document::new(100);
        let id = alchemize(
            &document,
            &expr!(["input", {"disabled": false, "data-x": (), "value": 5}]),
        )
        .unwrap();
        assert_eq!(document.attribute(id, "disabled").unwrap(), "false");
        assert_eq!(document.attribute(id, "data-x").unwrap(), "null");
        assert_eq!(document.attribute(id, "value").unwrap(), "5");
    }

    #[test]
    fn t_terminal_placement() {
        let document = Document::new(100);
        let outer = alchemize(&document, &expr!(["p>span", {"id": "ok"}, "hello"])).unwrap();
        assert_eq!(document.tag_name(outer).unwrap(), "p");
        assert_eq!(document.attribute(outer, "id"), None);
        let inner = document.children(outer)[0];
        assert_eq!(document.tag_name(inner).unwrap(), "span");
        assert_eq!(document.attribute(inner, "id").unwrap(), "ok");
    }

    #[test]
    fn t_sibling_wrapper() {
        let document = Document::new(100);
        let id = alchemize(&document, &expr!([["p", "a"], ["p", "b"]])).unwrap();
        assert_eq!(document.tag_name(id).unwrap(), "div");
        let children = document.children(id);
        assert_eq!(children.len(), 2);
        assert_eq!(document.text_content(children[0]).unwrap(), "a");
        assert_eq!(document.text_content(children[1]).unwrap(), "b");
    }

    #[test]
    fn t_handler_binding_and_dispatch() {
        let document = Document::new(100);
        let fired = Rc::new(RefCell::new(Vec::new()));
        let on_click = {
            let fired = fired.clone();
            AttrValue::handler(move |document, event| {
                fired.borrow_mut().push("property");
                // handlers may mutate the document
                document
                    .set_attribute(event.target, "data-clicked", "yes")
                    .unwrap();
            })
        };
        let id = alchemize(&document, &expr!(["button", {"onclick": on_click}, "hit"])).unwrap();
        // handler properties never show up as markup
        assert_eq!(document.attribute(id, "onclick"), None);
        {
            let fired = fired.clone();
            document
                .add_event_listener(
                    id,
                    "click",
                    Rc::new(move |_, _| fired.borrow_mut().push("listener")),
                )
                .unwrap();
        }
        document.dispatch(id, "click").unwrap();
        assert_eq!(*fired.borrow(), ["property", "listener"]);
        assert_eq!(document.attribute(id, "data-clicked").unwrap(), "yes");
        // unrelated events fire nothing
        document.dispatch(id, "keydown").unwrap();
        assert_eq!(fired.borrow().len(), 2);
    }

    #[test]
    fn t_get_element_by_id() {
        let document = Document::new(100);
        alchemize(
            &document,
            &expr!(["div", ["p#first", "a"], ["p#second", "b"]]),
        )
        .unwrap();
        let first = document.get_element_by_id("first").unwrap();
        assert_eq!(document.text_content(first).unwrap(), "a");
        assert!(document.get_element_by_id("missing").is_none());
    }

    #[test]
    fn t_replace_children() {
        let document = Document::new(100);
        let parent = alchemize(&document, &expr!(["div", "old"])).unwrap();
        let fresh = document.create_text("new").unwrap();
        document.replace_children(parent, &[fresh]).unwrap();
        assert_eq!(document.outer_html(parent).unwrap(), "<div>new</div>");
    }

    #[test]
    fn t_void_serialization() {
        let document = Document::new(100);
        // children of a void tag stay in the live tree but never
        // serialize
        let id = alchemize(&document, &expr!(["img", {"src": "x.png"}, "nope"])).unwrap();
        assert_eq!(document.children(id).len(), 1);
        assert_eq!(document.outer_html(id).unwrap(), "<img src=\"x.png\">");
    }

    #[test]
    fn t_raw_nodes() {
        let document = Document::new(100);
        let elem = document.create_element("div").unwrap();
        let raw = document.create_raw("<em>x</em>").unwrap();
        document.append_child(elem, raw).unwrap();
        assert_eq!(document.outer_html(elem).unwrap(), "<div><em>x</em></div>");
        assert!(document.text_content(elem).is_err());
    }

    #[test]
    fn t_out_of_memory() {
        let document = Document::new(2);
        document.create_element("p").unwrap();
        document.create_element("p").unwrap();
        assert!(document.create_element("p").is_err());
        // and a render aborts mid-way without panicking
        assert!(alchemize(&document, &expr!(["div", "x"])).is_err());
    }

    #[test]
    #[should_panic(expected = "incompatible Document")]
    fn t_cross_document_panic() {
        let a = Document::new(10);
        let b = Document::new(10);
        let node = a.create_element("p").unwrap();
        let _ = b.tag_name(node);
    }

    #[test]
    fn t_no_partial_attachment_on_failure() {
        let document = Document::new(1000);
        let root = document.create_element("main").unwrap();
        // the failing branch aborts before any element is allocated or
        // appended
        let bad = expr!(["div", {"id": "x"}, [{"oops": 1}]]);
        assert!(alchemize(&document, &bad).is_err());
        assert!(document.children(root).is_empty());
        assert_eq!(document.len(), 1);
    }
}
