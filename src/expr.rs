//! The expression tree consumed by the interpreter, with runtime typing.
//!
//! An expression is an untyped-feeling recursive value: text and numbers
//! are leaves, a list whose first element is text is a tag-expression
//! (`["div.foo", {attrs}, ...content]`), any other list is a sibling-list,
//! thunks defer evaluation, and `Empty` renders to a placeholder. The
//! `expr!` and `attrs!` macros give literal construction syntax close to
//! the notation above.

use std::fmt;

use kstring::KString;

use crate::dom::{EventHandler, NodeId};

pub type ThunkFn = Box<dyn Fn() -> Expr>;

pub enum Expr {
    /// Renders to the empty placeholder element.
    Empty,
    /// An already-materialized document node, passed through unchanged.
    Node(NodeId),
    /// Invoked with no arguments on interpretation; the result is itself
    /// an expression. Invoked at most once per render path traversal.
    Thunk(ThunkFn),
    Text(KString),
    Num(f64),
    /// An attributes map. Only meaningful as the second slot of a
    /// tag-expression; anywhere else it is the unrecognized case.
    Attrs(AttrMap),
    List(Vec<Expr>),
}

impl Expr {
    pub fn thunk(f: impl Fn() -> Expr + 'static) -> Expr {
        Expr::Thunk(Box::new(f))
    }

    pub fn text(s: &str) -> Expr {
        Expr::Text(KString::from_ref(s))
    }

    /// True only for `Empty`. `Num(0.0)`, `Text("")` and the empty list
    /// all render and are not empty values.
    pub fn is_empty_value(&self) -> bool {
        matches!(self, Expr::Empty)
    }

    /// The representation used in error messages.
    pub fn repr(&self) -> String {
        format!("{self:?}")
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Text(KString::from_ref(s))
    }
}
impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Text(KString::from_string(s))
    }
}
impl From<KString> for Expr {
    fn from(s: KString) -> Self {
        Expr::Text(s)
    }
}
impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Num(n)
    }
}
impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::Num(n as f64)
    }
}
impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::Num(n as f64)
    }
}
impl From<u32> for Expr {
    fn from(n: u32) -> Self {
        Expr::Num(n as f64)
    }
}
impl From<()> for Expr {
    fn from(_: ()) -> Self {
        Expr::Empty
    }
}
impl From<NodeId> for Expr {
    fn from(id: NodeId) -> Self {
        Expr::Node(id)
    }
}
impl From<Vec<Expr>> for Expr {
    fn from(items: Vec<Expr>) -> Self {
        Expr::List(items)
    }
}
impl From<AttrMap> for Expr {
    fn from(map: AttrMap) -> Self {
        Expr::Attrs(map)
    }
}

/// An attribute value as it appears in a tag-expression's map.
#[derive(Clone)]
pub enum AttrValue {
    Str(KString),
    Num(f64),
    Bool(bool),
    Null,
    /// A callable, bound as a live event-handler property when the key
    /// carries the `on` prefix. Not representable in markup.
    Handler(EventHandler),
}

impl AttrValue {
    pub fn handler(f: impl Fn(&crate::dom::Document, &crate::dom::Event) + 'static) -> AttrValue {
        AttrValue::Handler(std::rc::Rc::new(f))
    }

    /// The value as written into markup by the string backend. `None`
    /// suppresses the attribute entirely (`Null`, `false`, handlers).
    pub fn markup_form(&self) -> Option<KString> {
        match self {
            AttrValue::Str(s) => Some(s.clone()),
            AttrValue::Num(n) => Some(KString::from_string(n.to_string())),
            AttrValue::Bool(true) => Some(KString::from_static("true")),
            AttrValue::Bool(false) => None,
            AttrValue::Null => None,
            AttrValue::Handler(_) => None,
        }
    }

    /// The value as coerced by the live document's attribute-setting
    /// primitive: everything except handlers gets a string form.
    pub fn coerced_form(&self) -> Option<KString> {
        match self {
            AttrValue::Str(s) => Some(s.clone()),
            AttrValue::Num(n) => Some(KString::from_string(n.to_string())),
            AttrValue::Bool(true) => Some(KString::from_static("true")),
            AttrValue::Bool(false) => Some(KString::from_static("false")),
            AttrValue::Null => Some(KString::from_static("null")),
            AttrValue::Handler(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(KString::from_ref(s))
    }
}
impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(KString::from_string(s))
    }
}
impl From<KString> for AttrValue {
    fn from(s: KString) -> Self {
        AttrValue::Str(s)
    }
}
impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Num(n)
    }
}
impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Num(n as f64)
    }
}
impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Num(n as f64)
    }
}
impl From<u32> for AttrValue {
    fn from(n: u32) -> Self {
        AttrValue::Num(n as f64)
    }
}
impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}
impl From<()> for AttrValue {
    fn from(_: ()) -> Self {
        AttrValue::Null
    }
}
impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => AttrValue::Null,
        }
    }
}

/// An insertion-ordered attribute map with unique keys.
#[derive(Clone, Default)]
pub struct AttrMap {
    pairs: Vec<(KString, AttrValue)>,
}

impl AttrMap {
    pub fn new() -> AttrMap {
        AttrMap { pairs: Vec::new() }
    }

    /// Setting an existing key replaces its value in place, keeping the
    /// original position.
    pub fn set(&mut self, key: impl Into<KString>, value: impl Into<AttrValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.pairs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.pairs.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.pairs
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(KString, AttrValue)> {
        self.pairs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// The attributes-or-content decision for the slots following a
/// tag-expression's selector: the first slot is the attribute map iff it
/// is one, everything else is content. Applied exactly once, at the entry
/// to tag-expression handling; the resulting pair is what the backends
/// see.
pub fn split_attributes(items: &[Expr]) -> (AttrMap, &[Expr]) {
    match items.split_first() {
        Some((Expr::Attrs(map), rest)) => (map.clone(), rest),
        _ => (AttrMap::new(), items),
    }
}

/// Keys with this prefix name event-handler properties, never markup
/// attributes.
pub fn is_event_key(key: &str) -> bool {
    key.starts_with(crate::EVENT_ATTRIBUTE_PREFIX)
}

// The Debug forms double as the value representation in error messages,
// so they follow the literal notation, not Rust constructor syntax.

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Empty => write!(f, "null"),
            Expr::Node(id) => write!(f, "<node {id:?}>"),
            Expr::Thunk(_) => write!(f, "<thunk>"),
            Expr::Text(s) => write!(f, "{:?}", s.as_str()),
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Attrs(map) => map.fmt(f),
            Expr::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt(f)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttrValue::Str(s) => write!(f, "{:?}", s.as_str()),
            AttrValue::Num(n) => write!(f, "{n}"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Null => write!(f, "null"),
            AttrValue::Handler(_) => write!(f, "<handler>"),
        }
    }
}

impl fmt::Debug for AttrMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}: {v:?}", k.as_str())?;
        }
        write!(f, "}}")
    }
}

/// Literal attribute-map syntax: `attrs!{"id": "ok", "tabindex": 3}`.
#[macro_export]
macro_rules! attrs {
    ( $( $k:literal : $v:expr ),* $(,)? ) => {{
        #[allow(unused_mut)]
        let mut map = $crate::expr::AttrMap::new();
        $( map.set($crate::kstring::KString::from_ref($k),
                   $crate::expr::AttrValue::from($v)); )*
        map
    }};
}

/// Literal expression syntax mirroring the tag-prefixed tree notation:
/// `expr!(["p>span", {"id": "ok"}, "hello"])`. Brackets build sequences,
/// braces build attribute maps, anything else goes through
/// `Expr::from`. Multi-token values need parentheses:
/// `expr!(["div", (Expr::thunk(body))])`.
#[macro_export]
macro_rules! expr {
    ({ $( $k:literal : $v:expr ),* $(,)? }) => {
        $crate::expr::Expr::Attrs($crate::attrs!( $( $k : $v ),* ))
    };
    ([ $( $item:tt ),* $(,)? ]) => {
        $crate::expr::Expr::List(vec![ $( $crate::expr!($item) ),* ])
    };
    ( $e:expr ) => {
        $crate::expr::Expr::from($e)
    };
}
