//! Hyperscript-style HTML templating, with runtime typing.
//!
//! A recursive interpreter (`alchemize`) turns tag-prefixed expression
//! trees like `["div.foo#bar", {"title": "hi"}, "content"]` into either
//! live document nodes (`dom`) or HTML strings (`html`). The two
//! backends share one walk and one set of disambiguation rules; the
//! `webutils` helpers cover the lookup/binding/replacement plumbing an
//! application needs around renders.

pub mod error;
pub mod expr;
pub mod selector;
pub mod interp;
pub mod dom;
pub mod html;
pub mod webutils;

// used by the construction macros
pub use kstring;

use alchemist_html::meta::{read_meta_db, MetaDb};
use lazy_static::lazy_static;

pub use crate::dom::{Document, Event, EventHandler, NodeId};
pub use crate::error::AlchemistError;
pub use crate::expr::{AttrMap, AttrValue, Expr};
pub use crate::interp::{Backend, ResolvedElement};

/// Attribute keys with this prefix are event-handler properties, never
/// markup attributes. Fixed, not user-configurable.
pub const EVENT_ATTRIBUTE_PREFIX: &str = "on";

lazy_static! {
    /// The process-wide default tag metadata; contexts take an explicit
    /// override for testing (`new_with_metadb`).
    pub static ref METADB: MetaDb = read_meta_db().unwrap();
}
