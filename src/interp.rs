//! The recursive tree interpreter, generic over the output backend.
//!
//! Both backends share this one walk; classification, the
//! attributes-or-content decision and selector-chain resolution happen
//! here exactly once, so the backends cannot diverge on them.

use anyhow::Result;
use itertools::Itertools;
use kstring::KString;

use crate::dom::NodeId;
use crate::error::AlchemistError;
use crate::expr::{split_attributes, AttrMap, AttrValue, Expr};
use crate::selector::{parse_selector, Segment};

/// One element of a resolved selector chain: its tag plus the attributes
/// it carries. Only the terminal element receives the tag-expression's
/// explicit attributes; the others carry at most the id and classes
/// written into their selector segment.
#[derive(Debug, Clone)]
pub struct ResolvedElement {
    pub tag: KString,
    pub attrs: AttrMap,
}

pub trait Backend {
    type Output;

    /// The output for `Empty` and the empty sequence: an empty `span`.
    fn empty_placeholder(&self) -> Result<Self::Output>;

    fn text(&self, s: &str) -> Result<Self::Output>;

    /// An already-materialized node given as input. Identity for the
    /// live-document backend; unrepresentable for the string backend.
    fn passthrough(&self, node: NodeId) -> Result<Self::Output>;

    /// A resolved element chain (never empty), nested first-to-last;
    /// `children` belong under the last element.
    fn element(
        &self,
        chain: &[ResolvedElement],
        children: Vec<Self::Output>,
    ) -> Result<Self::Output>;

    /// The members of a sequence without a tag head, already rendered in
    /// order.
    fn siblings(&self, items: Vec<Self::Output>) -> Result<Self::Output>;
}

pub fn alchemize<B: Backend>(backend: &B, expr: &Expr) -> Result<B::Output> {
    match expr {
        Expr::Empty => backend.empty_placeholder(),
        Expr::Node(id) => backend.passthrough(*id),
        Expr::Thunk(f) => alchemize(backend, &f()),
        Expr::Text(s) => backend.text(s),
        Expr::Num(n) => backend.text(&n.to_string()),
        Expr::Attrs(_) => {
            Err(AlchemistError::UnrecognizedExpression(expr.repr()).into())
        }
        Expr::List(items) => match items.split_first() {
            None => backend.empty_placeholder(),
            Some((Expr::Text(selector), rest)) => {
                tag_expression(backend, selector, rest)
            }
            Some(_) => {
                // Sibling-list. No implicit flattening: a nested one
                // renders exactly like a top-level one.
                let mut outputs = Vec::with_capacity(items.len());
                for item in items {
                    outputs.push(alchemize(backend, item)?);
                }
                backend.siblings(outputs)
            }
        },
    }
}

fn tag_expression<B: Backend>(
    backend: &B,
    selector: &str,
    rest: &[Expr],
) -> Result<B::Output> {
    let segments = parse_selector(selector)?;
    let (attrs, content) = split_attributes(rest);
    let chain = resolve_chain(&segments, &attrs);
    let mut children = Vec::with_capacity(content.len());
    for item in content {
        if item.is_empty_value() {
            // Empty content items vanish; they do not leave a
            // placeholder behind.
            continue;
        }
        children.push(alchemize(backend, item)?);
    }
    backend.element(&chain, children)
}

/// Distribute selector-derived ids and classes over the chain and merge
/// the explicit attributes into the terminal element. The selector id
/// overwrites an explicit `id`; selector classes extend an explicit
/// `class` value with a separating space.
fn resolve_chain(segments: &[Segment], explicit: &AttrMap) -> Vec<ResolvedElement> {
    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let mut attrs = if i == last {
                explicit.clone()
            } else {
                AttrMap::new()
            };
            if let Some(id) = &segment.id {
                attrs.set(KString::from_static("id"), AttrValue::Str(id.clone()));
            }
            if !segment.classes.is_empty() {
                let joined = segment.classes.iter().map(|c| c.as_str()).join(" ");
                let merged = match attrs.get("class").and_then(|v| v.markup_form()) {
                    Some(existing) => format!("{existing} {joined}"),
                    None => joined,
                };
                attrs.set(
                    KString::from_static("class"),
                    AttrValue::Str(KString::from_string(merged)),
                );
            }
            ResolvedElement {
                tag: segment.tag.clone(),
                attrs,
            }
        })
        .collect()
}
