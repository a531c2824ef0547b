//! The tag-shorthand parser: `tag.class1.class2#id>subtag` names a chain
//! of nested elements.

use anyhow::Result;
use kstring::KString;

use crate::error::AlchemistError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub tag: KString,
    pub id: Option<KString>,
    pub classes: Vec<KString>,
}

/// Parse a selector into its `>`-chain; always at least one segment. The
/// last segment is the terminal one, which receives a tag-expression's
/// explicit attributes and content.
///
/// Splitting order per segment: first `#` (everything after it is the
/// id; ids containing `#` are unsupported), then `.` on the part before
/// it (first token tag name, rest class tokens). An empty id (`div#`)
/// counts as no id. An empty tag name in any segment is an error.
pub fn parse_selector(selector: &str) -> Result<Vec<Segment>> {
    selector
        .split('>')
        .map(|raw| parse_segment(raw, selector))
        .collect()
}

fn parse_segment(raw: &str, whole: &str) -> Result<Segment> {
    let (head, id) = match raw.split_once('#') {
        Some((head, id)) => (head, id),
        None => (raw, ""),
    };
    let mut tokens = head.split('.');
    let tag = tokens.next().expect("split yields at least one token");
    if tag.is_empty() {
        return Err(AlchemistError::MalformedSelector(whole.to_string()).into());
    }
    Ok(Segment {
        tag: KString::from_ref(tag),
        id: if id.is_empty() {
            None
        } else {
            Some(KString::from_ref(id))
        },
        classes: tokens.map(KString::from_ref).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(tag: &str, id: Option<&str>, classes: &[&str]) -> Segment {
        Segment {
            tag: KString::from_ref(tag),
            id: id.map(KString::from_ref),
            classes: classes.iter().map(|c| KString::from_ref(c)).collect(),
        }
    }

    #[test]
    fn t_simple() {
        assert_eq!(parse_selector("div").unwrap(), vec![seg("div", None, &[])]);
    }

    #[test]
    fn t_classes_and_id() {
        assert_eq!(
            parse_selector("div.a.b#x").unwrap(),
            vec![seg("div", Some("x"), &["a", "b"])]
        );
        // id split happens before class split, so classes after the id
        // end up inside the id
        assert_eq!(
            parse_selector("div#x.a").unwrap(),
            vec![seg("div", Some("x.a"), &[])]
        );
    }

    #[test]
    fn t_empty_id() {
        assert_eq!(parse_selector("div#").unwrap(), vec![seg("div", None, &[])]);
    }

    #[test]
    fn t_chain() {
        assert_eq!(
            parse_selector("p>span").unwrap(),
            vec![seg("p", None, &[]), seg("span", None, &[])]
        );
        assert_eq!(
            parse_selector("div.box#main>ul.list>li").unwrap(),
            vec![
                seg("div", Some("main"), &["box"]),
                seg("ul", None, &["list"]),
                seg("li", None, &[]),
            ]
        );
    }

    #[test]
    fn t_empty_tag_name() {
        for s in ["", ".foo", "#x", "p>", ">p", "div>.x"] {
            let e = parse_selector(s).unwrap_err();
            match e.downcast_ref::<AlchemistError>() {
                Some(AlchemistError::MalformedSelector(got)) => assert_eq!(got, s),
                other => panic!("expected MalformedSelector for {s:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn t_pure() {
        // same result no matter how often it runs
        let a = parse_selector("div.a.b#x").unwrap();
        let b = parse_selector("div.a.b#x").unwrap();
        assert_eq!(a, b);
    }
}
