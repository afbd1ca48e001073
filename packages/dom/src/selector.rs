//! Compound selector matching
//!
//! Supports a single compound selector: an optional tag followed by any number
//! of `#id`, `.class`, `[name]` and `[name=value]` qualifiers. Combinators are
//! rejected with [`DomError::UnsupportedSelector`].

use crate::errors::DomError;
use crate::live::{LiveDom, NodeId};
use crate::DomResult;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Qualifier {
    Id(String),
    Class(String),
    Has(String),
    Equals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    qualifiers: Vec<Qualifier>,
}

impl Selector {
    pub fn parse(source: &str) -> DomResult<Self> {
        let unsupported = || DomError::UnsupportedSelector(source.to_string());
        let input = source.trim();
        if input.is_empty() || input.contains(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ',')) {
            return Err(unsupported());
        }

        let chars: Vec<char> = input.chars().collect();
        let mut pos = 0;
        let tag = if chars[0] == '*' {
            pos = 1;
            None
        } else {
            let name = read_ident(&chars, &mut pos);
            (!name.is_empty()).then_some(name)
        };

        let mut qualifiers = Vec::new();
        while pos < chars.len() {
            let marker = chars[pos];
            pos += 1;
            match marker {
                '#' | '.' => {
                    let name = read_ident(&chars, &mut pos);
                    if name.is_empty() {
                        return Err(unsupported());
                    }
                    qualifiers.push(if marker == '#' {
                        Qualifier::Id(name)
                    } else {
                        Qualifier::Class(name)
                    });
                }
                '[' => {
                    let end = chars[pos..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| pos + offset)
                        .ok_or_else(unsupported)?;
                    let body: String = chars[pos..end].iter().collect();
                    pos = end + 1;
                    qualifiers.push(parse_attribute(&body).ok_or_else(unsupported)?);
                }
                _ => return Err(unsupported()),
            }
        }

        if tag.is_none() && qualifiers.is_empty() && chars[0] != '*' {
            return Err(unsupported());
        }
        Ok(Self { tag, qualifiers })
    }

    pub fn matches(&self, dom: &LiveDom, node: NodeId) -> bool {
        let Some(element) = dom.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.qualifiers.iter().all(|q| match q {
            Qualifier::Id(id) => element.attributes.get("id") == Some(id),
            Qualifier::Class(class) => element
                .attributes
                .get("class")
                .is_some_and(|list| list.split_whitespace().any(|c| c == class)),
            Qualifier::Has(name) => element.attributes.contains_key(name),
            Qualifier::Equals(name, value) => element.attributes.get(name) == Some(value),
        })
    }
}

fn read_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && (chars[*pos].is_alphanumeric() || matches!(chars[*pos], '-' | '_')) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_attribute(body: &str) -> Option<Qualifier> {
    match body.split_once('=') {
        None => {
            let name = body.trim();
            (!name.is_empty()).then(|| Qualifier::Has(name.to_string()))
        }
        Some((name, value)) => {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some(Qualifier::Equals(name.to_string(), value.to_string()))
        }
    }
}

/// First match in `root`'s inclusive subtree, in document order
pub fn query_selector(dom: &LiveDom, root: NodeId, selector: &str) -> DomResult<Option<NodeId>> {
    let selector = Selector::parse(selector)?;
    if selector.matches(dom, root) {
        return Ok(Some(root));
    }
    Ok(dom
        .descendants(root)
        .into_iter()
        .find(|id| selector.matches(dom, *id)))
}

pub fn query_selector_all(dom: &LiveDom, root: NodeId, selector: &str) -> DomResult<Vec<NodeId>> {
    let selector = Selector::parse(selector)?;
    let mut out = Vec::new();
    if selector.matches(dom, root) {
        out.push(root);
    }
    out.extend(
        dom.descendants(root)
            .into_iter()
            .filter(|id| selector.matches(dom, *id)),
    );
    Ok(out)
}
