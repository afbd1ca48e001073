//! Attribute, style and listener diffing
//!
//! Produces the minimal set of writes that turns one node's attributes into
//! another's. Values are compared in their live form (see
//! [`AttrValue::to_attr_string`]), so `true` and `""` are the same attribute.

use indexmap::IndexMap;
use scribe_dom::{LiveDom, NodeId};
use scribe_vdom::{AttrValue, Markers};

/// Attribute or style writes; `None` removes the entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrPatch {
    pub set: IndexMap<String, Option<String>>,
}

impl AttrPatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn removals(&self) -> impl Iterator<Item = &str> {
        self.set
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.as_str())
    }

    /// Whether the patch touches `name`
    pub fn touches(&self, name: &str) -> bool {
        self.set.contains_key(name)
    }
}

/// Listener binds (event to handler) and unbinds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerPatch {
    pub bind: IndexMap<String, String>,
    pub unbind: Vec<String>,
}

impl ListenerPatch {
    pub fn is_empty(&self) -> bool {
        self.bind.is_empty() && self.unbind.is_empty()
    }
}

fn written_attrs<'a>(
    attrs: &'a IndexMap<String, AttrValue>,
    markers: &'a Markers,
) -> impl Iterator<Item = (&'a str, Option<String>)> {
    attrs
        .iter()
        .filter(move |(name, value)| **name != markers.key_attribute && !value.is_handler())
        .map(|(name, value)| (name.as_str(), value.to_attr_string()))
}

fn diff_values<'a>(
    prev: impl Iterator<Item = (&'a str, Option<String>)>,
    next: impl Iterator<Item = (&'a str, Option<String>)>,
) -> AttrPatch {
    let prev: IndexMap<&str, String> = prev
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect();
    let next: IndexMap<&str, String> = next
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect();

    let mut patch = AttrPatch::default();
    for (name, value) in &next {
        if prev.get(name) != Some(value) {
            patch.set.insert(name.to_string(), Some(value.clone()));
        }
    }
    for name in prev.keys() {
        if !next.contains_key(name) {
            patch.set.insert(name.to_string(), None);
        }
    }
    patch
}

/// Attribute writes from `prev` to `next`. The reconciliation key and
/// handler markers are never written.
pub fn diff_attrs(
    prev: &IndexMap<String, AttrValue>,
    next: &IndexMap<String, AttrValue>,
    markers: &Markers,
) -> AttrPatch {
    diff_values(written_attrs(prev, markers), written_attrs(next, markers))
}

/// Style writes from `prev` to `next`; properties missing from `next` are unset
pub fn diff_style(prev: &IndexMap<String, AttrValue>, next: &IndexMap<String, AttrValue>) -> AttrPatch {
    let values = |style: &IndexMap<String, AttrValue>| {
        style
            .iter()
            .map(|(name, value)| (name.clone(), value.to_attr_string().filter(|v| !v.is_empty())))
            .collect::<Vec<_>>()
    };
    let prev = values(prev);
    let next = values(next);
    diff_values(
        prev.iter().map(|(n, v)| (n.as_str(), v.clone())),
        next.iter().map(|(n, v)| (n.as_str(), v.clone())),
    )
}

/// Event name bound by a handler attribute: `onClick` listens for `click`
pub fn event_name(attribute: &str) -> String {
    let name = attribute.strip_prefix("on").unwrap_or(attribute);
    name.to_ascii_lowercase()
}

fn handlers(attrs: &IndexMap<String, AttrValue>) -> IndexMap<String, String> {
    attrs
        .iter()
        .filter_map(|(name, value)| value.as_handler().map(|h| (event_name(name), h.to_string())))
        .collect()
}

fn diff_handlers(prev: IndexMap<String, String>, next: IndexMap<String, String>) -> ListenerPatch {
    let mut patch = ListenerPatch::default();
    for (event, handler) in &next {
        if prev.get(event) != Some(handler) {
            patch.bind.insert(event.clone(), handler.clone());
        }
    }
    for event in prev.keys() {
        if !next.contains_key(event) {
            patch.unbind.push(event.clone());
        }
    }
    patch
}

pub fn diff_listeners(prev: &IndexMap<String, AttrValue>, next: &IndexMap<String, AttrValue>) -> ListenerPatch {
    diff_handlers(handlers(prev), handlers(next))
}

/// Attribute writes to bring a live element in line with `next`
///
/// Used when no previous virtual node is known for the element.
pub fn diff_attrs_against_live(
    dom: &LiveDom,
    node: NodeId,
    next: &IndexMap<String, AttrValue>,
    markers: &Markers,
) -> AttrPatch {
    let Some(element) = dom.element(node) else {
        return AttrPatch::default();
    };
    diff_values(
        element
            .attributes
            .iter()
            .map(|(name, value)| (name.as_str(), Some(value.clone()))),
        written_attrs(next, markers),
    )
}

pub fn diff_style_against_live(dom: &LiveDom, node: NodeId, next: &IndexMap<String, AttrValue>) -> AttrPatch {
    let Some(element) = dom.element(node) else {
        return AttrPatch::default();
    };
    let live: IndexMap<String, AttrValue> = element
        .style
        .iter()
        .map(|(name, value)| (name.clone(), AttrValue::Text(value.clone())))
        .collect();
    diff_style(&live, next)
}

pub fn diff_listeners_against_live(dom: &LiveDom, node: NodeId, next: &IndexMap<String, AttrValue>) -> ListenerPatch {
    let Some(element) = dom.element(node) else {
        return ListenerPatch::default();
    };
    diff_handlers(element.listeners.clone(), handlers(next))
}
