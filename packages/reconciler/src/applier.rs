//! Live tree writes
//!
//! Every function here returns the [`ChangeSet`] bits it actually caused, so
//! a no-op update reports nothing.

use crate::attr_differ::{AttrPatch, ListenerPatch};
use crate::work_item::ChangeSet;
use scribe_dom::{DomResult, LiveDom, NodeId};
use tracing::debug;

pub fn create_text(dom: &mut LiveDom, text: &str) -> NodeId {
    dom.create_text(text)
}

pub fn create_element(dom: &mut LiveDom, tag: &str) -> NodeId {
    dom.create_element(tag)
}

/// Write `text` unless the live node already holds it
pub fn update_text(dom: &mut LiveDom, node: NodeId, text: &str) -> DomResult<ChangeSet> {
    if dom.text(node) == Some(text) {
        return Ok(ChangeSet::empty());
    }
    dom.set_text(node, text)?;
    Ok(ChangeSet::TEXT)
}

pub fn apply_attr_patch(dom: &mut LiveDom, node: NodeId, patch: &AttrPatch) -> DomResult<ChangeSet> {
    if patch.is_empty() {
        return Ok(ChangeSet::empty());
    }
    for (name, value) in &patch.set {
        match value {
            Some(value) => dom.set_attribute(node, name.as_str(), value.as_str())?,
            None => {
                dom.remove_attribute(node, name)?;
            }
        }
    }
    Ok(ChangeSet::ATTRS)
}

pub fn apply_style_patch(dom: &mut LiveDom, node: NodeId, patch: &AttrPatch) -> DomResult<ChangeSet> {
    if patch.is_empty() {
        return Ok(ChangeSet::empty());
    }
    for (property, value) in &patch.set {
        match value {
            Some(value) => dom.set_style(node, property.as_str(), value.as_str())?,
            None => {
                dom.remove_style(node, property)?;
            }
        }
    }
    Ok(ChangeSet::STYLE)
}

pub fn apply_listener_patch(dom: &mut LiveDom, node: NodeId, patch: &ListenerPatch) -> DomResult<ChangeSet> {
    if patch.is_empty() {
        return Ok(ChangeSet::empty());
    }
    for event in &patch.unbind {
        dom.remove_listener(node, event)?;
    }
    for (event, handler) in &patch.bind {
        dom.add_listener(node, event.as_str(), handler.as_str())?;
    }
    Ok(ChangeSet::LISTENERS)
}

/// Insert or move `node` before `reference` unless it is already there
pub fn place(dom: &mut LiveDom, parent: NodeId, node: NodeId, reference: Option<NodeId>) -> DomResult<ChangeSet> {
    let in_place = dom.parent(node) == Some(parent) && dom.next_sibling(node) == reference;
    if in_place {
        return Ok(ChangeSet::empty());
    }
    let moving = dom.parent(node).is_some();
    dom.insert_before(parent, node, reference)?;
    Ok(if moving {
        ChangeSet::MOVE
    } else {
        ChangeSet::INSERT
    })
}

/// Move every child of `from` to the end of `to`
pub fn move_children(dom: &mut LiveDom, from: NodeId, to: NodeId) -> DomResult<()> {
    let children = dom.children(from).to_vec();
    for child in children {
        dom.append_child(to, child)?;
    }
    Ok(())
}

/// Replace `old` with `new` at its position, carrying element children over
///
/// `new` must be detached. Children move only between two elements; a text
/// node replacing an element drops the old subtree.
pub fn replace(dom: &mut LiveDom, old: NodeId, new: NodeId) -> DomResult<()> {
    if let Some(parent) = dom.parent(old) {
        dom.insert_before(parent, new, Some(old))?;
    }
    retire(dom, old, new)
}

/// Hand `old`'s children to an already placed `new`, then destroy `old`
pub fn retire(dom: &mut LiveDom, old: NodeId, new: NodeId) -> DomResult<()> {
    if dom.is_element(old) && dom.is_element(new) {
        move_children(dom, old, new)?;
    }
    debug!(old = ?old, new = ?new, "Replaced live node");
    dom.destroy(old)
}

/// Destroy a stale node and its subtree
pub fn remove(dom: &mut LiveDom, node: NodeId) -> DomResult<()> {
    debug!(node = ?node, "Removing stale live node");
    dom.destroy(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_update_text_skips_equal_values() {
        let mut dom = LiveDom::new();
        let text = dom.create_text("same");
        dom.append_child(dom.body(), text).unwrap();
        dom.reset_stats();

        assert_eq!(update_text(&mut dom, text, "same").unwrap(), ChangeSet::empty());
        assert_eq!(update_text(&mut dom, text, "changed").unwrap(), ChangeSet::TEXT);
        assert_eq!(dom.stats().text_writes, 1);
    }

    #[test]
    fn test_place_reports_insert_then_nothing() {
        let mut dom = LiveDom::new();
        let body = dom.body();
        let a = dom.create_element("p");
        let b = dom.create_element("p");

        assert_eq!(place(&mut dom, body, a, None).unwrap(), ChangeSet::INSERT);
        assert_eq!(place(&mut dom, body, b, None).unwrap(), ChangeSet::INSERT);
        assert_eq!(place(&mut dom, body, a, Some(b)).unwrap(), ChangeSet::empty());
        assert_eq!(place(&mut dom, body, b, Some(a)).unwrap(), ChangeSet::MOVE);
        assert_eq!(dom.children(body), &[b, a]);
    }

    #[test]
    fn test_replace_keeps_children() {
        let mut dom = LiveDom::new();
        let body = dom.body();
        let old = dom.create_element("p");
        let child = dom.create_text("kept");
        dom.append_child(old, child).unwrap();
        dom.append_child(body, old).unwrap();

        let new = dom.create_element("h1");
        replace(&mut dom, old, new).unwrap();

        assert_eq!(dom.children(body), &[new]);
        assert_eq!(dom.children(new), &[child]);
        assert!(!dom.contains(old));
    }

    #[test]
    fn test_patches_apply_sets_and_removals() {
        let mut dom = LiveDom::new();
        let div = dom.create_element("div");
        dom.set_attribute(div, "title", "old").unwrap();

        let mut set = IndexMap::new();
        set.insert("class".to_string(), Some("lead".to_string()));
        set.insert("title".to_string(), None);
        let changes = apply_attr_patch(&mut dom, div, &AttrPatch { set }).unwrap();

        assert_eq!(changes, ChangeSet::ATTRS);
        assert_eq!(dom.attribute(div, "class"), Some("lead"));
        assert_eq!(dom.attribute(div, "title"), None);
    }
}
