//! Stable-identity index
//!
//! Maps identity attribute values to live nodes. Entries are validated on
//! read, so a stale entry costs a miss and a scan, never a wrong match.

use scribe_dom::{LiveDom, NodeId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SidIndex {
    entries: HashMap<String, NodeId>,
}

impl SidIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexed node for `sid`, if it is alive and still carries the value
    pub fn get(&self, dom: &LiveDom, attribute: &str, sid: &str) -> Option<NodeId> {
        let node = *self.entries.get(sid)?;
        (dom.attribute(node, attribute) == Some(sid)).then_some(node)
    }

    pub fn insert(&mut self, sid: impl Into<String>, node: NodeId) {
        self.entries.insert(sid.into(), node);
    }

    pub fn remove(&mut self, sid: &str) -> Option<NodeId> {
        self.entries.remove(sid)
    }

    /// Drop entries for `root`'s inclusive subtree and for dead nodes
    pub fn invalidate_subtree(&mut self, dom: &LiveDom, root: NodeId) {
        self.entries
            .retain(|_, node| dom.contains(*node) && !dom.is_inclusive_ancestor(root, *node));
    }

    /// Index every identity-bearing element under `root`
    pub fn rebuild(&mut self, dom: &LiveDom, root: NodeId, attribute: &str) {
        self.invalidate_subtree(dom, root);
        for node in std::iter::once(root).chain(dom.descendants(root)) {
            if let Some(sid) = dom.attribute(node, attribute) {
                self.entries.insert(sid.to_string(), node);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
