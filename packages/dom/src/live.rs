//! Arena-backed live tree

use crate::errors::DomError;
use crate::mutation::{MutationRecord, MutationStats, Observer};
use crate::DomResult;
use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use std::fmt;
use tracing::trace;

new_key_type! {
    /// Handle to a node owned by a [`LiveDom`]
    pub struct NodeId;
}

/// Element payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub style: IndexMap<String, String>,
    /// Event name to handler name
    pub listeners: IndexMap<String, String>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
struct LiveNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl LiveNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// The mutable render target
pub struct LiveDom {
    nodes: SlotMap<NodeId, LiveNode>,
    body: NodeId,
    pending: Vec<MutationRecord>,
    stats: MutationStats,
    observer: Option<Observer>,
}

impl fmt::Debug for LiveDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveDom")
            .field("nodes", &self.nodes.len())
            .field("body", &self.body)
            .field("pending", &self.pending.len())
            .field("stats", &self.stats)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl Default for LiveDom {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveDom {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(LiveNode::new(NodeData::Element(ElementData::new("body"))));
        Self {
            nodes,
            body,
            pending: Vec::new(),
            stats: MutationStats::default(),
            observer: None,
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of live nodes, connected or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id).map(|n| &n.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.node(id) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id), Some(NodeData::Text(_)))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            Some(NodeData::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children of `id`; empty for text nodes and dead handles
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(parent, id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Whether `node` is `ancestor` or one of its descendants
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = if self.contains(node) { Some(node) } else { None };
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is attached under `body`
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.body, id)
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.nodes
            .insert(LiveNode::new(NodeData::Element(ElementData::new(tag))))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(LiveNode::new(NodeData::Text(text.into())))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end), moving it if attached
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.ensure_element(parent)?;
        if !self.contains(child) {
            return Err(DomError::DeadNode(child));
        }
        if child == self.body {
            return Err(DomError::BodyLocked);
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference {
            if reference == child {
                return Ok(());
            }
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }

        let old_parent = self.parent(child);
        let was_connected = old_parent.is_some_and(|p| self.is_connected(p));
        if let Some(old) = old_parent {
            self.unlink(old, child);
        }

        let index = reference
            .and_then(|r| self.index_of(parent, r))
            .unwrap_or_else(|| self.children(parent).len());
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.insert(index, child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }

        let now_connected = self.is_connected(parent);
        if was_connected {
            if let Some(old) = old_parent.filter(|old| *old != parent) {
                self.record(MutationRecord::ChildList {
                    target: old,
                    added: Vec::new(),
                    removed: vec![child],
                });
            }
        }
        if now_connected {
            self.record(MutationRecord::ChildList {
                target: parent,
                added: vec![child],
                removed: Vec::new(),
            });
        }
        match (was_connected, now_connected) {
            (true, true) => self.stats.moved += 1,
            (false, true) => self.stats.inserted += 1,
            (true, false) => self.stats.removed += 1,
            (false, false) => {}
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        let connected = self.is_connected(parent);
        self.unlink(parent, child);
        if connected {
            self.stats.removed += 1;
            self.record(MutationRecord::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![child],
            });
        }
        Ok(())
    }

    /// Remove the node from its parent, if it has one
    pub fn detach(&mut self, node: NodeId) -> DomResult<()> {
        if node == self.body {
            return Err(DomError::BodyLocked);
        }
        if !self.contains(node) {
            return Err(DomError::DeadNode(node));
        }
        match self.parent(node) {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> DomResult<()> {
        if self.parent(old) != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new == old {
            return Ok(());
        }
        self.insert_before(parent, new, Some(old))?;
        self.remove_child(parent, old)
    }

    /// Detach the node and free it together with its subtree
    pub fn destroy(&mut self, node: NodeId) -> DomResult<()> {
        self.detach(node)?;
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.remove(id) {
                stack.extend(removed.children);
            }
        }
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .and_then(|el| el.attributes.get(name))
            .map(String::as_str)
    }

    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> DomResult<()> {
        let name = name.into();
        let connected = self.is_connected(node);
        self.element_mut(node)?
            .attributes
            .insert(name.clone(), value.into());
        if connected {
            self.stats.attribute_writes += 1;
            self.record(MutationRecord::Attributes { target: node, name });
        }
        Ok(())
    }

    /// Returns whether the attribute was present
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<bool> {
        let connected = self.is_connected(node);
        let removed = self
            .element_mut(node)?
            .attributes
            .shift_remove(name)
            .is_some();
        if removed && connected {
            self.stats.attribute_writes += 1;
            self.record(MutationRecord::Attributes {
                target: node,
                name: name.to_string(),
            });
        }
        Ok(removed)
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)
            .and_then(|el| el.style.get(property))
            .map(String::as_str)
    }

    pub fn set_style(
        &mut self,
        node: NodeId,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> DomResult<()> {
        let property = property.into();
        let connected = self.is_connected(node);
        self.element_mut(node)?
            .style
            .insert(property.clone(), value.into());
        if connected {
            self.stats.style_writes += 1;
            self.record(MutationRecord::Style {
                target: node,
                property,
            });
        }
        Ok(())
    }

    pub fn remove_style(&mut self, node: NodeId, property: &str) -> DomResult<bool> {
        let connected = self.is_connected(node);
        let removed = self
            .element_mut(node)?
            .style
            .shift_remove(property)
            .is_some();
        if removed && connected {
            self.stats.style_writes += 1;
            self.record(MutationRecord::Style {
                target: node,
                property: property.to_string(),
            });
        }
        Ok(removed)
    }

    pub fn listener(&self, node: NodeId, event: &str) -> Option<&str> {
        self.element(node)
            .and_then(|el| el.listeners.get(event))
            .map(String::as_str)
    }

    pub fn add_listener(
        &mut self,
        node: NodeId,
        event: impl Into<String>,
        handler: impl Into<String>,
    ) -> DomResult<()> {
        let event = event.into();
        let connected = self.is_connected(node);
        self.element_mut(node)?
            .listeners
            .insert(event.clone(), handler.into());
        if connected {
            self.stats.listener_writes += 1;
            self.record(MutationRecord::Listeners {
                target: node,
                event,
            });
        }
        Ok(())
    }

    pub fn remove_listener(&mut self, node: NodeId, event: &str) -> DomResult<bool> {
        let connected = self.is_connected(node);
        let removed = self
            .element_mut(node)?
            .listeners
            .shift_remove(event)
            .is_some();
        if removed && connected {
            self.stats.listener_writes += 1;
            self.record(MutationRecord::Listeners {
                target: node,
                event: event.to_string(),
            });
        }
        Ok(removed)
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> DomResult<()> {
        let connected = self.is_connected(node);
        match self.nodes.get_mut(node).map(|n| &mut n.data) {
            Some(NodeData::Text(content)) => *content = text.into(),
            Some(NodeData::Element(_)) => return Err(DomError::NotText(node)),
            None => return Err(DomError::DeadNode(node)),
        }
        if connected {
            self.stats.text_writes += 1;
            self.record(MutationRecord::CharacterData { target: node });
        }
        Ok(())
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }

    /// Descendants in document order, excluding `node`
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// First element in `root`'s inclusive subtree whose attribute equals `value`
    pub fn find_by_attribute(&self, root: NodeId, name: &str, value: &str) -> Option<NodeId> {
        if self.attribute(root, name) == Some(value) {
            return Some(root);
        }
        self.descendants(root)
            .into_iter()
            .find(|id| self.attribute(*id, name) == Some(value))
    }

    pub fn stats(&self) -> MutationStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MutationStats::default();
    }

    /// Pending records that have not been delivered yet
    pub fn pending_records(&self) -> &[MutationRecord] {
        &self.pending
    }

    /// Take pending records without notifying the observer
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn set_observer(&mut self, observer: Observer) {
        self.observer = Some(observer);
    }

    pub fn clear_observer(&mut self) -> Option<Observer> {
        self.observer.take()
    }

    /// Deliver pending records to the observer as one batch
    pub fn flush_records(&mut self) -> usize {
        let records = self.take_records();
        if records.is_empty() {
            return 0;
        }
        if let Some(observer) = self.observer.as_mut() {
            observer(&records);
        }
        records.len()
    }

    fn ensure_element(&self, id: NodeId) -> DomResult<()> {
        match self.node(id) {
            Some(NodeData::Element(_)) => Ok(()),
            Some(NodeData::Text(_)) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::DeadNode(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        match self.nodes.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Ok(el),
            Some(NodeData::Text(_)) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::DeadNode(id)),
        }
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
    }

    fn record(&mut self, record: MutationRecord) {
        trace!(?record, "Live tree mutation");
        self.pending.push(record);
    }
}
