//! Per-pass work items
//!
//! One [`WorkItem`] exists per reconciled node. Items live in a [`WorkArena`]
//! owned by the pass and refer to their parent by [`WorkItemId`], so nothing
//! here outlives the pass.

use bitflags::bitflags;
use scribe_dom::NodeId;
use scribe_vdom::{NodeKind, VNode};
use serde::Serialize;

bitflags! {
    /// Changes detected for a work item
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangeSet: u8 {
        const INSERT = 1 << 0;
        const TEXT = 1 << 1;
        const TAG = 1 << 2;
        const ATTRS = 1 << 3;
        const STYLE = 1 << 4;
        const MOVE = 1 << 5;
        const LISTENERS = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkItemId(usize);

#[derive(Debug)]
pub struct WorkItem<'v> {
    pub prev: Option<&'v VNode>,
    pub next: &'v VNode,
    pub kind: NodeKind,
    pub live: Option<NodeId>,
    pub parent: Option<WorkItemId>,
    /// Position among the next siblings
    pub index: usize,
    pub changes: ChangeSet,
}

#[derive(Debug, Default)]
pub struct WorkArena<'v> {
    items: Vec<WorkItem<'v>>,
}

impl<'v> WorkArena<'v> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: WorkItem<'v>) -> WorkItemId {
        self.items.push(item);
        WorkItemId(self.items.len() - 1)
    }

    pub fn get(&self, id: WorkItemId) -> &WorkItem<'v> {
        &self.items[id.0]
    }

    pub fn get_mut(&mut self, id: WorkItemId) -> &mut WorkItem<'v> {
        &mut self.items[id.0]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Child indices from the root down to `id`
    pub fn path(&self, id: WorkItemId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let item = self.get(id);
            path.push(item.index);
            current = item.parent;
        }
        path.reverse();
        path
    }

    pub fn tally(&self) -> ChangeTally {
        let mut tally = ChangeTally::default();
        for item in &self.items {
            tally.record(item.changes);
        }
        tally
    }
}

/// Number of work items carrying each change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeTally {
    pub items: usize,
    pub inserted: usize,
    pub retagged: usize,
    pub moved: usize,
    pub text: usize,
    pub attrs: usize,
    pub style: usize,
    pub listeners: usize,
}

impl ChangeTally {
    pub fn record(&mut self, changes: ChangeSet) {
        self.items += 1;
        let count = |flag: ChangeSet| usize::from(changes.contains(flag));
        self.inserted += count(ChangeSet::INSERT);
        self.retagged += count(ChangeSet::TAG);
        self.moved += count(ChangeSet::MOVE);
        self.text += count(ChangeSet::TEXT);
        self.attrs += count(ChangeSet::ATTRS);
        self.style += count(ChangeSet::STYLE);
        self.listeners += count(ChangeSet::LISTENERS);
    }

    pub fn merge(&mut self, other: &ChangeTally) {
        self.items += other.items;
        self.inserted += other.inserted;
        self.retagged += other.retagged;
        self.moved += other.moved;
        self.text += other.text;
        self.attrs += other.attrs;
        self.style += other.style;
        self.listeners += other.listeners;
    }

    /// Items that needed any live write
    pub fn changed(&self) -> usize {
        self.inserted + self.retagged + self.moved + self.text + self.attrs + self.style + self.listeners
    }
}
