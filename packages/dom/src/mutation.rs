//! Change records emitted by the live tree

use crate::live::NodeId;
use serde::Serialize;

/// Callback receiving one batch of records per [`crate::LiveDom::flush_records`]
pub type Observer = Box<dyn FnMut(&[MutationRecord])>;

/// A single observable change to a connected node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MutationRecord {
    /// Children added to or removed from `target`
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },

    /// Attribute set or removed
    Attributes { target: NodeId, name: String },

    /// Inline style property set or removed
    Style { target: NodeId, property: String },

    /// Text node content changed
    CharacterData { target: NodeId },

    /// Event listener bound or unbound
    Listeners { target: NodeId, event: String },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. }
            | MutationRecord::Attributes { target, .. }
            | MutationRecord::Style { target, .. }
            | MutationRecord::CharacterData { target }
            | MutationRecord::Listeners { target, .. } => *target,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, MutationRecord::ChildList { .. })
    }
}

/// Running counters of observable mutations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationStats {
    pub inserted: usize,
    pub moved: usize,
    pub removed: usize,
    pub text_writes: usize,
    pub attribute_writes: usize,
    pub style_writes: usize,
    pub listener_writes: usize,
}

impl MutationStats {
    /// Insertions, moves and removals
    pub fn structural(&self) -> usize {
        self.inserted + self.moved + self.removed
    }

    pub fn total(&self) -> usize {
        self.structural()
            + self.text_writes
            + self.attribute_writes
            + self.style_writes
            + self.listener_writes
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Counters accumulated after `earlier` was taken
    pub fn since(&self, earlier: &MutationStats) -> MutationStats {
        MutationStats {
            inserted: self.inserted.saturating_sub(earlier.inserted),
            moved: self.moved.saturating_sub(earlier.moved),
            removed: self.removed.saturating_sub(earlier.removed),
            text_writes: self.text_writes.saturating_sub(earlier.text_writes),
            attribute_writes: self.attribute_writes.saturating_sub(earlier.attribute_writes),
            style_writes: self.style_writes.saturating_sub(earlier.style_writes),
            listener_writes: self.listener_writes.saturating_sub(earlier.listener_writes),
        }
    }

    pub fn merge(&mut self, other: &MutationStats) {
        self.inserted += other.inserted;
        self.moved += other.moved;
        self.removed += other.removed;
        self.text_writes += other.text_writes;
        self.attribute_writes += other.attribute_writes;
        self.style_writes += other.style_writes;
        self.listener_writes += other.listener_writes;
    }
}
