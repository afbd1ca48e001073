//! # Scribe Virtual Tree
//!
//! The immutable, serializable description of desired UI state that the
//! reconciler consumes.
//!
//! ```json
//! {
//!   "tag": "p",
//!   "attrs": { "data-node-id": "para-1", "onclick": { "handler": "focus" } },
//!   "style": { "color": "red" },
//!   "children": ["Hello ", { "tag": "strong", "text": "world" }]
//! }
//! ```
//!
//! Trees are normalized before reconciliation (see [`VNode::normalized`]): string
//! and number children become text nodes, and `text` on a node that has children
//! (or on an element) is folded into its children so a node never carries both.

pub mod classify;
pub mod markers;
pub mod portal;
pub mod validate;
pub mod visitor;
pub mod vnode;

pub use classify::{classify, component_type, NodeKind};
pub use markers::Markers;
pub use portal::{PortalSpec, PortalTarget, TargetResolver};
pub use validate::{validate_tree, TreeWarning, WarningLevel};
pub use visitor::{walk_child, walk_node, walk_portal, Visitor};
pub use vnode::{format_number, AttrValue, Child, VNode, DEFAULT_CONTAINER_TAG};

/// Parse a virtual tree from JSON
pub fn from_json(source: &str) -> Result<VNode, serde_json::Error> {
    serde_json::from_str(source)
}
