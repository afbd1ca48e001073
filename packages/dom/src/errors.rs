//! Error types for the live tree

use crate::live::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node {0:?} does not exist")]
    DeadNode(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("Inserting {child:?} into {parent:?} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("The body element cannot be moved or removed")]
    BodyLocked,

    #[error("Unsupported selector '{0}'")]
    UnsupportedSelector(String),
}
