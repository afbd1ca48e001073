use crate::vnode::Child;
use scribe_dom::{LiveDom, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Where and what a portal renders
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSpec {
    /// Explicit portal identity, takes priority over every derived identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub target: PortalTarget,
    /// Content rendered ahead of the portal node's children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template: Vec<Child>,
}

impl PortalSpec {
    pub fn new(target: PortalTarget) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }
}

/// Portal target reference
///
/// JSON accepts `"body"`, `{ "selector": "#overlay" }` and `{ "stableId": "n-1" }`.
/// Live node references and resolvers only exist in-process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortalTarget {
    #[default]
    Body,
    Selector(String),
    StableId(String),
    Node(NodeId),
    #[serde(skip)]
    Resolver(TargetResolver),
}

impl PortalTarget {
    /// Parse the string form used by the `target` attribute
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("body") {
            PortalTarget::Body
        } else {
            PortalTarget::Selector(value.to_string())
        }
    }

    pub fn resolver(f: impl Fn(&LiveDom) -> Option<NodeId> + 'static) -> Self {
        PortalTarget::Resolver(TargetResolver::new(f))
    }
}

impl fmt::Display for PortalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortalTarget::Body => write!(f, "body"),
            PortalTarget::Selector(s) => write!(f, "{}", s),
            PortalTarget::StableId(id) => write!(f, "sid:{}", id),
            PortalTarget::Node(node) => write!(f, "node:{:?}", node),
            PortalTarget::Resolver(_) => write!(f, "resolver"),
        }
    }
}

/// Caller-supplied function locating the target in the live tree
#[derive(Clone)]
pub struct TargetResolver(Rc<dyn Fn(&LiveDom) -> Option<NodeId>>);

impl TargetResolver {
    pub fn new(f: impl Fn(&LiveDom) -> Option<NodeId> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn resolve(&self, dom: &LiveDom) -> Option<NodeId> {
        (self.0)(dom)
    }
}

impl fmt::Debug for TargetResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TargetResolver(..)")
    }
}

impl PartialEq for TargetResolver {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
