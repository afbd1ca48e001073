//! Node classification

use crate::markers::Markers;
use crate::vnode::{AttrValue, VNode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Text,
    Element,
    Component,
    Portal,
}

/// Classify a node. Either component marker alone never makes a component.
pub fn classify(node: &VNode, markers: &Markers) -> NodeKind {
    if has_component_markers(&node.attrs, markers) {
        return NodeKind::Component;
    }
    if let Some(tag) = &node.tag {
        if *tag == markers.portal_tag || node.portal.is_some() {
            return NodeKind::Portal;
        }
        return NodeKind::Element;
    }
    if node.text.is_some() {
        return NodeKind::Text;
    }
    NodeKind::Element
}

pub(crate) fn has_component_markers(attrs: &IndexMap<String, AttrValue>, markers: &Markers) -> bool {
    let set = |name: &str| attrs.get(name).is_some_and(AttrValue::is_truthy);
    set(&markers.component_marker) && set(&markers.component_type_attribute)
}

/// Component type, for component instances only
pub fn component_type(node: &VNode, markers: &Markers) -> Option<String> {
    if !has_component_markers(&node.attrs, markers) {
        return None;
    }
    node.attr_string(&markers.component_type_attribute)
}
