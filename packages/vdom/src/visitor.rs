use crate::portal::PortalSpec;
use crate::vnode::{Child, VNode};

/// Visitor pattern for traversing virtual trees immutably
///
/// Default implementations walk the entire tree, portal templates included.
/// Override specific visit_* methods to act on nodes.
pub trait Visitor: Sized {
    fn visit_node(&mut self, node: &VNode) {
        walk_node(self, node);
    }

    fn visit_portal(&mut self, portal: &PortalSpec) {
        walk_portal(self, portal);
    }

    fn visit_text(&mut self, _text: &str) {
        // Leaf
    }

    fn visit_number(&mut self, _value: f64) {
        // Leaf
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &VNode) {
    if let Some(text) = &node.text {
        visitor.visit_text(text);
    }
    if let Some(portal) = &node.portal {
        visitor.visit_portal(portal);
    }
    for child in &node.children {
        walk_child(visitor, child);
    }
}

pub fn walk_portal<V: Visitor>(visitor: &mut V, portal: &PortalSpec) {
    for child in &portal.template {
        walk_child(visitor, child);
    }
}

pub fn walk_child<V: Visitor>(visitor: &mut V, child: &Child) {
    match child {
        Child::Node(node) => visitor.visit_node(node),
        Child::Text(text) => visitor.visit_text(text),
        Child::Number(value) => visitor.visit_number(*value),
    }
}
