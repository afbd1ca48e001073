//! Development mode checks for trees that reconcile unstably

use crate::classify::has_component_markers;
use crate::markers::Markers;
use crate::visitor::{walk_node, Visitor};
use crate::vnode::{AttrValue, VNode};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    /// Reconciles, but probably not the way the author expects
    Warning,
    /// Defeats identity matching for part of the tree
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeWarning {
    pub level: WarningLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

impl TreeWarning {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarningLevel::Warning,
            message: message.into(),
            sid: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarningLevel::Error,
            message: message.into(),
            sid: None,
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }
}

struct Validator<'m> {
    markers: &'m Markers,
    seen_sids: HashSet<String>,
    warnings: Vec<TreeWarning>,
}

impl Visitor for Validator<'_> {
    fn visit_node(&mut self, node: &VNode) {
        let sid = node.sid(self.markers);
        if let Some(sid) = &sid {
            if !self.seen_sids.insert(sid.clone()) {
                self.warnings.push(
                    TreeWarning::error(format!("Duplicate stable identity '{}'", sid))
                        .with_sid(sid.clone()),
                );
            }
        }

        if node.tag.is_some() && node.text.is_some() && !node.children.is_empty() {
            self.warnings.push(tagged(
                TreeWarning::warning("Node has both text and children; text is rendered as the first child"),
                &sid,
            ));
        }

        let component_marker = node
            .attrs
            .get(&self.markers.component_marker)
            .is_some_and(AttrValue::is_truthy);
        let component_type = node
            .attrs
            .get(&self.markers.component_type_attribute)
            .is_some_and(AttrValue::is_truthy);
        if (component_marker || component_type) && !has_component_markers(&node.attrs, self.markers) {
            self.warnings.push(tagged(
                TreeWarning::warning("Component marker without component type (or the reverse) renders as a plain element"),
                &sid,
            ));
        }

        self.check_sibling_keys(node, &sid);
        walk_node(self, node);
    }
}

fn tagged(warning: TreeWarning, sid: &Option<String>) -> TreeWarning {
    match sid {
        Some(sid) => warning.with_sid(sid.clone()),
        None => warning,
    }
}

impl Validator<'_> {
    fn check_sibling_keys(&mut self, parent: &VNode, sid: &Option<String>) {
        let mut keys = HashSet::new();
        let mut keyed = 0;
        let mut total = 0;
        for child in parent.child_nodes() {
            total += 1;
            let key = child
                .key
                .clone()
                .or_else(|| child.attr_string(&self.markers.key_attribute));
            let Some(key) = key else { continue };
            keyed += 1;
            if !keys.insert(key.clone()) {
                let warning = TreeWarning::error(format!("Duplicate key '{}' among siblings", key));
                self.warnings.push(tagged(warning, sid));
            }
        }
        if keyed > 0 && keyed < total {
            let warning = TreeWarning::warning(format!(
                "{} of {} siblings are keyed; unkeyed siblings match by position",
                keyed, total
            ));
            self.warnings.push(tagged(warning, sid));
        }
    }
}

/// Collect warnings for `root` and its subtree
pub fn validate_tree(root: &VNode, markers: &Markers) -> Vec<TreeWarning> {
    let mut validator = Validator {
        markers,
        seen_sids: HashSet::new(),
        warnings: Vec::new(),
    };
    validator.visit_node(root);
    validator.warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_sids_are_errors() {
        let tree = VNode::element("div")
            .with_child(VNode::element("p").with_sid("a"))
            .with_child(VNode::element("p").with_sid("a"));

        let warnings = validate_tree(&tree, &Markers::default());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarningLevel::Error);
        assert_eq!(warnings[0].sid.as_deref(), Some("a"));
    }

    #[test]
    fn test_duplicate_and_partial_keys() {
        let tree = VNode::element("ul")
            .with_child(VNode::element("li").with_key("x"))
            .with_child(VNode::element("li").with_attr("key", "x"))
            .with_child(VNode::element("li"));

        let warnings = validate_tree(&tree, &Markers::default());
        let messages: Vec<_> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Duplicate key 'x' among siblings",
                "2 of 3 siblings are keyed; unkeyed siblings match by position",
            ]
        );
    }

    #[test]
    fn test_clean_tree_has_no_warnings() {
        let tree = VNode::element("ul")
            .with_child(VNode::element("li").with_key("a").with_text("one"))
            .with_child(VNode::element("li").with_key("b").with_text("two"));
        assert!(validate_tree(&tree, &Markers::default()).is_empty());
    }
}
