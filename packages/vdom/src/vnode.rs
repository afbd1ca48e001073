use crate::classify::has_component_markers;
use crate::markers::{Markers, DEFAULT_IDENTITY_ATTRIBUTE, DEFAULT_PORTAL_TAG};
use crate::portal::{PortalSpec, PortalTarget};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tag used for containers and components that don't name one
pub const DEFAULT_CONTAINER_TAG: &str = "div";

/// Virtual tree node
///
/// A node without `tag` is a text node. Everything else is an element, a
/// component instance or a portal (see [`crate::classify`]).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, AttrValue>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub style: IndexMap<String, AttrValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Child>,
    /// Reconciliation-only identifier, never written to the live tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal: Option<PortalSpec>,
}

/// Resolved attribute or style value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Event handler marker, bound as a listener rather than written
    Handler { handler: String },
}

/// Child entry as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Text(String),
    Number(f64),
    Node(VNode),
}

/// Render a number the way it appears in markup (`3`, not `3.0`)
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    value.to_string()
}

impl AttrValue {
    pub fn handler(name: impl Into<String>) -> Self {
        AttrValue::Handler {
            handler: name.into(),
        }
    }

    /// Live attribute value: `true` is presence, `false`/null is absence
    pub fn to_attr_string(&self) -> Option<String> {
        match self {
            AttrValue::Null | AttrValue::Bool(false) | AttrValue::Handler { .. } => None,
            AttrValue::Bool(true) => Some(String::new()),
            AttrValue::Number(n) => Some(format_number(*n)),
            AttrValue::Text(s) => Some(s.clone()),
        }
    }

    pub fn as_handler(&self) -> Option<&str> {
        match self {
            AttrValue::Handler { handler } => Some(handler),
            _ => None,
        }
    }

    pub fn is_handler(&self) -> bool {
        matches!(self, AttrValue::Handler { .. })
    }

    /// Whether the value counts as "set" for marker attributes
    pub fn is_truthy(&self) -> bool {
        !matches!(self, AttrValue::Null | AttrValue::Bool(false))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Number(value as f64)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Number(value as f64)
    }
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Number(value)
    }
}

impl Child {
    /// Convert to a node; strings and numbers become text nodes
    pub fn into_node(self) -> VNode {
        match self {
            Child::Node(node) => node,
            Child::Text(text) => VNode::text(text),
            Child::Number(n) => VNode::text(format_number(n)),
        }
    }

    pub fn as_node(&self) -> Option<&VNode> {
        match self {
            Child::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> Self {
        VNode {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        VNode {
            text: Some(content.into()),
            ..Default::default()
        }
    }

    /// Portal node using the default portal tag
    pub fn portal(target: PortalTarget) -> Self {
        VNode {
            tag: Some(DEFAULT_PORTAL_TAG.to_string()),
            portal: Some(PortalSpec::new(target)),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Bind `handler` to the `on<event>` attribute
    pub fn with_handler(mut self, attr: impl Into<String>, handler: impl Into<String>) -> Self {
        self.attrs.insert(attr.into(), AttrValue::handler(handler));
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the stable identity under the default identity attribute
    pub fn with_sid(self, sid: impl Into<String>) -> Self {
        self.with_attr(DEFAULT_IDENTITY_ATTRIBUTE, sid.into())
    }

    pub fn with_portal_id(mut self, id: impl Into<String>) -> Self {
        if let Some(spec) = self.portal.as_mut() {
            spec.id = Some(id.into());
        }
        self
    }

    pub fn with_template<C: Into<Child>>(mut self, template: impl IntoIterator<Item = C>) -> Self {
        if let Some(spec) = self.portal.as_mut() {
            spec.template.extend(template.into_iter().map(Into::into));
        }
        self
    }

    /// A text node has no tag
    pub fn is_text(&self) -> bool {
        self.tag.is_none() && self.text.is_some()
    }

    pub fn tag_name(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_CONTAINER_TAG)
    }

    /// Attribute rendered as it would appear on the live node
    pub fn attr_string(&self, name: &str) -> Option<String> {
        self.attrs.get(name).and_then(AttrValue::to_attr_string)
    }

    /// Stable identity value, if the node carries one
    pub fn sid(&self, markers: &Markers) -> Option<String> {
        self.attr_string(&markers.identity_attribute)
            .filter(|sid| !sid.is_empty())
    }

    /// Child nodes, skipping raw text/number entries
    pub fn child_nodes(&self) -> impl Iterator<Item = &VNode> {
        self.children.iter().filter_map(Child::as_node)
    }

    /// Projected portal content: template followed by children
    pub fn portal_content(&self) -> impl Iterator<Item = &VNode> {
        self.portal
            .iter()
            .flat_map(|spec| spec.template.iter())
            .chain(self.children.iter())
            .filter_map(Child::as_node)
    }

    /// Logical text of the subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            match child {
                Child::Text(text) => out.push_str(text),
                Child::Number(n) => out.push_str(&format_number(*n)),
                Child::Node(node) => node.collect_text(out),
            }
        }
    }

    /// Deep copy in canonical form
    ///
    /// - `Child::Text`/`Child::Number` become text nodes
    /// - `text` on a tagged node becomes a leading text child
    /// - the key attribute moves to `key`
    /// - tagless containers and components get [`DEFAULT_CONTAINER_TAG`]
    /// - a portal tag without a spec gets one from its `target` attribute
    pub fn normalized(&self, markers: &Markers) -> VNode {
        let mut attrs = self.attrs.clone();
        let key_attr = attrs.shift_remove(&markers.key_attribute);
        let key = self
            .key
            .clone()
            .or_else(|| key_attr.as_ref().and_then(AttrValue::to_attr_string));

        let component = has_component_markers(&self.attrs, markers);
        let text_only = self.tag.is_none()
            && self.text.is_some()
            && self.children.is_empty()
            && self.portal.is_none()
            && !component;
        if text_only {
            return VNode {
                text: self.text.clone(),
                key,
                ..Default::default()
            };
        }

        let tag = match (&self.tag, &self.portal) {
            (Some(tag), _) => tag.clone(),
            (None, Some(_)) => markers.portal_tag.clone(),
            (None, None) => DEFAULT_CONTAINER_TAG.to_string(),
        };

        let mut children = Vec::with_capacity(self.children.len() + 1);
        if let Some(text) = &self.text {
            if self.children.is_empty() || !text.is_empty() {
                children.push(Child::Node(VNode::text(text.clone())));
            }
        }
        children.extend(
            self.children
                .iter()
                .map(|child| Child::Node(normalize_child(child, markers))),
        );

        let mut portal = self.portal.clone();
        if portal.is_none() && tag == markers.portal_tag {
            let target = attrs
                .get("target")
                .and_then(AttrValue::to_attr_string)
                .map(|t| PortalTarget::parse(&t))
                .unwrap_or_default();
            portal = Some(PortalSpec::new(target));
        }
        if let Some(spec) = portal.as_mut() {
            spec.template = spec
                .template
                .iter()
                .map(|child| Child::Node(normalize_child(child, markers)))
                .collect();
        }

        VNode {
            tag: Some(tag),
            text: None,
            attrs,
            style: self.style.clone(),
            children,
            key,
            portal,
        }
    }
}

fn normalize_child(child: &Child, markers: &Markers) -> VNode {
    match child {
        Child::Node(node) => node.normalized(markers),
        Child::Text(text) => VNode::text(text.clone()),
        Child::Number(n) => VNode::text(format_number(*n)),
    }
}
