//! Reserved attribute and tag names

use serde::{Deserialize, Serialize};

pub const DEFAULT_IDENTITY_ATTRIBUTE: &str = "data-node-id";
pub const DEFAULT_DECORATION_ATTRIBUTE: &str = "data-decoration";
pub const DEFAULT_COMPONENT_MARKER: &str = "data-component";
pub const DEFAULT_COMPONENT_TYPE_ATTRIBUTE: &str = "data-component-type";
pub const DEFAULT_PORTAL_TAG: &str = "portal";
pub const DEFAULT_KEY_ATTRIBUTE: &str = "key";
pub const DEFAULT_PORTAL_CONTAINER_ATTRIBUTE: &str = "data-portal-container";

/// Names the reconciler treats specially
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Markers {
    /// Attribute carrying the stable identity of a document entity
    pub identity_attribute: String,
    /// Attribute flagging decoration-only wrappers skipped by text runs
    pub decoration_attribute: String,
    /// Attribute marking a node as a component instance
    pub component_marker: String,
    /// Attribute naming the component type
    pub component_type_attribute: String,
    /// Tag reserved for portals
    pub portal_tag: String,
    /// Attribute accepted as an alias for the reconciliation key
    pub key_attribute: String,
    /// Attribute set on live portal containers
    pub portal_container_attribute: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            identity_attribute: DEFAULT_IDENTITY_ATTRIBUTE.to_string(),
            decoration_attribute: DEFAULT_DECORATION_ATTRIBUTE.to_string(),
            component_marker: DEFAULT_COMPONENT_MARKER.to_string(),
            component_type_attribute: DEFAULT_COMPONENT_TYPE_ATTRIBUTE.to_string(),
            portal_tag: DEFAULT_PORTAL_TAG.to_string(),
            key_attribute: DEFAULT_KEY_ATTRIBUTE.to_string(),
            portal_container_attribute: DEFAULT_PORTAL_CONTAINER_ATTRIBUTE.to_string(),
        }
    }
}
