//! Property groups used for UI presentation

use serde::{Deserialize, Serialize};

/// Flat, domain-wide property definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knot_range: Option<String>,
}

/// Reference to a group or property by id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
}

impl IdRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Canonical group: nested groups and properties are held by id only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "group")]
    pub groups: Vec<IdRef>,
    #[serde(default, rename = "property")]
    pub properties: Vec<IdRef>,
}

impl Group {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn has_group(&self, id: &str) -> bool {
        self.groups.iter().any(|g| g.id == id)
    }

    pub fn has_property(&self, id: &str) -> bool {
        self.properties.iter().any(|p| p.id == id)
    }
}

/// Derived, disposable view of a group with every reference resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedGroup {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "group")]
    pub groups: Vec<MaterializedGroup>,
    #[serde(rename = "property")]
    pub properties: Vec<Property>,
}

/// Group membership edit: a group id and the element ids to add or remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembers {
    pub id: String,
    #[serde(default)]
    pub elements: Vec<String>,
}
