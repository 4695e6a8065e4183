//! Domain schema nodes: anchors, attributes, ties, knots and areas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::group::{Group, Property};

/// Position of a node on the modelling canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Auxiliary column attached to an anchor, attribute or tie table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedColumn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub column_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_range: Option<String>,
    /// Knot mnemonic when the column is knotted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knot_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

/// A physical index over node columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, rename = "column", skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

/// Index container, present only when a node declares indexes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indexes {
    #[serde(default)]
    pub index: Vec<Index>,
}

/// Column owned by an anchor, historized and/or knotted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub mnemonic: String,
    #[serde(default)]
    pub descriptor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knot_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, rename = "extendedColumn")]
    pub extended_columns: Vec<ExtendedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Indexes>,
}

/// Entity table definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub mnemonic: String,
    #[serde(default)]
    pub descriptor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<Attribute>,
    #[serde(default, rename = "extendedColumn")]
    pub extended_columns: Vec<ExtendedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Indexes>,
}

/// Cross-domain anchor: local projection of another domain's anchor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdAnchor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub mnemonic: String,
    #[serde(default)]
    pub descriptor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<Attribute>,
    #[serde(default, rename = "extendedColumn")]
    pub extended_columns: Vec<ExtendedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Indexes>,
}

/// Transaction anchor: an anchor that also references the anchors it links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxAnchor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub mnemonic: String,
    #[serde(default)]
    pub descriptor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, rename = "anchorRole")]
    pub anchor_roles: Vec<AnchorRole>,
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<Attribute>,
    #[serde(default, rename = "extendedColumn")]
    pub extended_columns: Vec<ExtendedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Indexes>,
}

/// Reference to an anchor by mnemonic, optionally qualified by domain short name
///
/// This is a weak reference: it holds key values only and is resolved on
/// demand through the lookup layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRole {
    #[serde(default)]
    pub role: String,
    /// Mnemonic of the referenced anchor or cross-domain anchor
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub identifier: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AnchorRole {
    /// Whether this role names the given domain short name
    pub fn names_domain(&self, short_name: &str) -> bool {
        self.domain.as_deref() == Some(short_name)
    }
}

/// Reference to a knot by mnemonic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnotRole {
    #[serde(default)]
    pub role: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub identifier: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Relationship between anchors and/or cross-domain anchors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tie {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub descriptor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knot_role: Option<KnotRole>,
    #[serde(default, rename = "anchorRole")]
    pub anchor_roles: Vec<AnchorRole>,
    #[serde(default, rename = "extendedColumn")]
    pub extended_columns: Vec<ExtendedColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Indexes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
}

impl Tie {
    /// Whether any anchor role of this tie references the given mnemonic
    pub fn references(&self, mnemonic: &str) -> bool {
        self.anchor_roles.iter().any(|role| role.kind == mnemonic)
    }
}

/// One entry of a knot's value set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Values {
    #[serde(default)]
    pub value: Vec<Value>,
}

/// Legacy knot value list, superseded by [`Values`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Items {
    #[serde(default)]
    pub item: Vec<Value>,
}

/// Controlled-vocabulary value set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Knot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub mnemonic: String,
    #[serde(default)]
    pub descriptor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
}

impl Knot {
    /// Move a legacy `items` list into `values`
    ///
    /// Returns true when a migration happened.
    pub fn migrate_items(&mut self) -> bool {
        let Some(items) = self.items.take() else {
            return false;
        };
        let value = items
            .item
            .into_iter()
            .map(|v| Value {
                uid: None,
                id: v.id,
                value: v.value,
            })
            .collect();
        self.values = Some(Values { value });
        true
    }
}

/// Visual grouping of anchor roles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, rename = "anchorRole")]
    pub anchor_roles: Vec<AnchorRole>,
}

/// One bounded anchor schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, rename = "anchor")]
    pub anchors: Vec<Anchor>,
    #[serde(default, rename = "tie")]
    pub ties: Vec<Tie>,
    #[serde(default, rename = "knot")]
    pub knots: Vec<Knot>,
    #[serde(default, rename = "txAnchor")]
    pub tx_anchors: Vec<TxAnchor>,
    #[serde(default, rename = "cdAnchor")]
    pub cd_anchors: Vec<CdAnchor>,
    #[serde(default, rename = "area")]
    pub areas: Vec<Area>,
    #[serde(default, rename = "group")]
    pub groups: Vec<Group>,
    /// Flat, domain-wide property dictionary
    #[serde(default, rename = "property")]
    pub properties: Vec<Property>,
}

impl Domain {
    /// Create an empty domain with the given short name
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            ..Self::default()
        }
    }

    /// Overwrite the header fields a domain batch update is allowed to touch
    pub fn apply_header(&mut self, other: &Domain) {
        self.short_name = other.short_name.clone();
        self.name = other.name.clone();
        self.author = other.author.clone();
        self.note = other.note.clone();
        self.layout = other.layout.clone();
    }

    /// Append another domain's nodes to this one
    ///
    /// The property dictionary is replaced by a copy of the other's.
    pub fn fill_from(&mut self, other: &Domain) {
        self.anchors.extend(other.anchors.iter().cloned());
        self.ties.extend(other.ties.iter().cloned());
        self.knots.extend(other.knots.iter().cloned());
        self.tx_anchors.extend(other.tx_anchors.iter().cloned());
        self.cd_anchors.extend(other.cd_anchors.iter().cloned());
        self.areas.extend(other.areas.iter().cloned());
        self.groups.extend(other.groups.iter().cloned());
        self.properties = other.properties.clone();
    }

    /// `{mnemonic}_{descriptor}` for every anchor
    pub fn mnemonic_descriptors(&self) -> Vec<String> {
        self.anchors
            .iter()
            .map(|a| format!("{}_{}", a.mnemonic, a.descriptor))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knot_item_migration() {
        let mut knot: Knot = serde_json::from_value(serde_json::json!({
            "mnemonic": "GEN",
            "items": { "item": [ { "id": 1, "value": "male" }, { "id": 2, "value": "female" } ] }
        }))
        .unwrap();

        assert!(knot.migrate_items());
        assert!(knot.items.is_none());
        let values = knot.values.as_ref().unwrap();
        assert_eq!(values.value.len(), 2);
        assert_eq!(values.value[1].value, "female");

        // Nothing left to migrate
        assert!(!knot.migrate_items());
    }

    #[test]
    fn test_anchor_role_type_field() {
        let role: AnchorRole = serde_json::from_value(serde_json::json!({
            "role": "of", "type": "CU", "domain": "Sales", "identifier": true
        }))
        .unwrap();
        assert_eq!(role.kind, "CU");
        assert!(role.names_domain("Sales"));

        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json["type"], "CU");
    }

    #[test]
    fn test_mnemonic_descriptors() {
        let mut domain = Domain::new("D");
        domain.anchors.push(Anchor {
            mnemonic: "AC".to_string(),
            descriptor: "Actor".to_string(),
            ..Anchor::default()
        });
        assert_eq!(domain.mnemonic_descriptors(), vec!["AC_Actor"]);
    }
}
