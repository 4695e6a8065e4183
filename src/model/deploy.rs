//! Deployment model: physical hosts and the domain items placed on them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Ports arrive as text (`"1580"`) or as a JSON number
#[derive(Deserialize)]
#[serde(untagged)]
enum PortRepr {
    Text(String),
    Number(u64),
}

/// Read a port as the exact text it compares by
fn port_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<PortRepr>::deserialize(deserializer)?.map(|port| match port {
        PortRepr::Text(text) => text,
        PortRepr::Number(n) => n.to_string(),
    }))
}

/// Database engine of a DB host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbType {
    Postgres,
    Hsqldb,
    Oracle,
}

/// One deployed, fully-qualified node reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployItem {
    pub fqn: String,
}

/// Bucket of items for one domain inside a host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployDomain {
    pub short_name: String,
    #[serde(default, rename = "item")]
    pub items: Vec<DeployItem>,
}

impl DeployDomain {
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbHost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "port_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_type: Option<DbType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default, rename = "domain")]
    pub domains: Vec<DeployDomain>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsHost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default, rename = "domain")]
    pub domains: Vec<DeployDomain>,
}

/// Deployment root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deploy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, rename = "dbHost")]
    pub db_hosts: Vec<DbHost>,
    #[serde(default, rename = "fsHost")]
    pub fs_hosts: Vec<FsHost>,
}

impl Deploy {
    /// Every host's domain buckets, DB hosts first
    pub fn buckets_mut(&mut self) -> impl Iterator<Item = &mut Vec<DeployDomain>> {
        self.db_hosts
            .iter_mut()
            .map(|h| &mut h.domains)
            .chain(self.fs_hosts.iter_mut().map(|h| &mut h.domains))
    }

    pub fn buckets(&self) -> impl Iterator<Item = &DeployDomain> {
        self.db_hosts
            .iter()
            .flat_map(|h| h.domains.iter())
            .chain(self.fs_hosts.iter().flat_map(|h| h.domains.iter()))
    }
}

/// Placement request: target fingerprint, domain bucket and node fqn
///
/// The presence of `db_type` selects DB hosts, otherwise FS hosts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementItem {
    pub short_name: String,
    pub fqn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_type: Option<DbType>,
    #[serde(
        default,
        deserialize_with = "port_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_type_wire_names() {
        let host: DbHost = serde_json::from_value(serde_json::json!({
            "host": "h", "dbType": "POSTGRES", "port": 5432,
            "domain": [ { "shortName": "D", "item": [ { "fqn": "D.AC" } ] } ]
        }))
        .unwrap();
        assert_eq!(host.db_type, Some(DbType::Postgres));
        assert_eq!(host.domains[0].items[0].fqn, "D.AC");
        assert_eq!(host.port.as_deref(), Some("5432"));
    }

    #[test]
    fn test_port_accepts_text_and_serializes_as_text() {
        let item: PlacementItem = serde_json::from_value(serde_json::json!({
            "shortName": "Domain2", "fqn": "SK", "dbType": "POSTGRES", "port": "1580"
        }))
        .unwrap();
        assert_eq!(item.port.as_deref(), Some("1580"));

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["port"], "1580");

        let bare: PlacementItem =
            serde_json::from_value(serde_json::json!({ "shortName": "D", "fqn": "D.AC" })).unwrap();
        assert!(bare.port.is_none());

        let bad = serde_json::from_value::<PlacementItem>(serde_json::json!({
            "shortName": "D", "fqn": "D.AC", "port": [1580]
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_buckets_cover_both_host_kinds() {
        let mut deploy = Deploy::default();
        deploy.db_hosts.push(DbHost {
            domains: vec![DeployDomain::new("A")],
            ..DbHost::default()
        });
        deploy.fs_hosts.push(FsHost {
            domains: vec![DeployDomain::new("B")],
            ..FsHost::default()
        });

        let names: Vec<_> = deploy.buckets().map(|b| b.short_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(deploy.buckets_mut().count(), 2);
    }
}
