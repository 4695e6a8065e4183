//! Project: a set of domains and the cross-domain links between them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AnchorRole, Domain, Layout};

/// Cross-domain relationship descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connexion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, rename = "anchorRole")]
    pub anchor_roles: Vec<AnchorRole>,
}

impl Connexion {
    /// Whether any role of this connexion names the given domain
    pub fn touches(&self, short_name: &str) -> bool {
        self.anchor_roles.iter().any(|r| r.names_domain(short_name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, rename = "domain")]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub connexions: Vec<Connexion>,
}
