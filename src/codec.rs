//! Payload decoding and export documents
//!
//! Ingest payloads are JSON: either a single node object or an ordered
//! array of nodes. A payload that fails to decode aborts the whole call.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::config::{ExportConfig, OutputFormat};
use crate::error::{Result, SchemaError};

/// Decode a single node or an ordered batch of nodes of the named kind
pub fn decode_batch<T: DeserializeOwned>(kind: &'static str, payload: &str) -> Result<Vec<T>> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| SchemaError::malformed(kind, e))?;
    let nodes = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>(),
        other => serde_json::from_value(other).map(|node| vec![node]),
    };
    nodes.map_err(|e| {
        tracing::warn!(kind, error = %e, "Rejected malformed payload");
        SchemaError::malformed(kind, e)
    })
}

/// Decode exactly one node of the named kind
pub fn decode_one<T: DeserializeOwned>(kind: &'static str, payload: &str) -> Result<T> {
    serde_json::from_str(payload).map_err(|e| {
        tracing::warn!(kind, error = %e, "Rejected malformed payload");
        SchemaError::malformed(kind, e)
    })
}

/// Decode a root document; a JSON `null` yields an absent root
pub fn decode_root<T: DeserializeOwned>(kind: &'static str, payload: &str) -> Result<Option<T>> {
    serde_json::from_str(payload).map_err(|e| SchemaError::malformed(kind, e))
}

/// Split a comma-separated identifier list, dropping empty entries
pub fn split_ids(ids: &str, trim: bool) -> Vec<String> {
    ids.split(',')
        .map(|id| if trim { id.trim() } else { id })
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serialized snapshot of a root, stamped at export time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document<T> {
    pub document_id: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    pub root: T,
}

impl<T: Serialize> Document<T> {
    /// Wrap a root in a fresh document
    pub fn new(root: T, generated_at: DateTime<Utc>, config: &ExportConfig) -> Result<Self> {
        let checksum = if config.include_checksum {
            Some(Checksum::from_json(&serde_json::to_value(&root)?))
        } else {
            None
        };
        Ok(Self {
            document_id: crate::identity::new_uid(),
            generated_at,
            checksum,
            root,
        })
    }

    /// Render in the configured output format
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        render(self, format)
    }

    /// Whether the stored checksum still matches the root
    pub fn verify(&self) -> Result<bool> {
        match &self.checksum {
            Some(checksum) => Ok(checksum.verify_json(&serde_json::to_value(&self.root)?)),
            None => Ok(true),
        }
    }
}

/// Render any snapshot as JSON text
pub fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(text)
}
