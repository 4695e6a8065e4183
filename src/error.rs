//! Error types for the schema graph engine

use thiserror::Error;

/// Result type for schema graph operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema graph errors
///
/// Lookups never produce an error: an unknown uid, mnemonic, short name or
/// host fingerprint is reported as `None` and deletes treat it as a no-op.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Malformed {kind} payload: {source}")]
    MalformedInput {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot assign identities: {root} root is absent")]
    MissingRoot { root: &'static str },

    #[error("Domain short name '{short_name}' is already taken")]
    DuplicateShortName { short_name: String },

    #[error("Group hierarchy contains a cycle: {}", members.join(" -> "))]
    GroupCycle { members: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// Wrap a decode failure for the given node kind
    pub fn malformed(kind: &'static str, source: serde_json::Error) -> Self {
        Self::MalformedInput { kind, source }
    }
}
