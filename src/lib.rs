//! Anchor Schemas
//!
//! An in-memory schema graph for anchor modelling: a project of domains,
//! each holding anchors, attributes, ties, knots, transaction and
//! cross-domain anchors, areas and property groups, plus a deployment model
//! mapping those nodes onto physical hosts.
//!
//! ## Features
//!
//! - **Stable Identity**: every node gets a random 128-bit uid once, never overwritten
//! - **Upsert by Identity**: JSON payloads insert or replace nodes in place
//! - **Cascading Deletes**: removing a connexion or domain removes its dependent nodes
//! - **Rename Propagation**: domain short-name changes reach connexions and deploy buckets
//! - **Group Aggregation**: nested property groups resolved into a disposable view
//! - **Deployment Placement**: items placed on hosts by exact fingerprint
//!
//! ## Architecture
//!
//! ```text
//! payload ─▶ codec ─▶ upsert ──▶ model (Domain / Project / Deploy)
//!                       │  ▲            │
//!              identity ┘  └─ lookup    ├─▶ cascade   (deletes, renames)
//!                                       ├─▶ groups    (materialized view)
//!                                       └─▶ placement (deploy buckets)
//! ```

pub mod cascade;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod error;
pub mod groups;
pub mod identity;
pub mod lookup;
pub mod model;
pub mod placement;
pub mod session;
pub mod upsert;

pub use cascade::CascadeReport;
pub use checksum::Checksum;
pub use codec::Document;
pub use config::{EngineConfig, OutputFormat};
pub use error::{Result, SchemaError};
pub use identity::{AssignUids, Identified};
pub use lookup::Slot;
pub use session::{SchemaSession, SchemaSessionBuilder};
pub use upsert::{RenameMap, Upserted};
