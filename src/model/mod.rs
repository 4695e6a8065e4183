//! Schema graph data model
//!
//! Ownership is tree-shaped: a [`Project`] owns its domains and connexions,
//! a [`Domain`] owns its nodes, a [`Deploy`] owns its hosts. Anchor roles and
//! deploy buckets refer to other nodes by key value only.

pub mod deploy;
pub mod domain;
pub mod group;
pub mod project;

pub use deploy::{DbHost, DbType, Deploy, DeployDomain, DeployItem, FsHost, PlacementItem};
pub use domain::{
    Anchor, AnchorRole, Area, Attribute, CdAnchor, Domain, ExtendedColumn, Index, Indexes, Items,
    Knot, KnotRole, Layout, Tie, TxAnchor, Value, Values,
};
pub use group::{Group, GroupMembers, IdRef, MaterializedGroup, Property};
pub use project::{Connexion, Project};
