//! Identity registry
//!
//! Assigns a random 128-bit identifier (canonical uuid string) to every
//! uid-bearing node that lacks one. Identifiers are effectively unique, not
//! guaranteed unique: no collision check is made. Assignment never
//! overwrites an existing identifier, so it is safe to repeat.

use crate::error::{Result, SchemaError};
use crate::model::{
    Anchor, Area, Attribute, CdAnchor, Connexion, DbHost, Deploy, Domain, ExtendedColumn, FsHost,
    Index, Indexes, Knot, Project, Tie, TxAnchor, Value,
};

/// Generate a fresh node identifier
pub fn new_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A node carrying a generated identifier
pub trait Identified {
    fn uid(&self) -> Option<&str>;
    fn set_uid(&mut self, uid: String);

    /// Whether the uid is set and non-empty
    fn has_uid(&self) -> bool {
        self.uid().is_some_and(|u| !u.is_empty())
    }

    /// Assign a fresh uid if none is set; returns true when one was assigned
    fn ensure_identity(&mut self) -> bool {
        if self.has_uid() {
            return false;
        }
        self.set_uid(new_uid());
        true
    }
}

macro_rules! impl_identified {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                fn uid(&self) -> Option<&str> {
                    self.uid.as_deref()
                }

                fn set_uid(&mut self, uid: String) {
                    self.uid = Some(uid);
                }
            }
        )*
    };
}

impl_identified!(
    Domain, Project, Anchor, TxAnchor, CdAnchor, Attribute, ExtendedColumn, Index, Tie, Knot,
    Value, Connexion, Area, DbHost, FsHost,
);

/// Recursive identity assignment over a node and everything it owns
pub trait AssignUids {
    /// Returns the number of identifiers newly assigned
    fn assign_uids(&mut self) -> usize;
}

fn assign_all<T: AssignUids>(nodes: &mut [T]) -> usize {
    nodes.iter_mut().map(AssignUids::assign_uids).sum()
}

fn assign_indexes(indexes: &mut Option<Indexes>) -> usize {
    indexes
        .as_mut()
        .map(|ix| assign_all(&mut ix.index))
        .unwrap_or(0)
}

impl AssignUids for ExtendedColumn {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
    }
}

impl AssignUids for Index {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
    }
}

impl AssignUids for Value {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
    }
}

impl AssignUids for Attribute {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
            + assign_all(&mut self.extended_columns)
            + assign_indexes(&mut self.indexes)
    }
}

macro_rules! impl_assign_anchor_like {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AssignUids for $ty {
                fn assign_uids(&mut self) -> usize {
                    usize::from(self.ensure_identity())
                        + assign_all(&mut self.extended_columns)
                        + assign_all(&mut self.attributes)
                        + assign_indexes(&mut self.indexes)
                }
            }
        )*
    };
}

impl_assign_anchor_like!(Anchor, TxAnchor, CdAnchor);

impl AssignUids for Tie {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
            + assign_all(&mut self.extended_columns)
            + assign_indexes(&mut self.indexes)
    }
}

impl AssignUids for Knot {
    fn assign_uids(&mut self) -> usize {
        let mut assigned = usize::from(self.ensure_identity());
        if self.migrate_items() {
            tracing::debug!(knot = %self.mnemonic, "Migrated legacy knot items to values");
        }
        if let Some(values) = self.values.as_mut() {
            assigned += assign_all(&mut values.value);
        }
        assigned
    }
}

impl AssignUids for Area {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
    }
}

impl AssignUids for Connexion {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
    }
}

impl AssignUids for DbHost {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
    }
}

impl AssignUids for FsHost {
    fn assign_uids(&mut self) -> usize {
        usize::from(self.ensure_identity())
    }
}

impl AssignUids for Domain {
    fn assign_uids(&mut self) -> usize {
        // Fixed traversal order: anchors, ties, knots, tx-anchors, cd-anchors, areas
        usize::from(self.ensure_identity())
            + assign_all(&mut self.anchors)
            + assign_all(&mut self.ties)
            + assign_all(&mut self.knots)
            + assign_all(&mut self.tx_anchors)
            + assign_all(&mut self.cd_anchors)
            + assign_all(&mut self.areas)
    }
}

impl AssignUids for Project {
    fn assign_uids(&mut self) -> usize {
        assign_all(&mut self.domains)
            + assign_all(&mut self.connexions)
            + usize::from(self.ensure_identity())
    }
}

impl AssignUids for Deploy {
    fn assign_uids(&mut self) -> usize {
        assign_all(&mut self.db_hosts) + assign_all(&mut self.fs_hosts)
    }
}

fn assign_root<T: AssignUids>(root: Option<&mut T>, name: &'static str) -> Result<usize> {
    let root = root.ok_or(SchemaError::MissingRoot { root: name })?;
    let assigned = root.assign_uids();
    tracing::debug!(root = name, assigned, "Assigned identities");
    Ok(assigned)
}

/// Assign identities across a whole domain
pub fn assign_domain_uids(domain: Option<&mut Domain>) -> Result<usize> {
    assign_root(domain, "domain")
}

/// Assign identities across a project and every domain it holds
pub fn assign_project_uids(project: Option<&mut Project>) -> Result<usize> {
    assign_root(project, "project")
}

/// Assign identities to every DB and FS host of a deployment
pub fn assign_deploy_uids(deploy: Option<&mut Deploy>) -> Result<usize> {
    assign_root(deploy, "deploy")
}
