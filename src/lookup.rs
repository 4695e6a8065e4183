//! Index/lookup layer
//!
//! Linear scans over owning collections. Every lookup returns the node and
//! its position, or `None`; nothing here errors. No secondary index is kept.

use crate::identity::Identified;
use crate::model::{
    Anchor, Attribute, CdAnchor, DbHost, DbType, DeployDomain, Domain, FsHost, Group, Knot,
    PlacementItem, Property, TxAnchor,
};

/// A located node and its position in the owning collection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot<'a, T> {
    pub index: usize,
    pub node: &'a T,
}

fn find<'a, T>(items: &'a [T], mut pred: impl FnMut(&T) -> bool) -> Option<Slot<'a, T>> {
    items
        .iter()
        .enumerate()
        .find(|(_, node)| pred(node))
        .map(|(index, node)| Slot { index, node })
}

/// Find a node by its generated identifier
pub fn by_uid<'a, T: Identified>(items: &'a [T], uid: &str) -> Option<Slot<'a, T>> {
    find(items, |n| n.uid() == Some(uid))
}

/// Nodes addressed by a human-assigned mnemonic within one domain
pub trait Mnemonic {
    fn mnemonic(&self) -> &str;
}

macro_rules! impl_mnemonic {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Mnemonic for $ty {
                fn mnemonic(&self) -> &str {
                    &self.mnemonic
                }
            }
        )*
    };
}

impl_mnemonic!(Anchor, TxAnchor, CdAnchor, Attribute, Knot);

/// Find a node by mnemonic
pub fn by_mnemonic<'a, T: Mnemonic>(items: &'a [T], mnemonic: &str) -> Option<Slot<'a, T>> {
    find(items, |n| n.mnemonic() == mnemonic)
}

/// Find a domain by short name
pub fn domain_by_short_name<'a>(domains: &'a [Domain], short_name: &str) -> Option<Slot<'a, Domain>> {
    find(domains, |d| d.short_name == short_name)
}

pub fn group_by_id<'a>(groups: &'a [Group], id: &str) -> Option<Slot<'a, Group>> {
    find(groups, |g| g.id == id)
}

pub fn property_by_id<'a>(properties: &'a [Property], id: &str) -> Option<Slot<'a, Property>> {
    find(properties, |p| p.id == id)
}

/// Find a deploy bucket by domain short name within one host
pub fn bucket_by_short_name<'a>(
    buckets: &'a [DeployDomain],
    short_name: &str,
) -> Option<Slot<'a, DeployDomain>> {
    find(buckets, |b| b.short_name == short_name)
}

/// Composite field set identifying a deployment host
///
/// Every field compares exactly, with an absent value matching only an
/// absent value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostFingerprint<'a> {
    Db {
        host: Option<&'a str>,
        user_name: Option<&'a str>,
        db_name: Option<&'a str>,
        db_type: DbType,
        port: Option<&'a str>,
    },
    Fs {
        host: Option<&'a str>,
        user_name: Option<&'a str>,
        folder: Option<&'a str>,
    },
}

impl<'a> HostFingerprint<'a> {
    /// Fingerprint named by a placement item; `db_type` selects the DB kind
    pub fn of_item(item: &'a PlacementItem) -> Self {
        match item.db_type {
            Some(db_type) => Self::Db {
                host: item.host.as_deref(),
                user_name: item.user_name.as_deref(),
                db_name: item.db_name.as_deref(),
                db_type,
                port: item.port.as_deref(),
            },
            None => Self::Fs {
                host: item.host.as_deref(),
                user_name: item.user_name.as_deref(),
                folder: item.folder.as_deref(),
            },
        }
    }

    pub fn matches_db(&self, h: &DbHost) -> bool {
        match self {
            Self::Db {
                host,
                user_name,
                db_name,
                db_type,
                port,
            } => {
                h.host.as_deref() == *host
                    && h.user_name.as_deref() == *user_name
                    && h.db_name.as_deref() == *db_name
                    && h.db_type == Some(*db_type)
                    && h.port.as_deref() == *port
            }
            Self::Fs { .. } => false,
        }
    }

    pub fn matches_fs(&self, h: &FsHost) -> bool {
        match self {
            Self::Fs {
                host,
                user_name,
                folder,
            } => {
                h.host.as_deref() == *host
                    && h.user_name.as_deref() == *user_name
                    && h.folder.as_deref() == *folder
            }
            Self::Db { .. } => false,
        }
    }
}

/// Positions of every DB host matching the fingerprint
pub fn db_hosts_matching(hosts: &[DbHost], fingerprint: &HostFingerprint<'_>) -> Vec<usize> {
    hosts
        .iter()
        .enumerate()
        .filter(|(_, h)| fingerprint.matches_db(h))
        .map(|(i, _)| i)
        .collect()
}

/// Positions of every FS host matching the fingerprint
pub fn fs_hosts_matching(hosts: &[FsHost], fingerprint: &HostFingerprint<'_>) -> Vec<usize> {
    hosts
        .iter()
        .enumerate()
        .filter(|(_, h)| fingerprint.matches_fs(h))
        .map(|(i, _)| i)
        .collect()
}
