//! Upsert engine: insert-or-replace by identifier
//!
//! Each node of a batch is merged independently and in order. There is no
//! rollback: a batch is only rejected before any write, at decode or
//! validation time.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, SchemaError};
use crate::identity::{AssignUids, Identified};
use crate::lookup;
use crate::model::Domain;

/// Outcome of merging one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted(usize),
    Replaced(usize),
}

impl Upserted {
    pub fn index(self) -> usize {
        match self {
            Self::Inserted(i) | Self::Replaced(i) => i,
        }
    }
}

/// Merge one node: replace the node with the same uid, or append
pub fn upsert<T>(items: &mut Vec<T>, mut node: T, assign: bool) -> Upserted
where
    T: Identified + AssignUids,
{
    let existing = node
        .uid()
        .filter(|uid| !uid.is_empty())
        .and_then(|uid| lookup::by_uid(items, uid))
        .map(|slot| slot.index);
    if assign {
        node.assign_uids();
    }
    match existing {
        Some(index) => {
            tracing::debug!(uid = ?node.uid(), index, "Replaced node");
            items[index] = node;
            Upserted::Replaced(index)
        }
        None => {
            tracing::debug!(uid = ?node.uid(), "Inserted node");
            items.push(node);
            Upserted::Inserted(items.len() - 1)
        }
    }
}

/// Merge an ordered batch
pub fn upsert_all<T>(items: &mut Vec<T>, nodes: Vec<T>, assign: bool) -> Vec<Upserted>
where
    T: Identified + AssignUids,
{
    nodes
        .into_iter()
        .map(|node| upsert(items, node, assign))
        .collect()
}

/// Append without an existence check
pub fn add_all<T: AssignUids>(items: &mut Vec<T>, nodes: Vec<T>, assign: bool) -> usize {
    let count = nodes.len();
    for mut node in nodes {
        if assign {
            node.assign_uids();
        }
        items.push(node);
    }
    tracing::debug!(count, "Appended nodes");
    count
}

/// Remove every node whose uid is listed; unknown ids are ignored
pub fn delete_by_uids<T: Identified>(items: &mut Vec<T>, uids: &[String]) -> usize {
    let before = items.len();
    for uid in uids {
        match lookup::by_uid(items, uid).map(|slot| slot.index) {
            Some(index) => {
                items.remove(index);
                tracing::debug!(%uid, "Deleted node");
            }
            None => tracing::debug!(%uid, "Delete skipped, no such node"),
        }
    }
    before - items.len()
}

/// Old short name to new short name, recorded by a domain batch
///
/// Entries compare each domain's name before the batch with its name after
/// it, so renames within one batch compose: `A -> B` then `B -> C` on the
/// same domain is recorded as `A -> C`, and renaming back is no change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap(BTreeMap<String, String>);

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change; identical names are ignored
    pub fn record(&mut self, old: &str, new: &str) {
        if old != new {
            self.0.insert(old.to_string(), new.to_string());
        }
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.0.get(old).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// Reject a batch whose final state would repeat a short name
fn check_unique_short_names(domains: &[Domain], batch: &[Domain]) -> Result<()> {
    let mut names: Vec<(Option<&str>, &str)> = domains
        .iter()
        .map(|d| (d.uid(), d.short_name.as_str()))
        .collect();
    for node in batch {
        let slot = node
            .uid()
            .filter(|uid| !uid.is_empty())
            .and_then(|uid| names.iter().position(|(u, _)| *u == Some(uid)));
        match slot {
            Some(i) => names[i].1 = node.short_name.as_str(),
            None => names.push((node.uid(), node.short_name.as_str())),
        }
    }

    let mut seen = HashSet::new();
    for (_, name) in names {
        if !seen.insert(name) {
            tracing::warn!(short_name = name, "Rejected domain batch with duplicate short name");
            return Err(SchemaError::DuplicateShortName {
                short_name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Merge a batch of domains, touching only the header fields of existing ones
///
/// New domains are inserted whole. For an existing domain (matched by uid)
/// only `shortName`, `name`, `author`, `note` and `layout` change; its nodes
/// are kept. Short-name changes are returned as a [`RenameMap`] so the
/// caller can propagate them.
pub fn upsert_domain_headers(
    domains: &mut Vec<Domain>,
    batch: Vec<Domain>,
    assign: bool,
) -> Result<RenameMap> {
    check_unique_short_names(domains, &batch)?;

    let originals: Vec<String> = domains.iter().map(|d| d.short_name.clone()).collect();
    for mut node in batch {
        let existing = node
            .uid()
            .filter(|uid| !uid.is_empty())
            .and_then(|uid| lookup::by_uid(domains, uid))
            .map(|slot| slot.index);
        match existing {
            Some(index) => {
                let target = &mut domains[index];
                target.apply_header(&node);
                tracing::debug!(short_name = %target.short_name, "Updated domain header");
            }
            None => {
                if assign {
                    node.assign_uids();
                }
                tracing::debug!(short_name = %node.short_name, "Inserted domain");
                domains.push(node);
            }
        }
    }

    let mut renames = RenameMap::new();
    for (old, domain) in originals.iter().zip(domains.iter()) {
        renames.record(old, &domain.short_name);
    }
    Ok(renames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Anchor, Attribute};

    fn anchor(uid: Option<&str>, mnemonic: &str) -> Anchor {
        Anchor {
            uid: uid.map(str::to_string),
            mnemonic: mnemonic.to_string(),
            ..Anchor::default()
        }
    }

    fn domain(uid: &str, short_name: &str) -> Domain {
        Domain {
            uid: Some(uid.to_string()),
            ..Domain::new(short_name)
        }
    }

    #[test]
    fn test_insert_then_lookup_returns_equal_node() {
        let mut anchors = Vec::new();
        let node = anchor(Some("a-1"), "TU");
        let outcome = upsert(&mut anchors, node.clone(), true);

        assert_eq!(outcome, Upserted::Inserted(0));
        assert_eq!(lookup::by_uid(&anchors, "a-1").unwrap().node, &node);
    }

    #[test]
    fn test_replace_keeps_collection_size() {
        let mut anchors = vec![anchor(Some("a-1"), "TU"), anchor(Some("a-2"), "LL")];
        let mut replacement = anchor(Some("a-1"), "TU");
        replacement.descriptor = "Tutor".to_string();
        replacement.attributes.push(Attribute::default());

        let outcome = upsert(&mut anchors, replacement, true);
        assert_eq!(outcome, Upserted::Replaced(0));
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].descriptor, "Tutor");
        // Nested nodes introduced by the replace are identified
        assert!(anchors[0].attributes[0].has_uid());
    }

    #[test]
    fn test_uidless_payload_is_inserted_with_identity() {
        let mut anchors = vec![anchor(Some("a-1"), "TU")];
        let outcome = upsert(&mut anchors, anchor(None, "TU"), true);
        assert_eq!(outcome, Upserted::Inserted(1));
        assert!(anchors[1].has_uid());
    }

    #[test]
    fn test_add_skips_existence_check() {
        let mut anchors = vec![anchor(Some("a-1"), "TU")];
        add_all(&mut anchors, vec![anchor(Some("a-1"), "TU")], true);
        assert_eq!(anchors.len(), 2);
    }

    #[test]
    fn test_delete_ignores_unknown_ids() {
        let mut anchors = vec![anchor(Some("a-1"), "TU"), anchor(Some("a-2"), "LL")];
        let removed = delete_by_uids(
            &mut anchors,
            &["a-2".to_string(), "missing".to_string()],
        );
        assert_eq!(removed, 1);
        assert_eq!(anchors.len(), 1);
    }

    #[test]
    fn test_renames_compose_within_batch() {
        let mut domains = vec![domain("d-1", "A")];
        let batch = vec![domain("d-1", "B"), domain("d-1", "C")];
        let renames = upsert_domain_headers(&mut domains, batch, true).unwrap();
        assert_eq!(renames.get("A"), Some("C"));
        assert_eq!(renames.len(), 1);

        let batch = vec![domain("d-1", "X"), domain("d-1", "C")];
        let renames = upsert_domain_headers(&mut domains, batch, true).unwrap();
        assert!(renames.is_empty());
    }

    #[test]
    fn test_domain_header_update_keeps_nodes() {
        let mut existing = domain("d-1", "A");
        existing.anchors.push(anchor(Some("a-1"), "TU"));
        let mut domains = vec![existing];

        let mut payload = domain("d-1", "B");
        payload.name = Some("Renamed".to_string());
        let renames = upsert_domain_headers(&mut domains, vec![payload], true).unwrap();

        assert_eq!(renames.get("A"), Some("B"));
        assert_eq!(domains[0].short_name, "B");
        assert_eq!(domains[0].name.as_deref(), Some("Renamed"));
        assert_eq!(domains[0].anchors.len(), 1);
    }

    #[test]
    fn test_duplicate_short_name_rejects_whole_batch() {
        let mut domains = vec![domain("d-1", "A"), domain("d-2", "B")];
        let batch = vec![domain("d-3", "C"), domain("d-1", "B")];

        let err = upsert_domain_headers(&mut domains, batch, true).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateShortName { ref short_name } if short_name == "B"));
        assert_eq!(domains.len(), 2);
        assert_eq!(domains[0].short_name, "A");
    }

    #[test]
    fn test_swap_within_batch_is_allowed() {
        let mut domains = vec![domain("d-1", "A"), domain("d-2", "B")];
        let batch = vec![domain("d-1", "B"), domain("d-2", "A")];
        let renames = upsert_domain_headers(&mut domains, batch, true).unwrap();
        assert_eq!(renames.get("A"), Some("B"));
        assert_eq!(renames.get("B"), Some("A"));
    }
}
