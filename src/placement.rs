//! Deployment placement engine
//!
//! Items are matched to hosts by exact fingerprint. Several hosts may share
//! a fingerprint; placement then writes into each of them.

use std::collections::BTreeSet;

use crate::lookup::{self, HostFingerprint};
use crate::model::{Deploy, DeployDomain, DeployItem, PlacementItem};

fn fill_bucket(buckets: &mut Vec<DeployDomain>, item: &PlacementItem, dedupe: bool) -> bool {
    let index = match lookup::bucket_by_short_name(buckets, &item.short_name) {
        Some(slot) => slot.index,
        None => {
            buckets.push(DeployDomain::new(item.short_name.clone()));
            buckets.len() - 1
        }
    };
    let bucket = &mut buckets[index];
    if dedupe && bucket.items.iter().any(|i| i.fqn == item.fqn) {
        return false;
    }
    bucket.items.push(DeployItem {
        fqn: item.fqn.clone(),
    });
    true
}

fn drain_bucket(buckets: &mut Vec<DeployDomain>, item: &PlacementItem) -> bool {
    let Some(index) = lookup::bucket_by_short_name(buckets, &item.short_name).map(|s| s.index)
    else {
        return false;
    };
    let bucket = &mut buckets[index];
    let Some(position) = bucket.items.iter().rposition(|i| i.fqn == item.fqn) else {
        return false;
    };
    bucket.items.remove(position);
    if bucket.items.is_empty() {
        buckets.remove(index);
    }
    true
}

fn matching_buckets<'a>(
    deploy: &'a mut Deploy,
    item: &PlacementItem,
) -> Vec<&'a mut Vec<DeployDomain>> {
    let fingerprint = HostFingerprint::of_item(item);
    match fingerprint {
        HostFingerprint::Db { .. } => {
            let positions = lookup::db_hosts_matching(&deploy.db_hosts, &fingerprint);
            deploy
                .db_hosts
                .iter_mut()
                .enumerate()
                .filter(|(i, _)| positions.contains(i))
                .map(|(_, h)| &mut h.domains)
                .collect()
        }
        HostFingerprint::Fs { .. } => {
            let positions = lookup::fs_hosts_matching(&deploy.fs_hosts, &fingerprint);
            deploy
                .fs_hosts
                .iter_mut()
                .enumerate()
                .filter(|(i, _)| positions.contains(i))
                .map(|(_, h)| &mut h.domains)
                .collect()
        }
    }
}

/// Place an item on every host matching its fingerprint
///
/// The domain bucket is created when missing. Without `dedupe`, placing
/// the same fqn twice yields two entries. Returns the number of hosts
/// written.
pub fn place(deploy: &mut Deploy, item: &PlacementItem, dedupe: bool) -> usize {
    let written = matching_buckets(deploy, item)
        .into_iter()
        .map(|buckets| fill_bucket(buckets, item, dedupe))
        .filter(|written| *written)
        .count();
    if written == 0 {
        tracing::debug!(fqn = %item.fqn, "No host matched placement fingerprint");
    } else {
        tracing::debug!(fqn = %item.fqn, domain = %item.short_name, hosts = written, "Placed item");
    }
    written
}

/// Remove an item from every host matching its fingerprint
///
/// Removes the most recently placed entry with the item's fqn, then prunes
/// the bucket if it is left empty. Returns the number of hosts changed.
pub fn unplace(deploy: &mut Deploy, item: &PlacementItem) -> usize {
    let removed = matching_buckets(deploy, item)
        .into_iter()
        .map(|buckets| drain_bucket(buckets, item))
        .filter(|removed| *removed)
        .count();
    tracing::debug!(fqn = %item.fqn, hosts = removed, "Unplaced item");
    removed
}

/// Remove the buckets with the given short names from every host
pub fn delete_domains_from_deploy(deploy: &mut Deploy, short_names: &[String]) -> usize {
    let mut removed = 0;
    for buckets in deploy.buckets_mut() {
        let before = buckets.len();
        buckets.retain(|b| !short_names.contains(&b.short_name));
        removed += before - buckets.len();
    }
    tracing::debug!(removed, "Removed deploy buckets");
    removed
}

/// Short names present in any host, sorted and de-duplicated
pub fn deploy_domain_names(deploy: &Deploy) -> Vec<String> {
    deploy
        .buckets()
        .map(|b| b.short_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
