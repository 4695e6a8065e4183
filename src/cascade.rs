//! Cascade consistency engine
//!
//! Deletes and renames that must keep cross-domain references intact.
//! Every cascade first snapshots the keys it will act on, then mutates; no
//! collection is modified while it is being scanned.

use crate::lookup;
use crate::model::{AnchorRole, Deploy, DeployDomain, Project};
use crate::upsert::RenameMap;

/// Counts of nodes removed by a cascade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub connexions: usize,
    pub cd_anchors: usize,
    pub ties: usize,
    pub domains: usize,
}

impl CascadeReport {
    fn absorb(&mut self, (cd_anchors, ties): (usize, usize)) {
        self.cd_anchors += cd_anchors;
        self.ties += ties;
    }
}

/// Remove the cross-domain anchor a role projects, and every tie using it
///
/// Targets the domain the role names. Returns `(cd_anchors, ties)` removed;
/// an unknown domain removes nothing.
pub fn remove_role_dependents(project: &mut Project, role: &AnchorRole) -> (usize, usize) {
    let Some(short_name) = role.domain.as_deref() else {
        return (0, 0);
    };
    let Some(index) = lookup::domain_by_short_name(&project.domains, short_name).map(|s| s.index)
    else {
        return (0, 0);
    };
    let domain = &mut project.domains[index];

    let cd_before = domain.cd_anchors.len();
    domain.cd_anchors.retain(|cd| cd.mnemonic != role.kind);
    let tie_before = domain.ties.len();
    domain.ties.retain(|tie| !tie.references(&role.kind));

    (
        cd_before - domain.cd_anchors.len(),
        tie_before - domain.ties.len(),
    )
}

/// Delete connexions by uid, cascading through their identifier roles
///
/// For every role flagged as identifier, the cross-domain anchor with the
/// role's type and every tie referencing that type are removed from the
/// domain the role names. Unknown uids are ignored.
pub fn delete_connexions(project: &mut Project, uids: &[String]) -> CascadeReport {
    let mut report = CascadeReport::default();
    for uid in uids {
        let Some(slot) = lookup::by_uid(&project.connexions, uid) else {
            tracing::debug!(%uid, "Connexion delete skipped, no such connexion");
            continue;
        };
        let index = slot.index;
        let roles: Vec<AnchorRole> = slot
            .node
            .anchor_roles
            .iter()
            .filter(|r| r.identifier)
            .cloned()
            .collect();

        for role in &roles {
            report.absorb(remove_role_dependents(project, role));
        }
        project.connexions.remove(index);
        report.connexions += 1;
    }
    tracing::info!(
        connexions = report.connexions,
        cd_anchors = report.cd_anchors,
        ties = report.ties,
        "Deleted connexions"
    );
    report
}

/// Delete domains by short name, cleaning their partners first
///
/// Every connexion with a role naming the doomed domain is removed. Before
/// that, its roles on the other side are cascaded so the partner domain
/// loses the cross-domain anchor and ties that projected the link.
pub fn delete_domains(project: &mut Project, short_names: &[String]) -> CascadeReport {
    let mut report = CascadeReport::default();
    for short_name in short_names {
        let partner_roles: Vec<AnchorRole> = project
            .connexions
            .iter()
            .filter(|c| c.touches(short_name))
            .flat_map(|c| c.anchor_roles.iter())
            .filter(|r| !r.names_domain(short_name))
            .cloned()
            .collect();

        for role in &partner_roles {
            report.absorb(remove_role_dependents(project, role));
        }

        let before = project.connexions.len();
        project.connexions.retain(|c| !c.touches(short_name));
        report.connexions += before - project.connexions.len();

        match lookup::domain_by_short_name(&project.domains, short_name).map(|s| s.index) {
            Some(index) => {
                project.domains.remove(index);
                report.domains += 1;
            }
            None => tracing::debug!(%short_name, "Domain delete skipped, no such domain"),
        }
    }
    tracing::info!(
        domains = report.domains,
        connexions = report.connexions,
        cd_anchors = report.cd_anchors,
        ties = report.ties,
        "Deleted domains"
    );
    report
}

/// Rewrite every connexion role naming an old short name
///
/// Each role is mapped once against the map, so swaps are safe. Returns the
/// number of roles rewritten.
pub fn rename_connexion_roles(project: &mut Project, renames: &RenameMap) -> usize {
    let mut rewritten = 0;
    for role in project
        .connexions
        .iter_mut()
        .flat_map(|c| c.anchor_roles.iter_mut())
    {
        let Some(new) = role.domain.as_deref().and_then(|d| renames.get(d)) else {
            continue;
        };
        role.domain = Some(new.to_string());
        rewritten += 1;
    }
    rewritten
}

/// Rekey deploy buckets by the rename map
///
/// If a host already holds a bucket under the new name, the items are merged
/// into it. Returns the number of buckets rekeyed.
pub fn rename_deploy_buckets(deploy: &mut Deploy, renames: &RenameMap) -> usize {
    let mut rekeyed = 0;
    for buckets in deploy.buckets_mut() {
        let mut merged: Vec<DeployDomain> = Vec::with_capacity(buckets.len());
        for mut bucket in std::mem::take(buckets) {
            if let Some(new) = renames.get(&bucket.short_name) {
                bucket.short_name = new.to_string();
                rekeyed += 1;
            }
            match merged.iter_mut().find(|b| b.short_name == bucket.short_name) {
                Some(existing) => existing.items.extend(bucket.items),
                None => merged.push(bucket),
            }
        }
        *buckets = merged;
    }
    rekeyed
}

/// Propagate domain renames to connexion roles and deploy buckets
pub fn propagate_renames(project: &mut Project, deploy: &mut Deploy, renames: &RenameMap) {
    if renames.is_empty() {
        return;
    }
    let roles = rename_connexion_roles(project, renames);
    let buckets = rename_deploy_buckets(deploy, renames);
    for (old, new) in renames.iter() {
        tracing::info!(%old, %new, "Renamed domain");
    }
    tracing::info!(roles, buckets, "Propagated domain renames");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CdAnchor, Connexion, DbHost, DeployItem, Domain, Tie};

    fn role(domain: &str, kind: &str, identifier: bool) -> AnchorRole {
        AnchorRole {
            role: "of".to_string(),
            kind: kind.to_string(),
            domain: Some(domain.to_string()),
            identifier,
            description: None,
        }
    }

    fn tie(uid: &str, kinds: &[&str]) -> Tie {
        Tie {
            uid: Some(uid.to_string()),
            anchor_roles: kinds.iter().map(|k| role("", k, false)).collect(),
            ..Tie::default()
        }
    }

    fn cd_anchor(mnemonic: &str) -> CdAnchor {
        CdAnchor {
            mnemonic: mnemonic.to_string(),
            ..CdAnchor::default()
        }
    }

    /// Sales projects Crm's customer anchor as cd-anchor CU
    fn linked_project() -> Project {
        let mut sales = Domain::new("Sales");
        sales.cd_anchors = vec![cd_anchor("CU"), cd_anchor("PR")];
        sales.ties = vec![tie("t-1", &["OR", "CU"]), tie("t-2", &["OR", "PR"])];

        let mut crm = Domain::new("Crm");
        crm.cd_anchors = vec![cd_anchor("OR")];
        crm.ties = vec![tie("t-3", &["CU", "OR"])];

        Project {
            domains: vec![sales, crm],
            connexions: vec![Connexion {
                uid: Some("c-1".to_string()),
                anchor_roles: vec![role("Sales", "CU", true), role("Crm", "OR", false)],
                ..Connexion::default()
            }],
            ..Project::default()
        }
    }

    #[test]
    fn test_connexion_cascade_removes_identifier_dependents() {
        let mut project = linked_project();
        let report = delete_connexions(&mut project, &["c-1".to_string()]);

        assert_eq!(report.connexions, 1);
        assert_eq!(report.cd_anchors, 1);
        assert_eq!(report.ties, 1);
        assert!(project.connexions.is_empty());

        let sales = &project.domains[0];
        assert!(sales.cd_anchors.iter().all(|cd| cd.mnemonic != "CU"));
        assert!(sales.ties.iter().all(|t| !t.references("CU")));
        assert_eq!(sales.ties[0].uid.as_deref(), Some("t-2"));

        // Non-identifier side untouched
        assert_eq!(project.domains[1].cd_anchors.len(), 1);
    }

    #[test]
    fn test_connexion_delete_unknown_uid_is_noop() {
        let mut project = linked_project();
        let report = delete_connexions(&mut project, &["nope".to_string()]);
        assert_eq!(report, CascadeReport::default());
        assert_eq!(project.connexions.len(), 1);
    }

    #[test]
    fn test_domain_cascade_cleans_partner() {
        let mut project = linked_project();
        let report = delete_domains(&mut project, &["Crm".to_string()]);

        assert_eq!(report.domains, 1);
        assert_eq!(report.connexions, 1);
        assert_eq!(project.domains.len(), 1);
        assert!(project.connexions.is_empty());

        let sales = &project.domains[0];
        assert_eq!(sales.short_name, "Sales");
        assert!(sales.cd_anchors.iter().all(|cd| cd.mnemonic != "CU"));
        assert_eq!(sales.ties.len(), 1);
    }

    #[test]
    fn test_rename_rewrites_roles_and_buckets() {
        let mut project = linked_project();
        let mut deploy = Deploy::default();
        deploy.db_hosts.push(DbHost {
            domains: vec![DeployDomain {
                short_name: "Crm".to_string(),
                items: vec![DeployItem {
                    fqn: "Crm.OR".to_string(),
                }],
            }],
            ..DbHost::default()
        });

        let mut renames = RenameMap::new();
        renames.record("Crm", "Customers");
        propagate_renames(&mut project, &mut deploy, &renames);

        let roles = &project.connexions[0].anchor_roles;
        assert_eq!(roles[1].domain.as_deref(), Some("Customers"));
        assert!(roles.iter().all(|r| !r.names_domain("Crm")));
        assert_eq!(deploy.db_hosts[0].domains[0].short_name, "Customers");
    }

    #[test]
    fn test_swap_rename_is_applied_once_per_role() {
        let mut project = linked_project();
        let mut renames = RenameMap::new();
        renames.record("Sales", "Crm");
        renames.record("Crm", "Sales");

        assert_eq!(rename_connexion_roles(&mut project, &renames), 2);
        let roles = &project.connexions[0].anchor_roles;
        assert_eq!(roles[0].domain.as_deref(), Some("Crm"));
        assert_eq!(roles[1].domain.as_deref(), Some("Sales"));
    }

    #[test]
    fn test_bucket_rekey_merges_into_existing() {
        let mut deploy = Deploy::default();
        deploy.db_hosts.push(DbHost {
            domains: vec![
                DeployDomain {
                    short_name: "A".to_string(),
                    items: vec![DeployItem { fqn: "A.X".to_string() }],
                },
                DeployDomain {
                    short_name: "B".to_string(),
                    items: vec![DeployItem { fqn: "B.Y".to_string() }],
                },
            ],
            ..DbHost::default()
        });
        let mut renames = RenameMap::new();
        renames.record("A", "B");

        assert_eq!(rename_deploy_buckets(&mut deploy, &renames), 1);
        let buckets = &deploy.db_hosts[0].domains;
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].items.len(), 2);
    }
}
