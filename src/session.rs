//! Schema session: the working domain, project and deployment roots
//!
//! Every boundary operation takes a JSON payload (one node or an ordered
//! array) or a comma-separated id list, and mutates the roots in place.
//! A session is single-writer; callers serialize access to it.

use chrono::Utc;
use serde::Serialize;

use crate::cascade::{self, CascadeReport};
use crate::codec::{self, Document};
use crate::config::EngineConfig;
use crate::error::{Result, SchemaError};
use crate::groups;
use crate::identity::{self, Identified};
use crate::lookup::{self, Slot};
use crate::model::{
    Anchor, Area, CdAnchor, Connexion, DbHost, Deploy, Domain, FsHost, Group, GroupMembers, Knot,
    MaterializedGroup, PlacementItem, Project, Property, Tie, TxAnchor,
};
use crate::placement;
use crate::upsert::{self, RenameMap, Upserted};

/// Builder for [`SchemaSession`]
#[derive(Debug, Default)]
pub struct SchemaSessionBuilder {
    domain: Option<Domain>,
    project: Option<Project>,
    deploy: Option<Deploy>,
    config: Option<EngineConfig>,
}

impl SchemaSessionBuilder {
    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    pub fn deploy(mut self, deploy: Deploy) -> Self {
        self.deploy = Some(deploy);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the working domain from a JSON document; `null` leaves it empty
    pub fn domain_json(mut self, json: &str) -> Result<Self> {
        self.domain = codec::decode_root("domain", json)?;
        Ok(self)
    }

    pub fn project_json(mut self, json: &str) -> Result<Self> {
        self.project = codec::decode_root("project", json)?;
        Ok(self)
    }

    pub fn deploy_json(mut self, json: &str) -> Result<Self> {
        self.deploy = codec::decode_root("deploy", json)?;
        Ok(self)
    }

    /// Build the session, assigning identities across all three roots
    pub fn build(self) -> Result<SchemaSession> {
        let mut session = SchemaSession {
            domain: self.domain.unwrap_or_default(),
            project: self.project.unwrap_or_default(),
            deploy: self.deploy.unwrap_or_default(),
            config: self.config.unwrap_or_default(),
        };
        session.assign_domain_uids()?;
        session.assign_project_uids()?;
        session.assign_deploy_uids()?;
        Ok(session)
    }
}

/// In-memory schema graph held for the lifetime of a session
#[derive(Debug, Clone, Default)]
pub struct SchemaSession {
    domain: Domain,
    project: Project,
    deploy: Deploy,
    config: EngineConfig,
}

/// Generates the upsert, add and delete operations for one node collection
macro_rules! node_collection {
    ($kind:literal, $root:ident . $field:ident : $ty:ty, $update:ident, $add:ident, $delete:ident) => {
        #[doc = concat!("Insert or replace ", $kind, " nodes by uid")]
        pub fn $update(&mut self, payload: &str) -> Result<Vec<Upserted>> {
            let nodes = codec::decode_batch::<$ty>($kind, payload)?;
            Ok(upsert::upsert_all(
                &mut self.$root.$field,
                nodes,
                self.config.ingest.assign_missing_uids,
            ))
        }

        #[doc = concat!("Append ", $kind, " nodes without an existence check")]
        pub fn $add(&mut self, payload: &str) -> Result<usize> {
            let nodes = codec::decode_batch::<$ty>($kind, payload)?;
            Ok(upsert::add_all(
                &mut self.$root.$field,
                nodes,
                self.config.ingest.assign_missing_uids,
            ))
        }

        #[doc = concat!("Delete ", $kind, " nodes by comma-separated uids")]
        pub fn $delete(&mut self, uids: &str) -> usize {
            let uids = self.split_ids(uids);
            upsert::delete_by_uids(&mut self.$root.$field, &uids)
        }
    };
}

impl SchemaSession {
    pub fn builder() -> SchemaSessionBuilder {
        SchemaSessionBuilder::default()
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn deploy(&self) -> &Deploy {
        &self.deploy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn split_ids(&self, ids: &str) -> Vec<String> {
        codec::split_ids(ids, self.config.ingest.trim_ids)
    }

    // ---- identity maintenance ----

    pub fn assign_domain_uids(&mut self) -> Result<usize> {
        identity::assign_domain_uids(Some(&mut self.domain))
    }

    pub fn assign_project_uids(&mut self) -> Result<usize> {
        identity::assign_project_uids(Some(&mut self.project))
    }

    pub fn assign_deploy_uids(&mut self) -> Result<usize> {
        identity::assign_deploy_uids(Some(&mut self.deploy))
    }

    // ---- working domain nodes ----

    node_collection!("anchor", domain.anchors: Anchor, update_anchors, add_anchors, delete_anchors);
    node_collection!("knot", domain.knots: Knot, update_knots, add_knots, delete_knots);
    node_collection!("txAnchor", domain.tx_anchors: TxAnchor, update_tx_anchors, add_tx_anchors, delete_tx_anchors);
    node_collection!("cdAnchor", domain.cd_anchors: CdAnchor, update_cd_anchors, add_cd_anchors, delete_cd_anchors);
    node_collection!("tie", domain.ties: Tie, update_ties, add_ties, delete_ties);
    node_collection!("area", domain.areas: Area, update_areas, add_areas, delete_areas);

    /// Clear all areas and install the payload list
    pub fn replace_areas(&mut self, payload: &str) -> Result<usize> {
        let areas = codec::decode_batch::<Area>("area", payload)?;
        self.domain.areas.clear();
        Ok(upsert::add_all(
            &mut self.domain.areas,
            areas,
            self.config.ingest.assign_missing_uids,
        ))
    }

    pub fn anchor(&self, uid: &str) -> Option<Slot<'_, Anchor>> {
        lookup::by_uid(&self.domain.anchors, uid)
    }

    pub fn anchor_by_mnemonic(&self, mnemonic: &str) -> Option<Slot<'_, Anchor>> {
        lookup::by_mnemonic(&self.domain.anchors, mnemonic)
    }

    pub fn knot_by_mnemonic(&self, mnemonic: &str) -> Option<Slot<'_, Knot>> {
        lookup::by_mnemonic(&self.domain.knots, mnemonic)
    }

    pub fn tx_anchor_by_mnemonic(&self, mnemonic: &str) -> Option<Slot<'_, TxAnchor>> {
        lookup::by_mnemonic(&self.domain.tx_anchors, mnemonic)
    }

    pub fn cd_anchor_by_mnemonic(&self, mnemonic: &str) -> Option<Slot<'_, CdAnchor>> {
        lookup::by_mnemonic(&self.domain.cd_anchors, mnemonic)
    }

    /// Append another domain's nodes and take over its property dictionary
    pub fn fill_domain_from(&mut self, other: &Domain) -> Result<()> {
        self.domain.fill_from(other);
        self.assign_domain_uids()?;
        Ok(())
    }

    pub fn mnemonic_descriptors(&self) -> Vec<String> {
        self.domain.mnemonic_descriptors()
    }

    // ---- groups and properties ----

    /// Resolved view of every group of the working domain
    pub fn materialized_groups(&self) -> Result<Vec<MaterializedGroup>> {
        groups::materialize_groups(&self.domain.groups, &self.domain.properties)
    }

    /// Insert groups, or update name and description of existing ones
    ///
    /// A batch inserting a cyclic nesting is rejected as a whole.
    pub fn update_groups(&mut self, payload: &str) -> Result<Vec<Upserted>> {
        let batch = codec::decode_batch::<Group>("group", payload)?;
        let snapshot = self.domain.groups.clone();
        let outcome = batch
            .into_iter()
            .map(|g| groups::update_group(&mut self.domain.groups, g))
            .collect::<Result<Vec<_>>>();
        if outcome.is_err() {
            self.domain.groups = snapshot;
        }
        outcome
    }

    pub fn remove_groups(&mut self, ids: &str) -> usize {
        let ids = self.split_ids(ids);
        groups::remove_groups(&mut self.domain.groups, &ids)
    }

    pub fn add_properties_to_group(&mut self, payload: &str) -> Result<usize> {
        let members = codec::decode_one::<GroupMembers>("group members", payload)?;
        Ok(groups::add_properties_to_group(&mut self.domain.groups, &members))
    }

    pub fn add_groups_to_group(&mut self, payload: &str) -> Result<usize> {
        let members = codec::decode_one::<GroupMembers>("group members", payload)?;
        groups::add_groups_to_group(&mut self.domain.groups, &members)
    }

    pub fn remove_properties_from_group(&mut self, payload: &str) -> Result<usize> {
        let members = codec::decode_one::<GroupMembers>("group members", payload)?;
        Ok(groups::remove_properties_from_group(&mut self.domain.groups, &members))
    }

    pub fn remove_groups_from_group(&mut self, payload: &str) -> Result<usize> {
        let members = codec::decode_one::<GroupMembers>("group members", payload)?;
        Ok(groups::remove_groups_from_group(&mut self.domain.groups, &members))
    }

    /// Insert or replace property definitions by id
    pub fn update_properties(&mut self, payload: &str) -> Result<Vec<Upserted>> {
        let batch = codec::decode_batch::<Property>("property", payload)?;
        Ok(batch
            .into_iter()
            .map(|p| groups::update_property(&mut self.domain.properties, p))
            .collect())
    }

    pub fn delete_properties(&mut self, ids: &str) -> usize {
        let ids = self.split_ids(ids);
        groups::delete_properties(&mut self.domain.groups, &mut self.domain.properties, &ids)
    }

    // ---- project: domains and connexions ----

    /// Merge a domain batch and propagate any short-name changes
    ///
    /// Existing domains only take the header fields of the payload. The
    /// returned map lists each renamed domain's old and new short names.
    pub fn update_domains(&mut self, payload: &str) -> Result<RenameMap> {
        let batch = codec::decode_batch::<Domain>("domain", payload)?;
        let renames = upsert::upsert_domain_headers(
            &mut self.project.domains,
            batch,
            self.config.ingest.assign_missing_uids,
        )?;
        cascade::propagate_renames(&mut self.project, &mut self.deploy, &renames);
        Ok(renames)
    }

    /// Insert or fully replace one domain by uid
    ///
    /// A replace that changes the short name is propagated like a header
    /// update.
    pub fn upsert_domain(&mut self, domain: Domain) -> Result<Upserted> {
        let existing = domain
            .uid()
            .and_then(|uid| lookup::by_uid(&self.project.domains, uid))
            .map(|slot| (slot.index, slot.node.short_name.clone()));

        let clash = self
            .project
            .domains
            .iter()
            .enumerate()
            .any(|(i, d)| d.short_name == domain.short_name && Some(i) != existing.as_ref().map(|e| e.0));
        if clash {
            return Err(SchemaError::DuplicateShortName {
                short_name: domain.short_name,
            });
        }

        let mut renames = RenameMap::new();
        if let Some((_, old)) = &existing {
            renames.record(old, &domain.short_name);
        }
        let outcome = upsert::upsert(
            &mut self.project.domains,
            domain,
            self.config.ingest.assign_missing_uids,
        );
        cascade::propagate_renames(&mut self.project, &mut self.deploy, &renames);
        Ok(outcome)
    }

    /// Append domains without checks other than short-name uniqueness
    pub fn add_domains(&mut self, payload: &str) -> Result<usize> {
        let batch = codec::decode_batch::<Domain>("domain", payload)?;
        for domain in &batch {
            let taken = self
                .project
                .domains
                .iter()
                .chain(batch.iter().take_while(|d| !std::ptr::eq(*d, domain)))
                .any(|d| d.short_name == domain.short_name);
            if taken {
                return Err(SchemaError::DuplicateShortName {
                    short_name: domain.short_name.clone(),
                });
            }
        }
        Ok(upsert::add_all(
            &mut self.project.domains,
            batch,
            self.config.ingest.assign_missing_uids,
        ))
    }

    /// Delete domains by comma-separated short names, cascading to partners
    pub fn delete_domains(&mut self, short_names: &str) -> CascadeReport {
        let short_names = self.split_ids(short_names);
        cascade::delete_domains(&mut self.project, &short_names)
    }

    pub fn domain_by_short_name(&self, short_name: &str) -> Option<Slot<'_, Domain>> {
        lookup::domain_by_short_name(&self.project.domains, short_name)
    }

    pub fn update_connexions(&mut self, payload: &str) -> Result<Vec<Upserted>> {
        let nodes = codec::decode_batch::<Connexion>("connexion", payload)?;
        Ok(upsert::upsert_all(
            &mut self.project.connexions,
            nodes,
            self.config.ingest.assign_missing_uids,
        ))
    }

    pub fn add_connexions(&mut self, payload: &str) -> Result<usize> {
        let nodes = codec::decode_batch::<Connexion>("connexion", payload)?;
        Ok(upsert::add_all(
            &mut self.project.connexions,
            nodes,
            self.config.ingest.assign_missing_uids,
        ))
    }

    /// Delete connexions by comma-separated uids, cascading through identifier roles
    pub fn delete_connexions(&mut self, uids: &str) -> CascadeReport {
        let uids = self.split_ids(uids);
        cascade::delete_connexions(&mut self.project, &uids)
    }

    // ---- deployment ----

    node_collection!("dbHost", deploy.db_hosts: DbHost, update_db_hosts, add_db_hosts, delete_db_hosts);
    node_collection!("fsHost", deploy.fs_hosts: FsHost, update_fs_hosts, add_fs_hosts, delete_fs_hosts);

    /// Place every item of the payload; returns the number of host writes
    pub fn place_items(&mut self, payload: &str) -> Result<usize> {
        let items = codec::decode_batch::<PlacementItem>("item", payload)?;
        let dedupe = self.config.deploy.dedupe_items;
        Ok(items
            .iter()
            .map(|item| placement::place(&mut self.deploy, item, dedupe))
            .sum())
    }

    /// Remove every item of the payload, pruning emptied buckets
    pub fn unplace_items(&mut self, payload: &str) -> Result<usize> {
        let items = codec::decode_batch::<PlacementItem>("item", payload)?;
        Ok(items
            .iter()
            .map(|item| placement::unplace(&mut self.deploy, item))
            .sum())
    }

    /// Remove buckets by comma-separated short names from every host
    pub fn delete_domains_from_deploy(&mut self, short_names: &str) -> usize {
        let short_names = self.split_ids(short_names);
        placement::delete_domains_from_deploy(&mut self.deploy, &short_names)
    }

    pub fn deploy_domain_names(&self) -> Vec<String> {
        placement::deploy_domain_names(&self.deploy)
    }

    // ---- export ----

    /// Snapshot the working domain, stamping its `dateTime`
    pub fn export_domain(&mut self) -> Result<Document<Domain>> {
        let now = Utc::now();
        self.domain.date_time = Some(now);
        Document::new(self.domain.clone(), now, &self.config.export)
    }

    /// Snapshot the project, stamping its `dateTime`
    pub fn export_project(&mut self) -> Result<Document<Project>> {
        let now = Utc::now();
        self.project.date_time = Some(now);
        Document::new(self.project.clone(), now, &self.config.export)
    }

    /// Snapshot the deployment, stamping its `dateTime`
    pub fn export_deploy(&mut self) -> Result<Document<Deploy>> {
        let now = Utc::now();
        self.deploy.date_time = Some(now);
        Document::new(self.deploy.clone(), now, &self.config.export)
    }

    /// Render any collection snapshot in the configured output format
    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        codec::render(value, self.config.export.output_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SchemaSession {
        SchemaSession::builder()
            .domain(Domain::new("Domain0"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_assigns_identities() {
        let session = SchemaSession::builder()
            .domain_json(r#"{"shortName":"D","anchor":[{"mnemonic":"TU"}]}"#)
            .unwrap()
            .build()
            .unwrap();
        assert!(session.domain().has_uid());
        assert!(session.anchor_by_mnemonic("TU").unwrap().node.has_uid());
        assert!(session.project().has_uid());
    }

    #[test]
    fn test_anchor_lifecycle() {
        let mut session = session();
        session.update_anchors(r#"{"mnemonic":"TU","descriptor":"Tutor"}"#).unwrap();
        let uid = session.anchor_by_mnemonic("TU").unwrap().node.uid.clone().unwrap();

        session
            .update_anchors(&format!(r#"[{{"uid":"{uid}","mnemonic":"TU","descriptor":"Mentor"}}]"#))
            .unwrap();
        assert_eq!(session.domain().anchors.len(), 1);
        assert_eq!(session.anchor(&uid).unwrap().node.descriptor, "Mentor");

        assert_eq!(session.delete_anchors(&uid), 1);
        assert!(session.anchor_by_mnemonic("TU").is_none());
    }

    #[test]
    fn test_malformed_batch_applies_nothing() {
        let mut session = session();
        let err = session
            .update_knots(r#"[{"mnemonic":"GEN"},{"mnemonic":["bad"]}]"#)
            .unwrap_err();
        assert!(matches!(err, SchemaError::MalformedInput { kind: "knot", .. }));
        assert!(session.domain().knots.is_empty());
    }

    #[test]
    fn test_replace_areas_clears_existing() {
        let mut session = session();
        session.update_areas(r#"[{"description":"a"},{"description":"b"}]"#).unwrap();
        assert_eq!(session.replace_areas(r#"{"description":"c"}"#).unwrap(), 1);
        assert_eq!(session.domain().areas.len(), 1);
        assert!(session.domain().areas[0].has_uid());
    }

    #[test]
    fn test_add_domains_rejects_taken_short_name() {
        let mut session = session();
        session.add_domains(r#"{"shortName":"A"}"#).unwrap();
        let err = session
            .add_domains(r#"[{"shortName":"B"},{"shortName":"A"}]"#)
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateShortName { .. }));
        assert_eq!(session.project().domains.len(), 1);

        let err = session
            .add_domains(r#"[{"shortName":"C"},{"shortName":"C"}]"#)
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateShortName { .. }));
    }

    #[test]
    fn test_upsert_domain_propagates_rename() {
        let mut session = session();
        session.add_domains(r#"{"uid":"d-1","shortName":"A"}"#).unwrap();
        session
            .add_connexions(r#"{"anchorRole":[{"role":"of","type":"X","domain":"A","identifier":true}]}"#)
            .unwrap();

        let mut renamed = session.domain_by_short_name("A").unwrap().node.clone();
        renamed.short_name = "B".to_string();
        assert_eq!(session.upsert_domain(renamed).unwrap(), Upserted::Replaced(0));

        let role = &session.project().connexions[0].anchor_roles[0];
        assert_eq!(role.domain.as_deref(), Some("B"));
    }

    #[test]
    fn test_export_stamps_date_time() {
        let mut session = session();
        let doc = session.export_domain().unwrap();
        assert_eq!(doc.root.date_time, Some(doc.generated_at));
        assert_eq!(session.domain().date_time, Some(doc.generated_at));
        assert!(doc.checksum.is_some());
    }

    #[test]
    fn test_delete_ignores_blank_and_unknown_ids() {
        let mut session = session();
        session.update_ties(r#"{"uid":"t-1","descriptor":"x"}"#).unwrap();
        assert_eq!(session.delete_ties(" , nope , t-1 "), 1);
        assert!(session.domain().ties.is_empty());
    }
}
