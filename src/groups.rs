//! Group aggregation engine and group/property editing
//!
//! Canonical groups reference nested groups and properties by id. The
//! materialized view resolves those ids into full objects and is built
//! fresh on every call; canonical storage is never touched by it.
//!
//! A group hierarchy with a cycle (a group nesting itself, directly or
//! through other groups) is rejected with [`SchemaError::GroupCycle`].

use std::collections::HashMap;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;

use crate::error::{Result, SchemaError};
use crate::lookup;
use crate::model::{Group, GroupMembers, IdRef, MaterializedGroup, Property};
use crate::upsert::Upserted;

/// Fail if the nesting graph of the groups has a cycle
pub fn check_acyclic(groups: &[Group]) -> Result<()> {
    let mut graph = DiGraph::<&str, ()>::with_capacity(groups.len(), groups.len() * 2);
    let mut node_indices = HashMap::with_capacity(groups.len());
    for group in groups {
        node_indices
            .entry(group.id.as_str())
            .or_insert_with(|| graph.add_node(group.id.as_str()));
    }

    for group in groups {
        let from = node_indices[group.id.as_str()];
        for nested in &group.groups {
            if nested.id == group.id {
                return Err(SchemaError::GroupCycle {
                    members: vec![group.id.clone(), group.id.clone()],
                });
            }
            if let Some(&to) = node_indices.get(nested.id.as_str()) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let cycle = kosaraju_scc(&graph).into_iter().find(|scc| scc.len() > 1);
    match cycle {
        Some(scc) => {
            let mut members: Vec<String> = scc
                .into_iter()
                .filter_map(|idx| graph.node_weight(idx).map(|id| id.to_string()))
                .collect();
            members.sort();
            tracing::warn!(?members, "Group hierarchy contains a cycle");
            Err(SchemaError::GroupCycle { members })
        }
        None => Ok(()),
    }
}

fn materialize(group: &Group, groups: &[Group], properties: &[Property]) -> MaterializedGroup {
    let nested = group
        .groups
        .iter()
        .filter_map(|r| match lookup::group_by_id(groups, &r.id) {
            Some(slot) => Some(materialize(slot.node, groups, properties)),
            None => {
                tracing::debug!(group = %group.id, nested = %r.id, "Dropped unresolved group");
                None
            }
        })
        .collect();
    let resolved = group
        .properties
        .iter()
        .filter_map(|r| match lookup::property_by_id(properties, &r.id) {
            Some(slot) => Some(slot.node.clone()),
            None => {
                tracing::debug!(group = %group.id, property = %r.id, "Dropped unresolved property");
                None
            }
        })
        .collect();

    MaterializedGroup {
        id: group.id.clone(),
        name: group.name.clone(),
        description: group.description.clone(),
        groups: nested,
        properties: resolved,
    }
}

/// Resolve every group into a fresh snapshot
///
/// Property and nested-group references with no matching entry are dropped
/// silently.
pub fn materialize_groups(
    groups: &[Group],
    properties: &[Property],
) -> Result<Vec<MaterializedGroup>> {
    check_acyclic(groups)?;
    Ok(groups
        .iter()
        .map(|g| materialize(g, groups, properties))
        .collect())
}

/// Insert a group, or update only the name and description of an existing one
///
/// An inserted group whose nested references close a cycle is taken back
/// out and the cycle reported.
pub fn update_group(groups: &mut Vec<Group>, group: Group) -> Result<Upserted> {
    match lookup::group_by_id(groups, &group.id).map(|s| s.index) {
        Some(index) => {
            let target = &mut groups[index];
            target.name = group.name;
            target.description = group.description;
            tracing::debug!(id = %target.id, "Updated group");
            Ok(Upserted::Replaced(index))
        }
        None => {
            groups.push(group);
            if let Err(e) = check_acyclic(groups) {
                groups.pop();
                return Err(e);
            }
            let index = groups.len() - 1;
            tracing::debug!(id = %groups[index].id, "Inserted group");
            Ok(Upserted::Inserted(index))
        }
    }
}

/// Remove groups by id, along with every nested reference to them
pub fn remove_groups(groups: &mut Vec<Group>, ids: &[String]) -> usize {
    let before = groups.len();
    groups.retain(|g| !ids.contains(&g.id));
    for group in groups.iter_mut() {
        group.groups.retain(|r| !ids.contains(&r.id));
    }
    let removed = before - groups.len();
    tracing::debug!(removed, "Removed groups");
    removed
}

fn add_refs(refs: &mut Vec<IdRef>, elements: &[String]) -> usize {
    let mut added = 0;
    for id in elements {
        if !refs.iter().any(|r| &r.id == id) {
            refs.push(IdRef::new(id.clone()));
            added += 1;
        }
    }
    added
}

fn remove_refs(refs: &mut Vec<IdRef>, elements: &[String]) -> usize {
    let before = refs.len();
    refs.retain(|r| !elements.contains(&r.id));
    before - refs.len()
}

/// Add property references to a group, skipping ones already present
pub fn add_properties_to_group(groups: &mut [Group], members: &GroupMembers) -> usize {
    match groups.iter_mut().find(|g| g.id == members.id) {
        Some(group) => add_refs(&mut group.properties, &members.elements),
        None => 0,
    }
}

/// Add nested group references to a group, skipping ones already present
///
/// The edit is undone and an error returned if it would create a cycle.
pub fn add_groups_to_group(groups: &mut [Group], members: &GroupMembers) -> Result<usize> {
    let Some(index) = groups.iter().position(|g| g.id == members.id) else {
        return Ok(0);
    };
    let previous = groups[index].groups.clone();
    let added = add_refs(&mut groups[index].groups, &members.elements);
    if let Err(e) = check_acyclic(groups) {
        groups[index].groups = previous;
        return Err(e);
    }
    Ok(added)
}

pub fn remove_properties_from_group(groups: &mut [Group], members: &GroupMembers) -> usize {
    match groups.iter_mut().find(|g| g.id == members.id) {
        Some(group) => remove_refs(&mut group.properties, &members.elements),
        None => 0,
    }
}

pub fn remove_groups_from_group(groups: &mut [Group], members: &GroupMembers) -> usize {
    match groups.iter_mut().find(|g| g.id == members.id) {
        Some(group) => remove_refs(&mut group.groups, &members.elements),
        None => 0,
    }
}

/// Insert or fully replace a property definition by id
pub fn update_property(properties: &mut Vec<Property>, property: Property) -> Upserted {
    match lookup::property_by_id(properties, &property.id).map(|s| s.index) {
        Some(index) => {
            properties[index] = property;
            Upserted::Replaced(index)
        }
        None => {
            properties.push(property);
            Upserted::Inserted(properties.len() - 1)
        }
    }
}

/// Remove properties from the dictionary and from every group referencing them
pub fn delete_properties(groups: &mut [Group], properties: &mut Vec<Property>, ids: &[String]) -> usize {
    let before = properties.len();
    properties.retain(|p| !ids.contains(&p.id));
    for group in groups.iter_mut() {
        remove_refs(&mut group.properties, ids);
    }
    before - properties.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, nested: &[&str], props: &[&str]) -> Group {
        Group {
            id: id.to_string(),
            name: Some(format!("{id} name")),
            description: None,
            groups: nested.iter().map(|n| IdRef::new(*n)).collect(),
            properties: props.iter().map(|p| IdRef::new(*p)).collect(),
        }
    }

    fn property(id: &str) -> Property {
        Property {
            id: id.to_string(),
            display_name: Some(id.to_uppercase()),
            ..Property::default()
        }
    }

    fn members(id: &str, elements: &[&str]) -> GroupMembers {
        GroupMembers {
            id: id.to_string(),
            elements: elements.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_materialize_resolves_nested_groups_and_properties() {
        let groups = vec![group("root", &["child"], &["p1"]), group("child", &[], &["p2"])];
        let properties = vec![property("p1"), property("p2")];

        let view = materialize_groups(&groups, &properties).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].properties[0].id, "p1");
        assert_eq!(view[0].groups[0].id, "child");
        assert_eq!(view[0].groups[0].properties[0].display_name.as_deref(), Some("P2"));
    }

    #[test]
    fn test_unresolved_references_are_dropped() {
        let groups = vec![group("root", &["ghost"], &["p1", "missing"])];
        let properties = vec![property("p1")];

        let view = materialize_groups(&groups, &properties).unwrap();
        assert!(view[0].groups.is_empty());
        assert_eq!(view[0].properties.len(), 1);
    }

    #[test]
    fn test_materialize_does_not_mutate_canonical_storage() {
        let groups = vec![group("root", &["child", "ghost"], &["p1", "missing"]), group("child", &[], &[])];
        let properties = vec![property("p1")];
        let (groups_before, properties_before) = (groups.clone(), properties.clone());

        materialize_groups(&groups, &properties).unwrap();
        assert_eq!(groups, groups_before);
        assert_eq!(properties, properties_before);
    }

    #[test]
    fn test_cycle_is_reported() {
        let groups = vec![group("a", &["b"], &[]), group("b", &["c"], &[]), group("c", &["a"], &[])];
        let err = materialize_groups(&groups, &[]).unwrap_err();
        match err {
            SchemaError::GroupCycle { members } => assert_eq!(members, vec!["a", "b", "c"]),
            other => panic!("unexpected error: {other}"),
        }

        let self_ref = vec![group("a", &["a"], &[])];
        assert!(matches!(check_acyclic(&self_ref), Err(SchemaError::GroupCycle { .. })));
    }

    #[test]
    fn test_update_group_only_touches_name_and_description() {
        let mut groups = vec![group("g", &["x"], &["p1"])];
        let mut payload = group("g", &[], &[]);
        payload.name = Some("Renamed".to_string());
        payload.description = Some("desc".to_string());

        assert_eq!(update_group(&mut groups, payload).unwrap(), Upserted::Replaced(0));
        assert_eq!(groups[0].name.as_deref(), Some("Renamed"));
        assert_eq!(groups[0].groups.len(), 1);
        assert_eq!(groups[0].properties.len(), 1);

        assert_eq!(update_group(&mut groups, group("h", &[], &[])).unwrap(), Upserted::Inserted(1));
    }

    #[test]
    fn test_inserting_self_nesting_group_is_rejected() {
        let mut groups = vec![group("a", &[], &[])];
        let err = update_group(&mut groups, group("x", &["x"], &[])).unwrap_err();
        assert!(matches!(err, SchemaError::GroupCycle { .. }));
        assert_eq!(groups.len(), 1);
        assert!(materialize_groups(&groups, &[]).is_ok());
    }

    #[test]
    fn test_inserting_mutually_nesting_group_is_rejected() {
        let mut groups = vec![group("a", &["b"], &[])];
        let err = update_group(&mut groups, group("b", &["a"], &[])).unwrap_err();
        match err {
            SchemaError::GroupCycle { members } => assert_eq!(members, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(groups, vec![group("a", &["b"], &[])]);

        // Forward references to a group not yet present stay legal
        assert_eq!(update_group(&mut groups, group("b", &["c"], &[])).unwrap(), Upserted::Inserted(1));
    }

    #[test]
    fn test_materialize_resolves_every_nesting_level() {
        let groups = vec![
            group("root", &["mid"], &[]),
            group("mid", &["leaf"], &[]),
            group("leaf", &[], &["p1"]),
        ];
        let view = materialize_groups(&groups, &[property("p1")]).unwrap();
        assert_eq!(view[0].groups[0].groups[0].id, "leaf");
        assert_eq!(view[0].groups[0].groups[0].properties[0].id, "p1");
    }

    #[test]
    fn test_remove_group_clears_nested_references() {
        let mut groups = vec![group("a", &["b"], &[]), group("b", &[], &[])];
        assert_eq!(remove_groups(&mut groups, &["b".to_string()]), 1);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].groups.is_empty());
    }

    #[test]
    fn test_membership_edits_skip_duplicates() {
        let mut groups = vec![group("a", &[], &["p1"]), group("b", &[], &[])];

        assert_eq!(add_properties_to_group(&mut groups, &members("a", &["p1", "p2"])), 1);
        assert_eq!(groups[0].properties.len(), 2);
        assert_eq!(add_groups_to_group(&mut groups, &members("a", &["b", "b"])).unwrap(), 1);
        assert_eq!(add_properties_to_group(&mut groups, &members("nope", &["p1"])), 0);

        assert_eq!(remove_properties_from_group(&mut groups, &members("a", &["p1"])), 1);
        assert_eq!(remove_groups_from_group(&mut groups, &members("a", &["b"])), 1);
        assert!(groups[0].groups.is_empty());
    }

    #[test]
    fn test_cyclic_group_edit_is_undone() {
        let mut groups = vec![group("a", &["b"], &[]), group("b", &[], &[])];
        let err = add_groups_to_group(&mut groups, &members("b", &["a"])).unwrap_err();
        assert!(matches!(err, SchemaError::GroupCycle { .. }));
        assert!(groups[1].groups.is_empty());
    }

    #[test]
    fn test_property_update_and_delete() {
        let mut groups = vec![group("a", &[], &["p1", "p2"])];
        let mut properties = vec![property("p1"), property("p2")];

        let mut replacement = property("p1");
        replacement.description = Some("changed".to_string());
        assert_eq!(update_property(&mut properties, replacement), Upserted::Replaced(0));
        assert_eq!(properties[0].description.as_deref(), Some("changed"));

        assert_eq!(delete_properties(&mut groups, &mut properties, &["p1".to_string()]), 1);
        assert_eq!(properties.len(), 1);
        assert_eq!(groups[0].properties, vec![IdRef::new("p2")]);
    }
}
