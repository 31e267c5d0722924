//! Change detection between an old (possibly absent) and a new snapshot.

use crate::change::change_set::{CategoryChanges, ChangeSet};
use crate::spec::model::{ApiContract, Entity, Package, Specification};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Diff two snapshots. `old = None` means first generation: every entity and
/// every API contract key is reported as added and `has_changes` is forced.
pub fn detect_changes(old: Option<&Specification>, new: &Specification) -> ChangeSet {
    let Some(old) = old else {
        let entities = CategoryChanges {
            added: new.entity_names().map(str::to_string).collect(),
            ..Default::default()
        };
        let api_contracts = CategoryChanges {
            added: new.api_contracts.iter().map(ApiContract::key).collect(),
            ..Default::default()
        };
        debug!(
            entities = entities.added.len(),
            contracts = api_contracts.added.len(),
            "No previous snapshot, treating as first generation"
        );
        return ChangeSet::new(
            CategoryChanges::default(),
            CategoryChanges::default(),
            CategoryChanges::default(),
            entities,
            api_contracts,
            false,
            false,
        )
        .mark_first_generation();
    };

    let requirements = diff_keyed(
        &old.requirements.functional,
        &new.requirements.functional,
        |r| r.id.clone(),
        |a, b| (&a.description, &a.priority, &a.category) == (&b.description, &b.priority, &b.category),
    );
    let non_functional = diff_keyed(
        &old.requirements.non_functional,
        &new.requirements.non_functional,
        |r| r.id.clone(),
        |a, b| (&a.description, &a.kind, &a.threshold) == (&b.description, &b.kind, &b.threshold),
    );
    let packages = diff_keyed(
        &old.architecture.packages,
        &new.architecture.packages,
        |p| p.name.clone(),
        package_unchanged,
    );
    let entities = diff_keyed(
        &old.data_model.entities,
        &new.data_model.entities,
        |e| e.name.clone(),
        entity_unchanged,
    );
    let api_contracts = diff_keyed(&old.api_contracts, &new.api_contracts, ApiContract::key, |a, b| {
        a == b
    });

    let change_set = ChangeSet::new(
        requirements,
        non_functional,
        packages,
        entities,
        api_contracts,
        old.architecture != new.architecture,
        old.build != new.build,
    );
    debug!(has_changes = change_set.has_changes(), "Change detection complete");
    change_set
}

/// Keyed three-way diff. The last occurrence of a duplicated key wins.
fn diff_keyed<T, K, S>(old: &[T], new: &[T], key: K, same: S) -> CategoryChanges
where
    K: Fn(&T) -> String,
    S: Fn(&T, &T) -> bool,
{
    let old_map: BTreeMap<String, &T> = old.iter().map(|item| (key(item), item)).collect();
    let new_map: BTreeMap<String, &T> = new.iter().map(|item| (key(item), item)).collect();

    let mut changes = CategoryChanges::default();
    for (k, new_item) in &new_map {
        match old_map.get(k) {
            None => changes.added.push(k.clone()),
            Some(old_item) if !same(old_item, new_item) => changes.modified.push(k.clone()),
            Some(_) => {}
        }
    }
    changes.deleted = old_map
        .keys()
        .filter(|k| !new_map.contains_key(*k))
        .cloned()
        .collect();
    changes
}

/// Dependency lists compare by length plus containment of every old entry in
/// the new list. Reorders are unchanged; equal-length lists that differ only
/// in duplicates may still compare unchanged.
fn package_unchanged(old: &Package, new: &Package) -> bool {
    if old.path != new.path || old.purpose != new.purpose {
        return false;
    }
    if old.dependencies.len() != new.dependencies.len() {
        return false;
    }
    let new_deps: HashSet<&str> = new.dependencies.iter().map(String::as_str).collect();
    old.dependencies.iter().all(|d| new_deps.contains(d.as_str()))
}

fn entity_unchanged(old: &Entity, new: &Entity) -> bool {
    old.package == new.package
        && old.attributes.len() == new.attributes.len()
        && old
            .attributes
            .iter()
            .all(|(name, ty)| new.attributes.get(name) == Some(ty))
}
