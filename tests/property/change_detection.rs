//! Change detection properties over generated entity sets

use proptest::prelude::*;
use specforge::change::detect_changes;
use specforge::spec::{Entity, Specification};
use std::collections::{BTreeMap, BTreeSet};

const NAMES: &[&str] = &["User", "Order", "Product", "Invoice", "Address", "Tag"];
const TYPES: &[&str] = &["string", "int", "*User"];

fn spec_strategy() -> impl Strategy<Value = Specification> {
    let attributes =
        prop::collection::btree_map("[a-z]{1,6}", prop::sample::select(TYPES), 0..3);
    (
        prop::sample::subsequence(NAMES.to_vec(), 0..=NAMES.len()),
        prop::collection::vec(attributes, NAMES.len()),
    )
        .prop_map(|(names, attribute_sets)| {
            let mut spec = Specification::default();
            spec.data_model.entities = names
                .into_iter()
                .zip(attribute_sets)
                .map(|(name, attributes)| Entity {
                    name: name.to_string(),
                    package: "models".to_string(),
                    attributes: attributes
                        .into_iter()
                        .map(|(k, v)| (k, v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                })
                .collect();
            spec
        })
}

/// Test that a snapshot compared with itself reports nothing
#[test]
fn test_identical_snapshots_have_no_changes_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&spec_strategy(), |spec| {
        let changes = detect_changes(Some(&spec), &spec);
        assert!(!changes.has_changes());
        assert!(!changes.requires_full_regeneration());
        Ok(())
    }).unwrap();
}

/// Test that added and deleted keys are exactly the name set differences
#[test]
fn test_added_and_deleted_match_set_difference_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&(spec_strategy(), spec_strategy()), |(old, new)| {
        let changes = detect_changes(Some(&old), &new);
        let old_names: BTreeSet<&str> = old.entity_names().collect();
        let new_names: BTreeSet<&str> = new.entity_names().collect();

        let added: Vec<&str> = new_names.difference(&old_names).copied().collect();
        let deleted: Vec<&str> = old_names.difference(&new_names).copied().collect();
        assert_eq!(changes.entities().added, added);
        assert_eq!(changes.entities().deleted, deleted);
        for name in &changes.entities().modified {
            assert!(old_names.contains(name.as_str()) && new_names.contains(name.as_str()));
        }
        assert_eq!(changes.has_changes(), !changes.entities().is_empty());
        Ok(())
    }).unwrap();
}

/// Test that a first generation always has changes and lists every entity
#[test]
fn test_first_generation_lists_every_entity_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&spec_strategy(), |spec| {
        let changes = detect_changes(None, &spec);
        assert!(changes.has_changes());
        let mut expected: Vec<String> = spec.entity_names().map(str::to_string).collect();
        expected.sort();
        assert_eq!(changes.entities().added, expected);
        Ok(())
    }).unwrap();
}
