use crate::integration::support::{entity, package};
use specforge::change::{affected_packages, detect_changes};
use specforge::orchestrator::{Orchestrator, RegenerationMode};
use specforge::spec::Specification;
use specforge::state::{affected_files, IncrementalState};

fn snapshot(entities: Vec<specforge::spec::Entity>) -> Specification {
    let mut spec = Specification::default();
    spec.version = "1.0".to_string();
    spec.architecture.packages = vec![
        package("models", &[]),
        package("domain", &[]),
        package("services", &["models"]),
    ];
    spec.data_model.entities = entities;
    spec
}

fn old_snapshot() -> Specification {
    snapshot(vec![
        entity("User", "models", &[("id", "string")]),
        entity("Product", "models", &[("sku", "string")]),
    ])
}

fn new_snapshot() -> Specification {
    snapshot(vec![
        entity("User", "domain", &[("id", "string")]),
        entity("Order", "models", &[("buyer", "*User")]),
    ])
}

fn recorded_state() -> IncrementalState {
    let mut state = IncrementalState::new();
    state.record_file("models/user.go", "package models", ["User"], false);
    state.record_file("models/product.go", "package models", ["Product"], false);
    state.record_file("models/order.go", "package models", ["Order", "User"], false);
    state
}

#[test]
fn entity_moves_and_removals_are_itemized() {
    let changes = detect_changes(Some(&old_snapshot()), &new_snapshot());

    assert!(changes.has_changes());
    assert!(!changes.requires_full_regeneration());
    assert_eq!(changes.entities().added, vec!["Order"]);
    assert_eq!(changes.entities().modified, vec!["User"]);
    assert_eq!(changes.entities().deleted, vec!["Product"]);
    assert!(changes.packages().is_empty());
}

#[test]
fn affected_files_include_name_matches_for_deleted_entities() {
    let changes = detect_changes(Some(&old_snapshot()), &new_snapshot());
    let affected = affected_files(&recorded_state(), &changes);

    assert_eq!(
        affected.into_iter().collect::<Vec<_>>(),
        vec!["models/order.go", "models/product.go", "models/user.go"]
    );
}

#[test]
fn decision_is_incremental_over_recorded_state() {
    let old = old_snapshot();
    let decision = Orchestrator::plan_regeneration(Some(&old), &new_snapshot(), &recorded_state());

    match &decision.mode {
        RegenerationMode::Incremental { affected } => assert_eq!(affected.len(), 3),
        other => panic!("expected incremental decision, got {:?}", other),
    }
    assert!(decision.requires("models/invoice.go", &recorded_state()));
}

#[test]
fn package_dependency_change_propagates_to_dependents() {
    let old = old_snapshot();
    let mut new = old.clone();
    new.architecture.packages[1].dependencies = vec!["models".to_string()];

    let changes = detect_changes(Some(&old), &new);
    assert_eq!(changes.packages().modified, vec!["domain"]);

    let mut layered = new.clone();
    layered.architecture.packages[2].dependencies = vec!["domain".to_string()];
    let affected = affected_packages(&layered, &changes);
    assert!(affected.contains("domain"));
    assert!(affected.contains("services"));
    assert!(!affected.contains("models"));
}

#[test]
fn first_generation_reports_every_entity_added() {
    let changes = detect_changes(None, &new_snapshot());
    assert!(changes.has_changes());
    assert_eq!(changes.entities().added, vec!["Order", "User"]);

    let decision =
        Orchestrator::plan_regeneration(None, &new_snapshot(), &recorded_state());
    assert_eq!(decision.mode, RegenerationMode::Full);
}
