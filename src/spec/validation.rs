//! Structural validation of a specification snapshot.
//!
//! Every check runs; failures are collected into one aggregate error.

use crate::error::{AggregateValidationError, GraphError};
use crate::graph::DependencyGraph;
use crate::spec::model::Specification;
use std::collections::HashSet;

pub fn validate_specification(spec: &Specification) -> Result<(), AggregateValidationError> {
    let mut errors = Vec::new();
    check_packages(spec, &mut errors);
    check_entities(spec, &mut errors);
    check_relationships(spec, &mut errors);
    AggregateValidationError::check(errors)
}

impl Specification {
    pub fn validate(&self) -> Result<(), AggregateValidationError> {
        validate_specification(self)
    }
}

fn check_packages(spec: &Specification, errors: &mut Vec<String>) {
    let packages = &spec.architecture.packages;
    let mut names: HashSet<&str> = HashSet::new();
    for package in packages {
        if package.name.trim().is_empty() {
            errors.push("Package with empty name".to_string());
        } else if !names.insert(package.name.as_str()) {
            errors.push(format!("Duplicate package name: {}", package.name));
        }
    }

    let mut graph: DependencyGraph<()> = DependencyGraph::new();
    for package in packages {
        for dep in &package.dependencies {
            if !names.contains(dep.as_str()) {
                errors.push(format!(
                    "Package {} depends on unknown package {}",
                    package.name, dep
                ));
            }
        }
        // Duplicates were reported above; the first declaration stands in the graph.
        let _ = graph.add_node_with_dependencies(
            package.name.clone(),
            (),
            package.dependencies.clone(),
        );
    }

    if let Err(GraphError::CycleDetected { path }) = graph.validate() {
        errors.push(format!("Package dependency cycle: {}", path.join(" -> ")));
    }
}

fn check_entities(spec: &Specification, errors: &mut Vec<String>) {
    let packages: HashSet<&str> = spec
        .architecture
        .packages
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    let mut names: HashSet<&str> = HashSet::new();
    for entity in &spec.data_model.entities {
        if entity.name.trim().is_empty() {
            errors.push("Entity with empty name".to_string());
            continue;
        }
        if !names.insert(entity.name.as_str()) {
            errors.push(format!("Duplicate entity name: {}", entity.name));
        }
        // A specification with no declared packages leaves ownership unchecked.
        if !packages.is_empty() && !packages.contains(entity.package.as_str()) {
            errors.push(format!(
                "Entity {} belongs to unknown package {:?}",
                entity.name, entity.package
            ));
        }
    }
}

fn check_relationships(spec: &Specification, errors: &mut Vec<String>) {
    let entities: HashSet<&str> = spec.entity_names().collect();
    for rel in &spec.data_model.relationships {
        for endpoint in [&rel.from, &rel.to] {
            if !entities.contains(endpoint.as_str()) {
                errors.push(format!(
                    "Relationship {} -> {} references unknown entity {}",
                    rel.from, rel.to, endpoint
                ));
            }
        }
    }
}
