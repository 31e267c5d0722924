//! Indices built once per specification.

use crate::spec::Specification;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Entity references, entity ownership and package dependencies.
#[derive(Debug, Clone, Default)]
pub struct ContextIndex {
    /// Entity → entities it references directly.
    references: BTreeMap<String, BTreeSet<String>>,
    /// Entity → owning package.
    entity_package: BTreeMap<String, String>,
    /// Package → declared dependency packages.
    package_dependencies: BTreeMap<String, Vec<String>>,
}

impl ContextIndex {
    pub fn build(spec: &Specification) -> Self {
        let known: HashSet<&str> = spec.entity_names().collect();
        let mut references: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut entity_package = BTreeMap::new();

        for entity in &spec.data_model.entities {
            entity_package.insert(entity.name.clone(), entity.package.clone());
            let refs = references.entry(entity.name.clone()).or_default();
            for descriptor in entity.attributes.values() {
                if let Some(target) = extract_type_reference(descriptor, |n| known.contains(n)) {
                    if target != entity.name {
                        refs.insert(target);
                    }
                }
            }
        }

        for rel in &spec.data_model.relationships {
            if known.contains(rel.from.as_str()) && known.contains(rel.to.as_str()) {
                references
                    .entry(rel.from.clone())
                    .or_default()
                    .insert(rel.to.clone());
            }
        }

        let package_dependencies = spec
            .architecture
            .packages
            .iter()
            .map(|p| (p.name.clone(), p.dependencies.clone()))
            .collect();

        Self {
            references,
            entity_package,
            package_dependencies,
        }
    }

    pub fn references(&self, entity: &str) -> impl Iterator<Item = &str> {
        self.references
            .get(entity)
            .into_iter()
            .flat_map(|refs| refs.iter().map(String::as_str))
    }

    pub fn package_of(&self, entity: &str) -> Option<&str> {
        self.entity_package.get(entity).map(String::as_str)
    }

    pub fn package_dependencies(&self, package: &str) -> &[String] {
        self.package_dependencies
            .get(package)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Resolve the entity a type descriptor refers to, if any.
///
/// Pointer (`*T`), optional (`T?`) and collection (`[]T`) decorations are
/// stripped repeatedly, a leading map decoration (`map[K]V`) once. The
/// package qualifier is dropped. The remaining identifier must start with an
/// upper-case letter and satisfy `is_entity`; anything else is a primitive.
pub fn extract_type_reference<F>(descriptor: &str, is_entity: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    let mut current = descriptor.trim();
    let mut map_stripped = false;
    loop {
        if let Some(rest) = current.strip_prefix('*') {
            current = rest.trim_start();
        } else if let Some(rest) = current.strip_suffix('?') {
            current = rest.trim_end();
        } else if let Some(rest) = current.strip_prefix("[]") {
            current = rest.trim_start();
        } else if !map_stripped && current.starts_with("map[") {
            map_stripped = true;
            current = strip_map_key(current)?;
        } else {
            break;
        }
    }

    let bare = current.rsplit('.').next().unwrap_or(current);
    let starts_upper = bare.chars().next().map(char::is_uppercase).unwrap_or(false);
    if starts_upper && is_entity(bare) {
        Some(bare.to_string())
    } else {
        None
    }
}

/// `map[K]V` → `V`, honouring brackets nested inside the key.
fn strip_map_key(descriptor: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in descriptor.char_indices().skip("map".len()) {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(descriptor[i + 1..].trim_start());
                }
            }
            _ => {}
        }
    }
    None
}
