//! Per-file context filtering.

use crate::context::index::ContextIndex;
use crate::scheduler::GenerationTask;
use crate::spec::model::{Architecture, DataModel, Specification};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_DEPTH: usize = 5;

const LAYER_KEYWORDS: &[&str] = &["service", "handler", "repository", "controller", "store", "api"];
const API_KEYWORDS: &[&str] = &["handler", "api", "route", "controller"];

#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Reference hops followed from the primary entities.
    pub max_depth: usize,
    /// Packages always included: entry point, configuration, shared utilities.
    pub infrastructure_packages: Vec<String>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            infrastructure_packages: vec!["main".into(), "config".into(), "utils".into()],
        }
    }
}

/// Immutable projection of the specification for one target file.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredSpecification {
    pub target_path: String,
    pub specification: Specification,
    /// Relevant entity names in declaration order.
    pub entities: Vec<String>,
    pub packages: BTreeSet<String>,
    pub original_entity_count: usize,
    pub filtered_entity_count: usize,
    pub original_package_count: usize,
    pub filtered_package_count: usize,
    pub reduction_percent: f64,
    /// No entity could be tied to the file and every entity was included.
    pub degraded: bool,
}

/// Reduction of `filtered` relative to `original`, within `[0, 100]`.
pub fn reduction_percent(original: usize, filtered: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let kept = filtered.min(original) as f64 / original as f64;
    ((1.0 - kept) * 100.0).clamp(0.0, 100.0)
}

pub struct ContextFilter {
    spec: Arc<Specification>,
    index: ContextIndex,
    options: ContextOptions,
}

impl ContextFilter {
    pub fn new(spec: Arc<Specification>, options: ContextOptions) -> Self {
        let index = ContextIndex::build(&spec);
        Self {
            spec,
            index,
            options,
        }
    }

    pub fn specification(&self) -> &Specification {
        &self.spec
    }

    pub fn index(&self) -> &ContextIndex {
        &self.index
    }

    pub fn filter_task(&self, task: &GenerationTask) -> FilteredSpecification {
        self.filter(&task.target_path, &task.entity_hints())
    }

    pub fn filter(&self, target_path: &str, hints: &[String]) -> FilteredSpecification {
        let path = Path::new(target_path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let dir_name = path
            .parent()
            .and_then(Path::file_name)
            .map(|d| d.to_string_lossy().to_string())
            .unwrap_or_default();

        let primary = self.primary_entities(path, &stem, &dir_name, hints);
        let degraded = primary.is_empty();
        let entities: BTreeSet<String> = if degraded {
            warn!(
                target = target_path,
                "No entity matched target file, including every entity"
            );
            self.spec.entity_names().map(str::to_string).collect()
        } else {
            self.closure(primary)
        };

        let packages = self.relevant_packages(&entities, &dir_name);
        let api_like = is_api_like(&stem, path);
        let filtered = self.project(&entities, &packages, api_like);

        let original_entities = self.spec.data_model.entities.len();
        let original_packages = self.spec.architecture.packages.len();
        let filtered_entities = filtered.data_model.entities.len();
        let filtered_packages = filtered.architecture.packages.len();
        let reduction = reduction_percent(
            original_entities + original_packages,
            filtered_entities + filtered_packages,
        );
        debug!(
            target = target_path,
            entities = filtered_entities,
            packages = filtered_packages,
            reduction,
            "Filtered context"
        );

        FilteredSpecification {
            target_path: target_path.to_string(),
            entities: filtered
                .data_model
                .entities
                .iter()
                .map(|e| e.name.clone())
                .collect(),
            specification: filtered,
            packages,
            original_entity_count: original_entities,
            filtered_entity_count: filtered_entities,
            original_package_count: original_packages,
            filtered_package_count: filtered_packages,
            reduction_percent: reduction,
            degraded,
        }
    }

    /// Primary entities, first matching rule wins: name in the file stem,
    /// package matching the directory, task hints, then the package's
    /// entities for layer files.
    fn primary_entities(
        &self,
        path: &Path,
        stem: &str,
        dir_name: &str,
        hints: &[String],
    ) -> Vec<String> {
        let entities = &self.spec.data_model.entities;
        let compact_stem: String = stem.chars().filter(|c| *c != '_' && *c != '-').collect();

        let mut best: Option<&str> = None;
        for entity in entities {
            let name = entity.name.to_lowercase();
            if name.is_empty() || !(stem.contains(&name) || compact_stem.contains(&name)) {
                continue;
            }
            if best.map(|b| entity.name.len() > b.len()).unwrap_or(true) {
                best = Some(&entity.name);
            }
        }
        if let Some(name) = best {
            return vec![name.to_string()];
        }

        if !dir_name.is_empty() {
            if let Some(entity) = entities
                .iter()
                .find(|e| e.package.eq_ignore_ascii_case(dir_name))
            {
                return vec![entity.name.clone()];
            }
        }

        let hinted: Vec<String> = hints
            .iter()
            .filter(|h| self.spec.entity(h).is_some())
            .cloned()
            .collect();
        if !hinted.is_empty() {
            return hinted;
        }

        if is_layer_file(stem) {
            let dir = path.parent().map(|p| p.to_string_lossy().replace('\\', "/"));
            let owner = self.spec.architecture.packages.iter().find(|p| {
                let declared = p.path.trim_end_matches('/');
                (!declared.is_empty() && dir.as_deref().map(|d| d.ends_with(declared)).unwrap_or(false))
                    || p.name.eq_ignore_ascii_case(dir_name)
            });
            if let Some(owner) = owner {
                return entities
                    .iter()
                    .filter(|e| e.package == owner.name)
                    .map(|e| e.name.clone())
                    .collect();
            }
        }
        Vec::new()
    }

    /// Breadth-first reference closure. Entities already included are not
    /// expanded again; nothing deeper than `max_depth` hops is followed.
    fn closure(&self, primary: Vec<String>) -> BTreeSet<String> {
        let mut included: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        for name in primary {
            if included.insert(name.clone()) {
                queue.push_back((name, 0));
            }
        }
        while let Some((name, depth)) = queue.pop_front() {
            if depth >= self.options.max_depth {
                continue;
            }
            for target in self.index.references(&name) {
                if included.insert(target.to_string()) {
                    queue.push_back((target.to_string(), depth + 1));
                }
            }
        }
        included
    }

    fn relevant_packages(&self, entities: &BTreeSet<String>, dir_name: &str) -> BTreeSet<String> {
        let mut packages = BTreeSet::new();
        if !dir_name.is_empty() {
            packages.insert(dir_name.to_string());
        }
        for entity in entities {
            if let Some(package) = self.index.package_of(entity) {
                packages.insert(package.to_string());
                packages.extend(self.index.package_dependencies(package).iter().cloned());
            }
        }
        packages.extend(self.options.infrastructure_packages.iter().cloned());
        packages
    }

    fn project(
        &self,
        entities: &BTreeSet<String>,
        packages: &BTreeSet<String>,
        api_like: bool,
    ) -> Specification {
        let spec = &self.spec;
        let api_contracts = if api_like {
            spec.api_contracts.clone()
        } else {
            spec.api_contracts
                .iter()
                .filter(|c| {
                    c.owning_package()
                        .map(|p| packages.contains(&p))
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        };

        Specification {
            version: spec.version.clone(),
            project: spec.project.clone(),
            requirements: spec.requirements.clone(),
            architecture: Architecture {
                packages: spec
                    .architecture
                    .packages
                    .iter()
                    .filter(|p| packages.contains(&p.name))
                    .cloned()
                    .collect(),
                external_dependencies: spec.architecture.external_dependencies.clone(),
                patterns: spec.architecture.patterns.clone(),
            },
            data_model: DataModel {
                entities: spec
                    .data_model
                    .entities
                    .iter()
                    .filter(|e| entities.contains(&e.name))
                    .cloned()
                    .collect(),
                relationships: spec
                    .data_model
                    .relationships
                    .iter()
                    .filter(|r| entities.contains(&r.from) && entities.contains(&r.to))
                    .cloned()
                    .collect(),
            },
            api_contracts,
            testing: spec.testing.clone(),
            build: spec.build.clone(),
        }
    }
}

fn is_layer_file(stem: &str) -> bool {
    LAYER_KEYWORDS.iter().any(|k| stem.contains(k))
}

fn is_api_like(stem: &str, path: &Path) -> bool {
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    API_KEYWORDS
        .iter()
        .any(|k| stem.contains(k) || dir.split(['/', '\\']).any(|c| c.contains(k)))
}
