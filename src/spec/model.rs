//! Specification data model
//!
//! Plain serde types. Collections keep declaration order (`Vec`) where the
//! order carries meaning for context resolution; keyed maps use `BTreeMap` so
//! the serialized form is canonical and checksums are stable.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Specification {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub project: ProjectInfo,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub data_model: DataModel,
    #[serde(default)]
    pub api_contracts: Vec<ApiContract>,
    #[serde(default)]
    pub testing: TestingStrategy,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirements {
    #[serde(default)]
    pub functional: Vec<FunctionalRequirement>,
    #[serde(default)]
    pub non_functional: Vec<NonFunctionalRequirement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionalRequirement {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NonFunctionalRequirement {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub threshold: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Architecture {
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub external_dependencies: Vec<ExternalDependency>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalDependency {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataModel {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// A named record type owned by one package
///
/// Attribute values are type descriptors such as `string`, `*Address`,
/// `[]models.Order` or `map[string]Tag`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiContract {
    pub method: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default)]
    pub errors: Vec<Value>,
}

impl ApiContract {
    /// Composite identity: upper-cased method plus endpoint.
    pub fn key(&self) -> String {
        format!("{} {}", self.method.to_uppercase(), self.endpoint)
    }

    /// Owning package: the explicit `package` field, else the first endpoint
    /// segment after any `api` / `v<N>` prefix segments.
    pub fn owning_package(&self) -> Option<String> {
        if let Some(package) = &self.package {
            return Some(package.clone());
        }
        self.endpoint
            .split('/')
            .filter(|segment| !segment.is_empty())
            .find(|segment| !is_route_prefix(segment))
            .filter(|segment| !segment.starts_with(':') && !segment.starts_with('{'))
            .map(str::to_string)
    }
}

fn is_route_prefix(segment: &str) -> bool {
    if segment.eq_ignore_ascii_case("api") {
        return true;
    }
    let mut chars = segment.chars();
    matches!(chars.next(), Some('v' | 'V'))
        && chars.clone().next().is_some()
        && chars.all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestingStrategy {
    #[serde(default)]
    pub approach: String,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_target: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildConfig {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub language_version: String,
    #[serde(default)]
    pub tooling: Vec<String>,
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}

impl Specification {
    pub fn from_json_str(input: &str) -> Result<Self, ApiError> {
        serde_json::from_str(input)
            .map_err(|e| ApiError::Specification(format!("Failed to parse specification: {}", e)))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Specification(format!("Failed to read specification {:?}: {}", path, e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.data_model.entities.iter().find(|e| e.name == name)
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.architecture.packages.iter().find(|p| p.name == name)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.data_model.entities.iter().map(|e| e.name.as_str())
    }
}
