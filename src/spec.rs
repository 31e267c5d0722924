//! Specification snapshots: the versioned input every run diffs and filters.

pub mod model;
pub mod validation;

pub use model::{
    ApiContract, Architecture, BuildConfig, DataModel, Entity, ExternalDependency,
    FunctionalRequirement, NonFunctionalRequirement, Package, ProjectInfo, Relationship,
    Requirements, Specification, TestingStrategy,
};
pub use validation::validate_specification;
