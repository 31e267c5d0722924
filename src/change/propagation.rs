//! Reverse-dependency closure over the package graph.

use crate::change::change_set::ChangeSet;
use crate::spec::model::Specification;
use std::collections::{BTreeSet, VecDeque};

/// Packages touched directly by `changes`, plus every package that depends on
/// an affected package, transitively. Terminates over cyclic dependency lists.
pub fn affected_packages(spec: &Specification, changes: &ChangeSet) -> BTreeSet<String> {
    let seeds = changes
        .packages()
        .touched()
        .into_iter()
        .map(str::to_string);
    propagate(spec, seeds)
}

pub fn propagate<I>(spec: &Specification, seeds: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = String>,
{
    let mut affected: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    for seed in seeds {
        if affected.insert(seed.clone()) {
            queue.push_back(seed);
        }
    }

    while let Some(current) = queue.pop_front() {
        for package in &spec.architecture.packages {
            if package.dependencies.iter().any(|d| *d == current)
                && affected.insert(package.name.clone())
            {
                queue.push_back(package.name.clone());
            }
        }
    }
    affected
}
