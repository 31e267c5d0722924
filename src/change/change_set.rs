//! Change Set: the itemized difference between two snapshots.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Added / modified / deleted keys for one category, each sorted.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CategoryChanges {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Union of added, modified and deleted.
    pub fn touched(&self) -> BTreeSet<&str> {
        self.added
            .iter()
            .chain(&self.modified)
            .chain(&self.deleted)
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    pub(crate) fn sorted(mut self) -> Self {
        self.added.sort();
        self.modified.sort();
        self.deleted.sort();
        self
    }
}

/// Immutable once built. `has_changes` is derived at construction.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ChangeSet {
    requirements: CategoryChanges,
    non_functional: CategoryChanges,
    packages: CategoryChanges,
    entities: CategoryChanges,
    api_contracts: CategoryChanges,
    architecture_changed: bool,
    build_changed: bool,
    has_changes: bool,
}

impl ChangeSet {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        requirements: CategoryChanges,
        non_functional: CategoryChanges,
        packages: CategoryChanges,
        entities: CategoryChanges,
        api_contracts: CategoryChanges,
        architecture_changed: bool,
        build_changed: bool,
    ) -> Self {
        let has_changes = !requirements.is_empty()
            || !non_functional.is_empty()
            || !packages.is_empty()
            || !entities.is_empty()
            || !api_contracts.is_empty()
            || architecture_changed
            || build_changed;
        Self {
            requirements: requirements.sorted(),
            non_functional: non_functional.sorted(),
            packages: packages.sorted(),
            entities: entities.sorted(),
            api_contracts: api_contracts.sorted(),
            architecture_changed,
            build_changed,
            has_changes,
        }
    }

    /// Forces `has_changes` on; used for a first generation with no old snapshot.
    pub(crate) fn mark_first_generation(mut self) -> Self {
        self.has_changes = true;
        self
    }

    pub fn requirements(&self) -> &CategoryChanges {
        &self.requirements
    }

    pub fn non_functional(&self) -> &CategoryChanges {
        &self.non_functional
    }

    pub fn packages(&self) -> &CategoryChanges {
        &self.packages
    }

    pub fn entities(&self) -> &CategoryChanges {
        &self.entities
    }

    pub fn api_contracts(&self) -> &CategoryChanges {
        &self.api_contracts
    }

    pub fn architecture_changed(&self) -> bool {
        self.architecture_changed
    }

    pub fn build_changed(&self) -> bool {
        self.build_changed
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// Either whole-section flag set: every output file must regenerate.
    pub fn requires_full_regeneration(&self) -> bool {
        self.architecture_changed || self.build_changed
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_changes {
            return write!(f, "No changes");
        }
        let categories = [
            ("requirements", &self.requirements),
            ("non-functional requirements", &self.non_functional),
            ("packages", &self.packages),
            ("entities", &self.entities),
            ("api contracts", &self.api_contracts),
        ];
        let mut first = true;
        for (label, changes) in categories {
            if changes.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{}:", label)?;
            for (marker, keys) in [
                ("+", &changes.added),
                ("~", &changes.modified),
                ("-", &changes.deleted),
            ] {
                for key in keys {
                    write!(f, "\n  {} {}", marker, key)?;
                }
            }
        }
        for (flag, label) in [
            (self.architecture_changed, "architecture changed"),
            (self.build_changed, "build configuration changed"),
        ] {
            if flag {
                if !first {
                    writeln!(f)?;
                }
                first = false;
                write!(f, "{}", label)?;
            }
        }
        if first {
            write!(f, "First generation")?;
        }
        Ok(())
    }
}
