//! Map a change set onto the output files that must regenerate.

use crate::change::ChangeSet;
use crate::state::checksum::to_snake_case;
use crate::state::IncrementalState;
use std::collections::BTreeSet;
use std::path::Path;

/// Files whose recorded entity dependencies intersect the changed entities.
///
/// Either whole-section flag makes every known file affected. Deleted
/// entities also match by file name, since their dependency entries no
/// longer identify the files generated for them.
pub fn affected_files(state: &IncrementalState, changes: &ChangeSet) -> BTreeSet<String> {
    if changes.requires_full_regeneration() {
        return state.known_files();
    }

    let changed = changes.entities().touched();
    let mut affected: BTreeSet<String> = state
        .dependency_graph
        .iter()
        .filter(|(_, entities)| entities.iter().any(|e| changed.contains(e.as_str())))
        .map(|(path, _)| path.clone())
        .collect();

    for deleted in &changes.entities().deleted {
        let needle = to_snake_case(deleted);
        for path in state.known_files() {
            let file_name = Path::new(&path)
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if file_name.contains(&needle) {
                affected.insert(path);
            }
        }
    }
    affected
}
