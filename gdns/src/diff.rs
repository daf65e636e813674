//! Pure set-difference helpers for the target-project list. Order is not
//! semantically significant but is preserved on write, so both helpers
//! keep the order of their primary input.

use indexmap::IndexSet;

/// Input entries not already in `existing`, in input order. Duplicate
/// input entries collapse to a single addition.
pub fn additions(existing: &[String], input: &[String]) -> Vec<String> {
    let existing: IndexSet<&str> = existing.iter().map(String::as_str).collect();
    let mut added: IndexSet<&str> = IndexSet::new();
    for project_id in input {
        if !existing.contains(project_id.as_str()) {
            added.insert(project_id.as_str());
        }
    }
    added.into_iter().map(str::to_string).collect()
}

/// `existing` with every entry of `to_remove` dropped, in existing order.
pub fn remaining(existing: &[String], to_remove: &[String]) -> Vec<String> {
    let to_remove: IndexSet<&str> = to_remove.iter().map(String::as_str).collect();
    existing
        .iter()
        .filter(|p| !to_remove.contains(p.as_str()))
        .cloned()
        .collect()
}
