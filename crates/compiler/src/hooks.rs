//! Detection hook aggregation across a package's rules.

use indexmap::{IndexMap, IndexSet};

use rulecard_core::ReducedRule;

/// Merge every rule's `detect` block into tool -> unique rule ids.
///
/// Tools and ids keep first-seen order; ids are compared as exact strings.
pub fn aggregate_hooks(rules: &[ReducedRule]) -> IndexMap<String, Vec<String>> {
    let mut merged: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for rule in rules {
        for (tool, ids) in &rule.detect {
            let entry = merged.entry(tool.clone()).or_default();
            for id in ids {
                entry.insert(id.clone());
            }
        }
    }
    merged
        .into_iter()
        .map(|(tool, ids)| (tool, ids.into_iter().collect()))
        .collect()
}
