//! Dependency merge: splice sub-chart rows into the parent's row set.
//!
//! Global values are shared verbatim between a chart and its sub-charts, so
//! they are deduplicated by key instead of being namespaced. Everything else
//! is prefixed with the dependency's alias (or name).

use crate::model::{DependencyValues, ValueRow};
use std::collections::HashSet;

/// True for `global` itself and anything beneath it.
pub fn is_global_key(key: &str) -> bool {
    key == "global" || key.starts_with("global.")
}

/// Merge dependency row sets into the root rows, in declaration order.
///
/// The first row seen for a global key wins; root rows are seen first.
pub fn merge(root: Vec<ValueRow>, dependencies: &[DependencyValues]) -> Vec<ValueRow> {
    let mut seen_globals: HashSet<String> = HashSet::new();
    let mut rows = Vec::with_capacity(
        root.len() + dependencies.iter().map(|d| d.rows.len()).sum::<usize>(),
    );

    for mut row in root {
        if is_global_key(&row.key) {
            row.is_global = true;
            seen_globals.insert(row.key.clone());
        }
        rows.push(row);
    }

    for dep in dependencies {
        for row in &dep.rows {
            let mut row = row.clone();
            if is_global_key(&row.key) {
                if !seen_globals.insert(row.key.clone()) {
                    continue;
                }
                row.is_global = true;
            } else {
                row.key = format!("{}.{}", dep.prefix, row.key);
                row.dependency = dep.prefix.clone();
            }
            rows.push(row);
        }
    }

    rows
}
