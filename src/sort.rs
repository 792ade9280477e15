//! Row ordering for the values table.

use crate::model::ValueRow;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

pub const ALPHANUM_SORT_ORDER: &str = "alphanum";
pub const FILE_SORT_ORDER: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    AlphaNum,
    File,
}

impl SortOrder {
    /// Unknown names fall back to alphanumeric ordering with a warning.
    pub fn parse_or_default(name: &str) -> Self {
        match name {
            ALPHANUM_SORT_ORDER => SortOrder::AlphaNum,
            FILE_SORT_ORDER => SortOrder::File,
            other => {
                warn!(
                    "invalid sort order {:?}, defaulting to {}",
                    other, ALPHANUM_SORT_ORDER
                );
                SortOrder::AlphaNum
            }
        }
    }

    fn compare(self, a: &ValueRow, b: &ValueRow) -> Ordering {
        match self {
            SortOrder::AlphaNum => a.key.cmp(&b.key),
            SortOrder::File => a
                .line_number
                .cmp(&b.line_number)
                .then(a.column.cmp(&b.column)),
        }
    }
}

/// Group rank: globals, then the chart's own rows, then each dependency in
/// the order it first appears.
fn group_ranks(rows: &[ValueRow]) -> HashMap<String, usize> {
    let mut ranks = HashMap::new();
    for row in rows {
        if !row.is_global && !row.dependency.is_empty() && !ranks.contains_key(&row.dependency) {
            ranks.insert(row.dependency.clone(), ranks.len() + 2);
        }
    }
    ranks
}

fn rank(row: &ValueRow, ranks: &HashMap<String, usize>) -> usize {
    if row.is_global {
        0
    } else if row.dependency.is_empty() {
        1
    } else {
        ranks.get(row.dependency.as_str()).copied().unwrap_or(usize::MAX)
    }
}

pub fn sort_value_rows(rows: &mut [ValueRow], order: SortOrder) {
    let ranks = group_ranks(rows);
    rows.sort_by(|a, b| {
        rank(a, &ranks)
            .cmp(&rank(b, &ranks))
            .then_with(|| order.compare(a, b))
    });
}
