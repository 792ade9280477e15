//! Strict mode: every mapping key in a values file must carry documentation.

use crate::config::StrictModeConfig;
use crate::error::ValuesError;
use crate::model::ChartValueDescription;
use crate::parser::comment::description_from_head_comment;
use crate::parser::yaml::{Node, NodeKind};
use crate::values::{format_next_list_key_prefix, format_next_object_key_prefix};
use std::collections::HashMap;

/// Paths of mapping keys with neither a declared nor a head-comment
/// description, in document order.
pub fn collect_values_without_doc(
    node: &Node,
    descriptions: &HashMap<String, ChartValueDescription>,
    prefix: &str,
) -> Vec<String> {
    let mut missing = Vec::new();
    match &node.resolve().kind {
        NodeKind::Mapping(entries) => {
            for (key, value) in entries {
                let path = format_next_object_key_prefix(prefix, key.literal());
                let documented = descriptions.contains_key(&path)
                    || !description_from_head_comment(&key.head_comment)
                        .description
                        .is_empty();
                if !documented {
                    missing.push(path.clone());
                }
                missing.extend(collect_values_without_doc(value, descriptions, &path));
            }
        }
        NodeKind::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                let path = format_next_list_key_prefix(prefix, i);
                missing.extend(collect_values_without_doc(item, descriptions, &path));
            }
        }
        _ => {}
    }
    missing
}

/// Fail with every undocumented path not covered by the allow-lists.
pub fn check_documentation(
    root: Option<&Node>,
    descriptions: &HashMap<String, ChartValueDescription>,
    config: &StrictModeConfig,
) -> Result<(), ValuesError> {
    let Some(root) = root else {
        return Ok(());
    };

    let missing: Vec<String> = collect_values_without_doc(root, descriptions, "")
        .into_iter()
        .filter(|path| !config.is_allowed_missing(path))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValuesError::Undocumented(missing))
    }
}
