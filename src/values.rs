//! Configuration tree walker: node tree into documented rows.
//!
//! Rows come out in structural order; ordering for display is the sorter's
//! job. Each row takes its position from the key node that introduced it.

use crate::config::ValuesConfig;
use crate::error::ValuesError;
use crate::model::{ChartValueDescription, DependencyValues, ValueRow};
use crate::parser::comment::{description_from_head_comment, leading_value_type};
use crate::parser::merge;
use crate::parser::yaml::{Node, NodeKind, ScalarKind};
use crate::sort;
use std::collections::{BTreeMap, HashMap};

pub const BOOL_TYPE: &str = "bool";
pub const FLOAT_TYPE: &str = "float";
pub const INT_TYPE: &str = "int";
pub const LIST_TYPE: &str = "list";
pub const OBJECT_TYPE: &str = "object";
pub const STRING_TYPE: &str = "string";

const NIL_DEFAULT: &str = "`nil`";

// -- Key paths ----------------------------------------------------------------

pub fn format_next_list_key_prefix(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}

/// Join a mapping key onto `prefix`, quoting keys containing `.` or a space.
pub fn format_next_object_key_prefix(prefix: &str, key: &str) -> String {
    let escaped = if key.contains('.') || key.contains(' ') {
        format!("\"{}\"", key)
    } else {
        key.to_string()
    };

    if prefix.is_empty() {
        escaped
    } else {
        format!("{}.{}", prefix, escaped)
    }
}

// -- Type inference -----------------------------------------------------------

pub fn type_name(node: &Node) -> &'static str {
    match &node.resolve().kind {
        NodeKind::Scalar { kind, .. } => match kind {
            ScalarKind::Bool => BOOL_TYPE,
            ScalarKind::Int => INT_TYPE,
            ScalarKind::Float => FLOAT_TYPE,
            ScalarKind::Null | ScalarKind::Str | ScalarKind::Timestamp => STRING_TYPE,
        },
        NodeKind::Mapping(_) => OBJECT_TYPE,
        NodeKind::Sequence(_) => LIST_TYPE,
        NodeKind::Alias(_) => STRING_TYPE,
    }
}

fn is_empty_container(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Mapping(entries) => entries.is_empty(),
        NodeKind::Sequence(items) => items.is_empty(),
        _ => false,
    }
}

// -- Scalar decoding ----------------------------------------------------------

fn decode_error(key: &str, kind: &'static str, literal: &str) -> ValuesError {
    ValuesError::Decode {
        key: key.to_string(),
        kind,
        literal: literal.to_string(),
    }
}

fn decode_int(key: &str, literal: &str) -> Result<i64, ValuesError> {
    let (sign, digits) = match literal.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, literal.strip_prefix('+').unwrap_or(literal)),
    };
    let parsed = if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i64::from_str_radix(oct, 8)
    } else if let Some(bin) = digits.strip_prefix("0b") {
        i64::from_str_radix(bin, 2)
    } else {
        digits.parse::<i64>()
    };
    parsed
        .map(|v| sign * v)
        .map_err(|_| decode_error(key, INT_TYPE, literal))
}

fn decode_float(key: &str, literal: &str) -> Result<f64, ValuesError> {
    match literal {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Ok(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Ok(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Ok(f64::NAN),
        _ => literal
            .parse::<f64>()
            .map_err(|_| decode_error(key, FLOAT_TYPE, literal)),
    }
}

fn decode_bool(key: &str, literal: &str) -> Result<bool, ValuesError> {
    match literal {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        _ => Err(decode_error(key, BOOL_TYPE, literal)),
    }
}

// -- Default encoding ---------------------------------------------------------

fn json_number(key: &str, value: f64) -> Result<serde_json::Value, ValuesError> {
    // Whole floats below 1e21 print as plain decimals, like integers.
    if value.fract() == 0.0 && value.abs() < 1e21 {
        if value.abs() < 9.2e18 {
            return Ok(serde_json::Value::from(value as i64));
        }
        if value > 0.0 && value < 1.8e19 {
            return Ok(serde_json::Value::from(value as u64));
        }
    }
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .ok_or_else(|| ValuesError::Marshal {
            key: key.to_string(),
            reason: format!("unsupported value: {}", value),
        })
}

/// Convert a subtree into a JSON value. Object keys come out sorted.
pub fn to_json(key: &str, node: &Node) -> Result<serde_json::Value, ValuesError> {
    use serde_json::Value;

    let node = node.resolve();
    Ok(match &node.kind {
        NodeKind::Scalar { kind, value } => match kind {
            ScalarKind::Null => Value::Null,
            ScalarKind::Bool => Value::Bool(decode_bool(key, value)?),
            ScalarKind::Int => Value::from(decode_int(key, value)?),
            ScalarKind::Float => json_number(key, decode_float(key, value)?)?,
            ScalarKind::Str | ScalarKind::Timestamp => Value::String(value.clone()),
        },
        NodeKind::Mapping(entries) => {
            let mut object = BTreeMap::new();
            for (k, v) in entries {
                object.insert(k.literal().to_string(), to_json(key, v)?);
            }
            Value::Object(object.into_iter().collect())
        }
        NodeKind::Sequence(items) => Value::Array(
            items
                .iter()
                .map(|item| to_json(key, item))
                .collect::<Result<_, _>>()?,
        ),
        NodeKind::Alias(_) => Value::Null,
    })
}

/// Compact JSON without HTML escaping.
pub fn json_encode(key: &str, node: &Node) -> Result<String, ValuesError> {
    let value = to_json(key, node)?;
    serde_json::to_string(&value).map_err(|e| ValuesError::Marshal {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn to_yaml(key: &str, node: &Node) -> Result<serde_yaml::Value, ValuesError> {
    use serde_yaml::Value;

    let node = node.resolve();
    Ok(match &node.kind {
        NodeKind::Scalar { kind, value } => match kind {
            ScalarKind::Null => Value::Null,
            ScalarKind::Bool => Value::Bool(decode_bool(key, value)?),
            ScalarKind::Int => Value::from(decode_int(key, value)?),
            ScalarKind::Float => Value::from(decode_float(key, value)?),
            ScalarKind::Str | ScalarKind::Timestamp => Value::String(value.clone()),
        },
        NodeKind::Mapping(entries) => {
            let mut mapping = serde_yaml::Mapping::new();
            for (k, v) in entries {
                mapping.insert(to_yaml(key, k)?, to_yaml(key, v)?);
            }
            Value::Mapping(mapping)
        }
        NodeKind::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| to_yaml(key, item))
                .collect::<Result<_, _>>()?,
        ),
        NodeKind::Alias(_) => Value::Null,
    })
}

/// Block-style YAML, declaration order kept.
pub fn yaml_encode(key: &str, node: &Node) -> Result<String, ValuesError> {
    let value = to_yaml(key, node)?;
    let text = serde_yaml::to_string(&value).map_err(|e| ValuesError::Marshal {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(text.trim_end_matches('\n').to_string())
}

/// Literal text handed to custom notations: scalars verbatim, containers
/// re-encoded as YAML.
fn notation_text(key: &str, node: &Node) -> Result<String, ValuesError> {
    let node = node.resolve();
    match node.kind {
        NodeKind::Scalar { .. } => Ok(node.literal().to_string()),
        _ => yaml_encode(key, node),
    }
}

// -- Row construction ---------------------------------------------------------

fn first_non_empty(a: &str, b: &str) -> String {
    let chosen = if a.is_empty() { b } else { a };
    chosen.to_string()
}

fn null_value_row(
    key: &str,
    description: &ChartValueDescription,
    auto: &ChartValueDescription,
) -> ValueRow {
    let mut text = first_non_empty(&description.description, &auto.description);

    let value_type = if !auto.value_type.is_empty() {
        auto.value_type.clone()
    } else if !description.value_type.is_empty() {
        description.value_type.clone()
    } else if let Some((value_type, rest)) = leading_value_type(&text) {
        let value_type = value_type.to_string();
        text = rest.to_string();
        value_type
    } else {
        STRING_TYPE.to_string()
    };

    let default = if description.default.is_empty() && auto.default.is_empty() {
        NIL_DEFAULT.to_string()
    } else {
        description.default.clone()
    };

    ValueRow {
        key: key.to_string(),
        value_type,
        notation_type: first_non_empty(&auto.notation_type, &description.notation_type),
        auto_default: auto.default.clone(),
        default,
        auto_description: auto.description.clone(),
        description: text,
        ..Default::default()
    }
}

fn create_value_row(
    key: &str,
    key_node: Option<&Node>,
    value: &Node,
    description: &ChartValueDescription,
    auto: &ChartValueDescription,
) -> Result<ValueRow, ValuesError> {
    let is_null = matches!(
        value.resolve().kind,
        NodeKind::Scalar {
            kind: ScalarKind::Null,
            ..
        }
    );

    let mut row = if is_null {
        null_value_row(key, description, auto)
    } else {
        let notation_type = first_non_empty(&auto.notation_type, &description.notation_type);
        let mut default = description.default.clone();
        if default.is_empty() && auto.default.is_empty() {
            default = if notation_type.is_empty() {
                format!("`{}`", json_encode(key, value)?)
            } else {
                notation_text(key, value)?
            };
        }

        let mut value_type = type_name(value).to_string();
        if !auto.value_type.is_empty() {
            value_type = auto.value_type.clone();
        }
        if !description.value_type.is_empty() {
            value_type = description.value_type.clone();
        }

        ValueRow {
            key: key.to_string(),
            value_type,
            notation_type,
            auto_default: auto.default.clone(),
            default,
            auto_description: auto.description.clone(),
            description: description.description.clone(),
            ..Default::default()
        }
    };

    row.section = first_non_empty(&auto.section, &description.section);
    if let Some(k) = key_node {
        row.line_number = k.line;
        row.column = k.column;
    }
    Ok(row)
}

// -- Walker -------------------------------------------------------------------

/// Recursively document `value`, found at path `prefix` under `key`.
///
/// `document_leaf_nodes` is cleared beneath any documented container, so
/// only children with their own description produce rows there.
pub fn create_value_rows_from_field(
    prefix: &str,
    key: Option<&Node>,
    value: &Node,
    descriptions: &HashMap<String, ChartValueDescription>,
    document_leaf_nodes: bool,
) -> Result<Vec<ValueRow>, ValuesError> {
    let auto = key
        .map(|k| description_from_head_comment(&k.head_comment))
        .unwrap_or_default();
    let external = descriptions.get(prefix);
    let described = external.is_some() || !auto.description.is_empty();
    let description = external.cloned().unwrap_or_default();

    match &value.kind {
        NodeKind::Alias(target) => {
            create_value_rows_from_field(prefix, key, target, descriptions, document_leaf_nodes)
        }
        NodeKind::Scalar { .. } => {
            if !(document_leaf_nodes || described) {
                return Ok(Vec::new());
            }
            Ok(vec![create_value_row(prefix, key, value, &description, &auto)?])
        }
        NodeKind::Mapping(_) | NodeKind::Sequence(_) if is_empty_container(value) => {
            if prefix.is_empty() && matches!(value.kind, NodeKind::Mapping(_)) {
                return Ok(Vec::new());
            }
            if !(document_leaf_nodes || described) {
                return Ok(Vec::new());
            }
            Ok(vec![create_value_row(prefix, key, value, &description, &auto)?])
        }
        NodeKind::Mapping(entries) => {
            let mut rows = Vec::new();
            let mut leaf = document_leaf_nodes;
            if described {
                rows.push(create_value_row(prefix, key, value, &description, &auto)?);
                leaf = false;
            }
            for (k, v) in entries {
                let next = format_next_object_key_prefix(prefix, k.literal());
                rows.extend(create_value_rows_from_field(
                    &next,
                    Some(k),
                    v,
                    descriptions,
                    leaf,
                )?);
            }
            Ok(rows)
        }
        NodeKind::Sequence(items) => {
            let mut rows = Vec::new();
            let mut leaf = document_leaf_nodes;
            if described {
                rows.push(create_value_row(prefix, key, value, &description, &auto)?);
                leaf = false;
            }
            for (i, item) in items.iter().enumerate() {
                let next = format_next_list_key_prefix(prefix, i);
                rows.extend(create_value_rows_from_field(
                    &next,
                    Some(item),
                    item,
                    descriptions,
                    leaf,
                )?);
            }
            Ok(rows)
        }
    }
}

/// Rows for a whole values document. `None` (an empty file) yields no rows.
pub fn create_value_rows(
    root: Option<&Node>,
    descriptions: &HashMap<String, ChartValueDescription>,
) -> Result<Vec<ValueRow>, ValuesError> {
    let Some(root) = root else {
        return Ok(Vec::new());
    };
    let resolved = root.resolve();
    if !matches!(resolved.kind, NodeKind::Mapping(_)) {
        return Err(ValuesError::NotAMap(resolved.kind_name()));
    }
    create_value_rows_from_field("", None, resolved, descriptions, true)
}

/// Merge, filter and sort the rows that end up in a chart's table.
pub fn finalize_rows(
    root_rows: Vec<ValueRow>,
    dependencies: &[DependencyValues],
    config: &ValuesConfig,
) -> Vec<ValueRow> {
    let mut rows = if config.document_dependency_values {
        merge::merge(root_rows, dependencies)
    } else {
        root_rows
    };

    if config.ignore_non_descriptions {
        rows.retain(ValueRow::has_description);
    }

    sort::sort_value_rows(&mut rows, config.sort_order);
    rows
}
