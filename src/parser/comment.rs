//! Comment annotation parser: line-by-line state machine over `# --` blocks.
//!
//! Two entry points share one block parser:
//!
//! - [`description_from_head_comment`]: the comment run attached to a node by
//!   the loader (`# -- text`, no declared key).
//! - [`parse_declared_descriptions`]: a flat scan of the whole values file for
//!   blocks that name the path they document (`# image.tag -- text`).

use crate::model::ChartValueDescription;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// -- Regex patterns -----------------------------------------------------------

static RE_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\s*(.*)\s+--\s*(.*)$").unwrap());

static RE_AUTO_DOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\s*-- (.*)$").unwrap());

static RE_RAW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*#\s+@raw").unwrap());

static RE_CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#(\s?)(.*)$").unwrap());

static RE_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*# @default -- (.*)$").unwrap());

static RE_VALUE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((.*?)\)\s*(.*)$").unwrap());

static RE_NOTATION_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\s+@notationType\s+--\s+(.*)$").unwrap());

static RE_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*# @section -- (.*)$").unwrap());

/// Lines starting with this open a documentation block.
const DOC_MARKER: &str = "# --";

// -- Block parser -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    SeekingStart,
    Normal,
    Raw,
}

/// Parse one comment block into its declared key (empty when the block does
/// not name one) and the annotation record.
pub fn parse_comment(lines: &[&str]) -> (String, ChartValueDescription) {
    // Adjacent blocks can arrive concatenated; only the last one counts.
    if let Some(last) = lines.iter().rposition(|l| l.starts_with(DOC_MARKER)) {
        if last > 0 {
            return parse_comment(&lines[last..]);
        }
    }

    let mut key = String::new();
    let mut desc = ChartValueDescription::default();
    let mut state = BlockState::SeekingStart;

    for line in lines {
        if state == BlockState::SeekingStart {
            if let Some(caps) = RE_DESCRIPTION.captures(line) {
                key = caps[1].to_string();
                desc.description = caps[2].to_string();
                split_value_type(&mut desc);
                state = BlockState::Normal;
            }
            continue;
        }

        if state == BlockState::Normal && RE_RAW.is_match(line) {
            state = BlockState::Raw;
            continue;
        }

        if let Some(caps) = RE_DEFAULT.captures(line) {
            desc.default = caps[1].to_string();
            continue;
        }

        if let Some(caps) = RE_NOTATION_TYPE.captures(line) {
            desc.notation_type = caps[1].to_string();
            continue;
        }

        if let Some(caps) = RE_SECTION.captures(line) {
            desc.section = caps[1].to_string();
            continue;
        }

        match RE_CONTINUATION.captures(line) {
            Some(caps) => {
                desc.description
                    .push(if state == BlockState::Raw { '\n' } else { ' ' });
                desc.description.push_str(&caps[2]);
            }
            // Not a comment at all: the block is over.
            None => break,
        }
    }

    (key, desc)
}

/// Move a leading `(type)` token out of the description.
fn split_value_type(desc: &mut ChartValueDescription) {
    if let Some((value_type, rest)) = leading_value_type(&desc.description) {
        let (value_type, rest) = (value_type.to_string(), rest.to_string());
        desc.value_type = value_type;
        desc.description = rest;
    }
}

/// Split `(type) text` into its type token and the remaining text.
pub fn leading_value_type(text: &str) -> Option<(&str, &str)> {
    let caps = RE_VALUE_TYPE.captures(text)?;
    let value_type = caps.get(1)?.as_str();
    if value_type.is_empty() {
        return None;
    }
    Some((value_type, caps.get(2)?.as_str()))
}

// -- Public API ---------------------------------------------------------------

/// Annotation carried by a node's head comment.
///
/// Only blocks whose first line is `# -- ...` count; blocks declaring a key
/// belong to [`parse_declared_descriptions`].
pub fn description_from_head_comment(head_comment: &str) -> ChartValueDescription {
    if head_comment.is_empty() {
        return ChartValueDescription::default();
    }

    let lines: Vec<&str> = head_comment.split('\n').collect();
    if !RE_AUTO_DOC.is_match(lines[0]) {
        return ChartValueDescription::default();
    }

    let (key, desc) = parse_comment(&lines);
    if !key.is_empty() {
        return ChartValueDescription::default();
    }
    desc
}

/// Scan raw values-file text for `# some.path -- text` blocks.
///
/// A block runs from its opening line through every following `@default` or
/// comment line; the first non-comment line closes it.
pub fn parse_declared_descriptions(source: &str) -> HashMap<String, ChartValueDescription> {
    let mut descriptions = HashMap::new();
    let mut block: Vec<&str> = Vec::new();

    for line in source.lines() {
        if block.is_empty() {
            if let Some(caps) = RE_DESCRIPTION.captures(line) {
                if !caps[1].is_empty() {
                    block.push(line);
                }
            }
            continue;
        }

        if RE_DEFAULT.is_match(line) || RE_CONTINUATION.is_match(line) {
            block.push(line);
            continue;
        }

        flush_block(&mut block, &mut descriptions);
    }
    flush_block(&mut block, &mut descriptions);

    descriptions
}

fn flush_block(block: &mut Vec<&str>, out: &mut HashMap<String, ChartValueDescription>) {
    if block.is_empty() {
        return;
    }
    let (key, desc) = parse_comment(block);
    if !key.is_empty() {
        out.insert(key, desc);
    }
    block.clear();
}
