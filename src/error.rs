//! Errors raised while turning a values document into documented rows.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuesError {
    #[error("values file must resolve to a map, not {0}")]
    NotAMap(&'static str),

    #[error("failed to decode {kind} value {literal:?} for {key}")]
    Decode {
        key: String,
        kind: &'static str,
        literal: String,
    },

    #[error("failed to marshal default value for {key}: {reason}")]
    Marshal { key: String, reason: String },

    #[error("values without documentation: \n{}", .0.join("\n"))]
    Undocumented(Vec<String>),

    #[error("failed to parse yaml: {0}")]
    Yaml(String),

    #[error("alias refers to unknown anchor {0}")]
    UnknownAlias(usize),
}
