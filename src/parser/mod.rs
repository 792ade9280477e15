//! Parser module: values file text into a node tree plus its annotations.

pub mod comment;
pub mod merge;
pub mod yaml;

use crate::error::ValuesError;
use crate::model::ChartValueDescription;
use std::collections::HashMap;
use yaml::Node;

/// A loaded values file.
#[derive(Debug, Clone, Default)]
pub struct ValuesDocument {
    /// `None` when the file has no content.
    pub root: Option<Node>,
    /// Descriptions declared by `# some.key -- text` blocks, by path.
    pub descriptions: HashMap<String, ChartValueDescription>,
}

/// Load the tree and scan the legacy key-declaring comments in one pass over
/// the same text.
pub fn parse_values(source: &str) -> Result<ValuesDocument, ValuesError> {
    let root = yaml::load(source)?;
    let descriptions = comment::parse_declared_descriptions(source);
    Ok(ValuesDocument { root, descriptions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_values_collects_tree_and_declarations() {
        let doc = parse_values("# image.tag -- tag to pull\nimage:\n  tag: v1\n").unwrap();
        assert!(doc.root.is_some());
        assert_eq!(doc.descriptions["image.tag"].description, "tag to pull");
    }

    #[test]
    fn parse_values_propagates_loader_errors() {
        assert!(parse_values("a: [").is_err());
    }
}
