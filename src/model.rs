//! Data model for documented values, independent of output format.

use serde::{Deserialize, Serialize};

/// Parsed result of a field's attached comment block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartValueDescription {
    pub description: String,
    /// `# @default -- ...`
    pub default: String,
    /// `(type)` token after `--`
    pub value_type: String,
    /// `# @notationType -- ...`
    pub notation_type: String,
    /// `# @section -- ...`
    pub section: String,
}

/// One documented field path.
///
/// `auto_*` fields come from the values file's own comments; `default` and
/// `description` come from the key-declaring comment table and win when
/// rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValueRow {
    pub key: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub notation_type: String,
    pub auto_default: String,
    pub default: String,
    pub auto_description: String,
    pub description: String,
    pub section: String,
    pub column: usize,
    pub line_number: usize,
    pub dependency: String,
    pub is_global: bool,
}

impl ValueRow {
    /// Default shown to readers: caller override first, then the comment's.
    pub fn rendered_default(&self) -> &str {
        if self.default.is_empty() {
            &self.auto_default
        } else {
            &self.default
        }
    }

    pub fn rendered_description(&self) -> &str {
        if self.description.is_empty() {
            &self.auto_description
        } else {
            &self.description
        }
    }

    pub fn has_description(&self) -> bool {
        !self.description.is_empty() || !self.auto_description.is_empty()
    }
}

/// Rows produced from one sub-chart, namespaced under `prefix`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DependencyValues {
    pub prefix: String,
    pub rows: Vec<ValueRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartMaintainer {
    pub name: String,
    pub email: String,
    pub url: String,
}

/// A `dependencies:` entry from Chart.yaml or requirements.yaml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartRequirementsItem {
    pub name: String,
    pub version: String,
    pub repository: String,
    pub alias: String,
}

impl ChartRequirementsItem {
    /// Anything but an empty repository or a `file://` URL lives elsewhere.
    pub fn is_remote(&self) -> bool {
        !self.repository.is_empty() && !self.repository.starts_with("file://")
    }

    pub fn prefix_name(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartMeta {
    pub api_version: String,
    pub app_version: String,
    pub kube_version: String,
    pub name: String,
    pub deprecated: bool,
    pub description: String,
    pub version: String,
    pub home: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub icon: String,
    pub sources: Vec<String>,
    pub engine: String,
    pub maintainers: Vec<ChartMaintainer>,
    pub dependencies: Vec<ChartRequirementsItem>,
}
