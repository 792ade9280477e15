//! Immutable settings derived once from the command line.

use crate::sort::SortOrder;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::PathBuf;

/// Settings for turning a values tree into table rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValuesConfig {
    pub sort_order: SortOrder,
    pub ignore_non_descriptions: bool,
    pub document_dependency_values: bool,
}

/// Undocumented-value check run while loading each chart.
#[derive(Debug, Clone, Default)]
pub struct StrictModeConfig {
    pub enabled: bool,
    pub allowed_missing_paths: Vec<String>,
    pub allowed_missing_regexes: Vec<Regex>,
}

impl StrictModeConfig {
    pub fn new(enabled: bool, paths: &[String], patterns: &[String]) -> Result<Self> {
        let allowed_missing_regexes = patterns
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| {
                Regex::new(p)
                    .with_context(|| format!("invalid documentation-strict-ignore-absent-regex: {}", p))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StrictModeConfig {
            enabled,
            allowed_missing_paths: paths.iter().filter(|p| !p.is_empty()).cloned().collect(),
            allowed_missing_regexes,
        })
    }

    pub fn is_allowed_missing(&self, path: &str) -> bool {
        self.allowed_missing_paths.iter().any(|p| p == path)
            || self.allowed_missing_regexes.iter().any(|re| re.is_match(path))
    }
}

/// Output settings for the generated README.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub chart_search_root: PathBuf,
    pub template_files: Vec<String>,
    pub output_file: String,
    pub badge_style: String,
    pub skip_version_footer: bool,
    pub dry_run: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            chart_search_root: PathBuf::from("."),
            template_files: vec!["README.md.tera".to_string()],
            output_file: "README.md".to_string(),
            badge_style: "flat-square".to_string(),
            skip_version_footer: false,
            dry_run: false,
        }
    }
}
