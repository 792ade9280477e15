//! README generation: template data, markdown fragments, tera rendering.

pub mod markdown;
pub mod template;

use crate::chart::ChartDocumentationInfo;
use crate::config::{RenderConfig, ValuesConfig};
use crate::model::{ChartMeta, DependencyValues, ValueRow};
use crate::values;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use tracing::info;

/// Everything a README template can see.
#[derive(Debug, Serialize)]
pub struct ChartTemplateData<'a> {
    pub chart: &'a ChartMeta,
    pub values: Vec<ValueRow>,
    pub dependency_values: Vec<DependencyValues>,
    pub helm_docs_version: &'a str,
    pub skip_version_footer: bool,
}

impl<'a> ChartTemplateData<'a> {
    /// Walk the chart's values and produce the final, ordered rows.
    pub fn build(
        info: &'a ChartDocumentationInfo,
        dependency_values: Vec<DependencyValues>,
        values_config: &ValuesConfig,
        render_config: &RenderConfig,
    ) -> Result<Self> {
        let root_rows =
            values::create_value_rows(info.values.root.as_ref(), &info.values.descriptions)
                .context("failed to document values")?;
        let rows = values::finalize_rows(root_rows, &dependency_values, values_config);

        Ok(ChartTemplateData {
            chart: &info.meta,
            values: rows,
            dependency_values,
            helm_docs_version: env!("CARGO_PKG_VERSION"),
            skip_version_footer: render_config.skip_version_footer,
        })
    }
}

/// Render one chart's README and write it (stdout on dry runs).
pub fn print_documentation(
    info: &ChartDocumentationInfo,
    dependency_values: Vec<DependencyValues>,
    values_config: &ValuesConfig,
    render_config: &RenderConfig,
) -> Result<()> {
    info!(
        "generating README documentation for chart {}",
        info.chart_directory.display()
    );

    let template = template::load_template_source(&info.chart_directory, render_config)?;
    let data = ChartTemplateData::build(info, dependency_values, values_config, render_config)?;
    let output = template::render(&template, &data, &render_config.badge_style)?;

    if render_config.dry_run {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(output.as_bytes())
            .context("failed to write to stdout")?;
        return Ok(());
    }

    let path = info.chart_directory.join(&render_config.output_file);
    fs::write(&path, output).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_values;
    use crate::sort::SortOrder;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn info(dir: PathBuf, values: &str) -> ChartDocumentationInfo {
        ChartDocumentationInfo {
            chart_directory: dir,
            meta: ChartMeta {
                name: "demo".to_string(),
                version: "0.1.0".to_string(),
                ..Default::default()
            },
            values: parse_values(values).unwrap(),
        }
    }

    #[test]
    fn template_data_rows_are_sorted() {
        let chart = info(PathBuf::from("."), "b: 1\n# -- first\na: 2\n");
        let data = ChartTemplateData::build(
            &chart,
            Vec::new(),
            &ValuesConfig::default(),
            &RenderConfig::default(),
        )
        .unwrap();
        let keys: Vec<&str> = data.values.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn file_order_and_description_filter() {
        let chart = info(PathBuf::from("."), "b: 1\n# -- first\na: 2\nc: 3\n");
        let config = ValuesConfig {
            sort_order: SortOrder::File,
            ignore_non_descriptions: true,
            document_dependency_values: false,
        };
        let data =
            ChartTemplateData::build(&chart, Vec::new(), &config, &RenderConfig::default())
                .unwrap();
        let keys: Vec<&str> = data.values.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn non_map_values_fail() {
        let chart = info(PathBuf::from("."), "- a\n");
        let err = ChartTemplateData::build(
            &chart,
            Vec::new(),
            &ValuesConfig::default(),
            &RenderConfig::default(),
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("values file must resolve to a map"));
    }

    #[test]
    fn writes_output_file_into_chart_directory() {
        let tmp = TempDir::new().unwrap();
        let chart = info(tmp.path().to_path_buf(), "# -- replicas\nreplicaCount: 1\n");
        print_documentation(
            &chart,
            Vec::new(),
            &ValuesConfig::default(),
            &RenderConfig::default(),
        )
        .unwrap();

        let readme = fs::read_to_string(tmp.path().join("README.md")).unwrap();
        assert!(readme.starts_with("# demo\n"));
        assert!(readme.contains("| replicaCount | int | `1` | replicas |"));
    }
}
