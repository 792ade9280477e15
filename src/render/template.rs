//! Tera-based README rendering.

use crate::config::RenderConfig;
use crate::render::{markdown, ChartTemplateData};
use anyhow::{Context as _, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tracing::debug;

const TEMPLATE_NAME: &str = "README.md.tera";

pub const DEFAULT_TEMPLATE: &str = r#"{{ chart_header }}
{{ chart_deprecation_warning }}

{{ chart_badges_section }}

{{ chart_description }}

{{ chart_homepage_line }}

{{ chart_maintainers_section }}

{{ chart_sources_section }}

{{ chart_requirements_section }}

{{ chart_values_section }}
{% if not skip_version_footer %}
{{ version_footer }}
{% endif %}
"#;

/// Where a configured template file lives: absolute paths as given, bare
/// file names inside the chart, anything else under the search root.
pub fn resolve_template_path(template: &str, chart_dir: &Path, search_root: &Path) -> PathBuf {
    let path = Path::new(template);
    if path.is_absolute() {
        path.to_path_buf()
    } else if path.components().count() == 1 {
        chart_dir.join(path)
    } else {
        search_root.join(path)
    }
}

/// Concatenated contents of every template file that exists, or the
/// built-in template when none does.
pub fn load_template_source(chart_dir: &Path, config: &RenderConfig) -> Result<String> {
    let mut source = String::new();
    let mut found = false;

    for template in &config.template_files {
        let path = resolve_template_path(template, chart_dir, &config.chart_search_root);
        if !path.is_file() {
            debug!(
                "template file {} not found for chart {}",
                template,
                chart_dir.display()
            );
            continue;
        }
        source.push_str(
            &fs::read_to_string(&path)
                .with_context(|| format!("failed to read template {}", path.display()))?,
        );
        found = true;
    }

    if !found {
        source.push_str(DEFAULT_TEMPLATE);
    }
    Ok(source)
}

fn build_context(data: &ChartTemplateData, badge_style: &str) -> Result<Context> {
    let mut context = Context::from_serialize(data).context("failed to build template context")?;

    let meta = data.chart;
    context.insert("chart_header", &markdown::header(meta));
    context.insert("chart_deprecation_warning", &markdown::deprecation_warning(meta));
    context.insert("chart_badges_section", &markdown::badges_section(meta, badge_style));
    context.insert("chart_description", &markdown::description(meta));
    context.insert("chart_homepage_line", &markdown::homepage_line(meta));
    context.insert("chart_maintainers_section", &markdown::maintainers_section(meta));
    context.insert("chart_sources_section", &markdown::sources_section(meta));
    context.insert("chart_requirements_section", &markdown::requirements_section(meta));
    context.insert("chart_values_table", &markdown::values_table(&data.values));
    context.insert("chart_values_section", &markdown::values_section(&data.values));
    context.insert("version_footer", &markdown::version_footer(data.helm_docs_version));
    Ok(context)
}

/// Render `template` against the chart data and tidy the markdown.
pub fn render(template: &str, data: &ChartTemplateData, badge_style: &str) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, template)
        .context("failed to parse README template")?;

    let context = build_context(data, badge_style)?;
    let output = tera
        .render(TEMPLATE_NAME, &context)
        .context("failed to render README template")?;
    Ok(markdown::apply_markdown_format(&output))
}
