//! Markdown fragments exposed to README templates.
//!
//! Every fragment is a plain string so templates only need `{{ name }}`.
//! Empty metadata yields an empty fragment; the final pass collapses the
//! blank lines left behind.

use crate::model::{ChartMeta, ValueRow};
use regex::Regex;
use std::sync::LazyLock;

static RE_TRAILING_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \n").unwrap());

static RE_BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

const VALUES_TABLE_HEADER: &str =
    "| Key | Type | Default | Description |\n|-----|------|---------|-------------|";

pub fn header(meta: &ChartMeta) -> String {
    format!("# {}\n", meta.name)
}

pub fn deprecation_warning(meta: &ChartMeta) -> String {
    if meta.deprecated {
        "> **:exclamation: This Helm Chart is deprecated!**".to_string()
    } else {
        String::new()
    }
}

fn badge(label: &str, value: &str, style: &str) -> String {
    format!(
        "![{label}: {value}](https://img.shields.io/badge/{label}-{escaped}-informational?style={style}) ",
        label = label,
        value = value,
        escaped = value.replace('-', "--"),
        style = style,
    )
}

pub fn badges_section(meta: &ChartMeta, style: &str) -> String {
    let mut out = badge("Version", &meta.version, style);
    if !meta.chart_type.is_empty() {
        out.push_str(&badge("Type", &meta.chart_type, style));
    }
    if !meta.app_version.is_empty() {
        out.push_str(&badge("AppVersion", &meta.app_version, style));
    }
    out
}

pub fn description(meta: &ChartMeta) -> String {
    meta.description.clone()
}

pub fn homepage_line(meta: &ChartMeta) -> String {
    if meta.home.is_empty() {
        String::new()
    } else {
        format!("**Homepage:** <{}>", meta.home)
    }
}

fn angle_link(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("<{}>", value)
    }
}

pub fn maintainers_section(meta: &ChartMeta) -> String {
    if meta.maintainers.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Maintainers\n\n| Name | Email | Url |\n| ---- | ------ | --- |");
    for m in &meta.maintainers {
        out.push_str(&format!(
            "\n| {} | {} | {} |",
            m.name,
            angle_link(&m.email),
            angle_link(&m.url)
        ));
    }
    out
}

pub fn sources_section(meta: &ChartMeta) -> String {
    if meta.sources.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Source Code\n");
    for source in &meta.sources {
        out.push_str(&format!("\n* <{}>", source));
    }
    out
}

pub fn requirements_section(meta: &ChartMeta) -> String {
    if meta.dependencies.is_empty() && meta.kube_version.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Requirements\n\n");
    if !meta.kube_version.is_empty() {
        out.push_str(&format!("Kubernetes: `{}`\n\n", meta.kube_version));
    }
    if !meta.dependencies.is_empty() {
        out.push_str("| Repository | Name | Version |\n|------------|------|---------|");
        for dep in &meta.dependencies {
            let name = if dep.alias.is_empty() {
                dep.name.clone()
            } else {
                format!("{}({})", dep.alias, dep.name)
            };
            out.push_str(&format!("\n| {} | {} | {} |", dep.repository, name, dep.version));
        }
    }
    out
}

/// Default cell: plain text, or a `<pre>` block for rows with a notation.
pub fn default_cell(row: &ValueRow) -> String {
    let default = row.rendered_default();
    if row.notation_type.is_empty() {
        return default.to_string();
    }
    format!(
        "<pre lang=\"{}\">{}</pre>",
        row.notation_type,
        default.replace('\n', "<br>")
    )
}

fn description_cell(row: &ValueRow) -> String {
    row.rendered_description().replace('\n', "<br>")
}

fn table(rows: &[&ValueRow]) -> String {
    let mut out = String::from(VALUES_TABLE_HEADER);
    for row in rows {
        out.push_str(&format!(
            "\n| {} | {} | {} | {} |",
            row.key,
            row.value_type,
            default_cell(row),
            description_cell(row)
        ));
    }
    out
}

/// Values table; rows with a section follow under `### <section>` headings,
/// sections in order of first appearance.
pub fn values_table(rows: &[ValueRow]) -> String {
    let unsectioned: Vec<&ValueRow> = rows.iter().filter(|r| r.section.is_empty()).collect();

    let mut sections: Vec<(&str, Vec<&ValueRow>)> = Vec::new();
    for row in rows.iter().filter(|r| !r.section.is_empty()) {
        match sections.iter_mut().find(|(name, _)| *name == row.section) {
            Some((_, items)) => items.push(row),
            None => sections.push((row.section.as_str(), vec![row])),
        }
    }

    let mut parts = Vec::new();
    if !unsectioned.is_empty() || sections.is_empty() {
        parts.push(table(&unsectioned));
    }
    for (name, items) in &sections {
        parts.push(format!("### {}\n\n{}", name, table(items)));
    }
    parts.join("\n\n")
}

pub fn values_section(rows: &[ValueRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    format!("## Values\n\n{}", values_table(rows))
}

pub fn version_footer(version: &str) -> String {
    if version.is_empty() {
        return String::new();
    }
    format!(
        "----------------------------------------------\n\
         Autogenerated from chart metadata using [helm-docs v{v}](https://github.com/norwoodj/helm-docs/releases/v{v})",
        v = version
    )
}

/// Strip spaces before line breaks and collapse runs of blank lines.
pub fn apply_markdown_format(output: &str) -> String {
    let output = RE_TRAILING_SPACE.replace_all(output, "\n");
    RE_BLANK_RUN.replace_all(&output, "\n\n").into_owned()
}
