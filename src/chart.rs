//! Chart discovery and loading.
//!
//! A chart is any directory holding a `Chart.yaml`. Loading reads its
//! metadata, its dependency list and its values file; dependency row sets are
//! assembled later from the full map of loaded charts.

use crate::config::StrictModeConfig;
use crate::model::{ChartMeta, ChartRequirementsItem, DependencyValues};
use crate::parser::{self, ValuesDocument};
use crate::strict;
use crate::values;
use anyhow::{anyhow, Context, Result};
use ignore::WalkBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

const CHART_FILE: &str = "Chart.yaml";
const REQUIREMENTS_FILE: &str = "requirements.yaml";

/// Everything read from one chart directory.
#[derive(Debug, Clone)]
pub struct ChartDocumentationInfo {
    pub chart_directory: PathBuf,
    pub meta: ChartMeta,
    pub values: ValuesDocument,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChartRequirements {
    dependencies: Vec<ChartRequirementsItem>,
}

/// Lexically normalise a path: drop `.` components and fold `..` where a
/// preceding component allows it.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.last() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(component),
            },
            other => cleaned.push(other),
        }
    }

    if cleaned.is_empty() {
        return PathBuf::from(".");
    }
    cleaned.iter().collect()
}

/// Directories under `search_root` that contain a `Chart.yaml`, relative to
/// the root and sorted. `.git` is never entered; paths matched by
/// `ignore_file` (gitignore syntax) are skipped.
pub fn find_chart_directories(search_root: &Path, ignore_file: &str) -> Result<Vec<PathBuf>> {
    if !search_root.is_dir() {
        return Err(anyhow!(
            "chart search root is not a directory: {}",
            search_root.display()
        ));
    }

    let mut builder = WalkBuilder::new(search_root);
    builder
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(|entry| entry.file_name() != ".git");
    if !ignore_file.is_empty() {
        builder.add_custom_ignore_filename(ignore_file);
    }

    let mut chart_dirs = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("error walking {}: {}", search_root.display(), err);
                continue;
            }
        };
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        if !is_file || entry.file_name() != CHART_FILE {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let relative = dir.strip_prefix(search_root).unwrap_or(dir);
        chart_dirs.push(clean_path(relative));
    }

    chart_dirs.sort();
    Ok(chart_dirs)
}

fn read_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(content.replace("\r\n", "\n"))
}

fn requirement_key(item: &ChartRequirementsItem) -> String {
    format!("{}/{}", item.repository, item.name)
}

fn parse_chart_meta(chart_dir: &Path) -> Result<ChartMeta> {
    let path = chart_dir.join(CHART_FILE);
    let mut meta: ChartMeta = serde_yaml::from_str(&read_file(&path)?)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if meta.api_version == "v1" {
        let requirements_path = chart_dir.join(REQUIREMENTS_FILE);
        meta.dependencies = if requirements_path.is_file() {
            let requirements: ChartRequirements =
                serde_yaml::from_str(&read_file(&requirements_path)?).with_context(|| {
                    format!("failed to parse {}", requirements_path.display())
                })?;
            requirements.dependencies
        } else {
            Vec::new()
        };
    }

    meta.dependencies
        .sort_by(|a, b| requirement_key(a).cmp(&requirement_key(b)));
    Ok(meta)
}

/// Read metadata and values for the chart in `chart_dir`, running the strict
/// documentation check when enabled.
pub fn parse_chart_information(
    chart_dir: &Path,
    values_file: &str,
    strict_mode: &StrictModeConfig,
) -> Result<ChartDocumentationInfo> {
    let meta = parse_chart_meta(chart_dir)?;

    let values_path = chart_dir.join(values_file);
    let source = read_file(&values_path)?;
    let values = parser::parse_values(&source)
        .with_context(|| format!("failed to parse {}", values_path.display()))?;

    if strict_mode.enabled {
        strict::check_documentation(values.root.as_ref(), &values.descriptions, strict_mode)?;
    }

    debug!(
        "parsed chart {} with {} declared descriptions",
        chart_dir.display(),
        values.descriptions.len()
    );
    Ok(ChartDocumentationInfo {
        chart_directory: clean_path(chart_dir),
        meta,
        values,
    })
}

/// Row sets for every local dependency of `root`, depth-first in declaration
/// order. Remote dependencies are skipped with a warning.
pub fn get_dependency_values(
    root: &ChartDocumentationInfo,
    all_charts: &HashMap<PathBuf, ChartDocumentationInfo>,
) -> Result<Vec<DependencyValues>> {
    let mut result = Vec::new();
    collect_dependency_values(root, all_charts, "", &mut result)?;
    Ok(result)
}

fn collect_dependency_values(
    chart: &ChartDocumentationInfo,
    all_charts: &HashMap<PathBuf, ChartDocumentationInfo>,
    prefix: &str,
    out: &mut Vec<DependencyValues>,
) -> Result<()> {
    for dep in &chart.meta.dependencies {
        if dep.is_remote() {
            warn!(
                "chart {}: remote dependency {} ({}) cannot be documented, skipping",
                chart.chart_directory.display(),
                dep.name,
                dep.repository
            );
            continue;
        }

        let search_path = clean_path(&chart.chart_directory.join("charts").join(&dep.name));
        let dep_info = all_charts.get(&search_path).ok_or_else(|| {
            anyhow!("dependency with path {:?} was not found", search_path.display().to_string())
        })?;

        let dep_prefix = if prefix.is_empty() {
            dep.prefix_name().to_string()
        } else {
            format!("{}.{}", prefix, dep.prefix_name())
        };

        let rows = values::create_value_rows(dep_info.values.root.as_ref(), &dep_info.values.descriptions)
            .with_context(|| format!("failed to document values of dependency {}", dep_prefix))?;
        out.push(DependencyValues {
            prefix: dep_prefix.clone(),
            rows,
        });

        collect_dependency_values(dep_info, all_charts, &dep_prefix, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn chart(dir: &Path, chart_yaml: &str, values: &str) {
        write(&dir.join("Chart.yaml"), chart_yaml);
        write(&dir.join("values.yaml"), values);
    }

    fn load_all(root: &Path) -> HashMap<PathBuf, ChartDocumentationInfo> {
        let strict_mode = StrictModeConfig::default();
        find_chart_directories(root, ".helmdocsignore")
            .unwrap()
            .into_iter()
            .map(|rel| {
                let info =
                    parse_chart_information(&root.join(rel), "values.yaml", &strict_mode).unwrap();
                (info.chart_directory.clone(), info)
            })
            .collect()
    }

    #[test]
    fn clean_path_normalises_components() {
        assert_eq!(clean_path(Path::new("./a/./b")), PathBuf::from("a/b"));
        assert_eq!(clean_path(Path::new("a/b/../c")), PathBuf::from("a/c"));
        assert_eq!(clean_path(Path::new("./")), PathBuf::from("."));
        assert_eq!(clean_path(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn finds_charts_and_honours_ignore_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        chart(&root.join("charts/a"), "name: a\n", "");
        chart(&root.join("charts/b"), "name: b\n", "");
        chart(&root.join("skipped/c"), "name: c\n", "");
        chart(&root.join(".git/d"), "name: d\n", "");
        write(&root.join(".helmdocsignore"), "skipped\n");

        let dirs = find_chart_directories(root, ".helmdocsignore").unwrap();
        assert_eq!(dirs, vec![PathBuf::from("charts/a"), PathBuf::from("charts/b")]);
    }

    #[test]
    fn search_root_must_exist() {
        let tmp = TempDir::new().unwrap();
        assert!(find_chart_directories(&tmp.path().join("missing"), "").is_err());
    }

    #[test]
    fn v1_charts_read_requirements_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("legacy");
        chart(&dir, "apiVersion: v1\nname: legacy\n", "a: 1\n");
        write(
            &dir.join("requirements.yaml"),
            "dependencies:\n  - name: zeta\n  - name: alpha\n",
        );

        let info = parse_chart_information(&dir, "values.yaml", &StrictModeConfig::default())
            .unwrap();
        let names: Vec<&str> = info.meta.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn missing_values_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("Chart.yaml"), "name: bare\n");
        let err = parse_chart_information(tmp.path(), "values.yaml", &StrictModeConfig::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("values.yaml"));
    }

    #[test]
    fn strict_mode_rejects_undocumented_values() {
        let tmp = TempDir::new().unwrap();
        chart(tmp.path(), "name: strict\n", "# -- documented\na: 1\nb: 2\n");
        let strict_mode = StrictModeConfig::new(true, &[], &[]).unwrap();
        let err = parse_chart_information(tmp.path(), "values.yaml", &strict_mode).unwrap_err();
        assert!(format!("{:#}", err).contains("values without documentation: \nb"));
    }

    #[test]
    fn dependency_values_are_collected_depth_first() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        chart(
            &root.join("parent"),
            "apiVersion: v2\nname: parent\ndependencies:\n  - name: first\n    alias: one\n  - name: second\n  - name: remote\n    repository: https://charts.example.com\n",
            "x: 1\n",
        );
        chart(
            &root.join("parent/charts/first"),
            "name: first\ndependencies:\n  - name: nested\n    repository: file://charts/nested\n",
            "a: 1\n",
        );
        chart(&root.join("parent/charts/first/charts/nested"), "name: nested\n", "n: 1\n");
        chart(&root.join("parent/charts/second"), "name: second\n", "b: 2\n");

        let all = load_all(root);
        let parent = &all[&clean_path(&root.join("parent"))];
        let deps = get_dependency_values(parent, &all).unwrap();

        let prefixes: Vec<&str> = deps.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["one", "one.nested", "second"]);
        assert_eq!(deps[1].rows[0].key, "n");
    }

    #[test]
    fn missing_local_dependency_is_an_error() {
        let tmp = TempDir::new().unwrap();
        chart(
            tmp.path(),
            "name: parent\ndependencies:\n  - name: ghost\n",
            "",
        );
        let all = load_all(tmp.path());
        let parent = all.values().next().unwrap();
        let err = get_dependency_values(parent, &all).unwrap_err();
        assert!(err.to_string().contains("was not found"));
    }
}
