//! helm-docs: generate README documentation for helm charts from the
//! comments in their values files.
//!
//! Every directory under the search root holding a `Chart.yaml` is loaded in
//! parallel, then a README is rendered for each selected chart:
//!
//! - `helm-docs` writes `<chart>/README.md` for every chart found
//! - `helm-docs --dry-run` prints the rendered documents to stdout instead

mod chart;
mod config;
mod error;
mod model;
mod parser;
mod render;
mod sort;
mod strict;
mod values;

use anyhow::{anyhow, Context, Result};
use chart::{clean_path, ChartDocumentationInfo};
use clap::Parser;
use config::{RenderConfig, StrictModeConfig, ValuesConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "helm-docs",
    version,
    about = "Generate markdown documentation for helm charts from annotated values files"
)]
struct Cli {
    /// Directory to search recursively for charts
    #[arg(short = 'c', long, env = "HELM_DOCS_CHART_SEARCH_ROOT", default_value = ".")]
    chart_search_root: PathBuf,

    /// Print generated documentation to stdout instead of writing files
    #[arg(short = 'd', long, env = "HELM_DOCS_DRY_RUN")]
    dry_run: bool,

    /// Drop values that carry no description
    #[arg(long, env = "HELM_DOCS_IGNORE_NON_DESCRIPTIONS")]
    ignore_non_descriptions: bool,

    /// Gitignore-style file naming directories to skip
    #[arg(short = 'i', long, env = "HELM_DOCS_IGNORE_FILE", default_value = ".helmdocsignore")]
    ignore_file: String,

    /// Log level: trace, debug, info, warn or error
    #[arg(short = 'l', long, env = "HELM_DOCS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// README file name written inside each chart directory
    #[arg(short = 'o', long, env = "HELM_DOCS_OUTPUT_FILE", default_value = "README.md")]
    output_file: String,

    /// Order of the values table: alphanum or file
    #[arg(short = 's', long, env = "HELM_DOCS_SORT_VALUES_ORDER", default_value = "alphanum")]
    sort_values_order: String,

    /// Template files, concatenated in order. Bare names resolve inside
    /// each chart, other relative paths under the search root.
    #[arg(
        short = 't',
        long,
        env = "HELM_DOCS_TEMPLATE_FILES",
        value_delimiter = ',',
        default_value = "README.md.tera"
    )]
    template_files: Vec<String>,

    /// shields.io badge style
    #[arg(short = 'b', long, env = "HELM_DOCS_BADGE_STYLE", default_value = "flat-square")]
    badge_style: String,

    /// Values file name inside each chart directory
    #[arg(short = 'f', long, env = "HELM_DOCS_VALUES_FILE", default_value = "values.yaml")]
    values_file: String,

    /// Include the values of local sub-charts in the parent's table
    #[arg(short = 'u', long, env = "HELM_DOCS_DOCUMENT_DEPENDENCY_VALUES")]
    document_dependency_values: bool,

    /// Only generate documentation for these chart directories
    #[arg(short = 'g', long, env = "HELM_DOCS_CHART_TO_GENERATE", value_delimiter = ',')]
    chart_to_generate: Vec<String>,

    /// Fail a chart when any of its values lacks documentation
    #[arg(short = 'x', long, env = "HELM_DOCS_DOCUMENTATION_STRICT_MODE")]
    documentation_strict_mode: bool,

    /// Value paths allowed to be undocumented in strict mode
    #[arg(
        short = 'y',
        long,
        env = "HELM_DOCS_DOCUMENTATION_STRICT_IGNORE_ABSENT",
        value_delimiter = ',',
        default_values = ["service.type", "image.repository", "image.tag"]
    )]
    documentation_strict_ignore_absent: Vec<String>,

    /// Regular expressions for value paths allowed to be undocumented
    #[arg(
        short = 'z',
        long,
        env = "HELM_DOCS_DOCUMENTATION_STRICT_IGNORE_ABSENT_REGEX",
        value_delimiter = ',',
        default_values = [r".*service\.type", r".*image\.repository", r".*image\.tag"]
    )]
    documentation_strict_ignore_absent_regex: Vec<String>,

    /// Leave the helm-docs version footer out of generated files
    #[arg(long, env = "HELM_DOCS_SKIP_VERSION_FOOTER")]
    skip_version_footer: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let strict_mode = StrictModeConfig::new(
        cli.documentation_strict_mode,
        &cli.documentation_strict_ignore_absent,
        &cli.documentation_strict_ignore_absent_regex,
    )?;
    let values_config = ValuesConfig {
        sort_order: sort::SortOrder::parse_or_default(&cli.sort_values_order),
        ignore_non_descriptions: cli.ignore_non_descriptions,
        document_dependency_values: cli.document_dependency_values,
    };
    let render_config = RenderConfig {
        chart_search_root: cli.chart_search_root.clone(),
        template_files: cli.template_files.clone(),
        output_file: cli.output_file.clone(),
        badge_style: cli.badge_style.clone(),
        skip_version_footer: cli.skip_version_footer,
        dry_run: cli.dry_run,
    };

    // Dry runs share stdout, so charts are handled one at a time.
    let parallelism = if cli.dry_run {
        1
    } else {
        thread::available_parallelism().map_or(1, |n| n.get()) * 2
    };

    let charts = read_documentation_info_by_chart_path(
        &cli.chart_search_root,
        &cli.ignore_file,
        &cli.values_file,
        &strict_mode,
        parallelism,
    )?;

    let selected = charts_to_generate(&charts, &cli.chart_to_generate);
    process_parallel(&selected, parallelism, |dir| {
        if let Err(err) = write_documentation(dir, &charts, &values_config, &render_config) {
            warn!("chart {}: {:#}", dir.display(), err);
        }
    });

    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` overrides `--log-level`.
fn init_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .map_err(|_| anyhow!("invalid log level: {}", level))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

/// Run `visit` over `items` on `parallelism` scoped threads fed by a channel.
fn process_parallel<T, F>(items: &[T], parallelism: usize, visit: F)
where
    T: Sync,
    F: Fn(&T) + Sync,
{
    let (tx, rx) = crossbeam::channel::unbounded();
    for item in items {
        // The receiver outlives every send.
        let _ = tx.send(item);
    }
    drop(tx);

    let visit = &visit;
    thread::scope(|scope| {
        for _ in 0..parallelism.max(1) {
            let rx = rx.clone();
            scope.spawn(move || {
                for item in rx {
                    visit(item);
                }
            });
        }
    });
}

fn read_documentation_info_by_chart_path(
    search_root: &Path,
    ignore_file: &str,
    values_file: &str,
    strict_mode: &StrictModeConfig,
    parallelism: usize,
) -> Result<HashMap<PathBuf, ChartDocumentationInfo>> {
    let chart_dirs = chart::find_chart_directories(search_root, ignore_file)
        .context("error finding chart directories")?;
    info!(
        "found chart directories [{}]",
        chart_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let charts = Mutex::new(HashMap::with_capacity(chart_dirs.len()));
    process_parallel(&chart_dirs, parallelism, |relative| {
        let dir = search_root.join(relative);
        match chart::parse_chart_information(&dir, values_file, strict_mode) {
            Ok(info) => {
                charts.lock().insert(info.chart_directory.clone(), info);
            }
            Err(err) => warn!(
                "error parsing information for chart {}, skipping: {:#}",
                dir.display(),
                err
            ),
        }
    });

    Ok(charts.into_inner())
}

/// Chart directories to render, sorted. An empty filter selects every chart;
/// unknown entries are reported together with the known charts.
fn charts_to_generate(
    charts: &HashMap<PathBuf, ChartDocumentationInfo>,
    filter: &[String],
) -> Vec<PathBuf> {
    let mut known: Vec<PathBuf> = charts.keys().cloned().collect();
    known.sort();

    let requested: Vec<PathBuf> = filter
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| clean_path(Path::new(f)))
        .collect();
    if requested.is_empty() {
        return known;
    }

    let mut selected = Vec::new();
    let mut skipped = false;
    for dir in requested {
        if charts.contains_key(&dir) {
            selected.push(dir);
        } else {
            warn!("couldn't find documentation info for <{}> - skipping", dir.display());
            skipped = true;
        }
    }
    if skipped {
        warn!(
            "some charts listed in chart-to-generate were not found, choose from: [{}]",
            known
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    selected
}

fn write_documentation(
    dir: &Path,
    charts: &HashMap<PathBuf, ChartDocumentationInfo>,
    values_config: &ValuesConfig,
    render_config: &RenderConfig,
) -> Result<()> {
    let info = charts
        .get(dir)
        .ok_or_else(|| anyhow!("chart {} was not loaded", dir.display()))?;

    let dependency_values = if values_config.document_dependency_values {
        chart::get_dependency_values(info, charts)
            .context("error evaluating dependency values")?
    } else {
        Vec::new()
    };
    debug!(
        "chart {} has {} dependency row sets",
        dir.display(),
        dependency_values.len()
    );

    render::print_documentation(info, dependency_values, values_config, render_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChartMeta;
    use crate::parser::ValuesDocument;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn loaded(paths: &[&str]) -> HashMap<PathBuf, ChartDocumentationInfo> {
        paths
            .iter()
            .map(|p| {
                (
                    PathBuf::from(p),
                    ChartDocumentationInfo {
                        chart_directory: PathBuf::from(p),
                        meta: ChartMeta::default(),
                        values: ValuesDocument::default(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn all_charts_selected_without_filter() {
        let charts = loaded(&["b", "a"]);
        assert_eq!(
            charts_to_generate(&charts, &[]),
            vec![PathBuf::from("a"), PathBuf::from("b")]
        );
    }

    #[test]
    fn filter_keeps_known_charts_only() {
        let charts = loaded(&["charts/a", "charts/b"]);
        let filter = vec!["./charts/b".to_string(), "charts/missing".to_string()];
        assert_eq!(charts_to_generate(&charts, &filter), vec![PathBuf::from("charts/b")]);
    }

    #[test]
    fn parallel_visits_every_item_once() {
        let items: Vec<usize> = (0..50).collect();
        let total = AtomicUsize::new(0);
        let count = AtomicUsize::new(0);
        process_parallel(&items, 4, |n| {
            total.fetch_add(*n, Ordering::SeqCst);
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 50);
        assert_eq!(total.load(Ordering::SeqCst), (0..50).sum::<usize>());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["helm-docs"]);
        assert_eq!(cli.chart_search_root, PathBuf::from("."));
        assert_eq!(cli.template_files, vec!["README.md.tera"]);
        assert_eq!(cli.documentation_strict_ignore_absent.len(), 3);
        assert_eq!(cli.sort_values_order, "alphanum");
    }

    #[test]
    fn cli_splits_comma_lists() {
        let cli = Cli::parse_from(["helm-docs", "-g", "a,b", "-t", "one.tera,two.tera"]);
        assert_eq!(cli.chart_to_generate, vec!["a", "b"]);
        assert_eq!(cli.template_files, vec!["one.tera", "two.tera"]);
    }
}
