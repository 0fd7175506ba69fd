//! `depscope search` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use depscope_analyzer::{GraphSearch, LoadedManifest, PackageGraph, Query, SearchPath};

use crate::cli::SearchArgs;
use crate::commands::{analyzer_config, load_config, load_manifest};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `search` command.
pub async fn execute(
    args: SearchArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let analyzer = analyzer_config(&config)?;
    let manifest = load_manifest(&args.path, &analyzer)?;

    info!(query = %args.query, source = %manifest.source, "searching dependency graph");
    let report = run_search(&manifest, &args.query, analyzer.max_search_paths);

    writer.render(&report)
}

/// Run a graph search over a loaded manifest.
pub fn run_search(manifest: &LoadedManifest, query: &str, max_paths: usize) -> SearchReport {
    let graph = PackageGraph::from_manifest(manifest);
    let result = GraphSearch::new(&graph, max_paths).search(query);

    SearchReport {
        source: manifest.source.clone(),
        root: manifest.info.display_name(),
        query: query.to_owned(),
        exact: matches!(Query::parse(query), Some(Query::Exact(_))),
        searched: Query::parse(query).is_some(),
        matched_names: result.matched_names.into_iter().collect(),
        paths: result.paths.iter().map(format_path).collect(),
        truncated: result.truncated,
    }
}

fn format_path(path: &SearchPath) -> String {
    path.iter()
        .map(|node| format!("{}@{}", node.name, node.version))
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Search outcome rendered by the CLI.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub source: String,
    pub root: String,
    pub query: String,
    pub exact: bool,
    /// `false` when the query was too short to run
    pub searched: bool,
    pub matched_names: Vec<String>,
    pub paths: Vec<String>,
    pub truncated: bool,
}

impl Render for SearchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if !self.searched {
            writeln!(
                w,
                "{}",
                "Query must be at least 2 characters; nothing searched.".yellow()
            )?;
            return Ok(());
        }

        let mode = if self.exact { "exact" } else { "substring" };
        writeln!(w, "Search: {} ({})", self.query.bold(), mode)?;
        writeln!(w, "Source: {}", self.source)?;
        writeln!(w)?;

        if self.paths.is_empty() {
            writeln!(w, "{}", "No matching packages.".green())?;
            return Ok(());
        }

        writeln!(w, "{} path(s):", self.paths.len())?;
        for path in &self.paths {
            writeln!(w, "  {} > {}", self.root.dimmed(), path)?;
        }
        if self.truncated {
            writeln!(
                w,
                "{}",
                "Result truncated at the configured path limit.".yellow()
            )?;
        }
        writeln!(w)?;
        writeln!(w, "Names on matching paths: {}", self.matched_names.join(", "))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscope_analyzer::ManifestIngester;

    const LOCKFILE: &str = r#"{
        "name": "app",
        "version": "1.0.0",
        "lockfileVersion": 3,
        "packages": {
            "": {"name": "app", "version": "1.0.0", "dependencies": {"express": "^4.18.0"}},
            "node_modules/express": {"version": "4.18.2", "dependencies": {"debug": "2.6.9"}},
            "node_modules/debug": {"version": "2.6.9", "dependencies": {"ms": "2.0.0"}},
            "node_modules/ms": {"version": "2.0.0"}
        }
    }"#;

    fn manifest() -> LoadedManifest {
        ManifestIngester::new()
            .ingest(LOCKFILE, "package-lock.json")
            .expect("lockfile should load")
    }

    #[test]
    fn test_search_formats_paths_from_root_child() {
        let report = run_search(&manifest(), "\"ms\"", 100);
        assert!(report.searched);
        assert!(report.exact);
        assert_eq!(
            report.paths,
            vec!["express@4.18.2 > debug@2.6.9 > ms@2.0.0".to_owned()]
        );
        assert_eq!(report.matched_names, vec!["debug", "express", "ms"]);
        assert!(!report.truncated);
    }

    #[test]
    fn test_short_query_is_not_searched() {
        let report = run_search(&manifest(), "m", 100);
        assert!(!report.searched);
        assert!(report.paths.is_empty());

        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let text = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(text.contains("at least 2 characters"));
    }

    #[test]
    fn test_render_lists_paths_with_root() {
        colored::control::set_override(false);
        let report = run_search(&manifest(), "debug", 100);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let text = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(text.contains("1 path(s):"));
        assert!(text.contains("app@1.0.0 > express@4.18.2 > debug@2.6.9"));
    }
}
