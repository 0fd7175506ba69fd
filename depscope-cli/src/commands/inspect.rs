//! `depscope inspect` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use depscope_analyzer::{LoadedManifest, ManifestKind};

use crate::cli::InspectArgs;
use crate::commands::{analyzer_config, load_config, load_manifest};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `inspect` command.
pub async fn execute(
    args: InspectArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let analyzer = analyzer_config(&config)?;

    info!(path = %args.path.display(), "inspecting manifest");
    let manifest = load_manifest(&args.path, &analyzer)?;

    writer.render(&InspectReport::from_manifest(&manifest))
}

/// Summary of a loaded manifest.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub source: String,
    pub kind: ManifestKind,
    pub root: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub has_transitive: bool,
    pub total_packages: usize,
    pub prod_packages: usize,
    pub dev_packages: usize,
    pub direct_dependencies: usize,
    pub direct_dev_dependencies: usize,
    pub scripts: Vec<String>,
    pub engines: Vec<String>,
}

impl InspectReport {
    pub fn from_manifest(manifest: &LoadedManifest) -> Self {
        let (prod, dev) = manifest.type_counts();
        let info = &manifest.info;
        Self {
            source: manifest.source.clone(),
            kind: manifest.kind,
            root: info.display_name(),
            description: info.description.clone(),
            author: info.author.clone(),
            license: info.license.clone(),
            has_transitive: manifest.has_transitive,
            total_packages: manifest.package_count(),
            prod_packages: prod,
            dev_packages: dev,
            direct_dependencies: info.dependencies.len(),
            direct_dev_dependencies: info.dev_dependencies.len(),
            scripts: info.scripts.keys().cloned().collect(),
            engines: info
                .engines
                .iter()
                .map(|(engine, range)| format!("{engine} {range}"))
                .collect(),
        }
    }
}

impl Render for InspectReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Source: {}", self.source.bold())?;
        writeln!(w, "Format: {}", self.kind)?;
        writeln!(w, "Root:   {}", self.root.bold())?;
        if let Some(description) = &self.description {
            writeln!(w, "Description: {}", description)?;
        }
        if let Some(author) = &self.author {
            writeln!(w, "Author: {}", author)?;
        }
        if let Some(license) = &self.license {
            writeln!(w, "License: {}", license)?;
        }
        writeln!(w)?;

        writeln!(
            w,
            "Packages: {} (prod {}, dev {})",
            self.total_packages, self.prod_packages, self.dev_packages
        )?;
        writeln!(
            w,
            "Direct:   {} dependencies, {} devDependencies",
            self.direct_dependencies, self.direct_dev_dependencies
        )?;
        if !self.has_transitive {
            writeln!(
                w,
                "{}",
                "No lockfile data: transitive dependencies are unknown.".yellow()
            )?;
        }
        if !self.scripts.is_empty() {
            writeln!(w, "Scripts:  {}", self.scripts.join(", "))?;
        }
        if !self.engines.is_empty() {
            writeln!(w, "Engines:  {}", self.engines.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscope_analyzer::ManifestIngester;

    #[test]
    fn test_report_from_declared_manifest() {
        let manifest = ManifestIngester::new()
            .ingest(
                r#"{
                    "name": "demo",
                    "version": "1.0.0",
                    "license": "MIT",
                    "scripts": {"test": "vitest", "build": "tsc"},
                    "engines": {"node": ">=18"},
                    "dependencies": {"react": "^18.2.0", "lodash": "^4.17.20"},
                    "devDependencies": {"vitest": "^1.0.0"}
                }"#,
                "package.json",
            )
            .expect("manifest should load");

        let report = InspectReport::from_manifest(&manifest);
        assert_eq!(report.kind, ManifestKind::PackageManifest);
        assert_eq!(report.root, "demo@1.0.0");
        assert_eq!(report.total_packages, 3);
        assert_eq!(report.prod_packages, 2);
        assert_eq!(report.dev_packages, 1);
        assert_eq!(report.direct_dependencies, 2);
        assert_eq!(report.direct_dev_dependencies, 1);
        assert!(!report.has_transitive);
        assert_eq!(report.scripts, vec!["build", "test"]);
        assert_eq!(report.engines, vec!["node >=18"]);
    }

    #[test]
    fn test_render_mentions_missing_lockfile() {
        colored::control::set_override(false);
        let manifest = ManifestIngester::new()
            .ingest(r#"{"name": "bare", "dependencies": {"ms": "2.1.3"}}"#, "package.json")
            .expect("manifest should load");

        let mut buffer = Vec::new();
        InspectReport::from_manifest(&manifest)
            .render_text(&mut buffer)
            .expect("render should succeed");
        let text = String::from_utf8(buffer).expect("valid UTF-8");

        assert!(text.contains("Format: package manifest"));
        assert!(text.contains("Packages: 1 (prod 1, dev 0)"));
        assert!(text.contains("transitive dependencies are unknown"));
    }
}
