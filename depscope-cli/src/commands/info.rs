//! `depscope info` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use depscope_analyzer::{
    AnalysisView, BatchQueryOrchestrator, FetchOutcome, FixAssessment, LoadedManifest, Lookup,
    PackageRow, RegistryMeta, UpstreamClient, UpdateStatus, VulnerabilityStatus,
};
use depscope_core::types::Severity;

use crate::cli::InfoArgs;
use crate::commands::{analyzer_config, http_orchestrator, load_config, load_manifest};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `info` command.
pub async fn execute(
    args: InfoArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let analyzer = analyzer_config(&config)?;
    let manifest = load_manifest(&args.path, &analyzer)?;
    let orchestrator = http_orchestrator(analyzer)?;

    let report = run_info(&orchestrator, &manifest, &args.package).await?;
    writer.render(&report)
}

/// Fetch details for one package of the loaded manifest.
///
/// # Errors
///
/// Returns `CliError::Command` when the manifest does not contain the package.
pub async fn run_info<C: UpstreamClient>(
    orchestrator: &BatchQueryOrchestrator<C>,
    manifest: &LoadedManifest,
    package: &str,
) -> Result<InfoReport, CliError> {
    let record = manifest
        .packages
        .iter()
        .find(|r| r.name == package)
        .ok_or_else(|| {
            CliError::Command(format!(
                "package '{}' not found in {}",
                package, manifest.source
            ))
        })?;

    info!(package = %record.name, version = %record.version, "fetching package details");
    let outcome = orchestrator.fetch_one(&record.name, &record.version).await;

    let snapshot = orchestrator.snapshot().await;
    let view = AnalysisView::build(manifest, &snapshot);
    let row = view
        .rows
        .into_iter()
        .find(|r| r.name == record.name && r.version == record.version)
        .ok_or_else(|| CliError::Command(format!("package '{}' vanished from view", package)))?;

    let details = snapshot.get(&record.name);
    let (registry, registry_error) = match details.map(|d| &d.registry) {
        Some(Lookup::Ready(meta)) => (Some(meta.clone()), None),
        Some(Lookup::Failed(reason)) => (None, Some(reason.clone())),
        _ => (None, None),
    };
    let (advisories, vulnerability_error) = match details.map(|d| &d.vulnerabilities) {
        Some(Lookup::Ready(_)) => (
            snapshot
                .assess(&record.name, &record.version)
                .advisories
                .iter()
                .map(|a| AdvisoryEntry {
                    id: a.display_id().to_owned(),
                    severity: a.severity(),
                    summary: a.summary.clone(),
                    published: a.published.clone(),
                })
                .collect(),
            None,
        ),
        Some(Lookup::Failed(reason)) => (Vec::new(), Some(reason.clone())),
        _ => (Vec::new(), None),
    };

    Ok(InfoReport {
        outcome,
        package: row,
        registry,
        registry_error,
        advisories,
        vulnerability_error,
    })
}

/// One advisory line in the info report.
#[derive(Debug, Serialize)]
pub struct AdvisoryEntry {
    pub id: String,
    pub severity: Option<Severity>,
    pub summary: Option<String>,
    pub published: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub outcome: FetchOutcome,
    pub package: PackageRow,
    pub registry: Option<RegistryMeta>,
    pub registry_error: Option<String>,
    pub advisories: Vec<AdvisoryEntry>,
    pub vulnerability_error: Option<String>,
}

impl Render for InfoReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let row = &self.package;
        writeln!(w, "{}@{} ({})", row.name.bold(), row.version, row.kind)?;

        match (&self.registry, &self.registry_error) {
            (Some(meta), _) => {
                writeln!(w, "Latest:    {}", meta.version)?;
                if let Some(description) = &meta.description {
                    writeln!(w, "About:     {}", description)?;
                }
                if let Some(license) = &meta.license {
                    writeln!(w, "License:   {}", license)?;
                }
                if let Some(homepage) = &meta.homepage {
                    writeln!(w, "Homepage:  {}", homepage)?;
                }
            }
            (None, Some(reason)) => writeln!(w, "Latest:    N/A ({})", reason.dimmed())?,
            (None, None) => writeln!(w, "Latest:    N/A")?,
        }

        match &row.update {
            UpdateStatus::Outdated {
                latest,
                within_range,
            } => {
                let note = if *within_range {
                    "within declared range"
                } else {
                    "outside declared range"
                };
                writeln!(w, "Update:    {} -> {} ({})", row.version, latest.yellow(), note)?;
            }
            UpdateStatus::UpToDate => writeln!(w, "Update:    {}", "up to date".green())?,
            UpdateStatus::Unknown => writeln!(w, "Update:    unknown")?,
        }

        match &row.downloads {
            Lookup::Ready(count) => writeln!(w, "Downloads: {} / week", count)?,
            _ => writeln!(w, "Downloads: N/A")?,
        }
        writeln!(w)?;

        if let Some(reason) = &self.vulnerability_error {
            writeln!(w, "Vulnerabilities: N/A ({})", reason.dimmed())?;
            return Ok(());
        }
        match row.vulnerability {
            VulnerabilityStatus::NotScanned => writeln!(w, "Vulnerabilities: not scanned")?,
            VulnerabilityStatus::Clean => {
                writeln!(w, "Vulnerabilities: {}", "none".green().bold())?
            }
            VulnerabilityStatus::Vulnerable(count) => {
                writeln!(w, "Vulnerabilities: {}", count.to_string().red().bold())?;
                for advisory in &self.advisories {
                    let severity = advisory
                        .severity
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Unknown".to_owned());
                    writeln!(
                        w,
                        "  {:<22} {:<9} {}",
                        advisory.id,
                        severity,
                        advisory.summary.as_deref().unwrap_or("")
                    )?;
                }
                match &row.fix {
                    Some(FixAssessment::FixAvailable(version)) => {
                        writeln!(w, "Fix:       upgrade to {}", version.green())?
                    }
                    Some(FixAssessment::FixUnknown) => {
                        writeln!(w, "Fix:       {}", "no fixed version known".yellow())?
                    }
                    Some(FixAssessment::NotAffected) | None => {}
                }
            }
        }
        Ok(())
    }
}
