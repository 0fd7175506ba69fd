//! `depscope scan` command handler

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use depscope_analyzer::{
    AnalysisView, BatchQueryOrchestrator, BulkOutcome, FixAssessment, LoadedManifest, Lookup,
    PackageRow, UpdateStatus, UpstreamClient, VulnerabilityStatus,
};
use depscope_core::types::Severity;

use crate::cli::ScanArgs;
use crate::commands::{analyzer_config, http_orchestrator, load_config, load_manifest};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
///
/// Returns `CliError::VulnerabilitiesFound` (exit code 4) after rendering
/// when any package has advisories.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let analyzer = analyzer_config(&config)?;
    let manifest = load_manifest(&args.path, &analyzer)?;
    let orchestrator = http_orchestrator(analyzer)?;

    let options = ScanOptions {
        updates: !args.skip_updates,
        vulnerabilities: !args.skip_vulns,
        only_issues: args.only_issues,
    };
    let report = run_scan(&orchestrator, &manifest, options).await;

    writer.render(&report)?;

    if report.view.has_vulnerabilities() {
        return Err(CliError::VulnerabilitiesFound {
            count: report.view.summary.vulnerable,
        });
    }

    Ok(())
}

/// Which bulk checks to run and how to render them.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub updates: bool,
    pub vulnerabilities: bool,
    pub only_issues: bool,
}

/// Run the bulk checks and build the analysis view.
///
/// The update check and the vulnerability scan run concurrently; each is
/// guarded against re-entry by the orchestrator.
pub async fn run_scan<C: UpstreamClient>(
    orchestrator: &BatchQueryOrchestrator<C>,
    manifest: &LoadedManifest,
    options: ScanOptions,
) -> ScanReport {
    info!(
        source = %manifest.source,
        packages = manifest.package_count(),
        updates = options.updates,
        vulnerabilities = options.vulnerabilities,
        "starting scan"
    );

    let direct: BTreeSet<String> = manifest
        .info
        .direct_dependency_names()
        .map(str::to_owned)
        .collect();

    let update_check = async {
        if options.updates {
            Some(
                orchestrator
                    .check_updates_for_all(&manifest.packages, &direct)
                    .await,
            )
        } else {
            None
        }
    };
    let vuln_check = async {
        if options.vulnerabilities {
            Some(
                orchestrator
                    .check_vulnerabilities_for_all(&manifest.packages)
                    .await,
            )
        } else {
            None
        }
    };
    let (updates, vulnerabilities) = tokio::join!(update_check, vuln_check);

    let snapshot = orchestrator.snapshot().await;
    ScanReport {
        view: AnalysisView::build(manifest, &snapshot),
        updates,
        vulnerabilities,
        only_issues: options.only_issues,
    }
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub view: AnalysisView,
    pub updates: Option<BulkOutcome>,
    pub vulnerabilities: Option<BulkOutcome>,
    #[serde(skip)]
    pub only_issues: bool,
}

impl ScanReport {
    fn visible_rows(&self) -> impl Iterator<Item = &PackageRow> {
        self.view
            .rows
            .iter()
            .filter(move |row| !self.only_issues || is_issue(row))
    }
}

fn is_issue(row: &PackageRow) -> bool {
    row.vulnerability.is_vulnerable() || row.update.is_outdated()
}

fn latest_cell(row: &PackageRow) -> String {
    match &row.latest {
        Lookup::Ready(version) => version.clone(),
        Lookup::Failed(_) => "N/A".to_owned(),
        Lookup::NotFetched => "-".to_owned(),
    }
}

fn vuln_cell(status: VulnerabilityStatus) -> String {
    match status {
        VulnerabilityStatus::NotScanned => "-".to_owned(),
        VulnerabilityStatus::Clean => "0".to_owned(),
        VulnerabilityStatus::Vulnerable(count) => count.to_string(),
    }
}

fn fix_cell(fix: Option<&FixAssessment>) -> String {
    match fix {
        Some(FixAssessment::FixAvailable(version)) => version.clone(),
        Some(FixAssessment::FixUnknown) => "unknown".to_owned(),
        Some(FixAssessment::NotAffected) | None => String::new(),
    }
}

fn bulk_line(outcome: &BulkOutcome) -> String {
    match outcome {
        BulkOutcome::Completed(report) => format!(
            "{} queried, {} skipped, {} failed, {} flagged",
            report.total, report.skipped, report.failed, report.flagged
        ),
        BulkOutcome::AlreadyRunning => "already running".to_owned(),
    }
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let summary = &self.view.summary;
        writeln!(w, "Scan: {} ({})", self.view.source.bold(), self.view.kind)?;
        writeln!(w, "Root: {}", self.view.root)?;
        writeln!(
            w,
            "Packages: {} (prod {}, dev {}, direct {})",
            summary.total, summary.prod, summary.dev, summary.direct
        )?;
        if let Some(outcome) = &self.updates {
            writeln!(w, "Update check: {}", bulk_line(outcome))?;
        }
        if let Some(outcome) = &self.vulnerabilities {
            writeln!(w, "Vulnerability scan: {}", bulk_line(outcome))?;
        }
        writeln!(w)?;

        let vuln_str = format!(
            "{} vulnerable, {} clean, {} not scanned",
            summary.vulnerable, summary.clean, summary.not_scanned
        );
        if summary.vulnerable > 0 {
            writeln!(w, "Vulnerabilities: {}", vuln_str.red().bold())?;
            writeln!(
                w,
                "Fixes: {} available, {} unknown",
                summary.fix_available, summary.fix_unknown
            )?;
        } else {
            writeln!(w, "Vulnerabilities: {}", vuln_str.green().bold())?;
        }
        writeln!(w, "Outdated: {}", summary.outdated)?;
        writeln!(w)?;

        writeln!(
            w,
            "{:<32} {:<14} {:<5} {:<14} {:<6} {:<10} Fix",
            "Package", "Version", "Type", "Latest", "Vulns", "Severity"
        )?;
        writeln!(w, "{}", "-".repeat(96))?;

        for row in self.visible_rows() {
            let latest = latest_cell(row);
            let latest = match &row.update {
                UpdateStatus::Outdated { .. } => latest.yellow(),
                _ => latest.normal(),
            };
            let severity = row.max_severity.map(|s| s.to_string()).unwrap_or_default();
            let severity_colored = match row.max_severity {
                Some(Severity::Critical) => severity.red().bold(),
                Some(Severity::High) => severity.red(),
                Some(Severity::Medium) => severity.yellow(),
                Some(Severity::Low) => severity.normal(),
                Some(Severity::Info) => severity.dimmed(),
                None => severity.normal(),
            };
            let name = if row.direct {
                row.name.bold()
            } else {
                row.name.normal()
            };

            writeln!(
                w,
                "{:<32} {:<14} {:<5} {:<14} {:<6} {:<10} {}",
                name,
                row.version,
                row.kind.to_string(),
                latest,
                vuln_cell(row.vulnerability),
                severity_colored,
                fix_cell(row.fix.as_ref())
            )?;
        }

        Ok(())
    }
}
