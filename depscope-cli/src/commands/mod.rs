//! Command handlers -- one module per subcommand

pub mod config;
pub mod info;
pub mod inspect;
pub mod scan;
pub mod search;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use depscope_analyzer::{
    AnalyzerConfig, BatchQueryOrchestrator, BatchQueryOrchestratorBuilder, HttpUpstreamClient,
    LoadedManifest, ManifestIngester,
};
use depscope_core::config::DepscopeConfig;

use crate::error::CliError;

/// Load the effective configuration, falling back to defaults when the file is absent.
pub async fn load_config(config_path: &Path) -> Result<DepscopeConfig, CliError> {
    Ok(DepscopeConfig::load_or_default(config_path).await?)
}

/// Derive and validate the analyzer settings from the `[analysis]` section.
pub fn analyzer_config(config: &DepscopeConfig) -> Result<AnalyzerConfig, CliError> {
    let analyzer = AnalyzerConfig::from_core(&config.analysis);
    analyzer.validate()?;
    Ok(analyzer)
}

/// Read and normalize a manifest, lockfile, or project directory.
pub fn load_manifest(path: &Path, config: &AnalyzerConfig) -> Result<LoadedManifest, CliError> {
    let manifest = ManifestIngester::new().ingest_path(path, config.max_file_size)?;
    debug!(
        source = %manifest.source,
        kind = %manifest.kind,
        packages = manifest.package_count(),
        "manifest loaded"
    );
    Ok(manifest)
}

/// Build an orchestrator backed by the HTTP upstream client.
pub fn http_orchestrator(
    config: AnalyzerConfig,
) -> Result<BatchQueryOrchestrator<HttpUpstreamClient>, CliError> {
    let client = Arc::new(HttpUpstreamClient::new(&config)?);
    Ok(BatchQueryOrchestratorBuilder::new()
        .config(config)
        .client(client)
        .build()?)
}
