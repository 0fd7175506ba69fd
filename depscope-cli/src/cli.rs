//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// depscope -- npm dependency graph and vulnerability analyzer.
///
/// Use `depscope <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "depscope", version, about, long_about = None)]
pub struct Cli {
    /// Path to the depscope.toml configuration file.
    #[arg(short, long, global = true, default_value = "depscope.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a manifest or lockfile and summarize it.
    Inspect(InspectArgs),

    /// Find every dependency path leading to matching packages.
    Search(SearchArgs),

    /// Fetch registry, download and advisory details for one package.
    Info(InfoArgs),

    /// Run bulk update and vulnerability checks over every package.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- inspect ----

/// Detect the input shape and report package counts.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// package.json, package-lock.json, or a directory containing one.
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

// ---- search ----

/// Search the dependency graph by package name.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Lockfile or project directory.
    pub path: PathBuf,

    /// Substring to match, or a quoted name ("lodash") for an exact match.
    pub query: String,
}

// ---- info ----

/// Show details for a single package from the loaded manifest.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Manifest, lockfile, or project directory.
    pub path: PathBuf,

    /// Package name as it appears in the manifest.
    pub package: String,
}

// ---- scan ----

/// Run bulk checks and render the full analysis view.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Manifest, lockfile, or project directory.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Skip the latest-version check for direct dependencies.
    #[arg(long)]
    pub skip_updates: bool,

    /// Skip the batch vulnerability query.
    #[arg(long)]
    pub skip_vulns: bool,

    /// Only list packages that are vulnerable or outdated.
    #[arg(long)]
    pub only_issues: bool,
}

// ---- config ----

/// Manage depscope configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, analysis).
        #[arg(long)]
        section: Option<String>,
    },
}
