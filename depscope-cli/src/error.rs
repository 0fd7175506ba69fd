//! CLI-specific error types and exit code mapping

use depscope_analyzer::AnalyzerError;
use depscope_core::error::DepscopeError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The scan completed and at least one package is vulnerable.
    #[error("found {count} vulnerable package(s)")]
    VulnerabilitiesFound { count: usize },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from depscope-core.
    #[error("{0}")]
    Core(#[from] DepscopeError),

    /// Analyzer error (manifest loading, client construction).
    #[error("{0}")]
    Analyzer(#[from] AnalyzerError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                 |
    /// |------|-----------------------------------------|
    /// | 0    | Success                                 |
    /// | 1    | General / command error                 |
    /// | 2    | Configuration error                     |
    /// | 3    | Manifest could not be loaded            |
    /// | 4    | Scan found vulnerable packages          |
    /// | 10   | IO error                                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::VulnerabilitiesFound { .. } => 4,
            Self::Io(_) => 10,
            Self::Core(e) => match e {
                DepscopeError::Config(_) => 2,
                DepscopeError::Manifest(_) => 3,
                DepscopeError::Io(_) => 10,
                DepscopeError::Upstream(_) => 1,
            },
            Self::Analyzer(e) => match e {
                AnalyzerError::Config { .. } => 2,
                AnalyzerError::Network { .. } | AnalyzerError::PartialResponse { .. } => 1,
                _ => 3,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}
