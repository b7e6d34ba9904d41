//! CLI-specific error types and exit code mapping

use strata_cache::CacheError;
use strata_core::error::StrataError;
use strata_ospkg::DetectorError;
use strata_walker::WalkerError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from strata-core.
    #[error("{0}")]
    Core(#[from] StrataError),

    /// Layer walking failure.
    #[error("layer error: {0}")]
    Walk(String),

    /// Cache key derivation or blob store failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// Detection failed before producing a report.
    #[error("detect error: {0}")]
    Detect(String),

    /// The user interrupted the command or its timeout expired.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Detection succeeded and found vulnerable packages.
    #[error("found {0} vulnerabilities")]
    VulnerabilitiesFound(usize),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command error               |
    /// | 2    | Configuration error                   |
    /// | 4    | Detection found vulnerabilities       |
    /// | 10   | IO error                              |
    /// | 130  | Cancelled by interrupt or timeout     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(StrataError::Config(_)) => 2,
            Self::VulnerabilitiesFound(_) => 4,
            Self::Io(_) | Self::Core(StrataError::Io(_)) => 10,
            Self::Cancelled(_) => 130,
            Self::JsonSerialize(_)
            | Self::Command(_)
            | Self::Core(_)
            | Self::Walk(_)
            | Self::Cache(_)
            | Self::Detect(_) => 1,
        }
    }
}

impl From<WalkerError> for CliError {
    fn from(e: WalkerError) -> Self {
        match e {
            WalkerError::Config { .. } | WalkerError::Pattern { .. } => {
                Self::Config(e.to_string())
            }
            WalkerError::Cancelled { .. } => Self::Cancelled(e.to_string()),
            other => Self::Walk(other.to_string()),
        }
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e.to_string())
    }
}

impl From<DetectorError> for CliError {
    fn from(e: DetectorError) -> Self {
        match e {
            DetectorError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Detect(other.to_string()),
        }
    }
}
