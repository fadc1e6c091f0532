use std::path::PathBuf;
use std::process::ExitCode;

use pagecheck::{ConfigError, ElfError};

/// All errors produced by the `pagecheck` binary.
///
/// Variants are split into two categories:
/// - **Infrastructure errors** (exit code 2): missing input, bad config, I/O failures
/// - **Operational errors** (exit code 1): the input was checked and failed
#[derive(thiserror::Error, Debug)]
pub enum PageCheckError {
    // ── Infrastructure errors (exit code 2) ──────────────────────────

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Invalid or missing APK: {path} (expected a .apk file)")]
    InvalidExtension { path: PathBuf },

    #[error("Config parse error: {0}")]
    ConfigParseError(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Operational errors (exit code 1) ─────────────────────────────

    #[error("Not 16KB compliant: {failing} of {total} native libraries failed")]
    NotCompliant { failing: usize, total: usize },

    #[error("{reason}")]
    UnreadableArchive { reason: String },

    #[error("External check failed: {tool}")]
    ExternalCheckFailed { tool: String },

    #[error("Invalid shared library: {0}")]
    InvalidLibrary(#[from] ElfError),

    #[error("{path}: {failing} LOAD segment(s) not aligned for the target page size")]
    MisalignedLibrary { path: PathBuf, failing: usize },
}

impl PageCheckError {
    /// Numeric process exit code.
    ///
    /// - `2`: infrastructure error (missing input, bad config, I/O)
    /// - `1`: operational failure (the package or library is not compliant)
    pub fn exit_code_num(&self) -> u8 {
        match self {
            Self::InputNotFound { .. }
            | Self::InvalidExtension { .. }
            | Self::ConfigParseError(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_) => 2,

            Self::NotCompliant { .. }
            | Self::UnreadableArchive { .. }
            | Self::ExternalCheckFailed { .. }
            | Self::InvalidLibrary(_)
            | Self::MisalignedLibrary { .. } => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_code_num())
    }
}
