//! Pluggable external checks.
//!
//! An external check is an independent, separately-failable sub-report
//! produced by some other tool (typically `zipalign -c`). The library never
//! spawns processes itself; callers supply an implementation.

use serde::{Deserialize, Serialize};

/// A check run against the raw archive alongside the library scan.
pub trait ExternalCheck: Send + Sync {
    /// Short tool name used in logs and reports.
    fn name(&self) -> &str;

    /// Run the check. Failures to run are reported through
    /// [`ExternalOutcome::unavailable`], never by panicking.
    fn run(&self, archive: &[u8]) -> ExternalOutcome;
}

impl<F> ExternalCheck for F
where
    F: Fn(&[u8]) -> ExternalOutcome + Send + Sync,
{
    fn name(&self) -> &str {
        "external"
    }

    fn run(&self, archive: &[u8]) -> ExternalOutcome {
        self(archive)
    }
}

/// Result of one external check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOutcome {
    pub tool: String,
    /// Whether the tool could be run at all.
    pub available: bool,
    /// Whether the tool reported success. Meaningless when unavailable.
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExternalOutcome {
    /// The tool ran and exited with `return_code`; zero means pass.
    pub fn completed(
        tool: impl Into<String>,
        return_code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            available: true,
            passed: return_code == Some(0),
            return_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: None,
        }
    }

    /// The tool could not be run (missing binary, spawn failure, timeout).
    pub fn unavailable(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            available: false,
            passed: false,
            return_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.into()),
        }
    }

    /// Pass/fail verdict, or `None` when the tool never ran.
    pub fn verdict(&self) -> Option<bool> {
        self.available.then_some(self.passed)
    }
}
