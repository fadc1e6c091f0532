//! Report aggregation.
//!
//! Folds per-library results and the optional external check into one
//! [`ComplianceReport`]. The rendered status string depends only on the
//! library verdict; the overall verdict is only given when an external check
//! actually ran.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;
use crate::external::ExternalOutcome;
use crate::scanner::SoCheckResult;

/// Status string when every library is compliant.
pub const RESULT_COMPLIANT: &str = "✅ 16KB Page Compliant";

/// Status string when at least one library has an issue.
pub const RESULT_NOT_COMPLIANT: &str = "❌ Not 16KB Compliant";

/// Package-level verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Every library has an empty issue list.
    pub so_ok: bool,
    #[serde(rename = "RESULT")]
    pub result: String,
    /// Verdict of the external check, when it ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ok: Option<bool>,
    /// `so_ok && external_ok`, only when `external_ok` is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_ok: Option<bool>,
}

/// The full result of validating one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub so_checks: Vec<SoCheckResult>,
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalOutcome>,
    /// Set only when the archive itself could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Combine library results and an optional external outcome.
pub fn aggregate(results: Vec<SoCheckResult>, external: Option<ExternalOutcome>) -> ComplianceReport {
    let so_ok = results.iter().all(SoCheckResult::is_compliant);
    let external_ok = external.as_ref().and_then(ExternalOutcome::verdict);

    ComplianceReport {
        so_checks: results,
        summary: Summary {
            so_ok,
            result: status_string(so_ok).to_string(),
            external_ok,
            overall_ok: external_ok.map(|ok| ok && so_ok),
        },
        external,
        error: None,
    }
}

/// Degenerate report for an archive that cannot be opened.
pub fn unreadable_archive(error: &ArchiveError, external: Option<ExternalOutcome>) -> ComplianceReport {
    ComplianceReport {
        error: Some(error.to_string()),
        ..aggregate(Vec::new(), external)
    }
}

fn status_string(so_ok: bool) -> &'static str {
    if so_ok {
        RESULT_COMPLIANT
    } else {
        RESULT_NOT_COMPLIANT
    }
}

impl ComplianceReport {
    /// Whether the archive was readable, every library passed, and the
    /// external check (if it ran) passed.
    pub fn is_compliant(&self) -> bool {
        self.error.is_none() && self.summary.so_ok && self.summary.external_ok != Some(false)
    }

    pub fn failing_libraries(&self) -> impl Iterator<Item = &SoCheckResult> {
        self.so_checks.iter().filter(|check| !check.is_compliant())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ComplianceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            writeln!(f, "error: {error}")?;
        }

        for check in &self.so_checks {
            if check.is_compliant() {
                writeln!(f, "  ok    {}", check.so)?;
                continue;
            }
            writeln!(f, "  FAIL  {}", check.so)?;
            for issue in &check.issues {
                writeln!(f, "          {issue}")?;
            }
        }

        if let Some(external) = &self.external {
            match external.verdict() {
                Some(true) => writeln!(f, "{}: passed", external.tool)?,
                Some(false) => writeln!(
                    f,
                    "{}: failed (exit code {})",
                    external.tool,
                    external
                        .return_code
                        .map_or_else(|| "none".to_string(), |code| code.to_string())
                )?,
                None => writeln!(
                    f,
                    "{}: not run ({})",
                    external.tool,
                    external.error.as_deref().unwrap_or("unavailable")
                )?,
            }
        }

        let failing = self.failing_libraries().count();
        write!(
            f,
            "{} ({} of {} libraries failing)",
            self.summary.result,
            failing,
            self.so_checks.len()
        )
    }
}
