//! `pagecheck check`: validate one APK.

use std::path::Path;

use pagecheck::{ComplianceReport, Validator};

use crate::cli::CheckArgs;
use crate::error::PageCheckError;
use crate::settings::{self, Settings};
use crate::zipalign::ZipalignCheck;

/// Reject inputs that are not named like an APK.
pub fn validate_input_path(path: &Path, allow_any_extension: bool) -> Result<(), PageCheckError> {
    if allow_any_extension {
        return Ok(());
    }
    let is_apk = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("apk"));
    if is_apk {
        Ok(())
    } else {
        Err(PageCheckError::InvalidExtension {
            path: path.to_path_buf(),
        })
    }
}

/// Read `path` fully, mapping a missing file to its own error.
pub fn read_input(path: &Path) -> Result<Vec<u8>, PageCheckError> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PageCheckError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PageCheckError::Io(e)
        }
    })
}

/// Validate the APK named by `args` and return its report.
///
/// An unreadable archive still yields a report; only problems reaching the
/// input or the configuration are errors here.
pub fn run(args: &CheckArgs, settings: &Settings) -> Result<ComplianceReport, PageCheckError> {
    validate_input_path(&args.apk, args.allow_any_extension)?;
    let resolved = settings::resolve(settings, args)?;
    let bytes = read_input(&args.apk)?;

    log::info!(
        "[PageCheck] Checking {} ({} bytes, page size {})",
        args.apk.display(),
        bytes.len(),
        resolved.check.page_size
    );

    let page_size = resolved.check.page_size;
    let mut validator = Validator::new(resolved.check)?;
    if let Some(zipalign) = resolved.zipalign {
        validator = validator.with_external_check(ZipalignCheck::new(zipalign, &args.apk, page_size));
    }

    Ok(validator.validate(&bytes))
}

/// Turn a finished report into the process verdict.
pub fn verdict(report: &ComplianceReport) -> Result<(), PageCheckError> {
    if let Some(reason) = &report.error {
        return Err(PageCheckError::UnreadableArchive {
            reason: reason.clone(),
        });
    }
    if !report.summary.so_ok {
        return Err(PageCheckError::NotCompliant {
            failing: report.failing_libraries().count(),
            total: report.so_checks.len(),
        });
    }
    if report.summary.external_ok == Some(false) {
        let tool = report
            .external
            .as_ref()
            .map_or_else(|| "external".to_string(), |e| e.tool.clone());
        return Err(PageCheckError::ExternalCheckFailed { tool });
    }
    Ok(())
}
