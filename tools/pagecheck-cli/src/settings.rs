//! Config file loading and merging.
//!
//! Precedence: command-line flag, then config file, then built-in default.
//!
//! ```toml
//! [check]
//! page_size = 16384
//! workers = 4
//! max_entry_size = 536870912
//!
//! [zipalign]
//! enabled = true
//! path = "/opt/android-sdk/build-tools/35.0.0/zipalign"
//! timeout_secs = 15
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pagecheck::{CheckConfig, PageSize};

use crate::cli::CheckArgs;
use crate::error::PageCheckError;
use crate::zipalign::{ZipalignConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_ZIPALIGN};

/// Contents of a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub check: CheckSection,
    pub zipalign: ZipalignSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckSection {
    pub page_size: Option<u64>,
    pub workers: Option<usize>,
    pub max_entry_size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZipalignSection {
    pub enabled: bool,
    pub path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

/// Fully merged settings for one `check` run.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub check: CheckConfig,
    pub zipalign: Option<ZipalignConfig>,
}

/// Load a config file.
pub fn load(path: &Path) -> Result<Settings, PageCheckError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PageCheckError::ConfigParseError(format!("config file not found: {}", path.display()))
        } else {
            PageCheckError::Io(e)
        }
    })?;
    parse_str(&content)
}

/// Parse config file contents.
pub fn parse_str(content: &str) -> Result<Settings, PageCheckError> {
    toml::from_str(content)
        .map_err(|e| PageCheckError::ConfigParseError(format!("invalid TOML: {e}")))
}

/// Resolve the page size from a flag and the config file.
pub fn page_size(flag: Option<u64>, settings: &Settings) -> Result<PageSize, PageCheckError> {
    match flag.or(settings.check.page_size) {
        Some(bytes) => Ok(PageSize::new(bytes)?),
        None => Ok(PageSize::default()),
    }
}

/// Merge `check` flags over the config file.
pub fn resolve(settings: &Settings, args: &CheckArgs) -> Result<Resolved, PageCheckError> {
    let mut check = CheckConfig::with_page_size(page_size(args.page_size, settings)?);
    if let Some(workers) = args.jobs.or(settings.check.workers) {
        check.workers = workers;
    }
    if let Some(limit) = args.max_entry_size.or(settings.check.max_entry_size) {
        check.max_entry_size = limit;
    }
    check.validate()?;

    let section = &settings.zipalign;
    let enabled = args.zipalign || args.zipalign_path.is_some() || section.enabled;
    let zipalign = enabled.then(|| ZipalignConfig {
        program: args
            .zipalign_path
            .clone()
            .or_else(|| section.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ZIPALIGN)),
        timeout: Duration::from_secs(
            args.zipalign_timeout
                .or(section.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        ),
    });

    Ok(Resolved { check, zipalign })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CheckArgs {
        CheckArgs {
            apk: PathBuf::from("app.apk"),
            ..CheckArgs::default()
        }
    }

    #[test]
    fn empty_settings_use_defaults() {
        let resolved = resolve(&Settings::default(), &args()).unwrap();
        assert_eq!(resolved.check, CheckConfig::default());
        assert_eq!(resolved.zipalign, None);
    }

    #[test]
    fn file_values_apply() {
        let settings = parse_str(
            r#"
[check]
page_size = 65536
workers = 3

[zipalign]
enabled = true
timeout_secs = 5
"#,
        )
        .unwrap();
        let resolved = resolve(&settings, &args()).unwrap();

        assert_eq!(resolved.check.page_size.get(), 65536);
        assert_eq!(resolved.check.workers, 3);
        let zipalign = resolved.zipalign.unwrap();
        assert_eq!(zipalign.program, PathBuf::from(DEFAULT_ZIPALIGN));
        assert_eq!(zipalign.timeout, Duration::from_secs(5));
    }

    #[test]
    fn flags_override_file() {
        let settings = parse_str("[check]\npage_size = 65536\n").unwrap();
        let mut args = args();
        args.page_size = Some(4096);
        args.zipalign_path = Some(PathBuf::from("/sdk/zipalign"));

        let resolved = resolve(&settings, &args).unwrap();
        assert_eq!(resolved.check.page_size.get(), 4096);
        assert_eq!(
            resolved.zipalign.unwrap().program,
            PathBuf::from("/sdk/zipalign")
        );
    }

    #[test]
    fn invalid_values_rejected() {
        let mut bad_page = args();
        bad_page.page_size = Some(10_000);
        assert!(matches!(
            resolve(&Settings::default(), &bad_page),
            Err(PageCheckError::Config(_))
        ));

        let mut no_workers = args();
        no_workers.jobs = Some(0);
        assert!(matches!(
            resolve(&Settings::default(), &no_workers),
            Err(PageCheckError::Config(_))
        ));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(matches!(
            parse_str("[check]\npagesize = 4096\n"),
            Err(PageCheckError::ConfigParseError(_))
        ));
    }
}
