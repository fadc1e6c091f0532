//! 16KB page-size compliance checks for Android packages.
//!
//! Devices with a 16KB memory page size can only map native libraries whose
//! loadable segments respect that page size. This crate inspects the ELF
//! program headers of every `lib/**.so` inside an APK and produces a
//! structured [`ComplianceReport`].
//!
//! # Pipeline
//!
//! ```text
//! archive bytes ─► archive ─► scanner ─┬─► elf ─► evaluator ─┐
//!                                      └──── per library ◄───┘
//!                                                 │
//!                    external check (optional) ─► report
//! ```
//!
//! # Modules
//!
//! - `elf`: bounds-checked ELF program header reader
//! - `evaluator`: per-segment alignment rule
//! - `archive`: in-memory ZIP reader (stored + deflate, ZIP64)
//! - `scanner`: library selection and per-library checks
//! - `report`: aggregation into the final verdict
//! - `external`: pluggable sub-checks such as `zipalign`
//!
//! The crate performs no file, network or process I/O: it consumes bytes and
//! returns a value.

pub mod archive;
pub mod config;
pub mod elf;
pub mod error;
pub mod evaluator;
pub mod external;
pub mod report;
pub mod scanner;

pub use config::{CheckConfig, PageSize, DEFAULT_PAGE_SIZE};
pub use elf::{ElfClass, ElfImage, Endianness, ProgramHeaderEntry};
pub use error::{ArchiveError, ConfigError, ElfError, EntryError};
pub use evaluator::{evaluate, AlignmentIssue};
pub use external::{ExternalCheck, ExternalOutcome};
pub use report::{aggregate, ComplianceReport, Summary, RESULT_COMPLIANT, RESULT_NOT_COMPLIANT};
pub use scanner::{scan, SoCheckResult, SoIssue};

/// Validates archives against one configuration and an optional external
/// check.
pub struct Validator {
    config: CheckConfig,
    external: Option<Box<dyn ExternalCheck>>,
}

impl Validator {
    pub fn new(config: CheckConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            external: None,
        })
    }

    /// Run `check` against every archive and merge its verdict.
    pub fn with_external_check(mut self, check: impl ExternalCheck + 'static) -> Self {
        self.external = Some(Box::new(check));
        self
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Validate one archive. Never fails: an unreadable archive yields a
    /// report with its `error` field set.
    pub fn validate(&self, archive: &[u8]) -> ComplianceReport {
        let external = self.external.as_ref().map(|check| {
            log::info!("[PageCheck] Running external check '{}'", check.name());
            check.run(archive)
        });

        match scan(archive, &self.config) {
            Ok(results) => {
                let report = aggregate(results, external);
                log::info!(
                    "[PageCheck] {} libraries checked: {}",
                    report.so_checks.len(),
                    report.summary.result
                );
                report
            }
            Err(e) => {
                log::warn!("[PageCheck] {}", e);
                report::unreadable_archive(&e, external)
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            config: CheckConfig::default(),
            external: None,
        }
    }
}

/// Validate `archive` with `config` and no external check.
pub fn validate_archive(archive: &[u8], config: &CheckConfig) -> ComplianceReport {
    match scan(archive, config) {
        Ok(results) => aggregate(results, None),
        Err(e) => report::unreadable_archive(&e, None),
    }
}
