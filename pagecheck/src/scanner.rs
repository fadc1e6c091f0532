//! Archive library scanner.
//!
//! Selects the native libraries of an APK (`lib/**.so`), runs each through
//! the ELF reader and the segment evaluator, and returns per-library results
//! in archive entry order.
//!
//! A library whose content is unusable (not valid ELF, unsupported
//! compression, over the size limit) is reported as an issue on that library
//! and never stops the scan of its siblings. A damaged container (bad local
//! header, data out of bounds, CRC mismatch) fails the whole archive.

use std::fmt;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::archive::{ZipArchive, ZipEntry};
use crate::config::{CheckConfig, PageSize};
use crate::elf::ElfImage;
use crate::error::ArchiveError;
use crate::evaluator::{self, AlignmentIssue};

/// Directory prefix of native libraries inside an APK.
pub const LIBRARY_PREFIX: &str = "lib/";

/// File suffix of native shared libraries.
pub const LIBRARY_SUFFIX: &str = ".so";

/// Whether an archive path names a native shared library.
pub fn is_native_library(path: &str) -> bool {
    path.starts_with(LIBRARY_PREFIX) && path.ends_with(LIBRARY_SUFFIX)
}

/// A problem found in one shared library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoIssue {
    /// A `PT_LOAD` segment that is not page-size aligned.
    Segment(AlignmentIssue),
    /// The library could not be extracted or parsed at all.
    Unreadable { error: String },
}

impl SoIssue {
    fn unreadable(error: impl fmt::Display) -> Self {
        Self::Unreadable {
            error: error.to_string(),
        }
    }
}

impl fmt::Display for SoIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segment(issue) => write!(
                f,
                "PT_LOAD p_align={:#x} p_offset={:#x} p_vaddr={:#x}",
                issue.p_align, issue.p_offset, issue.p_vaddr
            ),
            Self::Unreadable { error } => write!(f, "unreadable: {error}"),
        }
    }
}

/// Check result for one shared library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoCheckResult {
    /// Path of the library inside the archive.
    pub so: String,
    /// Issues in program header order; empty when compliant.
    pub issues: Vec<SoIssue>,
}

impl SoCheckResult {
    pub fn is_compliant(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Open `archive_bytes` and check every native library in it.
pub fn scan(archive_bytes: &[u8], config: &CheckConfig) -> Result<Vec<SoCheckResult>, ArchiveError> {
    let archive = ZipArchive::open(archive_bytes)?;
    scan_archive(&archive, config)
}

/// Check every native library in an opened archive.
pub fn scan_archive(
    archive: &ZipArchive<'_>,
    config: &CheckConfig,
) -> Result<Vec<SoCheckResult>, ArchiveError> {
    let candidates: Vec<&ZipEntry> = archive
        .entries()
        .iter()
        .filter(|entry| !entry.is_dir() && is_native_library(entry.name()))
        .collect();

    log::info!(
        "[PageCheck Scan] {} native libraries among {} entries (page size {})",
        candidates.len(),
        archive.len(),
        config.page_size
    );

    let workers = config.workers.max(1).min(candidates.len().max(1));
    if workers == 1 {
        return candidates
            .into_iter()
            .map(|entry| check_entry(archive, entry, config))
            .collect();
    }

    // Contiguous chunks joined in spawn order keep archive order intact.
    let chunk_len = candidates.len().div_ceil(workers);
    thread::scope(|scope| {
        let handles: Vec<_> = candidates
            .chunks(chunk_len)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|entry| check_entry(archive, entry, config))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();

        // The first failure in archive order wins, as in a sequential scan.
        let mut results = Vec::with_capacity(candidates.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk) => results.extend(chunk?),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(results)
    })
}

fn check_entry(
    archive: &ZipArchive<'_>,
    entry: &ZipEntry,
    config: &CheckConfig,
) -> Result<SoCheckResult, ArchiveError> {
    let issues = match archive.read(entry, config.max_entry_size) {
        Ok(bytes) => check_library(&bytes, config.page_size),
        Err(e) if e.is_structural() => {
            return Err(ArchiveError::corrupt(format!("{}: {e}", entry.name())));
        }
        Err(e) => {
            log::warn!("[PageCheck Scan] {}: cannot extract: {}", entry.name(), e);
            vec![SoIssue::unreadable(e)]
        }
    };

    if issues.is_empty() {
        log::debug!("[PageCheck Scan] {}: ok", entry.name());
    } else {
        log::debug!("[PageCheck Scan] {}: {} issue(s)", entry.name(), issues.len());
    }

    Ok(SoCheckResult {
        so: entry.name().to_string(),
        issues,
    })
}

/// Check the loadable segments of one shared library image.
pub fn check_library(bytes: &[u8], page_size: PageSize) -> Vec<SoIssue> {
    match ElfImage::parse(bytes) {
        Ok(image) => {
            log::trace!(
                "[PageCheck Scan] {} {} {} image, {} program headers",
                image.class(),
                image.endianness(),
                image.machine_name(),
                image.program_header_count()
            );
            evaluator::evaluate_all(image.program_headers(), page_size)
                .into_iter()
                .map(SoIssue::Segment)
                .collect()
        }
        Err(e) => vec![SoIssue::unreadable(e)],
    }
}
