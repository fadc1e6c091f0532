//! Check configuration.
//!
//! The page size is never hardcoded inside the evaluator; callers build a
//! [`CheckConfig`] (usually the default, 16KB) and thread it through the
//! pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default target page size (16KB).
pub const DEFAULT_PAGE_SIZE: u64 = 16 * 1024;

/// Default ceiling on the decompressed size of a single archive entry (512 MiB).
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 512 * 1024 * 1024;

/// A validated page size: non-zero and a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PageSize(u64);

impl PageSize {
    /// 16KB pages.
    pub const SIZE_16K: PageSize = PageSize(DEFAULT_PAGE_SIZE);

    pub fn new(bytes: u64) -> Result<Self, ConfigError> {
        if bytes == 0 || !bytes.is_power_of_two() {
            return Err(ConfigError::InvalidPageSize(bytes));
        }
        Ok(Self(bytes))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether `value` falls on a page boundary.
    #[inline]
    pub const fn is_aligned(self, value: u64) -> bool {
        value % self.0 == 0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::SIZE_16K
    }
}

impl TryFrom<u64> for PageSize {
    type Error = ConfigError;

    fn try_from(bytes: u64) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl From<PageSize> for u64 {
    fn from(page: PageSize) -> u64 {
        page.0
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1024 && self.0 % 1024 == 0 {
            write!(f, "{}KB", self.0 / 1024)
        } else {
            write!(f, "{}B", self.0)
        }
    }
}

/// Configuration for one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Target page size that loadable segments must respect.
    pub page_size: PageSize,
    /// Largest decompressed entry the scanner will materialize.
    pub max_entry_size: u64,
    /// Number of scanner worker threads. `1` scans sequentially.
    pub workers: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            workers: 1,
        }
    }
}

impl CheckConfig {
    /// Default configuration targeting `page_size`.
    pub fn with_page_size(page_size: PageSize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Reject settings the scanner cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount);
        }
        if self.max_entry_size == 0 {
            return Err(ConfigError::InvalidEntryLimit);
        }
        Ok(())
    }
}
