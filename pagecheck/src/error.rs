use thiserror::Error;

/// Errors produced while decoding an ELF image.
///
/// Every variant is a per-library failure: the scanner records it as an
/// issue on the library that produced it and moves on to the next entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElfError {
    /// Missing or wrong magic signature, or a header field that cannot be
    /// reconciled with the declared class.
    #[error("malformed ELF image: {reason}")]
    MalformedImage { reason: String },

    /// A header or table declared by the image extends past the end of the
    /// buffer.
    #[error("truncated ELF image: {what} needs {needed} bytes, image has {available}")]
    TruncatedImage {
        what: &'static str,
        needed: u64,
        available: u64,
    },

    /// `EI_CLASS` is neither `ELFCLASS32` nor `ELFCLASS64`.
    #[error("unsupported ELF class {0}")]
    UnsupportedClass(u8),

    /// `EI_DATA` is neither `ELFDATA2LSB` nor `ELFDATA2MSB`.
    #[error("unsupported ELF data encoding {0}")]
    UnsupportedEndianness(u8),
}

impl ElfError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedImage {
            reason: reason.into(),
        }
    }
}

/// Errors produced while reading the ZIP container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The container as a whole cannot be opened. Reported at the top level
    /// of the compliance report.
    #[error("Invalid APK file: {reason}")]
    CorruptArchive { reason: String },
}

impl ArchiveError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptArchive {
            reason: reason.into(),
        }
    }
}

/// Errors produced while extracting a single archive entry.
///
/// Structural failures (see [`EntryError::is_structural`]) mean the container
/// itself is damaged and fail the whole archive. The rest only concern the
/// entry's content and are reported on that library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("unsupported compression method {0}")]
    UnsupportedCompression(u16),

    #[error("bad local file header: {0}")]
    BadLocalHeader(&'static str),

    #[error("entry data out of bounds")]
    DataOutOfBounds,

    #[error("inflate failed: {0}")]
    Inflate(String),

    #[error("entry is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("size mismatch: header declares {declared} bytes, got {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("bad CRC-32: header declares {declared:#010x}, data has {actual:#010x}")]
    CrcMismatch { declared: u32, actual: u32 },
}

impl EntryError {
    /// Whether this failure means the container is corrupt rather than the
    /// entry's content being unusable.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::BadLocalHeader(_) | Self::DataOutOfBounds | Self::CrcMismatch { .. }
        )
    }
}

/// Invalid check configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("page size {0} is not a non-zero power of two")]
    InvalidPageSize(u64),

    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("max entry size must be non-zero")]
    InvalidEntryLimit,
}
