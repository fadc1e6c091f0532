//! ZIP container reader.
//!
//! APKs are ZIP archives. This reader works directly on the in-memory bytes:
//! it locates the End-of-Central-Directory record, walks the central
//! directory in order and extracts individual entries on demand.
//!
//! Supported:
//! - Stored (method 0) and Deflate (method 8) entries
//! - ZIP64 end-of-central-directory records and extended-information fields
//!
//! The central directory must parse completely or the archive is rejected.
//! It is walked by its declared byte size; the EOCD entry count is only a
//! 16-bit hint and wraps in large archives written without ZIP64.
//! Extracted data is verified against the entry's CRC-32.

use std::borrow::Cow;

use crate::error::{ArchiveError, EntryError};

/// End-of-central-directory signature (`PK\x05\x06`)
const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

/// ZIP64 end-of-central-directory locator signature (`PK\x06\x07`)
const ZIP64_LOCATOR_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x06, 0x07];

/// ZIP64 end-of-central-directory record signature (`PK\x06\x06`)
const ZIP64_EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x06, 0x06];

/// Central directory file header signature (`PK\x01\x02`)
const CENTRAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];

/// Local file header signature (`PK\x03\x04`)
const LOCAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

const EOCD_SIZE: usize = 22;
const ZIP64_LOCATOR_SIZE: usize = 20;
const ZIP64_EOCD_MIN_SIZE: usize = 56;
const CENTRAL_HEADER_SIZE: usize = 46;
const LOCAL_HEADER_SIZE: usize = 30;

/// Longest archive comment the EOCD search has to step over.
const MAX_COMMENT_LEN: usize = 0xFFFF;

/// ZIP64 extended information extra field tag
const ZIP64_EXTRA_ID: u16 = 0x0001;

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATED: u16 = 8;

/// One central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    name: String,
    compression: u16,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    local_header_offset: u64,
}

impl ZipEntry {
    /// Full path inside the archive, `/`-delimited.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }
}

/// An opened ZIP archive borrowing its bytes.
#[derive(Debug, Clone)]
pub struct ZipArchive<'a> {
    data: &'a [u8],
    entries: Vec<ZipEntry>,
}

/// Location of the central directory as declared by the EOCD records.
struct Directory {
    offset: u64,
    size: u64,
    entries: u64,
}

impl<'a> ZipArchive<'a> {
    /// Open an archive by parsing its central directory.
    pub fn open(data: &'a [u8]) -> Result<Self, ArchiveError> {
        let eocd = find_eocd(data).ok_or_else(|| ArchiveError::corrupt("EOCD not found"))?;
        let directory = read_directory_location(data, eocd)?;

        let start = to_usize(directory.offset)
            .ok_or_else(|| ArchiveError::corrupt("central directory out of bounds"))?;
        let end = to_usize(directory.size)
            .and_then(|size| start.checked_add(size))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| ArchiveError::corrupt("central directory out of bounds"))?;

        let mut entries = Vec::new();
        let mut pos = start;
        while pos < end {
            let (entry, next) = read_central_header(data, pos, end).map_err(|reason| {
                ArchiveError::corrupt(format!("central directory entry {}: {reason}", entries.len()))
            })?;
            entries.push(entry);
            pos = next;
        }

        if entries.len() as u64 != directory.entries {
            log::debug!(
                "[PageCheck Archive] EOCD declares {} entries, central directory holds {}",
                directory.entries,
                entries.len()
            );
        }

        log::debug!(
            "[PageCheck Archive] Opened archive: {} entries, central directory at {:#x}",
            entries.len(),
            directory.offset
        );

        Ok(Self { data, entries })
    }

    /// Entries in central directory order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extract one entry, refusing anything larger than `limit` bytes once
    /// decompressed.
    pub fn read(&self, entry: &ZipEntry, limit: u64) -> Result<Cow<'a, [u8]>, EntryError> {
        if entry.uncompressed_size > limit {
            return Err(EntryError::TooLarge {
                size: entry.uncompressed_size,
                limit,
            });
        }

        let raw = self.raw_data(entry)?;
        let content = match entry.compression {
            METHOD_STORED => {
                if raw.len() as u64 != entry.uncompressed_size {
                    return Err(EntryError::SizeMismatch {
                        declared: entry.uncompressed_size,
                        actual: raw.len() as u64,
                    });
                }
                Cow::Borrowed(raw)
            }
            METHOD_DEFLATED => {
                let max = to_usize(entry.uncompressed_size).ok_or(EntryError::TooLarge {
                    size: entry.uncompressed_size,
                    limit,
                })?;
                let inflated = miniz_oxide::inflate::decompress_to_vec_with_limit(raw, max)
                    .map_err(|e| EntryError::Inflate(format!("{:?}", e.status)))?;
                if inflated.len() as u64 != entry.uncompressed_size {
                    return Err(EntryError::SizeMismatch {
                        declared: entry.uncompressed_size,
                        actual: inflated.len() as u64,
                    });
                }
                Cow::Owned(inflated)
            }
            other => return Err(EntryError::UnsupportedCompression(other)),
        };

        let actual = crc32fast::hash(&content);
        if actual != entry.crc32 {
            return Err(EntryError::CrcMismatch {
                declared: entry.crc32,
                actual,
            });
        }
        Ok(content)
    }

    /// The entry's stored bytes, located through its local file header.
    fn raw_data(&self, entry: &ZipEntry) -> Result<&'a [u8], EntryError> {
        let data = self.data;
        let header = to_usize(entry.local_header_offset)
            .filter(|&offset| {
                offset
                    .checked_add(LOCAL_HEADER_SIZE)
                    .map_or(false, |end| end <= data.len())
            })
            .ok_or(EntryError::BadLocalHeader("header out of bounds"))?;

        if data[header..header + 4] != LOCAL_HEADER_SIGNATURE {
            return Err(EntryError::BadLocalHeader("signature mismatch"));
        }

        let name_len = read_u16_le(data, header + 26).unwrap_or(0) as usize;
        let extra_len = read_u16_le(data, header + 28).unwrap_or(0) as usize;

        // Sizes come from the central directory; the local copy may be zeroed
        // when a data descriptor follows the entry.
        let start = header + LOCAL_HEADER_SIZE + name_len + extra_len;
        let end = to_usize(entry.compressed_size)
            .and_then(|size| start.checked_add(size))
            .filter(|&end| end <= data.len())
            .ok_or(EntryError::DataOutOfBounds)?;

        Ok(&data[start..end])
    }
}

/// Locate the EOCD record, searching backwards over any trailing comment.
fn find_eocd(data: &[u8]) -> Option<usize> {
    if data.len() < EOCD_SIZE {
        return None;
    }
    let last = data.len() - EOCD_SIZE;
    let first = last.saturating_sub(MAX_COMMENT_LEN);
    (first..=last).rev().find(|&i| data[i..i + 4] == EOCD_SIGNATURE)
}

fn read_directory_location(data: &[u8], eocd: usize) -> Result<Directory, ArchiveError> {
    let field16 = |offset: usize| {
        read_u16_le(data, eocd + offset).ok_or_else(|| ArchiveError::corrupt("EOCD truncated"))
    };
    let field32 = |offset: usize| {
        read_u32_le(data, eocd + offset).ok_or_else(|| ArchiveError::corrupt("EOCD truncated"))
    };

    let mut directory = Directory {
        entries: u64::from(field16(10)?),
        size: u64::from(field32(12)?),
        offset: u64::from(field32(16)?),
    };

    // A ZIP64 locator sits immediately before the classic EOCD.
    if let Some(locator) = eocd.checked_sub(ZIP64_LOCATOR_SIZE) {
        if data[locator..locator + 4] == ZIP64_LOCATOR_SIGNATURE {
            let record = read_u64_le(data, locator + 8)
                .and_then(to_usize)
                .filter(|&record| {
                    record
                        .checked_add(ZIP64_EOCD_MIN_SIZE)
                        .map_or(false, |end| end <= data.len())
                })
                .ok_or_else(|| ArchiveError::corrupt("ZIP64 EOCD out of bounds"))?;
            if data[record..record + 4] != ZIP64_EOCD_SIGNATURE {
                return Err(ArchiveError::corrupt("ZIP64 EOCD signature mismatch"));
            }
            let field64 = |offset: usize| {
                read_u64_le(data, record + offset)
                    .ok_or_else(|| ArchiveError::corrupt("ZIP64 EOCD truncated"))
            };
            directory = Directory {
                entries: field64(32)?,
                size: field64(40)?,
                offset: field64(48)?,
            };
        }
    }

    Ok(directory)
}

/// Decode one central directory header at `pos`, returning the entry and the
/// position of the next header.
fn read_central_header(
    data: &[u8],
    pos: usize,
    end: usize,
) -> Result<(ZipEntry, usize), &'static str> {
    let fixed_end = pos
        .checked_add(CENTRAL_HEADER_SIZE)
        .filter(|&e| e <= end)
        .ok_or("header truncated")?;
    if data[pos..pos + 4] != CENTRAL_HEADER_SIGNATURE {
        return Err("signature mismatch");
    }

    let u16_at = |offset: usize| read_u16_le(data, pos + offset).ok_or("header truncated");
    let u32_at = |offset: usize| read_u32_le(data, pos + offset).ok_or("header truncated");

    let compression = u16_at(10)?;
    let crc32 = u32_at(16)?;
    let mut compressed_size = u64::from(u32_at(20)?);
    let mut uncompressed_size = u64::from(u32_at(24)?);
    let name_len = u16_at(28)? as usize;
    let extra_len = u16_at(30)? as usize;
    let comment_len = u16_at(32)? as usize;
    let mut local_header_offset = u64::from(u32_at(42)?);

    let name_end = fixed_end + name_len;
    let extra_end = name_end + extra_len;
    let next = extra_end + comment_len;
    if next > end {
        return Err("variable fields out of bounds");
    }

    let name = String::from_utf8_lossy(&data[fixed_end..name_end]).into_owned();

    // Fields saturated at 0xFFFFFFFF continue in the ZIP64 extra field, in
    // this fixed order.
    let mut zip64 = zip64_extra(&data[name_end..extra_end]);
    for field in [
        &mut uncompressed_size,
        &mut compressed_size,
        &mut local_header_offset,
    ] {
        if *field == u64::from(u32::MAX) {
            *field = zip64
                .as_mut()
                .and_then(|values| values.next())
                .ok_or("ZIP64 extra field missing")?;
        }
    }

    Ok((
        ZipEntry {
            name,
            compression,
            crc32,
            compressed_size,
            uncompressed_size,
            local_header_offset,
        },
        next,
    ))
}

/// Iterate the 64-bit values of the ZIP64 extended-information extra field.
fn zip64_extra(extra: &[u8]) -> Option<impl Iterator<Item = u64> + '_> {
    let mut pos = 0;
    while pos + 4 <= extra.len() {
        let id = read_u16_le(extra, pos)?;
        let size = read_u16_le(extra, pos + 2)? as usize;
        let body = extra.get(pos + 4..pos + 4 + size)?;
        if id == ZIP64_EXTRA_ID {
            return Some(
                body.chunks_exact(8)
                    .filter_map(|chunk| chunk.try_into().ok().map(u64::from_le_bytes)),
            );
        }
        pos += 4 + size;
    }
    None
}

fn to_usize(value: u64) -> Option<usize> {
    usize::try_from(value).ok()
}

fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    bytes.try_into().ok().map(u64::from_le_bytes)
}
