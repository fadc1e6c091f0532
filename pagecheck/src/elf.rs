//! ELF program header reader
//!
//! Bounds-checked decoder for the identification block, the file header and
//! the program header table of 32- and 64-bit ELF images in either byte
//! order.
//!
//! # Safety of untrusted input
//!
//! - Every header and table extent is validated against the buffer before
//!   any field is read
//! - All offset arithmetic is checked; overflow is reported as truncation
//! - Fields are decoded byte-by-byte; the buffer needs no alignment

use std::fmt;

use crate::error::ElfError;

/// ELF magic number: 0x7F 'E' 'L' 'F'
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// Size of the identification block
pub const EI_NIDENT: usize = 16;

/// Offset of the class byte in `e_ident`
pub const EI_CLASS: usize = 4;

/// Offset of the data encoding byte in `e_ident`
pub const EI_DATA: usize = 5;

/// ELF class: 32-bit
pub const ELFCLASS32: u8 = 1;

/// ELF class: 64-bit
pub const ELFCLASS64: u8 = 2;

/// ELF data encoding: little endian
pub const ELFDATA2LSB: u8 = 1;

/// ELF data encoding: big endian
pub const ELFDATA2MSB: u8 = 2;

/// Program header type: unused entry
pub const PT_NULL: u32 = 0;

/// Program header type: loadable segment
pub const PT_LOAD: u32 = 1;

/// Program header type: dynamic linking info
pub const PT_DYNAMIC: u32 = 2;

/// Program header type: interpreter path
pub const PT_INTERP: u32 = 3;

/// Program header type: auxiliary notes
pub const PT_NOTE: u32 = 4;

/// Program header type: program header table
pub const PT_PHDR: u32 = 6;

/// Program header type: GNU read-only after relocation
pub const PT_GNU_RELRO: u32 = 0x6474_E552;

/// `e_phnum` escape value: the real count lives in section header 0
pub const PN_XNUM: u16 = 0xFFFF;

/// Object type: executable
pub const ET_EXEC: u16 = 2;

/// Object type: shared object
pub const ET_DYN: u16 = 3;

/// Machine type: x86
pub const EM_386: u16 = 3;

/// Machine type: ARM
pub const EM_ARM: u16 = 40;

/// Machine type: x86_64
pub const EM_X86_64: u16 = 62;

/// Machine type: AArch64
pub const EM_AARCH64: u16 = 183;

/// Machine type: RISC-V
pub const EM_RISCV: u16 = 243;

/// Address class declared in `e_ident[EI_CLASS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    fn from_ident(byte: u8) -> Result<Self, ElfError> {
        match byte {
            ELFCLASS32 => Ok(Self::Elf32),
            ELFCLASS64 => Ok(Self::Elf64),
            other => Err(ElfError::UnsupportedClass(other)),
        }
    }

    /// Size of the file header.
    pub const fn header_size(self) -> u64 {
        match self {
            Self::Elf32 => 52,
            Self::Elf64 => 64,
        }
    }

    /// Smallest program header entry able to hold every standard field.
    pub const fn min_phentsize(self) -> u64 {
        match self {
            Self::Elf32 => 32,
            Self::Elf64 => 56,
        }
    }

    /// Smallest section header entry able to hold every standard field.
    pub const fn min_shentsize(self) -> u64 {
        match self {
            Self::Elf32 => 40,
            Self::Elf64 => 64,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            Self::Elf32 => 32,
            Self::Elf64 => 64,
        }
    }
}

impl fmt::Display for ElfClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ELF{}", self.bits())
    }
}

/// Byte order declared in `e_ident[EI_DATA]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    fn from_ident(byte: u8) -> Result<Self, ElfError> {
        match byte {
            ELFDATA2LSB => Ok(Self::Little),
            ELFDATA2MSB => Ok(Self::Big),
            other => Err(ElfError::UnsupportedEndianness(other)),
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Little => write!(f, "little-endian"),
            Self::Big => write!(f, "big-endian"),
        }
    }
}

/// Field reader over a byte buffer with a fixed class and byte order.
#[derive(Clone, Copy)]
struct Fields<'a> {
    bytes: &'a [u8],
    class: ElfClass,
    endian: Endianness,
}

impl<'a> Fields<'a> {
    fn array<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        self.bytes.get(offset..end)?.try_into().ok()
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        let raw = self.array::<2>(offset)?;
        Some(match self.endian {
            Endianness::Little => u16::from_le_bytes(raw),
            Endianness::Big => u16::from_be_bytes(raw),
        })
    }

    fn u32(&self, offset: usize) -> Option<u32> {
        let raw = self.array::<4>(offset)?;
        Some(match self.endian {
            Endianness::Little => u32::from_le_bytes(raw),
            Endianness::Big => u32::from_be_bytes(raw),
        })
    }

    fn u64(&self, offset: usize) -> Option<u64> {
        let raw = self.array::<8>(offset)?;
        Some(match self.endian {
            Endianness::Little => u64::from_le_bytes(raw),
            Endianness::Big => u64::from_be_bytes(raw),
        })
    }

    /// Class-sized word (`Elf32_Addr`/`Elf32_Off` or their 64-bit forms),
    /// widened to `u64`.
    fn word(&self, offset: usize) -> Option<u64> {
        match self.class {
            ElfClass::Elf32 => self.u32(offset).map(u64::from),
            ElfClass::Elf64 => self.u64(offset),
        }
    }
}

/// The file header fields the reader needs.
#[derive(Debug, Clone, Copy)]
struct FileHeader {
    e_type: u16,
    e_machine: u16,
    e_phoff: u64,
    e_shoff: u64,
    e_phentsize: u16,
    e_phnum: u16,
    e_shentsize: u16,
}

impl FileHeader {
    fn decode(fields: &Fields<'_>) -> Option<Self> {
        // (phoff, shoff, phentsize, phnum, shentsize)
        let (phoff, shoff, phentsize, phnum, shentsize) = match fields.class {
            ElfClass::Elf32 => (28, 32, 42, 44, 46),
            ElfClass::Elf64 => (32, 40, 54, 56, 58),
        };
        Some(Self {
            e_type: fields.u16(16)?,
            e_machine: fields.u16(18)?,
            e_phoff: fields.word(phoff)?,
            e_shoff: fields.word(shoff)?,
            e_phentsize: fields.u16(phentsize)?,
            e_phnum: fields.u16(phnum)?,
            e_shentsize: fields.u16(shentsize)?,
        })
    }
}

/// One segment descriptor from the program header table.
///
/// 32-bit images have their fields widened to `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHeaderEntry {
    /// Segment type
    pub p_type: u32,
    /// Segment file offset
    pub p_offset: u64,
    /// Segment virtual address
    pub p_vaddr: u64,
    /// Segment alignment
    pub p_align: u64,
}

impl ProgramHeaderEntry {
    #[inline]
    pub fn is_load(&self) -> bool {
        self.p_type == PT_LOAD
    }

    fn decode(fields: &Fields<'_>, base: usize) -> Option<Self> {
        let at = |rel: usize| base.checked_add(rel);
        match fields.class {
            ElfClass::Elf32 => Some(Self {
                p_type: fields.u32(base)?,
                p_offset: fields.word(at(4)?)?,
                p_vaddr: fields.word(at(8)?)?,
                p_align: fields.word(at(28)?)?,
            }),
            ElfClass::Elf64 => Some(Self {
                p_type: fields.u32(base)?,
                p_offset: fields.word(at(8)?)?,
                p_vaddr: fields.word(at(16)?)?,
                p_align: fields.word(at(48)?)?,
            }),
        }
    }
}

/// A parsed, read-only view over an ELF image.
///
/// Construction validates the identification block, the file header and the
/// extent of the program header table, so iterating the table afterwards
/// never reads out of bounds.
#[derive(Clone, Copy)]
pub struct ElfImage<'a> {
    fields: Fields<'a>,
    header: FileHeader,
    phoff: usize,
    phentsize: usize,
    phnum: usize,
}

impl<'a> ElfImage<'a> {
    /// Parse and validate an ELF image.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ElfError> {
        if bytes.len() < EI_NIDENT || bytes[..4] != ELF_MAGIC {
            return Err(ElfError::malformed("missing ELF magic signature"));
        }

        let class = ElfClass::from_ident(bytes[EI_CLASS])?;
        let endian = Endianness::from_ident(bytes[EI_DATA])?;
        let fields = Fields {
            bytes,
            class,
            endian,
        };
        let available = bytes.len() as u64;

        if available < class.header_size() {
            return Err(ElfError::TruncatedImage {
                what: "file header",
                needed: class.header_size(),
                available,
            });
        }
        let header = FileHeader::decode(&fields).ok_or(ElfError::TruncatedImage {
            what: "file header",
            needed: class.header_size(),
            available,
        })?;

        let phnum = if header.e_phnum == PN_XNUM {
            Self::extended_phnum(&fields, &header)?
        } else {
            u64::from(header.e_phnum)
        };
        let phentsize = u64::from(header.e_phentsize);

        if phnum > 0 && phentsize < class.min_phentsize() {
            return Err(ElfError::malformed(format!(
                "program header entry size {} is below the {} minimum of {}",
                phentsize,
                class,
                class.min_phentsize()
            )));
        }

        let table_end = phnum
            .checked_mul(phentsize)
            .and_then(|size| size.checked_add(header.e_phoff))
            .ok_or(ElfError::TruncatedImage {
                what: "program header table",
                needed: u64::MAX,
                available,
            })?;
        if phnum > 0 && table_end > available {
            return Err(ElfError::TruncatedImage {
                what: "program header table",
                needed: table_end,
                available,
            });
        }

        // Every extent is now known to fit in the buffer, hence in usize.
        let to_usize = |value: u64| {
            usize::try_from(value).map_err(|_| ElfError::TruncatedImage {
                what: "program header table",
                needed: value,
                available,
            })
        };

        Ok(Self {
            fields,
            header,
            phoff: if phnum > 0 { to_usize(header.e_phoff)? } else { 0 },
            phentsize: to_usize(phentsize)?,
            phnum: to_usize(phnum)?,
        })
    }

    /// Resolve `PN_XNUM` through `sh_info` of section header 0.
    fn extended_phnum(fields: &Fields<'_>, header: &FileHeader) -> Result<u64, ElfError> {
        let class = fields.class;
        let available = fields.bytes.len() as u64;
        let shentsize = u64::from(header.e_shentsize);

        if header.e_shoff == 0 {
            return Err(ElfError::malformed(
                "extended program header count without a section header table",
            ));
        }
        if shentsize < class.min_shentsize() {
            return Err(ElfError::malformed(format!(
                "section header entry size {} is below the {} minimum of {}",
                shentsize,
                class,
                class.min_shentsize()
            )));
        }

        let needed = header.e_shoff.saturating_add(shentsize);
        let truncated = ElfError::TruncatedImage {
            what: "section header 0",
            needed,
            available,
        };
        if needed > available {
            return Err(truncated);
        }
        let sh_info_rel = match class {
            ElfClass::Elf32 => 28,
            ElfClass::Elf64 => 44,
        };
        let sh_info = usize::try_from(header.e_shoff)
            .ok()
            .and_then(|base| base.checked_add(sh_info_rel))
            .and_then(|offset| fields.u32(offset))
            .ok_or(truncated)?;

        Ok(u64::from(sh_info))
    }

    pub fn class(&self) -> ElfClass {
        self.fields.class
    }

    pub fn endianness(&self) -> Endianness {
        self.fields.endian
    }

    /// `e_type` (ET_DYN for shared objects).
    pub fn object_type(&self) -> u16 {
        self.header.e_type
    }

    pub fn machine(&self) -> u16 {
        self.header.e_machine
    }

    /// Short architecture name for the common Android ABIs.
    pub fn machine_name(&self) -> &'static str {
        match self.machine() {
            EM_386 => "x86",
            EM_ARM => "arm",
            EM_X86_64 => "x86_64",
            EM_AARCH64 => "aarch64",
            EM_RISCV => "riscv",
            _ => "unknown",
        }
    }

    /// Size of the underlying buffer.
    pub fn len(&self) -> usize {
        self.fields.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.bytes.is_empty()
    }

    pub fn program_header_count(&self) -> usize {
        self.phnum
    }

    /// Lazily decode the program header table in file order.
    pub fn program_headers(&self) -> ProgramHeaders<'a> {
        ProgramHeaders {
            fields: self.fields,
            phoff: self.phoff,
            phentsize: self.phentsize,
            next: 0,
            end: self.phnum,
        }
    }

    /// Only the `PT_LOAD` entries, in file order.
    pub fn load_segments(&self) -> impl Iterator<Item = ProgramHeaderEntry> + 'a {
        self.program_headers().filter(ProgramHeaderEntry::is_load)
    }
}

impl fmt::Debug for ElfImage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElfImage")
            .field("class", &self.fields.class)
            .field("endian", &self.fields.endian)
            .field("machine", &self.header.e_machine)
            .field("phnum", &self.phnum)
            .finish()
    }
}

/// Iterator over the program header table.
#[derive(Clone)]
pub struct ProgramHeaders<'a> {
    fields: Fields<'a>,
    phoff: usize,
    phentsize: usize,
    next: usize,
    end: usize,
}

impl Iterator for ProgramHeaders<'_> {
    type Item = ProgramHeaderEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let base = self
            .next
            .checked_mul(self.phentsize)
            .and_then(|rel| rel.checked_add(self.phoff));
        self.next += 1;
        // The table extent was validated in `ElfImage::parse`.
        let entry = base.and_then(|base| ProgramHeaderEntry::decode(&self.fields, base));
        if entry.is_none() {
            self.next = self.end;
        }
        entry
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ProgramHeaders<'_> {}
